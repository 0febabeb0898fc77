//! Customers and how documents refer to them.
//!
//! Pure domain logic: no IO, no HTTP, no storage.

pub mod customer;

pub use customer::{Customer, CustomerId, CustomerRef, CustomerUpdate, NewCustomer, resolve_customer};
