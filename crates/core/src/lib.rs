//! `billbook-core` — shared building blocks for the billing domain crates.
//!
//! Pure domain primitives only: identifiers, the error model, record families,
//! financial-year numbering and period filters. No IO lives here.

pub mod entity;
pub mod error;
pub mod family;
pub mod fiscal;
pub mod id;
pub mod period;
pub mod value_object;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use family::{DocumentFamily, RecordFamily};
pub use fiscal::{DocumentNumber, FinancialYear, next_document_number, sequence_suffix};
pub use id::{RecordId, TenantId, UserId};
pub use period::PeriodFilter;
pub use value_object::ValueObject;
