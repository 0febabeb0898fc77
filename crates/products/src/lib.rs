//! Item catalog.

pub mod item;

pub use item::{Item, ItemId, ItemUpdate, NewItem, find_by_name, hsn_for};
