//! Delivery challans: goods dispatched to a customer, not yet billed.

pub mod challan;

pub use challan::{ChallanDraft, ChallanId, ChallanLine, ChallanLineInput, DeliveryChallan};
