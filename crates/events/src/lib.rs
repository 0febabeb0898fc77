//! Change notifications for the billing book.
//!
//! Every successful write publishes a [`RecordChanged`] notice on an
//! [`EventBus`]. Views that cache anything subscribe and refresh on notice
//! instead of sharing mutable state with the writers.

pub mod bus;
pub mod change;
pub mod in_memory_bus;
pub mod tenant;

pub use bus::{EventBus, Subscription};
pub use change::{ChangeKind, RecordChanged};
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
pub use tenant::TenantScoped;
