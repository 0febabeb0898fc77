//! Entity trait: identity + continuity across state changes.

use crate::id::RecordId;

/// A persisted record with a stable identity.
///
/// Every stored document (customer, item, challan, bill, invoice) implements
/// this so that generic repositories can address it by its raw [`RecordId`].
pub trait Entity {
    /// Strongly-typed identifier.
    type Id: Copy + Eq + core::hash::Hash + core::fmt::Debug + Into<RecordId>;

    /// Returns the entity identifier.
    fn id(&self) -> Self::Id;

    /// Raw identifier used by the storage layer.
    fn record_id(&self) -> RecordId {
        self.id().into()
    }
}
