use billbook_core::TenantId;

use crate::RecordChanged;

/// Messages that belong to exactly one tenant.
///
/// Lets subscribers that serve a single owner discard everyone else's
/// notices (see [`crate::Subscription::drain_for_tenant`]).
pub trait TenantScoped {
    fn tenant_id(&self) -> TenantId;
}

impl TenantScoped for RecordChanged {
    fn tenant_id(&self) -> TenantId {
        RecordChanged::tenant_id(self)
    }
}
