use billbook_core::TenantId;

use crate::error::{ServiceError, ServiceResult};

/// Who is calling. Every record read or written belongs to the owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Session {
    owner: Option<TenantId>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self { owner: None }
    }

    pub fn owned_by(tenant_id: TenantId) -> Self {
        Self { owner: Some(tenant_id) }
    }

    pub fn owner(&self) -> Option<TenantId> {
        self.owner
    }

    /// Owner for a mutating call. Checked before any payload is built.
    pub fn require_owner(&self) -> ServiceResult<TenantId> {
        self.owner.ok_or(ServiceError::NotAuthenticated)
    }
}
