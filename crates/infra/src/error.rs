use thiserror::Error;

use billbook_core::{DomainError, RecordId};

use crate::store::StoreError;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Failure of a billing service call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// A mutating call was made without an owning tenant.
    #[error("not authenticated")]
    NotAuthenticated,

    /// A multi-step billing transition failed and could not be rolled back.
    /// The saga log `saga_id` records what is left to repair.
    #[error("operation partially applied (saga {saga_id}): {reason}")]
    PartialFailure { saga_id: RecordId, reason: String },
}

impl ServiceError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::Domain(DomainError::not_found(what))
    }
}
