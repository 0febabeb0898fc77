use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use billbook_core::{RecordFamily, RecordId, TenantId};

/// What happened to a record.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Inserted,
    Updated,
    Deleted,
}

/// Notice that one stored record changed.
///
/// Carries identity only, never the record body: subscribers re-read what
/// they need from the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordChanged {
    notice_id: Uuid,
    tenant_id: TenantId,
    family: RecordFamily,
    record_id: RecordId,
    kind: ChangeKind,
    occurred_at: DateTime<Utc>,
}

impl RecordChanged {
    pub fn new(
        tenant_id: TenantId,
        family: RecordFamily,
        record_id: RecordId,
        kind: ChangeKind,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            notice_id: Uuid::now_v7(),
            tenant_id,
            family,
            record_id,
            kind,
            occurred_at,
        }
    }

    pub fn notice_id(&self) -> Uuid {
        self.notice_id
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    pub fn family(&self) -> RecordFamily {
        self.family
    }

    pub fn record_id(&self) -> RecordId {
        self.record_id
    }

    pub fn kind(&self) -> ChangeKind {
        self.kind
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}
