//! Typed access to the record store.
//!
//! [`Books`] serialises domain records into store bodies and back, and
//! publishes a [`RecordChanged`] notice after every successful write so
//! interested parties can refresh instead of sharing a mutable cache.

use chrono::Utc;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use billbook_accounting::{CashAccount, CashTransaction};
use billbook_core::{Entity, RecordFamily, RecordId, TenantId};
use billbook_events::{ChangeKind, EventBus, RecordChanged};
use billbook_invoicing::{Bill, Invoice};
use billbook_parties::Customer;
use billbook_products::Item;
use billbook_sales::DeliveryChallan;

use crate::saga::SagaLog;
use crate::store::{ListQuery, RecordStore, StoreError, StoredRecord};

/// A domain type persisted as one record family.
pub trait Record: Entity + Serialize + DeserializeOwned + Send + Sync {
    const FAMILY: RecordFamily;
}

impl Record for Customer {
    const FAMILY: RecordFamily = RecordFamily::Customers;
}

impl Record for Item {
    const FAMILY: RecordFamily = RecordFamily::Items;
}

impl Record for DeliveryChallan {
    const FAMILY: RecordFamily = RecordFamily::DeliveryChallans;
}

impl Record for Bill {
    const FAMILY: RecordFamily = RecordFamily::Bills;
}

impl Record for Invoice {
    const FAMILY: RecordFamily = RecordFamily::Invoices;
}

impl Record for SagaLog {
    const FAMILY: RecordFamily = RecordFamily::SagaLogs;
}

impl Record for CashAccount {
    const FAMILY: RecordFamily = RecordFamily::CashAccounts;
}

impl Record for CashTransaction {
    const FAMILY: RecordFamily = RecordFamily::CashTransactions;
}

fn encode<R: Record>(record: &R) -> Result<JsonValue, StoreError> {
    serde_json::to_value(record).map_err(|e| StoreError::Codec(format!("encode {}: {e}", R::FAMILY)))
}

fn decode<R: Record>(stored: StoredRecord) -> Result<R, StoreError> {
    serde_json::from_value(stored.body)
        .map_err(|e| StoreError::Codec(format!("decode {} {}: {e}", R::FAMILY, stored.id)))
}

/// Record store plus change notifications.
#[derive(Debug, Clone)]
pub struct Books<S, B> {
    store: S,
    bus: B,
}

impl<S, B> Books<S, B>
where
    S: RecordStore,
    B: EventBus<RecordChanged>,
{
    pub fn new(store: S, bus: B) -> Self {
        Self { store, bus }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub async fn list<R: Record>(&self, tenant_id: TenantId, query: &ListQuery) -> Result<Vec<R>, StoreError> {
        self.store
            .list(tenant_id, R::FAMILY, query)
            .await?
            .into_iter()
            .map(decode)
            .collect()
    }

    /// Every record of the family, oldest first.
    pub async fn all<R: Record>(&self, tenant_id: TenantId) -> Result<Vec<R>, StoreError> {
        self.list(tenant_id, &ListQuery::new()).await
    }

    pub async fn get<R: Record>(&self, tenant_id: TenantId, id: R::Id) -> Result<Option<R>, StoreError> {
        self.store
            .get(tenant_id, R::FAMILY, id.into())
            .await?
            .map(decode)
            .transpose()
    }

    pub async fn insert<R: Record>(&self, tenant_id: TenantId, record: &R) -> Result<(), StoreError> {
        let id = record.record_id();
        self.store.insert(tenant_id, R::FAMILY, id, encode(record)?).await?;
        debug!(%tenant_id, family = %R::FAMILY, %id, "record inserted");
        self.notify(tenant_id, R::FAMILY, id, ChangeKind::Inserted);
        Ok(())
    }

    /// Overwrite the stored body with `record`.
    pub async fn save<R: Record>(&self, tenant_id: TenantId, record: &R) -> Result<(), StoreError> {
        let id = record.record_id();
        self.store.update(tenant_id, R::FAMILY, id, encode(record)?).await?;
        debug!(%tenant_id, family = %R::FAMILY, %id, "record updated");
        self.notify(tenant_id, R::FAMILY, id, ChangeKind::Updated);
        Ok(())
    }

    /// Write only the given top-level fields.
    pub async fn patch(
        &self,
        tenant_id: TenantId,
        family: RecordFamily,
        id: RecordId,
        fields: JsonValue,
    ) -> Result<(), StoreError> {
        self.store.update(tenant_id, family, id, fields).await?;
        debug!(%tenant_id, %family, %id, "record patched");
        self.notify(tenant_id, family, id, ChangeKind::Updated);
        Ok(())
    }

    pub async fn delete<R: Record>(&self, tenant_id: TenantId, id: R::Id) -> Result<(), StoreError> {
        let id: RecordId = id.into();
        self.store.delete(tenant_id, R::FAMILY, id).await?;
        debug!(%tenant_id, family = %R::FAMILY, %id, "record deleted");
        self.notify(tenant_id, R::FAMILY, id, ChangeKind::Deleted);
        Ok(())
    }

    /// Raw bodies, for callers that only need a field or two.
    pub async fn bodies(&self, tenant_id: TenantId, family: RecordFamily) -> Result<Vec<JsonValue>, StoreError> {
        Ok(self
            .store
            .list(tenant_id, family, &ListQuery::new())
            .await?
            .into_iter()
            .map(|r| r.body)
            .collect())
    }

    // The write already landed; a lost notice only delays a refresh.
    fn notify(&self, tenant_id: TenantId, family: RecordFamily, id: RecordId, kind: ChangeKind) {
        let notice = RecordChanged::new(tenant_id, family, id, kind, Utc::now());
        if let Err(err) = self.bus.publish(notice) {
            warn!(%tenant_id, %family, %id, error = ?err, "failed to publish change notice");
        }
    }
}
