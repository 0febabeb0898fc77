use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value as JsonValue;

use billbook_core::{RecordFamily, RecordId, TenantId};

use super::{ListQuery, RecordStore, StoreError, StoredRecord, merge_patch};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
struct TableKey {
    tenant_id: TenantId,
    family: RecordFamily,
}

/// In-memory record store.
///
/// Intended for tests/dev. Not optimized for performance.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    tables: RwLock<HashMap<TableKey, BTreeMap<RecordId, StoredRecord>>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned() -> StoreError {
        StoreError::Backend("lock poisoned".to_string())
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn list(
        &self,
        tenant_id: TenantId,
        family: RecordFamily,
        query: &ListQuery,
    ) -> Result<Vec<StoredRecord>, StoreError> {
        let tables = self.tables.read().map_err(|_| Self::poisoned())?;
        let Some(table) = tables.get(&TableKey { tenant_id, family }) else {
            return Ok(Vec::new());
        };

        let mut rows: Vec<StoredRecord> = table
            .values()
            .filter(|r| query.matches(&r.body))
            .cloned()
            .collect();
        rows.sort_by(|a, b| query.compare(a, b));
        Ok(rows)
    }

    async fn get(
        &self,
        tenant_id: TenantId,
        family: RecordFamily,
        id: RecordId,
    ) -> Result<Option<StoredRecord>, StoreError> {
        let tables = self.tables.read().map_err(|_| Self::poisoned())?;
        Ok(tables
            .get(&TableKey { tenant_id, family })
            .and_then(|t| t.get(&id))
            .cloned())
    }

    async fn insert(
        &self,
        tenant_id: TenantId,
        family: RecordFamily,
        id: RecordId,
        body: JsonValue,
    ) -> Result<StoredRecord, StoreError> {
        if !body.is_object() {
            return Err(StoreError::Codec("record body must be a JSON object".into()));
        }

        let mut tables = self.tables.write().map_err(|_| Self::poisoned())?;
        let table = tables.entry(TableKey { tenant_id, family }).or_default();
        if table.contains_key(&id) {
            return Err(StoreError::AlreadyExists { family, id });
        }

        let now = Utc::now();
        let stored = StoredRecord {
            id,
            tenant_id,
            family,
            body,
            created_at: now,
            updated_at: now,
        };
        table.insert(id, stored.clone());
        Ok(stored)
    }

    async fn update(
        &self,
        tenant_id: TenantId,
        family: RecordFamily,
        id: RecordId,
        patch: JsonValue,
    ) -> Result<StoredRecord, StoreError> {
        let mut tables = self.tables.write().map_err(|_| Self::poisoned())?;
        let record = tables
            .get_mut(&TableKey { tenant_id, family })
            .and_then(|t| t.get_mut(&id))
            .ok_or(StoreError::NotFound { family, id })?;

        let mut body = record.body.clone();
        merge_patch(&mut body, patch)?;
        record.body = body;
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    async fn delete(&self, tenant_id: TenantId, family: RecordFamily, id: RecordId) -> Result<(), StoreError> {
        let mut tables = self.tables.write().map_err(|_| Self::poisoned())?;
        tables
            .get_mut(&TableKey { tenant_id, family })
            .and_then(|t| t.remove(&id))
            .map(|_| ())
            .ok_or(StoreError::NotFound { family, id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn tenants_are_isolated() {
        let store = InMemoryRecordStore::new();
        let t1 = TenantId::new();
        let t2 = TenantId::new();
        let id = RecordId::new();

        store
            .insert(t1, RecordFamily::Customers, id, json!({"name": "Acme"}))
            .await
            .unwrap();

        assert!(store.get(t2, RecordFamily::Customers, id).await.unwrap().is_none());
        assert!(store.list(t2, RecordFamily::Customers, &ListQuery::new()).await.unwrap().is_empty());
        assert_eq!(
            store.delete(t2, RecordFamily::Customers, id).await,
            Err(StoreError::NotFound {
                family: RecordFamily::Customers,
                id
            })
        );
        assert_eq!(store.list(t1, RecordFamily::Customers, &ListQuery::new()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn update_merges_and_missing_rows_fail() {
        let store = InMemoryRecordStore::new();
        let t = TenantId::new();
        let id = RecordId::new();
        store
            .insert(t, RecordFamily::DeliveryChallans, id, json!({"is_billed": false, "bill_id": null}))
            .await
            .unwrap();

        let bill = RecordId::new();
        let updated = store
            .update(
                t,
                RecordFamily::DeliveryChallans,
                id,
                json!({"is_billed": true, "bill_id": bill}),
            )
            .await
            .unwrap();
        assert_eq!(updated.body["is_billed"], true);

        let billed = store
            .list(t, RecordFamily::DeliveryChallans, &ListQuery::new().filter("is_billed", json!(true)))
            .await
            .unwrap();
        assert_eq!(billed.len(), 1);

        let err = store
            .update(t, RecordFamily::DeliveryChallans, RecordId::new(), json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn duplicate_ids_are_rejected() {
        let store = InMemoryRecordStore::new();
        let t = TenantId::new();
        let id = RecordId::new();
        store.insert(t, RecordFamily::Items, id, json!({})).await.unwrap();
        let err = store.insert(t, RecordFamily::Items, id, json!({})).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists { .. }));
    }
}
