//! The persistence collaborator: tenant-scoped CRUD over JSON records.
//!
//! Records are grouped by [`RecordFamily`]. Every call names the owning
//! tenant explicitly; an implementation must never return or touch another
//! tenant's rows.

pub mod in_memory;
pub mod postgres;

use std::cmp::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value as JsonValue};
use thiserror::Error;

use billbook_core::{RecordFamily, RecordId, TenantId};

pub use in_memory::InMemoryRecordStore;
pub use postgres::PostgresRecordStore;

/// A persisted record. `body` is the full serialized domain record.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    pub id: RecordId,
    pub tenant_id: TenantId,
    pub family: RecordFamily,
    pub body: JsonValue,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Persistence failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{family} record {id} not found")]
    NotFound { family: RecordFamily, id: RecordId },

    #[error("{family} record {id} already exists")]
    AlreadyExists { family: RecordFamily, id: RecordId },

    #[error("record encoding failed: {0}")]
    Codec(String),

    #[error("storage backend failure: {0}")]
    Backend(String),
}

/// Sort key for [`ListQuery`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderBy {
    /// Storage insertion time.
    CreatedAt,
    /// A top-level field of the record body.
    Field(String),
}

/// Equality filters on top-level body fields plus an ordering.
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    pub filters: Map<String, JsonValue>,
    pub order_by: OrderBy,
    pub descending: bool,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            filters: Map::new(),
            order_by: OrderBy::CreatedAt,
            descending: false,
        }
    }
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, field: impl Into<String>, value: JsonValue) -> Self {
        self.filters.insert(field.into(), value);
        self
    }

    pub fn order_by(mut self, field: impl Into<String>) -> Self {
        self.order_by = OrderBy::Field(field.into());
        self
    }

    pub fn descending(mut self) -> Self {
        self.descending = true;
        self
    }

    pub fn matches(&self, body: &JsonValue) -> bool {
        self.filters
            .iter()
            .all(|(field, expected)| body.get(field) == Some(expected))
    }

    /// Ordering used by stores that sort in process. Ties fall back to
    /// insertion time so results are deterministic.
    pub fn compare(&self, a: &StoredRecord, b: &StoredRecord) -> Ordering {
        let primary = match &self.order_by {
            OrderBy::CreatedAt => Ordering::Equal,
            OrderBy::Field(field) => compare_json(a.body.get(field), b.body.get(field)),
        };
        let ord = primary.then_with(|| a.created_at.cmp(&b.created_at));
        if self.descending { ord.reverse() } else { ord }
    }
}

fn compare_json(a: Option<&JsonValue>, b: Option<&JsonValue>) -> Ordering {
    fn rank(v: Option<&JsonValue>) -> u8 {
        match v {
            None | Some(JsonValue::Null) => 0,
            Some(JsonValue::Bool(_)) => 1,
            Some(JsonValue::Number(_)) => 2,
            Some(JsonValue::String(_)) => 3,
            Some(_) => 4,
        }
    }

    match (a, b) {
        (Some(JsonValue::String(x)), Some(JsonValue::String(y))) => x.cmp(y),
        (Some(JsonValue::Number(x)), Some(JsonValue::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(JsonValue::Bool(x)), Some(JsonValue::Bool(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

/// Tenant-scoped record CRUD.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn list(
        &self,
        tenant_id: TenantId,
        family: RecordFamily,
        query: &ListQuery,
    ) -> Result<Vec<StoredRecord>, StoreError>;

    async fn get(
        &self,
        tenant_id: TenantId,
        family: RecordFamily,
        id: RecordId,
    ) -> Result<Option<StoredRecord>, StoreError>;

    /// Store a new record. The store stamps creation and update times.
    async fn insert(
        &self,
        tenant_id: TenantId,
        family: RecordFamily,
        id: RecordId,
        body: JsonValue,
    ) -> Result<StoredRecord, StoreError>;

    /// Shallow-merge `patch` (a JSON object) into the stored body.
    async fn update(
        &self,
        tenant_id: TenantId,
        family: RecordFamily,
        id: RecordId,
        patch: JsonValue,
    ) -> Result<StoredRecord, StoreError>;

    async fn delete(&self, tenant_id: TenantId, family: RecordFamily, id: RecordId) -> Result<(), StoreError>;
}

#[async_trait]
impl<S> RecordStore for Arc<S>
where
    S: RecordStore + ?Sized,
{
    async fn list(
        &self,
        tenant_id: TenantId,
        family: RecordFamily,
        query: &ListQuery,
    ) -> Result<Vec<StoredRecord>, StoreError> {
        (**self).list(tenant_id, family, query).await
    }

    async fn get(
        &self,
        tenant_id: TenantId,
        family: RecordFamily,
        id: RecordId,
    ) -> Result<Option<StoredRecord>, StoreError> {
        (**self).get(tenant_id, family, id).await
    }

    async fn insert(
        &self,
        tenant_id: TenantId,
        family: RecordFamily,
        id: RecordId,
        body: JsonValue,
    ) -> Result<StoredRecord, StoreError> {
        (**self).insert(tenant_id, family, id, body).await
    }

    async fn update(
        &self,
        tenant_id: TenantId,
        family: RecordFamily,
        id: RecordId,
        patch: JsonValue,
    ) -> Result<StoredRecord, StoreError> {
        (**self).update(tenant_id, family, id, patch).await
    }

    async fn delete(&self, tenant_id: TenantId, family: RecordFamily, id: RecordId) -> Result<(), StoreError> {
        (**self).delete(tenant_id, family, id).await
    }
}

/// Shallow JSON merge: top-level keys of `patch` replace those of `body`.
pub(crate) fn merge_patch(body: &mut JsonValue, patch: JsonValue) -> Result<(), StoreError> {
    let JsonValue::Object(patch) = patch else {
        return Err(StoreError::Codec("update patch must be a JSON object".into()));
    };
    let JsonValue::Object(target) = body else {
        return Err(StoreError::Codec("stored body is not a JSON object".into()));
    };
    for (k, v) in patch {
        target.insert(k, v);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(body: JsonValue, secs: i64) -> StoredRecord {
        let at = DateTime::<Utc>::from_timestamp(secs, 0).unwrap();
        StoredRecord {
            id: RecordId::new(),
            tenant_id: TenantId::new(),
            family: RecordFamily::Bills,
            body,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn filters_are_top_level_equality() {
        let q = ListQuery::new().filter("is_billed", json!(false));
        assert!(q.matches(&json!({"is_billed": false, "x": 1})));
        assert!(!q.matches(&json!({"is_billed": true})));
        assert!(!q.matches(&json!({})));
    }

    #[test]
    fn ordering_by_field_then_insertion() {
        let a = record(json!({"date": "2025-04-02"}), 2);
        let b = record(json!({"date": "2025-04-01"}), 3);
        let c = record(json!({"date": "2025-04-02"}), 1);

        let q = ListQuery::new().order_by("date").descending();
        let mut rows = vec![b.clone(), c.clone(), a.clone()];
        rows.sort_by(|x, y| q.compare(x, y));
        assert_eq!(rows, vec![a, c, b]);
    }

    #[test]
    fn patches_merge_shallowly() {
        let mut body = json!({"a": 1, "b": {"c": 2}});
        merge_patch(&mut body, json!({"b": null, "d": true})).unwrap();
        assert_eq!(body, json!({"a": 1, "b": null, "d": true}));
        assert!(merge_patch(&mut body, json!([1])).is_err());
    }
}
