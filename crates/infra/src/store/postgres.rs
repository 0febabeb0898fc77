//! Postgres-backed record store.
//!
//! All families share one `records` table keyed by `(tenant_id, family, id)`
//! with the record body in a `jsonb` column. Filters use jsonb containment
//! and ordering sorts on the text value of a body field.
//!
//! ## Error Mapping
//!
//! | SQLx error | Postgres code | StoreError |
//! |------------|---------------|------------|
//! | Database (unique violation) | `23505` | `AlreadyExists` |
//! | Database (other) | any | `Backend` |
//! | PoolClosed / other | n/a | `Backend` |

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use tracing::instrument;

use billbook_core::{RecordFamily, RecordId, TenantId};

use super::{ListQuery, OrderBy, RecordStore, StoreError, StoredRecord};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS records (
    tenant_id   UUID        NOT NULL,
    family      TEXT        NOT NULL,
    id          UUID        NOT NULL,
    body        JSONB       NOT NULL,
    created_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
    PRIMARY KEY (tenant_id, family, id)
);
CREATE INDEX IF NOT EXISTS records_body_gin ON records USING GIN (body jsonb_path_ops);
"#;

#[derive(Debug, Clone)]
pub struct PostgresRecordStore {
    pool: Arc<PgPool>,
}

impl PostgresRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }

    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create the `records` table and its index if they do not exist.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(())
    }
}

fn decode_row(row: &sqlx::postgres::PgRow, family: RecordFamily) -> Result<StoredRecord, StoreError> {
    let decode = |e: sqlx::Error| StoreError::Codec(format!("failed to decode record row: {e}"));
    let id: uuid::Uuid = row.try_get("id").map_err(decode)?;
    let tenant_id: uuid::Uuid = row.try_get("tenant_id").map_err(decode)?;
    let body: Json<JsonValue> = row.try_get("body").map_err(decode)?;
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(decode)?;
    let updated_at: DateTime<Utc> = row.try_get("updated_at").map_err(decode)?;

    Ok(StoredRecord {
        id: RecordId::from_uuid(id),
        tenant_id: TenantId::from_uuid(tenant_id),
        family,
        body: body.0,
        created_at,
        updated_at,
    })
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            StoreError::Backend(format!("database error in {operation}: {}", db_err.message()))
        }
        sqlx::Error::PoolClosed => StoreError::Backend(format!("connection pool closed in {operation}")),
        other => StoreError::Backend(format!("sqlx error in {operation}: {other}")),
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}

#[async_trait]
impl RecordStore for PostgresRecordStore {
    #[instrument(skip(self, query), fields(tenant_id = %tenant_id, family = %family), err)]
    async fn list(
        &self,
        tenant_id: TenantId,
        family: RecordFamily,
        query: &ListQuery,
    ) -> Result<Vec<StoredRecord>, StoreError> {
        let direction = if query.descending { "DESC" } else { "ASC" };
        let order = match &query.order_by {
            OrderBy::CreatedAt => format!("created_at {direction}"),
            OrderBy::Field(_) => format!("body->>$4 {direction}, created_at {direction}"),
        };
        let sql = format!(
            "SELECT id, tenant_id, body, created_at, updated_at FROM records \
             WHERE tenant_id = $1 AND family = $2 AND body @> $3 ORDER BY {order}"
        );

        let mut q = sqlx::query(&sql)
            .bind(*tenant_id.as_uuid())
            .bind(family.as_str())
            .bind(Json(JsonValue::Object(query.filters.clone())));
        if let OrderBy::Field(field) = &query.order_by {
            q = q.bind(field.clone());
        }

        let rows = q
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list", e))?;
        rows.iter().map(|r| decode_row(r, family)).collect()
    }

    async fn get(
        &self,
        tenant_id: TenantId,
        family: RecordFamily,
        id: RecordId,
    ) -> Result<Option<StoredRecord>, StoreError> {
        let row = sqlx::query(
            "SELECT id, tenant_id, body, created_at, updated_at FROM records \
             WHERE tenant_id = $1 AND family = $2 AND id = $3",
        )
        .bind(*tenant_id.as_uuid())
        .bind(family.as_str())
        .bind(*id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get", e))?;

        row.map(|r| decode_row(&r, family)).transpose()
    }

    #[instrument(skip(self, body), fields(tenant_id = %tenant_id, family = %family, id = %id), err)]
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

        let row = sqlx::query(
            "INSERT INTO records (tenant_id, family, id, body) VALUES ($1, $2, $3, $4) \
             RETURNING id, tenant_id, body, created_at, updated_at",
        )
        .bind(*tenant_id.as_uuid())
        .bind(family.as_str())
        .bind(*id.as_uuid())
        .bind(Json(body))
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::AlreadyExists { family, id }
            } else {
                map_sqlx_error("insert", e)
            }
        })?;

        decode_row(&row, family)
    }

    #[instrument(skip(self, patch), fields(tenant_id = %tenant_id, family = %family, id = %id), err)]
    async fn update(
        &self,
        tenant_id: TenantId,
        family: RecordFamily,
        id: RecordId,
        patch: JsonValue,
    ) -> Result<StoredRecord, StoreError> {
        if !patch.is_object() {
            return Err(StoreError::Codec("update patch must be a JSON object".into()));
        }

        // `||` on jsonb objects is a shallow merge.
        let row = sqlx::query(
            "UPDATE records SET body = body || $4, updated_at = now() \
             WHERE tenant_id = $1 AND family = $2 AND id = $3 \
             RETURNING id, tenant_id, body, created_at, updated_at",
        )
        .bind(*tenant_id.as_uuid())
        .bind(family.as_str())
        .bind(*id.as_uuid())
        .bind(Json(patch))
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update", e))?;

        match row {
            Some(row) => decode_row(&row, family),
            None => Err(StoreError::NotFound { family, id }),
        }
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, family = %family, id = %id), err)]
    async fn delete(&self, tenant_id: TenantId, family: RecordFamily, id: RecordId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM records WHERE tenant_id = $1 AND family = $2 AND id = $3")
            .bind(*tenant_id.as_uuid())
            .bind(family.as_str())
            .bind(*id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound { family, id });
        }
        Ok(())
    }
}
