use axum::{
    Json, Router,
    extract::Extension,
    routing::{get, post},
};

use billbook_accounting::DashboardSummary;
use billbook_infra::{RepairReport, Session};

use crate::app::dto;
use crate::app::errors::ApiResult;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/sagas", get(pending_sagas))
        .route("/sagas/repair", post(repair))
        .route("/consistency", get(consistency))
}

pub async fn dashboard(
    Extension(services): Extension<AppServices>,
    Extension(session): Extension<Session>,
) -> ApiResult<Json<DashboardSummary>> {
    Ok(Json(services.book().dashboard(&session).await?))
}

/// Conversions and deletions still running or waiting for repair.
pub async fn pending_sagas(
    Extension(services): Extension<AppServices>,
    Extension(session): Extension<Session>,
) -> ApiResult<Json<serde_json::Value>> {
    Ok(dto::items(services.book().pending_sagas(&session).await?))
}

pub async fn repair(
    Extension(services): Extension<AppServices>,
    Extension(session): Extension<Session>,
) -> ApiResult<Json<RepairReport>> {
    Ok(Json(services.book().repair_pending(&session).await?))
}

pub async fn consistency(
    Extension(services): Extension<AppServices>,
    Extension(session): Extension<Session>,
) -> ApiResult<Json<serde_json::Value>> {
    Ok(dto::items(services.book().consistency_report(&session).await?))
}
