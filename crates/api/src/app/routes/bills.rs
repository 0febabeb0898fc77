use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    routing::{get, post},
};
use serde_json::json;

use billbook_core::DocumentFamily;
use billbook_infra::Session;
use billbook_invoicing::{Bill, BillId, BillStatus, InvoiceDraft};

use crate::app::dto::{self, DateQuery, StatusRequest};
use crate::app::errors::{ApiResult, parse_id};
use crate::app::services::AppServices;

/// Bills are created only by converting challans (`POST /customers/:id/convert`).
pub fn router() -> Router {
    Router::new()
        .route("/", get(list_bills))
        .route("/next-number", get(next_number))
        .route("/:id", get(get_bill).delete(delete_bill))
        .route("/:id/status", post(set_status))
        .route("/:id/invoice-draft", get(invoice_draft))
}

pub async fn list_bills(
    Extension(services): Extension<AppServices>,
    Extension(session): Extension<Session>,
) -> ApiResult<Json<serde_json::Value>> {
    Ok(dto::items(services.book().list_bills(&session).await?))
}

pub async fn next_number(
    Extension(services): Extension<AppServices>,
    Extension(session): Extension<Session>,
    Query(query): Query<DateQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    let number = services
        .book()
        .next_number(&session, DocumentFamily::Bill, query.or_today())
        .await?;
    Ok(Json(json!({ "number": number.to_string() })))
}

pub async fn get_bill(
    Extension(services): Extension<AppServices>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> ApiResult<Json<Bill>> {
    let id: BillId = parse_id(&id)?;
    Ok(Json(services.book().get_bill(&session, id).await?))
}

/// Unlinks the bill's challans, then removes the bill.
pub async fn delete_bill(
    Extension(services): Extension<AppServices>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id: BillId = parse_id(&id)?;
    services.book().delete_bill(&session, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn set_status(
    Extension(services): Extension<AppServices>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
    Json(body): Json<StatusRequest<BillStatus>>,
) -> ApiResult<Json<Bill>> {
    let id: BillId = parse_id(&id)?;
    Ok(Json(services.book().set_bill_status(&session, id, body.status).await?))
}

pub async fn invoice_draft(
    Extension(services): Extension<AppServices>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> ApiResult<Json<InvoiceDraft>> {
    let id: BillId = parse_id(&id)?;
    Ok(Json(services.book().invoice_draft_from_bill(&session, id).await?))
}
