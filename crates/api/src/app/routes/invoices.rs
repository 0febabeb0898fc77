use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    routing::{get, post},
};
use serde_json::json;

use billbook_core::DocumentFamily;
use billbook_infra::Session;
use billbook_invoicing::{Invoice, InvoiceDraft, InvoiceId, InvoiceStatus, amount_in_words};

use crate::app::dto::{self, DateQuery, SearchQuery, StatusRequest};
use crate::app::errors::{ApiResult, parse_id};
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_invoice).get(list_invoices))
        .route("/next-number", get(next_number))
        .route("/:id", get(get_invoice).put(update_invoice).delete(delete_invoice))
        .route("/:id/status", post(set_status))
}

pub async fn create_invoice(
    Extension(services): Extension<AppServices>,
    Extension(session): Extension<Session>,
    Json(body): Json<InvoiceDraft>,
) -> ApiResult<(StatusCode, Json<Invoice>)> {
    let invoice = services.book().create_invoice(&session, body).await?;
    Ok((StatusCode::CREATED, Json(invoice)))
}

/// Sales register, optionally filtered with `?q=`.
pub async fn list_invoices(
    Extension(services): Extension<AppServices>,
    Extension(session): Extension<Session>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    Ok(dto::items(
        services.book().list_invoices(&session, query.q.as_deref()).await?,
    ))
}

pub async fn next_number(
    Extension(services): Extension<AppServices>,
    Extension(session): Extension<Session>,
    Query(query): Query<DateQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    let number = services
        .book()
        .next_number(&session, DocumentFamily::Invoice, query.or_today())
        .await?;
    Ok(Json(json!({ "number": number.to_string() })))
}

/// The invoice plus its grand total in words, as printed.
pub async fn get_invoice(
    Extension(services): Extension<AppServices>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let id: InvoiceId = parse_id(&id)?;
    let invoice = services.book().get_invoice(&session, id).await?;
    let words = amount_in_words(invoice.grand_total);
    Ok(Json(json!({ "invoice": invoice, "grand_total_in_words": words })))
}

pub async fn update_invoice(
    Extension(services): Extension<AppServices>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
    Json(body): Json<InvoiceDraft>,
) -> ApiResult<Json<Invoice>> {
    let id: InvoiceId = parse_id(&id)?;
    Ok(Json(services.book().update_invoice(&session, id, body).await?))
}

pub async fn delete_invoice(
    Extension(services): Extension<AppServices>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id: InvoiceId = parse_id(&id)?;
    services.book().delete_invoice(&session, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn set_status(
    Extension(services): Extension<AppServices>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
    Json(body): Json<StatusRequest<InvoiceStatus>>,
) -> ApiResult<Json<Invoice>> {
    let id: InvoiceId = parse_id(&id)?;
    Ok(Json(services.book().set_invoice_status(&session, id, body.status).await?))
}
