use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    routing::{get, post},
};
use serde_json::json;

use billbook_core::DocumentFamily;
use billbook_infra::Session;
use billbook_parties::CustomerRef;
use billbook_sales::{ChallanDraft, ChallanId, DeliveryChallan};

use crate::app::dto::{self, DateQuery, NameQuery};
use crate::app::errors::{ApiResult, parse_id};
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_challan).get(list_challans))
        .route("/next-number", get(next_number))
        .route("/previous-balance", get(previous_balance_by_name))
        .route("/:id", get(get_challan).put(update_challan).delete(delete_challan))
}

pub async fn create_challan(
    Extension(services): Extension<AppServices>,
    Extension(session): Extension<Session>,
    Json(body): Json<ChallanDraft>,
) -> ApiResult<(StatusCode, Json<DeliveryChallan>)> {
    let challan = services.book().create_challan(&session, body).await?;
    Ok((StatusCode::CREATED, Json(challan)))
}

pub async fn list_challans(
    Extension(services): Extension<AppServices>,
    Extension(session): Extension<Session>,
) -> ApiResult<Json<serde_json::Value>> {
    Ok(dto::items(services.book().list_challans(&session).await?))
}

pub async fn next_number(
    Extension(services): Extension<AppServices>,
    Extension(session): Extension<Session>,
    Query(query): Query<DateQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    let number = services
        .book()
        .next_number(&session, DocumentFamily::Challan, query.or_today())
        .await?;
    Ok(Json(json!({ "number": number.to_string() })))
}

/// Opening balance for a walk-in customer known only by name.
pub async fn previous_balance_by_name(
    Extension(services): Extension<AppServices>,
    Extension(session): Extension<Session>,
    Query(query): Query<NameQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    let customer = CustomerRef::unlinked(query.name.trim());
    let balance = services.book().previous_balance(&session, &customer).await?;
    Ok(Json(json!({ "customer_name": customer.name, "previous_balance": balance })))
}

pub async fn get_challan(
    Extension(services): Extension<AppServices>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> ApiResult<Json<DeliveryChallan>> {
    let id: ChallanId = parse_id(&id)?;
    Ok(Json(services.book().get_challan(&session, id).await?))
}

pub async fn update_challan(
    Extension(services): Extension<AppServices>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
    Json(body): Json<ChallanDraft>,
) -> ApiResult<Json<DeliveryChallan>> {
    let id: ChallanId = parse_id(&id)?;
    Ok(Json(services.book().update_challan(&session, id, body).await?))
}

pub async fn delete_challan(
    Extension(services): Extension<AppServices>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id: ChallanId = parse_id(&id)?;
    services.book().delete_challan(&session, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
