use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    routing::{get, post},
};
use chrono::Utc;
use serde_json::json;

use billbook_infra::{ConvertChallans, Session};
use billbook_invoicing::Bill;
use billbook_parties::{Customer, CustomerId, CustomerUpdate, NewCustomer};

use crate::app::dto::{self, ConvertRequest, NameQuery, PeriodQuery, StatementResponse};
use crate::app::errors::{ApiResult, parse_id};
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_customer).get(list_customers))
        .route("/lookup", get(lookup_customer))
        .route("/:id", get(get_customer).patch(update_customer).delete(delete_customer))
        .route("/:id/challans", get(customer_challans))
        .route("/:id/unbilled-challans", get(unbilled_challans))
        .route("/:id/bills", get(customer_bills))
        .route("/:id/previous-balance", get(previous_balance))
        .route("/:id/ledger", get(ledger))
        .route("/:id/convert", post(convert))
}

pub async fn create_customer(
    Extension(services): Extension<AppServices>,
    Extension(session): Extension<Session>,
    Json(body): Json<NewCustomer>,
) -> ApiResult<(StatusCode, Json<Customer>)> {
    let customer = services.book().create_customer(&session, body).await?;
    Ok((StatusCode::CREATED, Json(customer)))
}

pub async fn list_customers(
    Extension(services): Extension<AppServices>,
    Extension(session): Extension<Session>,
) -> ApiResult<Json<serde_json::Value>> {
    Ok(dto::items(services.book().list_customers(&session).await?))
}

/// Case-insensitive exact-name lookup.
pub async fn lookup_customer(
    Extension(services): Extension<AppServices>,
    Extension(session): Extension<Session>,
    Query(query): Query<NameQuery>,
) -> ApiResult<Json<Option<Customer>>> {
    Ok(Json(services.book().find_customer(&session, &query.name).await?))
}

pub async fn get_customer(
    Extension(services): Extension<AppServices>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> ApiResult<Json<Customer>> {
    let id: CustomerId = parse_id(&id)?;
    Ok(Json(services.book().get_customer(&session, id).await?))
}

pub async fn update_customer(
    Extension(services): Extension<AppServices>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
    Json(body): Json<CustomerUpdate>,
) -> ApiResult<Json<Customer>> {
    let id: CustomerId = parse_id(&id)?;
    Ok(Json(services.book().update_customer(&session, id, body).await?))
}

pub async fn delete_customer(
    Extension(services): Extension<AppServices>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id: CustomerId = parse_id(&id)?;
    services.book().delete_customer(&session, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn customer_challans(
    Extension(services): Extension<AppServices>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
    Query(period): Query<PeriodQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    let id: CustomerId = parse_id(&id)?;
    let period = period.to_filter()?;
    Ok(dto::items(services.book().customer_challans(&session, id, &period).await?))
}

pub async fn unbilled_challans(
    Extension(services): Extension<AppServices>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let id: CustomerId = parse_id(&id)?;
    Ok(dto::items(services.book().unbilled_challans(&session, id).await?))
}

pub async fn customer_bills(
    Extension(services): Extension<AppServices>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
    Query(period): Query<PeriodQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    let id: CustomerId = parse_id(&id)?;
    let period = period.to_filter()?;
    Ok(dto::items(services.book().customer_bills(&session, id, &period).await?))
}

pub async fn previous_balance(
    Extension(services): Extension<AppServices>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let id: CustomerId = parse_id(&id)?;
    let customer = services.book().get_customer(&session, id).await?;
    let balance = services.book().previous_balance(&session, &customer.to_ref()).await?;
    Ok(Json(json!({ "customer_id": id, "previous_balance": balance })))
}

pub async fn ledger(
    Extension(services): Extension<AppServices>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
    Query(period): Query<PeriodQuery>,
) -> ApiResult<Json<StatementResponse>> {
    let id: CustomerId = parse_id(&id)?;
    let period = period.to_filter()?;
    let statement = services.book().customer_statement(&session, id, &period).await?;
    Ok(Json(statement.into()))
}

pub async fn convert(
    Extension(services): Extension<AppServices>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
    Json(body): Json<ConvertRequest>,
) -> ApiResult<(StatusCode, Json<Bill>)> {
    let customer_id: CustomerId = parse_id(&id)?;
    let request = ConvertChallans {
        customer_id,
        challan_ids: body.challan_ids,
        date: body.date.unwrap_or_else(|| Utc::now().date_naive()),
        gst_rate: body.gst_rate,
    };
    let bill = services.book().convert_challans(&session, request).await?;
    Ok((StatusCode::CREATED, Json(bill)))
}
