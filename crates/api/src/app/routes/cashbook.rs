use axum::{
    Json, Router,
    extract::{Extension, Query},
    http::StatusCode,
    routing::get,
};

use billbook_accounting::{CashAccount, CashSummary, CashTransaction, NewCashAccount, TransactionDraft};
use billbook_infra::Session;

use crate::app::dto::{self, PeriodQuery};
use crate::app::errors::ApiResult;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/accounts", get(list_accounts).post(open_account))
        .route("/transactions", get(list_transactions).post(record_transaction))
        .route("/summary", get(summary))
}

pub async fn list_accounts(
    Extension(services): Extension<AppServices>,
    Extension(session): Extension<Session>,
) -> ApiResult<Json<serde_json::Value>> {
    Ok(dto::items(services.book().list_cash_accounts(&session).await?))
}

pub async fn open_account(
    Extension(services): Extension<AppServices>,
    Extension(session): Extension<Session>,
    Json(body): Json<NewCashAccount>,
) -> ApiResult<(StatusCode, Json<CashAccount>)> {
    let account = services.book().open_cash_account(&session, body).await?;
    Ok((StatusCode::CREATED, Json(account)))
}

/// Transactions filtered by `?years=` and 0-based `?months=`, newest first.
pub async fn list_transactions(
    Extension(services): Extension<AppServices>,
    Extension(session): Extension<Session>,
    Query(period): Query<PeriodQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    let period = period.to_filter()?;
    Ok(dto::items(services.book().cash_transactions(&session, &period).await?))
}

pub async fn record_transaction(
    Extension(services): Extension<AppServices>,
    Extension(session): Extension<Session>,
    Json(body): Json<TransactionDraft>,
) -> ApiResult<(StatusCode, Json<CashTransaction>)> {
    let transaction = services.book().record_cash_transaction(&session, body).await?;
    Ok((StatusCode::CREATED, Json(transaction)))
}

pub async fn summary(
    Extension(services): Extension<AppServices>,
    Extension(session): Extension<Session>,
) -> ApiResult<Json<CashSummary>> {
    Ok(Json(services.book().cash_summary(&session).await?))
}
