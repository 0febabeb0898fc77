use std::str::FromStr;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::error;

use billbook_core::DomainError;
use billbook_infra::{ServiceError, StoreError};

pub type ApiResult<T> = Result<T, ApiError>;

/// A service failure on its way out as a JSON error body.
#[derive(Debug)]
pub struct ApiError(pub ServiceError);

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        Self(err)
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self(err.into())
    }
}

impl ApiError {
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match &self.0 {
            ServiceError::Domain(err) => match err {
                DomainError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
                DomainError::InvariantViolation(_) => (StatusCode::BAD_REQUEST, "invariant_violation"),
                DomainError::InvalidId(_) => (StatusCode::BAD_REQUEST, "invalid_id"),
                DomainError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
                DomainError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            },
            ServiceError::Store(err) => match err {
                StoreError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
                StoreError::AlreadyExists { .. } => (StatusCode::CONFLICT, "conflict"),
                StoreError::Codec(_) => (StatusCode::INTERNAL_SERVER_ERROR, "store_error"),
                StoreError::Backend(_) => (StatusCode::BAD_GATEWAY, "store_unavailable"),
            },
            ServiceError::NotAuthenticated => (StatusCode::UNAUTHORIZED, "not_authenticated"),
            ServiceError::PartialFailure { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "partial_failure"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            error!(error = %self.0, code, "request failed");
        }
        json_error(status, code, self.0.to_string())
    }
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// Parse a path segment into a typed id.
pub fn parse_id<T>(raw: &str) -> Result<T, ApiError>
where
    T: FromStr<Err = DomainError>,
{
    raw.trim().parse().map_err(ApiError::from)
}
