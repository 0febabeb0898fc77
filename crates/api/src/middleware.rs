use axum::{extract::Request, middleware::Next, response::Response};

use crate::app::errors::ApiError;
use crate::context::session_from_headers;

/// Attach the request's [`billbook_infra::Session`] as an extension.
pub async fn session_middleware(mut req: Request, next: Next) -> Result<Response, ApiError> {
    let session = session_from_headers(req.headers())?;
    req.extensions_mut().insert(session);
    Ok(next.run(req).await)
}
