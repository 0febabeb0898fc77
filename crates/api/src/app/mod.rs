//! HTTP application wiring.
//!
//! - `services.rs`: store and bus wiring behind [`billbook_infra::BillBook`]
//! - `routes/`: handlers, one file per record family
//! - `dto.rs`: query strings, request bodies and response shapes
//! - `errors.rs`: JSON error responses

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

use billbook_infra::AppConfig;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::AppServices;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub async fn build_app(config: &AppConfig) -> anyhow::Result<Router> {
    let services = services::build_services(config).await?;
    Ok(router(services))
}

/// Router over already-built services.
pub fn router(services: AppServices) -> Router {
    let scoped = routes::router().layer(
        ServiceBuilder::new()
            .layer(Extension(services))
            .layer(axum::middleware::from_fn(middleware::session_middleware)),
    );

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(scoped)
}
