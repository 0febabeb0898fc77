use axum::Router;

pub mod bills;
pub mod cashbook;
pub mod challans;
pub mod customers;
pub mod invoices;
pub mod items;
pub mod reports;
pub mod system;

/// Router for every tenant-scoped endpoint.
pub fn router() -> Router {
    Router::new()
        .nest("/customers", customers::router())
        .nest("/items", items::router())
        .nest("/challans", challans::router())
        .nest("/bills", bills::router())
        .nest("/invoices", invoices::router())
        .nest("/cashbook", cashbook::router())
        .merge(reports::router())
}
