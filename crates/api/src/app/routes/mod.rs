use axum::{Router, routing::get};

pub mod adjustments;
pub mod admin;
pub mod auth;
pub mod dashboard;
pub mod documents;
pub mod ledger;
pub mod locations;
pub mod operations;
pub mod products;
pub mod system;
pub mod warehouses;

/// Router for all authenticated endpoints.
///
/// Collection paths are registered with and without the trailing slash.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .merge(admin::router())
        .merge(products::router())
        .merge(warehouses::router())
        .merge(locations::router())
        .merge(operations::router())
        .merge(documents::router())
        .merge(adjustments::router())
        .merge(ledger::router())
        .merge(dashboard::router())
}
