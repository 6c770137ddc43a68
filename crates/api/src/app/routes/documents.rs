//! Document listings: live receipts/deliveries grouped by reference.

use std::sync::Arc;

use axum::{Json, Router, extract::Extension, response::IntoResponse, routing::get};

use depot_auth::Permission;
use depot_inventory::MoveType;

use crate::app::errors::ApiResult;
use crate::app::services::AppServices;
use crate::authz::require;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/receipts", get(list_receipts))
        .route("/receipts/", get(list_receipts))
        .route("/deliveries", get(list_deliveries))
        .route("/deliveries/", get(list_deliveries))
}

pub async fn list_receipts(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult<impl IntoResponse> {
    require(&principal, &Permission::OPERATIONS_READ)?;
    Ok(Json(services.reporting.list_documents(MoveType::Receipt).await?))
}

pub async fn list_deliveries(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult<impl IntoResponse> {
    require(&principal, &Permission::OPERATIONS_READ)?;
    Ok(Json(services.reporting.list_documents(MoveType::Delivery).await?))
}
