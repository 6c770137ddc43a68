use std::sync::Arc;

use axum::{
    Json, Router,
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde_json::json;

use depot_auth::Permission;
use depot_infra::services::ManualAdjustment;

use crate::app::dto::AppJson;
use crate::app::errors::ApiResult;
use crate::app::services::AppServices;
use crate::authz::require;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/adjustments", get(list_adjustments).post(create_adjustment))
        .route("/adjustments/", get(list_adjustments).post(create_adjustment))
}

pub async fn list_adjustments(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult<impl IntoResponse> {
    require(&principal, &Permission::STOCK_ADJUST)?;
    Ok(Json(services.reporting.list_adjustments().await?))
}

/// Delta-based adjustment (`ADD`/`REMOVE` a quantity).
pub async fn create_adjustment(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    AppJson(body): AppJson<ManualAdjustment>,
) -> ApiResult<impl IntoResponse> {
    require(&principal, &Permission::STOCK_ADJUST)?;
    let entry = services
        .recorder
        .record_manual_adjustment(principal.user_id(), body)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "id": entry.id, "reference": entry.reference })),
    ))
}
