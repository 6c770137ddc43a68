use std::sync::Arc;

use axum::{Json, Router, extract::Extension, response::IntoResponse, routing::get};

use depot_auth::Permission;

use crate::app::dto::{AppQuery, LedgerQuery};
use crate::app::errors::ApiResult;
use crate::app::services::AppServices;
use crate::authz::require;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/ledger", get(query_ledger))
        .route("/ledger/", get(query_ledger))
}

/// Filtered ledger read, newest first.
pub async fn query_ledger(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    AppQuery(query): AppQuery<LedgerQuery>,
) -> ApiResult<impl IntoResponse> {
    require(&principal, &Permission::LEDGER_READ)?;
    let (filter, pagination) = query.into_parts()?;
    Ok(Json(services.reporting.ledger(filter, pagination).await?))
}
