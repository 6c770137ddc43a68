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
use depot_core::WarehouseId;
use depot_inventory::NewWarehouse;

use crate::app::dto::{AppJson, AppPath};
use crate::app::errors::ApiResult;
use crate::app::services::AppServices;
use crate::authz::require;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/warehouses", get(list_warehouses).post(create_warehouse))
        .route("/warehouses/", get(list_warehouses).post(create_warehouse))
        .route(
            "/warehouses/:id",
            get(get_warehouse).put(rename_warehouse).delete(delete_warehouse),
        )
}

pub async fn list_warehouses(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult<impl IntoResponse> {
    require(&principal, &Permission::CATALOG_READ)?;
    Ok(Json(services.catalog.list_warehouses().await?))
}

pub async fn create_warehouse(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    AppJson(body): AppJson<NewWarehouse>,
) -> ApiResult<impl IntoResponse> {
    require(&principal, &Permission::CATALOG_WRITE)?;
    let warehouse = services.catalog.create_warehouse(body).await?;
    Ok((StatusCode::CREATED, Json(warehouse)))
}

pub async fn get_warehouse(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    AppPath(id): AppPath<WarehouseId>,
) -> ApiResult<impl IntoResponse> {
    require(&principal, &Permission::CATALOG_READ)?;
    Ok(Json(services.catalog.get_warehouse(id).await?))
}

pub async fn rename_warehouse(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    AppPath(id): AppPath<WarehouseId>,
    AppJson(body): AppJson<NewWarehouse>,
) -> ApiResult<impl IntoResponse> {
    require(&principal, &Permission::CATALOG_WRITE)?;
    Ok(Json(services.catalog.rename_warehouse(id, body).await?))
}

pub async fn delete_warehouse(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    AppPath(id): AppPath<WarehouseId>,
) -> ApiResult<impl IntoResponse> {
    require(&principal, &Permission::CATALOG_WRITE)?;
    services.catalog.delete_warehouse(id).await?;
    Ok(Json(json!({ "msg": "deleted" })))
}
