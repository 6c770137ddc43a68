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
use depot_core::LocationId;
use depot_inventory::{LocationPatch, NewLocation};

use crate::app::dto::{AppJson, AppPath};
use crate::app::errors::ApiResult;
use crate::app::services::AppServices;
use crate::authz::require;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/locations", get(list_locations).post(create_location))
        .route("/locations/", get(list_locations).post(create_location))
        .route(
            "/locations/:id",
            get(get_location)
                .put(update_location)
                .patch(update_location)
                .delete(delete_location),
        )
}

pub async fn list_locations(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult<impl IntoResponse> {
    require(&principal, &Permission::CATALOG_READ)?;
    Ok(Json(services.catalog.list_locations().await?))
}

pub async fn create_location(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    AppJson(body): AppJson<NewLocation>,
) -> ApiResult<impl IntoResponse> {
    require(&principal, &Permission::CATALOG_WRITE)?;
    let location = services.catalog.create_location(body).await?;
    Ok((StatusCode::CREATED, Json(location)))
}

pub async fn get_location(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    AppPath(id): AppPath<LocationId>,
) -> ApiResult<impl IntoResponse> {
    require(&principal, &Permission::CATALOG_READ)?;
    Ok(Json(services.catalog.get_location(id).await?))
}

pub async fn update_location(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    AppPath(id): AppPath<LocationId>,
    AppJson(patch): AppJson<LocationPatch>,
) -> ApiResult<impl IntoResponse> {
    require(&principal, &Permission::CATALOG_WRITE)?;
    Ok(Json(services.catalog.update_location(id, patch).await?))
}

pub async fn delete_location(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    AppPath(id): AppPath<LocationId>,
) -> ApiResult<impl IntoResponse> {
    require(&principal, &Permission::CATALOG_WRITE)?;
    services.catalog.delete_location(id).await?;
    Ok(Json(json!({ "msg": "deleted" })))
}
