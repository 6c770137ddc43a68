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
use depot_core::ProductId;
use depot_inventory::{NewProduct, ProductPatch};

use crate::app::dto::{AppJson, AppPath, AppQuery, StockQuery};
use crate::app::errors::ApiResult;
use crate::app::services::AppServices;
use crate::authz::require;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/products", get(list_products).post(create_product))
        .route("/products/", get(list_products).post(create_product))
        .route(
            "/products/:id",
            get(get_product)
                .put(update_product)
                .patch(update_product)
                .delete(delete_product),
        )
        .route("/products/:id/stock", get(product_stock))
}

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    AppJson(body): AppJson<NewProduct>,
) -> ApiResult<impl IntoResponse> {
    require(&principal, &Permission::CATALOG_WRITE)?;
    let product = services.catalog.create_product(body).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "msg": "product_created", "product": product })),
    ))
}

pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult<impl IntoResponse> {
    require(&principal, &Permission::CATALOG_READ)?;
    Ok(Json(services.catalog.list_products().await?))
}

pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    AppPath(id): AppPath<ProductId>,
) -> ApiResult<impl IntoResponse> {
    require(&principal, &Permission::CATALOG_READ)?;
    Ok(Json(services.catalog.get_product(id).await?))
}

pub async fn update_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    AppPath(id): AppPath<ProductId>,
    AppJson(patch): AppJson<ProductPatch>,
) -> ApiResult<impl IntoResponse> {
    require(&principal, &Permission::CATALOG_WRITE)?;
    let product = services.catalog.update_product(id, patch).await?;
    Ok(Json(json!({ "msg": "product_updated", "product": product })))
}

pub async fn delete_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    AppPath(id): AppPath<ProductId>,
) -> ApiResult<impl IntoResponse> {
    require(&principal, &Permission::CATALOG_WRITE)?;
    services.catalog.delete_product(id).await?;
    Ok(Json(json!({ "msg": "product_deleted" })))
}

pub async fn product_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    AppPath(id): AppPath<ProductId>,
    AppQuery(query): AppQuery<StockQuery>,
) -> ApiResult<impl IntoResponse> {
    require(&principal, &Permission::CATALOG_READ)?;
    Ok(Json(services.reporting.product_stock(id, query.location_id).await?))
}
