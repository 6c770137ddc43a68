//! User administration (`users.manage`).

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post},
};
use serde_json::json;

use depot_auth::Permission;
use depot_core::UserId;
use depot_infra::services::NewAccount;

use crate::app::dto::{AppJson, AppPath, UpdateRoleRequest};
use crate::app::errors::ApiResult;
use crate::app::services::AppServices;
use crate::authz::require;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/admin/users", get(list_users))
        .route("/admin/users/", get(list_users))
        .route("/admin/users/create", post(create_user))
        .route("/admin/users/update-role/:id", patch(update_role))
}

pub async fn create_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    AppJson(body): AppJson<NewAccount>,
) -> ApiResult<impl IntoResponse> {
    require(&principal, &Permission::USERS_MANAGE)?;
    let user = services.accounts.create_user(body).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "msg": "user created", "user_id": user.id, "user": user })),
    ))
}

pub async fn update_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    AppPath(id): AppPath<UserId>,
    AppJson(body): AppJson<UpdateRoleRequest>,
) -> ApiResult<impl IntoResponse> {
    require(&principal, &Permission::USERS_MANAGE)?;
    let user = services.accounts.update_role(id, &body.role).await?;
    Ok(Json(json!({ "msg": "role updated", "user": user })))
}

pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult<impl IntoResponse> {
    require(&principal, &Permission::USERS_MANAGE)?;
    Ok(Json(services.accounts.list_users().await?))
}
