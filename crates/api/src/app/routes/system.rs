use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};
use serde_json::json;

use crate::context::PrincipalContext;

pub async fn root() -> impl IntoResponse {
    Json(json!({ "msg": "depot API running" }))
}

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(Extension(principal): Extension<PrincipalContext>) -> impl IntoResponse {
    Json(json!({
        "user_id": principal.user_id(),
        "name": principal.name(),
        "email": principal.email(),
        "role": principal.role().as_str(),
        "permissions": principal.permissions().iter().map(|p| p.as_str()).collect::<Vec<_>>(),
    }))
}
