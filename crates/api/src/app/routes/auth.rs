//! Public authentication routes: login and OTP password reset.

use std::sync::Arc;

use axum::{Json, Router, extract::Extension, response::IntoResponse, routing::post};
use serde_json::json;

use crate::app::dto::{AppJson, EmailRequest, LoginRequest, VerifyOtpRequest};
use crate::app::errors::ApiResult;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/request-otp", post(request_otp))
        .route("/auth/resend-otp", post(resend_otp))
        .route("/auth/verify-otp", post(verify_otp))
}

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    AppJson(body): AppJson<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let token = services.accounts.login(&body.email, &body.password).await?;
    Ok(Json(token))
}

pub async fn request_otp(
    Extension(services): Extension<Arc<AppServices>>,
    AppJson(body): AppJson<EmailRequest>,
) -> ApiResult<impl IntoResponse> {
    services.password_reset.request(&body.email).await?;
    Ok(Json(json!({ "message": "OTP sent to your email" })))
}

pub async fn resend_otp(
    Extension(services): Extension<Arc<AppServices>>,
    AppJson(body): AppJson<EmailRequest>,
) -> ApiResult<impl IntoResponse> {
    services.password_reset.resend(&body.email).await?;
    Ok(Json(json!({ "message": "OTP resent to your email" })))
}

pub async fn verify_otp(
    Extension(services): Extension<Arc<AppServices>>,
    AppJson(body): AppJson<VerifyOtpRequest>,
) -> ApiResult<impl IntoResponse> {
    services
        .password_reset
        .verify(&body.email, &body.otp, &body.new_password)
        .await?;
    Ok(Json(json!({ "msg": "password_reset" })))
}
