use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::error;

use depot_infra::StoreError;
use depot_infra::services::ServiceError;

/// Handler error: already rendered as the JSON error body.
pub struct ApiError(Response);

pub type ApiResult<T> = Result<T, ApiError>;

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.0
    }
}

impl From<Response> for ApiError {
    fn from(resp: Response) -> Self {
        Self(resp)
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        Self(service_error_to_response(err))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(json_error(StatusCode::BAD_REQUEST, "validation_error", rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self(json_error(StatusCode::BAD_REQUEST, "validation_error", rejection.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self(json_error(StatusCode::BAD_REQUEST, "validation_error", rejection.body_text()))
    }
}

pub fn service_error_to_response(err: ServiceError) -> Response {
    match err {
        ServiceError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        ServiceError::NotFound(msg) => json_error(StatusCode::NOT_FOUND, "not_found", msg),
        ServiceError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        ServiceError::Unauthorized(msg) => json_error(StatusCode::UNAUTHORIZED, "unauthorized", msg),
        ServiceError::TooManyRequests { wait_seconds } => (
            StatusCode::TOO_MANY_REQUESTS,
            axum::Json(json!({
                "error": "too_many_requests",
                "message": format!("Wait {wait_seconds} seconds before resend"),
                "wait_seconds": wait_seconds,
            })),
        )
            .into_response(),
        ServiceError::Store(e) => {
            let status = match e {
                StoreError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            json_error(status, "store_error", e.to_string())
        }
        ServiceError::Internal(msg) => {
            error!(error = %msg, "internal error");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "internal error")
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_errors_map_to_status_codes() {
        let cases = [
            (ServiceError::validation("bad"), StatusCode::BAD_REQUEST),
            (ServiceError::not_found("product 1"), StatusCode::NOT_FOUND),
            (ServiceError::conflict("dup"), StatusCode::CONFLICT),
            (ServiceError::Unauthorized("no".to_string()), StatusCode::UNAUTHORIZED),
            (ServiceError::TooManyRequests { wait_seconds: 12 }, StatusCode::TOO_MANY_REQUESTS),
            (
                ServiceError::Store(StoreError::Unavailable("pool".to_string())),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                ServiceError::Store(StoreError::Storage("boom".to_string())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(service_error_to_response(err).status(), status);
        }
    }
}
