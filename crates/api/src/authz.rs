//! API-side authorization guard.
//!
//! Every protected handler calls [`require`] before touching a service, so
//! the services below only ever see an already-authorized `UserId`.

use axum::http::StatusCode;
use axum::response::Response;
use tracing::warn;

use depot_auth::{AuthzError, Permission, authorize};

use crate::app::errors;
use crate::context::PrincipalContext;

/// Check a single permission for the current principal.
pub fn authorize_request(principal: &PrincipalContext, required: &Permission) -> Result<(), AuthzError> {
    authorize(principal.principal(), required)
}

/// Same check, already mapped to a `403` response.
pub fn require(principal: &PrincipalContext, required: &Permission) -> Result<(), Response> {
    authorize_request(principal, required).map_err(|e| {
        warn!(user_id = %principal.user_id(), role = %principal.role(), permission = %required, "forbidden");
        errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string())
    })
}
