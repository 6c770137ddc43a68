//! Stock movements: receipts, deliveries, transfers and count adjustments.
//!
//! Receipts and deliveries are never edited in place: `PUT` appends a
//! reversal plus a replacement, `DELETE` appends a reversal only.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;

use depot_auth::Permission;
use depot_core::EntryId;
use depot_infra::services::ServiceError;
use depot_inventory::{Correction, MoveType, MovementRequest};

use crate::app::dto::{AppJson, AppPath};
use crate::app::errors::ApiResult;
use crate::app::services::AppServices;
use crate::authz::require;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/operations/receipts", get(list_receipts).post(create_receipt))
        .route("/operations/receipts/", get(list_receipts).post(create_receipt))
        .route("/operations/receipt", post(create_receipt))
        .route(
            "/operations/receipts/:id",
            get(get_receipt).put(update_receipt).delete(delete_receipt),
        )
        .route("/operations/deliveries", get(list_deliveries).post(create_delivery))
        .route("/operations/deliveries/", get(list_deliveries).post(create_delivery))
        .route("/operations/delivery", post(create_delivery))
        .route(
            "/operations/deliveries/:id",
            get(get_delivery).put(update_delivery).delete(delete_delivery),
        )
        .route("/operations/transfer", post(transfer))
        .route("/operations/adjust", post(adjust))
}

fn label(kind: MoveType) -> &'static str {
    match kind {
        MoveType::Receipt => "Receipt",
        MoveType::Delivery => "Delivery",
        MoveType::Transfer => "Transfer",
        MoveType::Adjust => "Adjustment",
    }
}

async fn create(
    services: &AppServices,
    principal: &PrincipalContext,
    kind: MoveType,
    req: MovementRequest,
) -> ApiResult<Response> {
    require(principal, &Permission::OPERATIONS_WRITE)?;
    let user = principal.user_id();
    let entry = match kind {
        MoveType::Delivery => services.recorder.record_delivery(user, req).await?,
        _ => services.recorder.record_receipt(user, req).await?,
    };
    let view = services.reporting.get_operation(kind, entry.id).await?;
    Ok((StatusCode::CREATED, Json(view)).into_response())
}

async fn list(
    services: &AppServices,
    principal: &PrincipalContext,
    kind: MoveType,
) -> ApiResult<Response> {
    require(principal, &Permission::OPERATIONS_READ)?;
    Ok(Json(services.reporting.list_operations(kind).await?).into_response())
}

async fn fetch(
    services: &AppServices,
    principal: &PrincipalContext,
    kind: MoveType,
    id: EntryId,
) -> ApiResult<Response> {
    require(principal, &Permission::OPERATIONS_READ)?;
    Ok(Json(services.reporting.get_operation(kind, id).await?).into_response())
}

async fn correct(
    services: &AppServices,
    principal: &PrincipalContext,
    kind: MoveType,
    id: EntryId,
    patch: Correction,
) -> ApiResult<Response> {
    require(principal, &Permission::OPERATIONS_WRITE)?;
    let entries = services
        .recorder
        .correct(kind, principal.user_id(), id, patch)
        .await?;
    let replacement = entries
        .last()
        .map(|e| e.id)
        .ok_or_else(|| ServiceError::Internal("correction appended no entry".to_string()))?;
    let view = services.reporting.get_operation(kind, replacement).await?;
    Ok(Json(json!({
        "msg": format!("{} corrected", label(kind)),
        "reversed_id": id,
        "operation": view,
    }))
    .into_response())
}

async fn void(
    services: &AppServices,
    principal: &PrincipalContext,
    kind: MoveType,
    id: EntryId,
) -> ApiResult<Response> {
    require(principal, &Permission::OPERATIONS_WRITE)?;
    let reversal = services.recorder.void(kind, principal.user_id(), id).await?;
    Ok(Json(json!({
        "msg": format!("{} voided", label(kind)),
        "reversal": reversal,
    }))
    .into_response())
}

// -------------------------
// Receipts
// -------------------------

pub async fn create_receipt(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    AppJson(body): AppJson<MovementRequest>,
) -> ApiResult<Response> {
    create(&services, &principal, MoveType::Receipt, body).await
}

pub async fn list_receipts(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult<Response> {
    list(&services, &principal, MoveType::Receipt).await
}

pub async fn get_receipt(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    AppPath(id): AppPath<EntryId>,
) -> ApiResult<Response> {
    fetch(&services, &principal, MoveType::Receipt, id).await
}

pub async fn update_receipt(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    AppPath(id): AppPath<EntryId>,
    AppJson(body): AppJson<Correction>,
) -> ApiResult<Response> {
    correct(&services, &principal, MoveType::Receipt, id, body).await
}

pub async fn delete_receipt(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    AppPath(id): AppPath<EntryId>,
) -> ApiResult<Response> {
    void(&services, &principal, MoveType::Receipt, id).await
}

// -------------------------
// Deliveries
// -------------------------

pub async fn create_delivery(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    AppJson(body): AppJson<MovementRequest>,
) -> ApiResult<Response> {
    create(&services, &principal, MoveType::Delivery, body).await
}

pub async fn list_deliveries(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult<Response> {
    list(&services, &principal, MoveType::Delivery).await
}

pub async fn get_delivery(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    AppPath(id): AppPath<EntryId>,
) -> ApiResult<Response> {
    fetch(&services, &principal, MoveType::Delivery, id).await
}

pub async fn update_delivery(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    AppPath(id): AppPath<EntryId>,
    AppJson(body): AppJson<Correction>,
) -> ApiResult<Response> {
    correct(&services, &principal, MoveType::Delivery, id, body).await
}

pub async fn delete_delivery(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    AppPath(id): AppPath<EntryId>,
) -> ApiResult<Response> {
    void(&services, &principal, MoveType::Delivery, id).await
}

// -------------------------
// Transfer / adjust
// -------------------------

pub async fn transfer(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    AppJson(body): AppJson<MovementRequest>,
) -> ApiResult<Response> {
    require(&principal, &Permission::OPERATIONS_WRITE)?;
    let legs = services
        .recorder
        .record_transfer(principal.user_id(), body)
        .await?;
    let movement_id = legs.first().map(|e| e.movement_id);
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "msg": "transfer recorded",
            "movement_id": movement_id,
            "entries": legs,
        })),
    )
        .into_response())
}

/// `qty` is the counted quantity at the location, not a delta.
pub async fn adjust(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    AppJson(body): AppJson<MovementRequest>,
) -> ApiResult<Response> {
    require(&principal, &Permission::STOCK_ADJUST)?;
    let reconciliation = services
        .recorder
        .record_adjustment(principal.user_id(), body)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "msg": "adjustment recorded",
            "difference": reconciliation.difference,
            "previous_balance": reconciliation.previous_balance,
            "entry": reconciliation.entry,
        })),
    )
        .into_response())
}
