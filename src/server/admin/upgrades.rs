use std::sync::Arc;

use axum::{Json, extract::State, response::IntoResponse};
use serde_json::json;

use crate::auth::RequireSuperAdmin;
use crate::server::AppState;
use crate::server::dto::{RejectUpgradeRequest, RequestIdBody, UpgradeRequestResponse};
use crate::server::response::{ApiError, ApiJson, StoreResultExt};
use crate::server::validation::require_field;
use crate::workflow::upgrades;

pub async fn list_upgrade_requests(
    _admin: RequireSuperAdmin,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let requests: Vec<UpgradeRequestResponse> = upgrades::list_pending(state.store.as_ref())
        .api_err("Failed to list upgrade requests")?
        .into_iter()
        .map(UpgradeRequestResponse::from)
        .collect();

    Ok::<_, ApiError>(Json(json!({ "success": true, "requests": requests })))
}

pub async fn reject_upgrade(
    RequireSuperAdmin(admin): RequireSuperAdmin,
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<RejectUpgradeRequest>,
) -> impl IntoResponse {
    let request_id = require_field(req.request_id.as_deref(), "requestId")?;

    upgrades::reject(
        state.store.as_ref(),
        request_id,
        req.reason.as_deref(),
        &admin,
    )
    .api_err_or_not_found(
        "Upgrade request not found",
        "Failed to reject upgrade request",
    )?;

    Ok::<_, ApiError>(Json(json!({
        "success": true,
        "message": "Upgrade request rejected",
    })))
}

pub async fn approve_upgrade(
    RequireSuperAdmin(admin): RequireSuperAdmin,
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<RequestIdBody>,
) -> impl IntoResponse {
    let request_id = require_field(req.request_id.as_deref(), "requestId")?;

    let approved = upgrades::approve(state.store.as_ref(), request_id, &admin)
        .api_err_or_not_found(
            "Upgrade request not found",
            "Failed to approve upgrade request",
        )?;

    Ok::<_, ApiError>(Json(json!({
        "success": true,
        "message": "Upgrade request approved",
        "tenantId": approved.tenant_id,
    })))
}
