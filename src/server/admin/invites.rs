use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    http::HeaderMap,
    response::IntoResponse,
};
use serde_json::json;

use crate::auth::RequireAdmin;
use crate::server::AppState;
use crate::server::dto::{InviteLinkResponse, InviteListParams, InviteResponse, RequestIdBody};
use crate::server::response::{ApiError, ApiJson, StoreResultExt};
use crate::server::validation::require_field;
use crate::workflow::invites;

pub async fn list_invites(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Query(params): Query<InviteListParams>,
) -> impl IntoResponse {
    let pending = invites::list_pending(state.store.as_ref(), params.kind.as_deref())
        .api_err("Failed to list invites")?;

    let invites: Vec<InviteResponse> = pending.into_iter().map(InviteResponse::from).collect();

    Ok::<_, ApiError>(Json(json!({ "success": true, "invites": invites })))
}

pub async fn reject_invite(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<RequestIdBody>,
) -> impl IntoResponse {
    let request_id = require_field(req.request_id.as_deref(), "requestId")?;

    invites::reject(state.store.as_ref(), request_id, &admin)
        .api_err_or_not_found("Invite not found", "Failed to reject invite")?;

    Ok::<_, ApiError>(Json(json!({
        "success": true,
        "message": "Invite request rejected",
    })))
}

pub async fn approve_access(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiJson(req): ApiJson<RequestIdBody>,
) -> impl IntoResponse {
    let request_id = require_field(req.request_id.as_deref(), "requestId")?;
    let origin = state.origin(&headers);

    let created = invites::approve_access_request(
        state.store.as_ref(),
        &state.config,
        request_id,
        &admin,
        &origin,
    )
    .api_err_or_not_found("Access request not found", "Failed to approve access request")?;

    tracing::info!("Invite link for {}: {}", created.invite.email, created.magic_link);

    Ok::<_, ApiError>(Json(json!({
        "success": true,
        "invite": InviteLinkResponse::from(created),
    })))
}
