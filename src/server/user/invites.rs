use std::sync::Arc;

use axum::{Json, extract::State, http::HeaderMap, response::IntoResponse};
use serde_json::json;

use crate::auth::RequireAdmin;
use crate::server::AppState;
use crate::server::dto::{
    CreateInviteRequest, InviteLinkResponse, InviteResponse, RequestAccessRequest,
    ValidateInviteRequest,
};
use crate::server::response::{ApiError, ApiJson, StoreResultExt};
use crate::server::validation::require_field;
use crate::workflow::{Validation, invites};

pub async fn create_invite(
    RequireAdmin(inviter): RequireAdmin,
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiJson(req): ApiJson<CreateInviteRequest>,
) -> impl IntoResponse {
    let email = require_field(req.email.as_deref(), "Email")?;
    let origin = state.origin(&headers);

    let created = invites::create(state.store.as_ref(), &state.config, email, &inviter, &origin)
        .api_err("Failed to create invite")?;

    tracing::info!("Invite link for {}: {}", created.invite.email, created.magic_link);

    Ok::<_, ApiError>(Json(json!({
        "success": true,
        "invite": InviteLinkResponse::from(created),
    })))
}

/// Always 200: an invalid code is a normal answer, not a failed call.
pub async fn validate_invite(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<ValidateInviteRequest>,
) -> impl IntoResponse {
    let code = req.code.as_deref().unwrap_or_default();
    let email = req.email.as_deref().unwrap_or_default();

    match invites::validate(state.store.as_ref(), code, email) {
        Validation::Valid(invite) => Json(json!({
            "valid": true,
            "invite": InviteResponse::from(invite),
        })),
        Validation::Invalid(reason) => Json(json!({ "valid": false, "error": reason })),
    }
}

pub async fn request_access(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<RequestAccessRequest>,
) -> impl IntoResponse {
    let email = require_field(req.email.as_deref(), "Email")?;

    let request = invites::request_access(state.store.as_ref(), email, req.company_name.as_deref())
        .api_err("Failed to record access request")?;

    Ok::<_, ApiError>(Json(json!({ "success": true, "requestId": request.id })))
}
