use std::sync::Arc;

use axum::{Json, extract::State, response::IntoResponse};
use serde_json::json;

use crate::auth::RequireIdentity;
use crate::server::AppState;
use crate::server::dto::{DemoAccountRequest, MeResponse};
use crate::server::response::{ApiError, ApiJson, StoreOptionExt, StoreResultExt};
use crate::server::validation::require_field;
use crate::workflow::demo;

pub async fn create_demo_account(
    auth: RequireIdentity,
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<DemoAccountRequest>,
) -> impl IntoResponse {
    let user_id = require_field(req.user_id.as_deref(), "userId")?;
    let email = require_field(req.email.as_deref(), "email")?;

    let has_full_access = demo::create_demo_account(
        state.store.as_ref(),
        &auth.identity,
        auth.user.as_ref(),
        user_id,
        email,
    )
    .api_err("Failed to create demo account")?;

    Ok::<_, ApiError>(Json(json!({
        "success": true,
        "hasFullAccess": has_full_access,
    })))
}

/// Caller context: identity, user record and the tenant it works in.
pub async fn me(auth: RequireIdentity, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let store = state.store.as_ref();

    let tenant = match &auth.user {
        Some(user) => store
            .get_tenant(&user.tenant_id)
            .api_err("Failed to load tenant")?
            .or_not_found("Tenant not found")?,
        None => store
            .get_demo_tenant()
            .api_err("Failed to load tenant")?
            .or_not_found("Demo tenant not found")?,
    };

    let warehouses = store
        .list_warehouses(&tenant.id)
        .api_err("Failed to list warehouses")?;

    let is_demo = auth.user.as_ref().is_none_or(|user| user.is_demo);

    Ok::<_, ApiError>(Json(MeResponse {
        success: true,
        identity: auth.identity,
        user: auth.user,
        is_demo,
        tenant,
        warehouses,
    }))
}
