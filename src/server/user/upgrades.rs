use std::sync::Arc;

use axum::{Json, extract::State, response::IntoResponse};
use serde_json::json;

use crate::auth::OptionalCaller;
use crate::server::AppState;
use crate::server::dto::RequestUpgradeRequest;
use crate::server::response::{ApiError, ApiJson, StoreResultExt};
use crate::workflow::upgrades;

pub async fn request_upgrade(
    OptionalCaller(caller): OptionalCaller,
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<RequestUpgradeRequest>,
) -> impl IntoResponse {
    let request = upgrades::create(state.store.as_ref(), &caller, req.company_name.as_deref())
        .api_err("Failed to record upgrade request")?;

    Ok::<_, ApiError>(Json(json!({ "success": true, "requestId": request.id })))
}
