use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    http::{HeaderMap, header::SET_COOKIE},
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use serde_json::json;

use crate::auth::{
    RequireIdentity, clear_session_cookie, exchange_code, extract_session_token, issue_session,
    resolve_session, session_cookie, start_login,
};
use crate::server::AppState;
use crate::server::dto::{CallbackParams, OtpRequest};
use crate::server::response::{ApiError, ApiJson, StoreResultExt};
use crate::server::validation::{require_field, safe_next_path};
use crate::workflow::{SetupOutcome, normalize_email, setup_new_user};

/// Why the auth callback sent the browser back to the login page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackFailure {
    MissingCode,
    ExchangeFailed,
    MissingUser,
    SetupFailed,
    Unexpected,
}

impl CallbackFailure {
    pub const fn as_str(self) -> &'static str {
        match self {
            CallbackFailure::MissingCode => "missing_code",
            CallbackFailure::ExchangeFailed => "exchange_failed",
            CallbackFailure::MissingUser => "missing_user",
            CallbackFailure::SetupFailed => "setup_failed",
            CallbackFailure::Unexpected => "unexpected",
        }
    }

    fn redirect(self) -> Redirect {
        Redirect::to(&format!("/login?error={}", self.as_str()))
    }
}

/// Issues a one-time login code. Delivery is external; the link is logged.
pub async fn start_otp(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiJson(req): ApiJson<OtpRequest>,
) -> impl IntoResponse {
    let email = require_field(req.email.as_deref(), "Email")?;
    let email = normalize_email(email).api_err("Invalid email address")?;

    let (identity, code) = start_login(state.store.as_ref(), &email, state.config.auth_code_ttl())
        .api_err("Failed to start login")?;

    tracing::info!(
        "Login link for {} ({}): {}/auth/callback?code={}",
        email,
        identity.id,
        state.origin(&headers),
        code
    );

    Ok::<_, ApiError>(Json(json!({ "success": true })))
}

/// Exchanges a one-time code for a session, then runs first-login provisioning.
pub async fn callback(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CallbackParams>,
) -> Response {
    let Some(code) = params.code.as_deref().filter(|c| !c.is_empty()) else {
        return CallbackFailure::MissingCode.redirect().into_response();
    };

    let store = state.store.as_ref();
    let config = &state.config;

    let identity_id = match exchange_code(store, code) {
        Ok(Some(identity_id)) => identity_id,
        Ok(None) => return CallbackFailure::ExchangeFailed.redirect().into_response(),
        Err(e) => {
            tracing::error!("Failed to exchange auth code: {}", e);
            return CallbackFailure::Unexpected.redirect().into_response();
        }
    };

    let identity = match store.get_identity(&identity_id) {
        Ok(Some(identity)) => identity,
        Ok(None) => return CallbackFailure::MissingUser.redirect().into_response(),
        Err(e) => {
            tracing::error!("Failed to load identity {}: {}", identity_id, e);
            return CallbackFailure::Unexpected.redirect().into_response();
        }
    };

    let ttl = config.session_ttl();
    let token = match issue_session(store, &identity.id, ttl) {
        Ok((token, _session)) => token,
        Err(e) => {
            tracing::error!("Failed to issue session for {}: {}", identity.id, e);
            return CallbackFailure::Unexpected.redirect().into_response();
        }
    };

    let cookie = session_cookie(
        &config.session_cookie_name(),
        &token,
        ttl,
        config.secure_cookies(),
    );

    // The session stands even when provisioning fails.
    let destination = match setup_new_user(store, &identity) {
        Ok(outcome) => {
            if let SetupOutcome::Created { tenant, .. } = &outcome {
                tracing::info!("First login for {} created tenant {}", identity.email, tenant.id);
            }
            Redirect::to(safe_next_path(params.next.as_deref()))
        }
        Err(e) => {
            tracing::error!("Tenant setup failed for {}: {}", identity.id, e);
            CallbackFailure::SetupFailed.redirect()
        }
    };

    (AppendHeaders([(SET_COOKIE, cookie)]), destination).into_response()
}

pub async fn setup(auth: RequireIdentity, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    if auth.user.is_some() {
        return Ok::<_, ApiError>(Json(SetupOutcome::AlreadyExists.to_json()));
    }

    let outcome = setup_new_user(state.store.as_ref(), &auth.identity)
        .api_err("Failed to set up account")?;

    Ok::<_, ApiError>(Json(outcome.to_json()))
}

pub async fn logout(State(state): State<Arc<AppState>>, headers: HeaderMap) -> impl IntoResponse {
    if let Some(token) = extract_session_token(&headers) {
        let resolved = resolve_session(state.store.as_ref(), &token).api_err("Failed to log out")?;
        if let Some(resolved) = resolved {
            state
                .store
                .delete_session(&resolved.session.id)
                .api_err("Failed to log out")?;
        }
    }

    let cookie = clear_session_cookie(&state.config.session_cookie_name());

    Ok::<_, ApiError>((
        AppendHeaders([(SET_COOKIE, cookie)]),
        Json(json!({ "success": true })),
    ))
}
