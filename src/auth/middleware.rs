use std::sync::Arc;

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;

use super::gate::{Caller, resolve_caller};
use super::session::extract_session_token;
use crate::error::Error;
use crate::server::AppState;
use crate::types::{Identity, User};

/// Extractor that never rejects an unauthenticated request.
pub struct OptionalCaller(pub Caller);

/// Extractor that requires an authenticated identity (demo or member).
pub struct RequireIdentity {
    pub identity: Identity,
    pub user: Option<User>,
}

/// Extractor that requires a non-demo admin.
pub struct RequireAdmin(pub User);

/// Extractor that requires a super-admin.
pub struct RequireSuperAdmin(pub User);

#[derive(Debug)]
pub enum AuthError {
    MissingAuth,
    Forbidden,
    InternalError,
}

impl From<Error> for AuthError {
    fn from(err: Error) -> Self {
        match err {
            Error::Unauthorized | Error::InvalidTokenFormat => {
                AuthError::MissingAuth
            }
            Error::Forbidden => AuthError::Forbidden,
            other => {
                tracing::error!("Failed to resolve caller: {}", other);
                AuthError::InternalError
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::MissingAuth => (StatusCode::UNAUTHORIZED, "Authentication required"),
            AuthError::Forbidden => (StatusCode::FORBIDDEN, "Forbidden"),
            AuthError::InternalError => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        let body = json!({ "success": false, "error": message });

        (status, Json(body)).into_response()
    }
}

impl FromRequestParts<Arc<AppState>> for OptionalCaller {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        Ok(OptionalCaller(caller_for(parts, state)?))
    }
}

impl FromRequestParts<Arc<AppState>> for RequireIdentity {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        match caller_for(parts, state)? {
            Caller::Anonymous => Err(AuthError::MissingAuth),
            Caller::Demo { identity } => Ok(RequireIdentity {
                identity,
                user: None,
            }),
            Caller::Member { identity, user } => Ok(RequireIdentity {
                identity,
                user: Some(user),
            }),
        }
    }
}

impl FromRequestParts<Arc<AppState>> for RequireAdmin {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let caller = caller_for(parts, state)?;
        let user = caller.require_admin()?;
        Ok(RequireAdmin(user.clone()))
    }
}

impl FromRequestParts<Arc<AppState>> for RequireSuperAdmin {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let caller = caller_for(parts, state)?;
        let user = caller.require_super_admin()?;
        Ok(RequireSuperAdmin(user.clone()))
    }
}

/// Reuses the caller the session middleware resolved for this request, if any.
fn caller_for(parts: &Parts, state: &Arc<AppState>) -> Result<Caller, AuthError> {
    if let Some(caller) = parts.extensions.get::<Caller>() {
        return Ok(caller.clone());
    }

    let raw_token = extract_session_token(&parts.headers);
    Ok(resolve_caller(state.store.as_ref(), raw_token.as_deref())?)
}
