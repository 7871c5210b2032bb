use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::header::SET_COOKIE,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;

use super::AppState;
use super::validation::DEFAULT_NEXT_PATH;
use crate::auth::{
    Caller, caller_for_identity, extract_session_token, has_session_credentials, needs_refresh,
    resolve_session, session_cookie,
};

/// Edge gate run on every request.
///
/// Identity resolution only happens when the request carries something that
/// looks like a session; anonymous traffic never touches the store. The
/// resolved caller is stored in request extensions for the extractors.
pub async fn session_gate(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let config = &state.config;
    let path = request.uri().path().to_string();

    let mut refreshed_cookie = None;
    let mut caller = Caller::Anonymous;

    if has_session_credentials(request.headers()) {
        if let Some(token) = extract_session_token(request.headers()) {
            match resolve_session(state.store.as_ref(), &token) {
                Ok(Some(resolved)) => {
                    let ttl = config.session_ttl();
                    if needs_refresh(&resolved.session, ttl) {
                        match state
                            .store
                            .extend_session(&resolved.session.id, Utc::now() + ttl)
                        {
                            Ok(()) => {
                                refreshed_cookie = Some(session_cookie(
                                    &config.session_cookie_name(),
                                    &token,
                                    ttl,
                                    config.secure_cookies(),
                                ));
                            }
                            Err(e) => tracing::warn!("Failed to extend session: {}", e),
                        }
                    }

                    match caller_for_identity(state.store.as_ref(), resolved.identity) {
                        Ok(resolved_caller) => caller = resolved_caller,
                        Err(e) => tracing::error!("Failed to load caller: {}", e),
                    }
                }
                Ok(None) => {}
                Err(e) => tracing::error!("Failed to resolve session: {}", e),
            }
        }
        request.extensions_mut().insert(caller.clone());
    }

    if config.is_protected_path(&path) && !caller.is_authenticated() {
        let target = request
            .uri()
            .path_and_query()
            .map_or(path.as_str(), |pq| pq.as_str());
        let location = format!("/login?next={}", urlencoding::encode(target));
        return Redirect::to(&location).into_response();
    }

    // A login error must stay visible even to a caller who holds a session.
    let shows_error = request
        .uri()
        .query()
        .is_some_and(|q| q.split('&').any(|pair| pair.starts_with("error=")));

    if config.is_auth_only_path(&path) && caller.is_authenticated() && !shows_error {
        return Redirect::to(DEFAULT_NEXT_PATH).into_response();
    }

    let mut response = next.run(request).await;

    if let Some(cookie) = refreshed_cookie {
        response.headers_mut().append(SET_COOKIE, cookie);
    }

    response
}
