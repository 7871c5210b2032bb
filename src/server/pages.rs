//! Placeholder pages. Rendering lives in the frontend; these routes exist so
//! the session gate has real destinations.

use std::sync::Arc;

use axum::{
    Router,
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::get,
};

use crate::auth::OptionalCaller;
use crate::server::AppState;

pub fn pages_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/login", get(login))
        .route("/signup", get(signup))
        .route("/dashboard", get(dashboard))
}

async fn login() -> Html<&'static str> {
    Html("<!doctype html><title>Sign in</title><h1>Sign in</h1>")
}

async fn signup() -> Html<&'static str> {
    Html("<!doctype html><title>Sign up</title><h1>Create your account</h1>")
}

async fn dashboard(OptionalCaller(caller): OptionalCaller) -> Html<String> {
    let mode = if caller.user().is_some() {
        "workspace"
    } else {
        "demo workspace"
    };
    Html(format!(
        "<!doctype html><title>Dashboard</title><h1>Dashboard</h1><p>Signed in to your {mode}.</p>"
    ))
}

pub async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "Not Found")
}
