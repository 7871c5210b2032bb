mod handlers;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use crate::server::AppState;

pub fn login_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/otp", post(handlers::start_otp))
        .route("/api/auth/setup", post(handlers::setup))
        .route("/api/auth/logout", post(handlers::logout))
        .route("/auth/callback", get(handlers::callback))
}
