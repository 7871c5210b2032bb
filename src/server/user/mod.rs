mod account;
mod invites;
mod upgrades;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use crate::server::AppState;

pub fn user_router() -> Router<Arc<AppState>> {
    Router::new()
        // Invites
        .route("/create-invite", post(invites::create_invite))
        .route("/validate-invite", post(invites::validate_invite))
        .route("/request-access", post(invites::request_access))
        // Upgrades
        .route("/request-upgrade", post(upgrades::request_upgrade))
        // Account
        .route("/create-demo-account", post(account::create_demo_account))
        .route("/me", get(account::me))
}
