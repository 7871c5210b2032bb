mod invites;
mod upgrades;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use crate::server::AppState;

pub fn admin_router() -> Router<Arc<AppState>> {
    Router::new()
        // Invites and access requests (tenant admins)
        .route("/invites", get(invites::list_invites))
        .route("/reject-invite", post(invites::reject_invite))
        .route("/approve-access", post(invites::approve_access))
        // Upgrade requests (super-admins)
        .route("/upgrade-requests", get(upgrades::list_upgrade_requests))
        .route("/reject-upgrade", post(upgrades::reject_upgrade))
        .route("/approve-upgrade", post(upgrades::approve_upgrade))
}
