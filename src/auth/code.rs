use chrono::{Duration, Utc};
use uuid::Uuid;

use super::{digest_auth_code, generate_auth_code};
use crate::error::Result;
use crate::store::Store;
use crate::types::{AuthCode, Identity};

/// Finds or creates the identity for an email and issues a one-time login code.
/// Returns the identity and the raw code; only its digest is stored.
pub fn start_login(store: &dyn Store, email: &str, ttl: Duration) -> Result<(Identity, String)> {
    let identity = match store.get_identity_by_email(email)? {
        Some(identity) => identity,
        None => {
            let identity = Identity {
                id: Uuid::new_v4().to_string(),
                email: email.to_string(),
                is_demo: false,
                created_at: Utc::now(),
            };
            store.create_identity(&identity)?;
            tracing::info!("Created identity {} for {}", identity.id, email);
            identity
        }
    };

    let raw_code = generate_auth_code();
    let now = Utc::now();
    store.create_auth_code(&AuthCode {
        code_hash: digest_auth_code(&raw_code),
        identity_id: identity.id.clone(),
        created_at: now,
        expires_at: now + ttl,
        used_at: None,
    })?;

    Ok((identity, raw_code))
}

/// Redeems a one-time code. `None` for unknown, used or expired codes.
pub fn exchange_code(store: &dyn Store, raw_code: &str) -> Result<Option<String>> {
    let consumed = store.consume_auth_code(&digest_auth_code(raw_code), Utc::now())?;
    Ok(consumed.map(|code| code.identity_id))
}
