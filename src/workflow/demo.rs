use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{Identity, User};

/// Marks an authenticated identity as a demo account.
///
/// `user_id` and `email` must name the caller itself. Identities that already
/// own a user record keep it; the returned flag says whether they have full access.
pub fn create_demo_account(
    store: &dyn Store,
    identity: &Identity,
    user: Option<&User>,
    user_id: &str,
    email: &str,
) -> Result<bool> {
    if user_id != identity.id || !email.trim().eq_ignore_ascii_case(&identity.email) {
        tracing::warn!("Demo account request for {} does not match caller", user_id);
        return Err(Error::Unauthorized);
    }

    if let Some(user) = user {
        return Ok(!user.is_demo);
    }

    if !identity.is_demo {
        store.set_identity_demo(&identity.id, true)?;
        tracing::info!("Identity {} switched to demo mode", identity.id);
    }

    Ok(false)
}
