//! Onboarding state machines: invites, upgrade requests and first-login
//! tenant provisioning. Each operation takes the store explicitly and the
//! already-resolved caller; nothing here reads ambient request state.

pub mod bootstrap;
pub mod demo;
pub mod invites;
pub mod upgrades;

pub use bootstrap::{SetupOutcome, setup_new_user};
pub use invites::{CreatedInvite, Validation};

use crate::error::{Error, Result};

const MAX_EMAIL_LEN: usize = 254;

/// Trims and lowercases an email, rejecting values that cannot be one.
pub fn normalize_email(email: &str) -> Result<String> {
    let email = email.trim().to_ascii_lowercase();

    if email.is_empty() {
        return Err(Error::BadRequest("Email is required".to_string()));
    }
    if email.len() > MAX_EMAIL_LEN {
        return Err(Error::BadRequest(format!(
            "Email cannot exceed {MAX_EMAIL_LEN} characters"
        )));
    }

    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };

    if !valid {
        return Err(Error::BadRequest("Invalid email address".to_string()));
    }

    Ok(email)
}
