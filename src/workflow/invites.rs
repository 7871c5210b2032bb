use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use super::normalize_email;
use crate::config::ServerConfig;
use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{
    Invite, InviteCode, InviteKind, InviteStatus, PLATFORM_INVITE_TYPE, User,
};

const MAX_CODE_ATTEMPTS: u32 = 3;

pub const KIND_FILTERS: [&str; 2] = ["platform_invite", "access_request"];

/// A freshly issued platform invite and the signup link that carries it.
#[derive(Debug, Clone)]
pub struct CreatedInvite {
    pub invite: Invite,
    pub code: String,
    pub expires_at: DateTime<Utc>,
    pub magic_link: String,
}

/// Outcome of checking a code against an email. Never an error.
#[derive(Debug, Clone)]
pub enum Validation {
    Valid(Invite),
    Invalid(&'static str),
}

impl Validation {
    pub fn is_valid(&self) -> bool {
        matches!(self, Validation::Valid(_))
    }
}

pub fn magic_link(origin: &str, code: &str, email: &str) -> String {
    format!(
        "{}/signup?invite={}&email={}",
        origin.trim_end_matches('/'),
        code,
        urlencoding::encode(email)
    )
}

/// Issues a platform invite valid for the regular invite window.
/// Members cannot invite their own email: the invite would lift them out of demo mode.
pub fn create(
    store: &dyn Store,
    config: &ServerConfig,
    email: &str,
    inviter: &User,
    origin: &str,
) -> Result<CreatedInvite> {
    if normalize_email(email)? == inviter.email.trim().to_ascii_lowercase() {
        return Err(Error::BadRequest("You cannot invite yourself".to_string()));
    }
    issue(store, email, Some(&inviter.id), None, config.invite_ttl(), origin)
}

/// Issues a platform invite on the admin approval path, with the shorter window.
pub fn create_direct(
    store: &dyn Store,
    config: &ServerConfig,
    email: &str,
    invited_by: &str,
    company_name: Option<&str>,
    origin: &str,
) -> Result<CreatedInvite> {
    issue(
        store,
        email,
        Some(invited_by),
        company_name,
        config.direct_invite_ttl(),
        origin,
    )
}

fn issue(
    store: &dyn Store,
    email: &str,
    invited_by: Option<&str>,
    company_name: Option<&str>,
    ttl: Duration,
    origin: &str,
) -> Result<CreatedInvite> {
    let email = normalize_email(email)?;

    // Pending codes are unique; a collision shows up as AlreadyExists.
    for _ in 0..MAX_CODE_ATTEMPTS {
        let code = InviteCode::generate_numeric();
        let invite = platform_invite(&email, code, invited_by, company_name, ttl);

        match store.create_invite(&invite) {
            Ok(()) => {
                let code = invite.code().unwrap_or_default().to_string();
                let expires_at = invite.expires_at().unwrap_or(invite.created_at);
                let magic_link = magic_link(origin, &code, &email);
                tracing::info!("Created invite {} for {}", invite.id, email);
                return Ok(CreatedInvite {
                    invite,
                    code,
                    expires_at,
                    magic_link,
                });
            }
            Err(Error::AlreadyExists) => {
                tracing::debug!("Invite code collision, retrying");
                continue;
            }
            Err(e) => return Err(e),
        }
    }

    Err(Error::Conflict(
        "Could not allocate a unique invite code".to_string(),
    ))
}

/// Creates a platform invite with a 12-character hex code.
/// Used by the seeding command; these codes are only redeemed by email match.
pub fn seed(
    store: &dyn Store,
    email: &str,
    company_name: Option<&str>,
    ttl: Duration,
) -> Result<Invite> {
    let email = normalize_email(email)?;
    let invite = platform_invite(
        &email,
        InviteCode::generate_hex(&email),
        None,
        company_name,
        ttl,
    );
    store.create_invite(&invite)?;
    Ok(invite)
}

fn platform_invite(
    email: &str,
    code: InviteCode,
    invited_by: Option<&str>,
    company_name: Option<&str>,
    ttl: Duration,
) -> Invite {
    let now = Utc::now();
    Invite {
        id: Uuid::new_v4().to_string(),
        email: email.to_string(),
        invite_type: PLATFORM_INVITE_TYPE.to_string(),
        kind: InviteKind::PlatformInvite {
            code: code.into_string(),
            expires_at: now + ttl,
            company_name: company_name.map(String::from),
        },
        status: InviteStatus::Pending,
        invited_by: invited_by.map(String::from),
        created_at: now,
        rejected_by: None,
        rejected_at: None,
        approved_at: None,
        metadata: serde_json::Map::new(),
    }
}

/// Records a self-service request for an invite. One pending request per email.
pub fn request_access(store: &dyn Store, email: &str, company_name: Option<&str>) -> Result<Invite> {
    let email = normalize_email(email)?;
    let company_name = company_name
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(String::from);

    let invite = Invite {
        id: Uuid::new_v4().to_string(),
        email,
        invite_type: PLATFORM_INVITE_TYPE.to_string(),
        kind: InviteKind::AccessRequest { company_name },
        status: InviteStatus::Pending,
        invited_by: None,
        created_at: Utc::now(),
        rejected_by: None,
        rejected_at: None,
        approved_at: None,
        metadata: serde_json::Map::new(),
    };

    match store.create_invite(&invite) {
        Ok(()) => Ok(invite),
        Err(Error::AlreadyExists) => Err(Error::Conflict(
            "An access request is already pending for this email".to_string(),
        )),
        Err(e) => Err(e),
    }
}

/// Checks a 4-digit code against an email. Malformed codes never reach the store.
pub fn validate(store: &dyn Store, code: &str, email: &str) -> Validation {
    let Some(code) = InviteCode::parse_numeric(code.trim()) else {
        return Validation::Invalid("Invalid invite code format");
    };

    let email = email.trim().to_ascii_lowercase();
    if email.is_empty() {
        return Validation::Invalid("Email is required");
    }

    match store.find_usable_invite(code.as_str(), &email, Utc::now()) {
        Ok(Some(invite)) => Validation::Valid(invite),
        Ok(None) => Validation::Invalid("Invalid or expired invite code"),
        Err(e) => {
            tracing::error!("Failed to validate invite: {}", e);
            Validation::Invalid("Failed to validate invite")
        }
    }
}

/// Revokes a pending invite or access request.
pub fn reject(store: &dyn Store, request_id: &str, admin: &User) -> Result<Invite> {
    let invite = store.revoke_invite(request_id, &admin.id, Utc::now())?;
    tracing::info!("Invite {} revoked by {}", invite.id, admin.id);
    Ok(invite)
}

/// Approves a pending access request and issues a direct platform invite for it.
pub fn approve_access_request(
    store: &dyn Store,
    config: &ServerConfig,
    request_id: &str,
    admin: &User,
    origin: &str,
) -> Result<CreatedInvite> {
    let request = store.get_invite(request_id)?.ok_or(Error::NotFound)?;

    if !matches!(request.kind, InviteKind::AccessRequest { .. }) {
        return Err(Error::BadRequest("Not an access request".to_string()));
    }

    let request = store.approve_invite(&request.id, Utc::now())?;
    tracing::info!("Access request {} approved by {}", request.id, admin.id);

    create_direct(
        store,
        config,
        &request.email,
        &admin.id,
        request.company_name(),
        origin,
    )
}

/// The newest usable platform invite for an email, consumed by first-login provisioning.
pub fn usable_for_email(store: &dyn Store, email: &str) -> Result<Option<Invite>> {
    store.find_usable_invite_for_email(&email.to_ascii_lowercase(), Utc::now())
}

pub fn list_pending(store: &dyn Store, kind: Option<&str>) -> Result<Vec<Invite>> {
    if let Some(kind) = kind {
        if !KIND_FILTERS.contains(&kind) {
            return Err(Error::BadRequest(format!("Unknown invite kind: {kind}")));
        }
    }
    store.list_pending_invites(kind)
}
