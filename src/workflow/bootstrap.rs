use chrono::Utc;
use serde_json::{Value, json};
use uuid::Uuid;

use super::invites;
use crate::error::{Error, Result};
use crate::store::{Grant, Provisioning, Store};
use crate::types::{Identity, Role, Tenant, User, Warehouse};

pub const DEFAULT_WAREHOUSE_NAME: &str = "Main Warehouse";

/// Result of first-login provisioning.
#[derive(Debug, Clone)]
pub enum SetupOutcome {
    Created {
        tenant: Tenant,
        user: User,
        warehouse: Warehouse,
    },
    /// The identity already has a user record. Not an error.
    AlreadyExists,
    /// The identity stays on the shared demo tenant: it chose the demo path,
    /// or there is no usable invite for its email.
    DemoMode,
}

impl SetupOutcome {
    pub fn to_json(&self) -> Value {
        match self {
            SetupOutcome::Created {
                tenant,
                user,
                warehouse,
            } => json!({
                "success": true,
                "tenantId": tenant.id,
                "userId": user.id,
                "warehouseId": warehouse.id,
            }),
            SetupOutcome::AlreadyExists => json!({ "success": false, "alreadyExists": true }),
            SetupOutcome::DemoMode => json!({ "success": false, "demo": true }),
        }
    }
}

/// Provisions tenant, admin user and default warehouse for an identity, once.
///
/// Safe to call from several entry points: the existing-user check is repeated
/// here, and a concurrent winner surfaces as a unique violation that is
/// reported as `AlreadyExists`. An invite revoked or consumed between lookup
/// and write leaves the identity in demo mode.
pub fn setup_new_user(store: &dyn Store, identity: &Identity) -> Result<SetupOutcome> {
    if store.get_user_by_identity(&identity.id)?.is_some() {
        return Ok(SetupOutcome::AlreadyExists);
    }

    if identity.is_demo {
        return Ok(SetupOutcome::DemoMode);
    }

    let Some(invite) = invites::usable_for_email(store, &identity.email)? else {
        tracing::debug!("No usable invite for {}, staying in demo mode", identity.email);
        return demo_unless_provisioned(store, identity);
    };

    match provision(store, identity, invite.company_name(), Grant::Invite(&invite.id)) {
        Err(Error::InvalidState { .. } | Error::NotFound) => {
            tracing::debug!(
                "Invite {} was settled before {} could use it",
                invite.id,
                identity.email
            );
            demo_unless_provisioned(store, identity)
        }
        outcome => outcome,
    }
}

/// A concurrent setup may have consumed the invite for this same identity.
fn demo_unless_provisioned(store: &dyn Store, identity: &Identity) -> Result<SetupOutcome> {
    if store.get_user_by_identity(&identity.id)?.is_some() {
        return Ok(SetupOutcome::AlreadyExists);
    }
    Ok(SetupOutcome::DemoMode)
}

/// Writes the tenant rows for an identity and settles the grant in one transaction.
pub(crate) fn provision(
    store: &dyn Store,
    identity: &Identity,
    company_name: Option<&str>,
    grant: Grant<'_>,
) -> Result<SetupOutcome> {
    provision_with(store, identity, company_name, grant, false)
}

/// Provisions the platform operator's own tenant, with super-admin rights.
pub fn provision_super_admin(
    store: &dyn Store,
    identity: &Identity,
    company_name: Option<&str>,
) -> Result<SetupOutcome> {
    provision_with(store, identity, company_name, Grant::Direct, true)
}

fn provision_with(
    store: &dyn Store,
    identity: &Identity,
    company_name: Option<&str>,
    grant: Grant<'_>,
    is_superadmin: bool,
) -> Result<SetupOutcome> {
    let now = Utc::now();

    let tenant = Tenant {
        id: Uuid::new_v4().to_string(),
        name: tenant_name(company_name, &identity.email),
        is_demo: false,
        created_at: now,
    };

    let user = User {
        id: Uuid::new_v4().to_string(),
        tenant_id: tenant.id.clone(),
        identity_id: identity.id.clone(),
        first_name: None,
        last_name: None,
        email: identity.email.clone(),
        role: Role::Admin,
        is_demo: false,
        is_superadmin,
        created_at: now,
        updated_at: now,
    };

    let warehouse = Warehouse {
        id: Uuid::new_v4().to_string(),
        tenant_id: tenant.id.clone(),
        name: DEFAULT_WAREHOUSE_NAME.to_string(),
        is_default: true,
        created_at: now,
    };

    let provisioning = Provisioning {
        tenant: &tenant,
        user: &user,
        warehouse: &warehouse,
        grant,
    };

    match store.provision_tenant(&provisioning) {
        Ok(()) => {
            tracing::info!(
                "Provisioned tenant {} for identity {}",
                tenant.id,
                identity.id
            );
            Ok(SetupOutcome::Created {
                tenant,
                user,
                warehouse,
            })
        }
        Err(Error::AlreadyExists) => Ok(SetupOutcome::AlreadyExists),
        Err(e) => Err(e),
    }
}

/// Company name from the invite, else the email's domain.
fn tenant_name(company_name: Option<&str>, email: &str) -> String {
    if let Some(name) = company_name.map(str::trim).filter(|n| !n.is_empty()) {
        return name.to_string();
    }

    match email.rsplit_once('@') {
        Some((_, domain)) if !domain.is_empty() => domain.to_string(),
        _ => email.to_string(),
    }
}
