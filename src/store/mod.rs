mod schema;
mod sqlite;

pub use schema::DEMO_TENANT_ID;
pub use sqlite::SqliteStore;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::types::*;

/// Rows written together when a tenant is provisioned for an identity.
#[derive(Debug)]
pub struct Provisioning<'a> {
    pub tenant: &'a Tenant,
    pub user: &'a User,
    pub warehouse: &'a Warehouse,
    pub grant: Grant<'a>,
}

/// The pending record a provisioning settles in the same transaction.
#[derive(Debug, Clone, Copy)]
pub enum Grant<'a> {
    /// Operator-initiated, nothing to settle.
    Direct,
    /// Platform invite consumed by this signup.
    Invite(&'a str),
    /// Upgrade request approved by a super-admin.
    Upgrade {
        request_id: &'a str,
        approved_by: &'a str,
    },
}

/// Store defines the database interface.
///
/// Status transitions (`revoke_invite`, `approve_invite`, `reject_upgrade_request`,
/// `approve_upgrade_request`) are conditional writes: they only touch rows that are
/// still pending, and report `Error::InvalidState` with the current status otherwise.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // Identity operations
    fn create_identity(&self, identity: &Identity) -> Result<()>;
    fn get_identity(&self, id: &str) -> Result<Option<Identity>>;
    fn get_identity_by_email(&self, email: &str) -> Result<Option<Identity>>;
    fn set_identity_demo(&self, id: &str, is_demo: bool) -> Result<()>;

    // Session operations
    fn create_session(&self, session: &Session) -> Result<()>;
    fn get_session_by_lookup(&self, lookup: &str) -> Result<Option<Session>>;
    fn extend_session(&self, id: &str, expires_at: DateTime<Utc>) -> Result<()>;
    fn delete_session(&self, id: &str) -> Result<bool>;

    // Auth code operations
    fn create_auth_code(&self, code: &AuthCode) -> Result<()>;
    /// Marks an unused, unexpired code as used and returns it. `None` if no such code.
    fn consume_auth_code(&self, code_hash: &str, now: DateTime<Utc>) -> Result<Option<AuthCode>>;

    // Tenant operations
    fn get_tenant(&self, id: &str) -> Result<Option<Tenant>>;
    fn get_demo_tenant(&self) -> Result<Option<Tenant>>;
    fn list_warehouses(&self, tenant_id: &str) -> Result<Vec<Warehouse>>;

    // User operations
    fn create_user(&self, user: &User) -> Result<()>;
    fn get_user_by_identity(&self, identity_id: &str) -> Result<Option<User>>;
    /// Writes tenant, user and warehouse in one transaction, settling the grant.
    /// Returns `Error::AlreadyExists` if the identity already has a user record,
    /// and `Error::InvalidState` if the granting record is no longer pending.
    /// Nothing is written in either case.
    fn provision_tenant(&self, provisioning: &Provisioning<'_>) -> Result<()>;

    // Invite operations
    fn create_invite(&self, invite: &Invite) -> Result<()>;
    fn get_invite(&self, id: &str) -> Result<Option<Invite>>;
    fn find_usable_invite(
        &self,
        code: &str,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Invite>>;
    fn find_usable_invite_for_email(&self, email: &str, now: DateTime<Utc>)
    -> Result<Option<Invite>>;
    fn list_pending_invites(&self, kind: Option<&str>) -> Result<Vec<Invite>>;
    fn revoke_invite(&self, id: &str, rejected_by: &str, at: DateTime<Utc>) -> Result<Invite>;
    fn approve_invite(&self, id: &str, at: DateTime<Utc>) -> Result<Invite>;

    // Upgrade request operations
    fn create_upgrade_request(&self, request: &UpgradeRequest) -> Result<()>;
    fn get_upgrade_request(&self, id: &str) -> Result<Option<UpgradeRequest>>;
    fn list_pending_upgrade_requests(&self) -> Result<Vec<UpgradeRequest>>;
    fn reject_upgrade_request(
        &self,
        id: &str,
        reason: Option<&str>,
        rejected_by: &str,
        at: DateTime<Utc>,
    ) -> Result<UpgradeRequest>;
    fn approve_upgrade_request(
        &self,
        id: &str,
        approved_by: &str,
        at: DateTime<Utc>,
    ) -> Result<UpgradeRequest>;
}
