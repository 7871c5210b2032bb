use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde_json::json;

use super::schema::{SCHEMA, SEED_DEMO_TENANT};
use super::{Grant, Provisioning, Store};
use crate::error::{Error, Result};
use crate::types::*;

const IDENTITY_COLUMNS: &str = "id, email, is_demo, created_at";
const SESSION_COLUMNS: &str = "id, token_hash, token_lookup, identity_id, created_at, expires_at";
const AUTH_CODE_COLUMNS: &str = "code_hash, identity_id, created_at, expires_at, used_at";
const USER_COLUMNS: &str = "id, tenant_id, identity_id, first_name, last_name, email, role, \
     is_demo, is_superadmin, created_at, updated_at";
const INVITE_COLUMNS: &str = "id, code, email, invite_type, kind, status, invited_by, \
     company_name, expires_at, rejected_by, rejected_at, approved_at, created_at, metadata";
const UPGRADE_COLUMNS: &str = "id, email, identity_id, company_name, status, rejection_reason, \
     rejected_by, rejected_at, approved_by, approved_at, created_at, updated_at";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Opens a private in-memory database.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns a guard to the underlying database connection.
    /// This allows consuming applications to execute custom SQL.
    pub fn connection(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn()
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

/// Fixed-width UTC timestamps, so string comparison in SQL orders correctly.
fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn conversion_error(idx: usize, message: impl Into<String>) -> rusqlite::Error {
    let message: String = message.into();
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, message.into())
}

fn parse_column<T: FromStr<Err = String>>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    row.get::<_, String>(idx)?
        .parse()
        .map_err(|e: String| conversion_error(idx, e))
}

fn optional_datetime(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    Ok(row.get::<_, Option<String>>(idx)?.map(|s| parse_datetime(&s)))
}

fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
}

fn map_unique(e: rusqlite::Error) -> Error {
    if is_unique_violation(&e) {
        Error::AlreadyExists
    } else {
        Error::from(e)
    }
}

fn identity_from_row(row: &Row<'_>) -> rusqlite::Result<Identity> {
    Ok(Identity {
        id: row.get(0)?,
        email: row.get(1)?,
        is_demo: row.get(2)?,
        created_at: parse_datetime(&row.get::<_, String>(3)?),
    })
}

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<Session> {
    Ok(Session {
        id: row.get(0)?,
        token_hash: row.get(1)?,
        token_lookup: row.get(2)?,
        identity_id: row.get(3)?,
        created_at: parse_datetime(&row.get::<_, String>(4)?),
        expires_at: parse_datetime(&row.get::<_, String>(5)?),
    })
}

fn auth_code_from_row(row: &Row<'_>) -> rusqlite::Result<AuthCode> {
    Ok(AuthCode {
        code_hash: row.get(0)?,
        identity_id: row.get(1)?,
        created_at: parse_datetime(&row.get::<_, String>(2)?),
        expires_at: parse_datetime(&row.get::<_, String>(3)?),
        used_at: optional_datetime(row, 4)?,
    })
}

fn tenant_from_row(row: &Row<'_>) -> rusqlite::Result<Tenant> {
    Ok(Tenant {
        id: row.get(0)?,
        name: row.get(1)?,
        is_demo: row.get(2)?,
        created_at: parse_datetime(&row.get::<_, String>(3)?),
    })
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        identity_id: row.get(2)?,
        first_name: row.get(3)?,
        last_name: row.get(4)?,
        email: row.get(5)?,
        role: parse_column(row, 6)?,
        is_demo: row.get(7)?,
        is_superadmin: row.get(8)?,
        created_at: parse_datetime(&row.get::<_, String>(9)?),
        updated_at: parse_datetime(&row.get::<_, String>(10)?),
    })
}

fn invite_from_row(row: &Row<'_>) -> rusqlite::Result<Invite> {
    let kind = match row.get::<_, String>(4)?.as_str() {
        "platform_invite" => {
            let code: Option<String> = row.get(1)?;
            let expires_at = optional_datetime(row, 8)?;
            match (code, expires_at) {
                (Some(code), Some(expires_at)) => InviteKind::PlatformInvite {
                    code,
                    expires_at,
                    company_name: row.get(7)?,
                },
                _ => return Err(conversion_error(1, "platform invite without code or expiry")),
            }
        }
        "access_request" => InviteKind::AccessRequest {
            company_name: row.get(7)?,
        },
        other => return Err(conversion_error(4, format!("unknown invite kind: {other}"))),
    };

    let metadata: String = row.get(13)?;
    let metadata = serde_json::from_str(&metadata)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(13, Type::Text, Box::new(e)))?;

    Ok(Invite {
        id: row.get(0)?,
        email: row.get(2)?,
        invite_type: row.get(3)?,
        kind,
        status: parse_column(row, 5)?,
        invited_by: row.get(6)?,
        rejected_by: row.get(9)?,
        rejected_at: optional_datetime(row, 10)?,
        approved_at: optional_datetime(row, 11)?,
        created_at: parse_datetime(&row.get::<_, String>(12)?),
        metadata,
    })
}

fn upgrade_from_row(row: &Row<'_>) -> rusqlite::Result<UpgradeRequest> {
    Ok(UpgradeRequest {
        id: row.get(0)?,
        email: row.get(1)?,
        identity_id: row.get(2)?,
        company_name: row.get(3)?,
        status: parse_column(row, 4)?,
        rejection_reason: row.get(5)?,
        rejected_by: row.get(6)?,
        rejected_at: optional_datetime(row, 7)?,
        approved_by: row.get(8)?,
        approved_at: optional_datetime(row, 9)?,
        created_at: parse_datetime(&row.get::<_, String>(10)?),
        updated_at: parse_datetime(&row.get::<_, String>(11)?),
    })
}

fn query_invite(conn: &Connection, id: &str) -> Result<Option<Invite>> {
    conn.query_row(
        &format!("SELECT {INVITE_COLUMNS} FROM invites WHERE id = ?1"),
        params![id],
        invite_from_row,
    )
    .optional()
    .map_err(Error::from)
}

fn query_upgrade_request(conn: &Connection, id: &str) -> Result<Option<UpgradeRequest>> {
    conn.query_row(
        &format!("SELECT {UPGRADE_COLUMNS} FROM upgrade_requests WHERE id = ?1"),
        params![id],
        upgrade_from_row,
    )
    .optional()
    .map_err(Error::from)
}

/// Explains why a conditional status update touched no rows.
fn transition_error(conn: &Connection, table: &'static str, id: &str) -> Error {
    let status = conn
        .query_row(
            &format!("SELECT status FROM {table} WHERE id = ?1"),
            params![id],
            |row| row.get::<_, String>(0),
        )
        .optional();

    match status {
        Ok(Some(status)) => Error::InvalidState { status },
        Ok(None) => Error::NotFound,
        Err(e) => Error::from(e),
    }
}

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        let conn = self.conn();
        conn.execute_batch(SCHEMA)?;
        conn.execute_batch(SEED_DEMO_TENANT)?;
        Ok(())
    }

    // Identity operations

    fn create_identity(&self, identity: &Identity) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO identities (id, email, is_demo, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![
                    identity.id,
                    identity.email,
                    identity.is_demo,
                    format_datetime(&identity.created_at),
                ],
            )
            .map_err(map_unique)?;
        Ok(())
    }

    fn get_identity(&self, id: &str) -> Result<Option<Identity>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {IDENTITY_COLUMNS} FROM identities WHERE id = ?1"),
            params![id],
            identity_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_identity_by_email(&self, email: &str) -> Result<Option<Identity>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {IDENTITY_COLUMNS} FROM identities WHERE email = ?1"),
            params![email],
            identity_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn set_identity_demo(&self, id: &str, is_demo: bool) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE identities SET is_demo = ?1 WHERE id = ?2",
            params![is_demo, id],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    // Session operations

    fn create_session(&self, session: &Session) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO sessions (id, token_hash, token_lookup, identity_id, created_at, expires_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    session.id,
                    session.token_hash,
                    session.token_lookup,
                    session.identity_id,
                    format_datetime(&session.created_at),
                    format_datetime(&session.expires_at),
                ],
            )
            .map_err(map_unique)?;
        Ok(())
    }

    fn get_session_by_lookup(&self, lookup: &str) -> Result<Option<Session>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE token_lookup = ?1"),
            params![lookup],
            session_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn extend_session(&self, id: &str, expires_at: DateTime<Utc>) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE sessions SET expires_at = ?1 WHERE id = ?2",
            params![format_datetime(&expires_at), id],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn delete_session(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM sessions WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // Auth code operations

    fn create_auth_code(&self, code: &AuthCode) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO auth_codes (code_hash, identity_id, created_at, expires_at, used_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    code.code_hash,
                    code.identity_id,
                    format_datetime(&code.created_at),
                    format_datetime(&code.expires_at),
                    code.used_at.as_ref().map(format_datetime),
                ],
            )
            .map_err(map_unique)?;
        Ok(())
    }

    fn consume_auth_code(&self, code_hash: &str, now: DateTime<Utc>) -> Result<Option<AuthCode>> {
        let conn = self.conn();
        let now = format_datetime(&now);
        let rows = conn.execute(
            "UPDATE auth_codes SET used_at = ?1
             WHERE code_hash = ?2 AND used_at IS NULL AND expires_at > ?1",
            params![now, code_hash],
        )?;

        if rows == 0 {
            return Ok(None);
        }

        conn.query_row(
            &format!("SELECT {AUTH_CODE_COLUMNS} FROM auth_codes WHERE code_hash = ?1"),
            params![code_hash],
            auth_code_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    // Tenant operations

    fn get_tenant(&self, id: &str) -> Result<Option<Tenant>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, name, is_demo, created_at FROM tenants WHERE id = ?1",
            params![id],
            tenant_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_demo_tenant(&self) -> Result<Option<Tenant>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, name, is_demo, created_at FROM tenants WHERE is_demo = 1 LIMIT 1",
            [],
            tenant_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_warehouses(&self, tenant_id: &str) -> Result<Vec<Warehouse>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, tenant_id, name, is_default, created_at
             FROM warehouses WHERE tenant_id = ?1 ORDER BY is_default DESC, name",
        )?;

        let rows = stmt.query_map(params![tenant_id], |row| {
            Ok(Warehouse {
                id: row.get(0)?,
                tenant_id: row.get(1)?,
                name: row.get(2)?,
                is_default: row.get(3)?,
                created_at: parse_datetime(&row.get::<_, String>(4)?),
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // User operations

    fn create_user(&self, user: &User) -> Result<()> {
        insert_user(&self.conn(), user)
    }

    fn get_user_by_identity(&self, identity_id: &str) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE identity_id = ?1"),
            params![identity_id],
            user_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn provision_tenant(&self, provisioning: &Provisioning<'_>) -> Result<()> {
        let Provisioning {
            tenant,
            user,
            warehouse,
            grant,
        } = provisioning;

        let mut conn = self.conn();
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO tenants (id, name, is_demo, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                tenant.id,
                tenant.name,
                tenant.is_demo,
                format_datetime(&tenant.created_at)
            ],
        )?;

        // Dropping `tx` on the error path rolls the tenant back.
        insert_user(&tx, user)?;

        tx.execute(
            "INSERT INTO warehouses (id, tenant_id, name, is_default, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                warehouse.id,
                warehouse.tenant_id,
                warehouse.name,
                warehouse.is_default,
                format_datetime(&warehouse.created_at),
            ],
        )?;

        tx.execute(
            "UPDATE identities SET is_demo = 0 WHERE id = ?1",
            params![user.identity_id],
        )?;

        let now = format_datetime(&tenant.created_at);
        match *grant {
            Grant::Direct => {}
            Grant::Invite(invite_id) => {
                let patch =
                    json!({ "consumed_by": user.identity_id, "consumed_at": now }).to_string();
                let rows = tx.execute(
                    "UPDATE invites SET status = 'approved', approved_at = ?1,
                            metadata = json_patch(metadata, ?2)
                     WHERE id = ?3 AND status = 'pending'",
                    params![now, patch, invite_id],
                )?;
                if rows == 0 {
                    return Err(transition_error(&tx, "invites", invite_id));
                }
            }
            Grant::Upgrade {
                request_id,
                approved_by,
            } => {
                let rows = tx.execute(
                    "UPDATE upgrade_requests
                     SET status = 'approved', approved_by = ?1, approved_at = ?2, updated_at = ?2
                     WHERE id = ?3 AND status = 'pending'",
                    params![approved_by, now, request_id],
                )?;
                if rows == 0 {
                    return Err(transition_error(&tx, "upgrade_requests", request_id));
                }
            }
        }

        tx.commit()?;
        Ok(())
    }

    // Invite operations

    fn create_invite(&self, invite: &Invite) -> Result<()> {
        let (code, expires_at, company_name) = match &invite.kind {
            InviteKind::PlatformInvite {
                code,
                expires_at,
                company_name,
            } => (
                Some(code.as_str()),
                Some(format_datetime(expires_at)),
                company_name.as_deref(),
            ),
            InviteKind::AccessRequest { company_name } => (None, None, company_name.as_deref()),
        };

        let metadata = serde_json::Value::Object(invite.metadata.clone()).to_string();
        let created_at = format_datetime(&invite.created_at);

        let mut conn = self.conn();
        let tx = conn.transaction()?;

        // Expired invites still hold their code in the pending index; retire them
        // so the small numeric code space is not exhausted by stale rows.
        if let Some(code) = code {
            let patch = json!({ "retired_at": created_at }).to_string();
            let retired = tx.execute(
                "UPDATE invites SET status = 'revoked', metadata = json_patch(metadata, ?1)
                 WHERE code = ?2 AND status = 'pending' AND expires_at <= ?3",
                params![patch, code, created_at],
            )?;
            if retired > 0 {
                tracing::debug!("Retired {} expired invite(s) holding a reused code", retired);
            }
        }

        tx.execute(
            "INSERT INTO invites (id, code, email, invite_type, kind, status, invited_by,
                                  company_name, expires_at, created_at, metadata)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                invite.id,
                code,
                invite.email,
                invite.invite_type,
                invite.kind.as_str(),
                invite.status.as_str(),
                invite.invited_by,
                company_name,
                expires_at,
                created_at,
                metadata,
            ],
        )
        .map_err(map_unique)?;

        tx.commit()?;
        Ok(())
    }

    fn get_invite(&self, id: &str) -> Result<Option<Invite>> {
        query_invite(&self.conn(), id)
    }

    fn find_usable_invite(
        &self,
        code: &str,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Invite>> {
        let conn = self.conn();
        conn.query_row(
            &format!(
                "SELECT {INVITE_COLUMNS} FROM invites
                 WHERE code = ?1 AND email = ?2 AND invite_type = 'platform'
                   AND kind = 'platform_invite' AND status = 'pending' AND expires_at > ?3
                 ORDER BY created_at DESC LIMIT 1"
            ),
            params![code, email, format_datetime(&now)],
            invite_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn find_usable_invite_for_email(
        &self,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Invite>> {
        let conn = self.conn();
        conn.query_row(
            &format!(
                "SELECT {INVITE_COLUMNS} FROM invites
                 WHERE email = ?1 AND invite_type = 'platform'
                   AND kind = 'platform_invite' AND status = 'pending' AND expires_at > ?2
                 ORDER BY created_at DESC LIMIT 1"
            ),
            params![email, format_datetime(&now)],
            invite_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_pending_invites(&self, kind: Option<&str>) -> Result<Vec<Invite>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {INVITE_COLUMNS} FROM invites
             WHERE status = 'pending' AND (?1 IS NULL OR kind = ?1)
             ORDER BY created_at DESC"
        ))?;

        let rows = stmt.query_map(params![kind], invite_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn revoke_invite(&self, id: &str, rejected_by: &str, at: DateTime<Utc>) -> Result<Invite> {
        let conn = self.conn();
        let at = format_datetime(&at);
        let patch = json!({ "rejected_by": rejected_by, "rejected_at": at }).to_string();

        let rows = conn.execute(
            "UPDATE invites SET status = 'revoked', rejected_by = ?1, rejected_at = ?2,
                    metadata = json_patch(metadata, ?3)
             WHERE id = ?4 AND status = 'pending'",
            params![rejected_by, at, patch, id],
        )?;

        if rows == 0 {
            return Err(transition_error(&conn, "invites", id));
        }

        query_invite(&conn, id)?.ok_or(Error::NotFound)
    }

    fn approve_invite(&self, id: &str, at: DateTime<Utc>) -> Result<Invite> {
        let conn = self.conn();
        let at = format_datetime(&at);
        let patch = json!({ "approved_at": at }).to_string();

        let rows = conn.execute(
            "UPDATE invites SET status = 'approved', approved_at = ?1,
                    metadata = json_patch(metadata, ?2)
             WHERE id = ?3 AND status = 'pending'",
            params![at, patch, id],
        )?;

        if rows == 0 {
            return Err(transition_error(&conn, "invites", id));
        }

        query_invite(&conn, id)?.ok_or(Error::NotFound)
    }

    // Upgrade request operations

    fn create_upgrade_request(&self, request: &UpgradeRequest) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO upgrade_requests (id, email, identity_id, company_name, status,
                                               created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    request.id,
                    request.email,
                    request.identity_id,
                    request.company_name,
                    request.status.as_str(),
                    format_datetime(&request.created_at),
                    format_datetime(&request.updated_at),
                ],
            )
            .map_err(map_unique)?;
        Ok(())
    }

    fn get_upgrade_request(&self, id: &str) -> Result<Option<UpgradeRequest>> {
        query_upgrade_request(&self.conn(), id)
    }

    fn list_pending_upgrade_requests(&self) -> Result<Vec<UpgradeRequest>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {UPGRADE_COLUMNS} FROM upgrade_requests
             WHERE status = 'pending' ORDER BY created_at DESC"
        ))?;

        let rows = stmt.query_map([], upgrade_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn reject_upgrade_request(
        &self,
        id: &str,
        reason: Option<&str>,
        rejected_by: &str,
        at: DateTime<Utc>,
    ) -> Result<UpgradeRequest> {
        let conn = self.conn();
        let rows = conn.execute(
            "UPDATE upgrade_requests
             SET status = 'rejected', rejection_reason = ?1, rejected_by = ?2,
                 rejected_at = ?3, updated_at = ?3
             WHERE id = ?4 AND status = 'pending'",
            params![reason, rejected_by, format_datetime(&at), id],
        )?;

        if rows == 0 {
            return Err(transition_error(&conn, "upgrade_requests", id));
        }

        query_upgrade_request(&conn, id)?.ok_or(Error::NotFound)
    }

    fn approve_upgrade_request(
        &self,
        id: &str,
        approved_by: &str,
        at: DateTime<Utc>,
    ) -> Result<UpgradeRequest> {
        let conn = self.conn();
        let rows = conn.execute(
            "UPDATE upgrade_requests
             SET status = 'approved', approved_by = ?1, approved_at = ?2, updated_at = ?2
             WHERE id = ?3 AND status = 'pending'",
            params![approved_by, format_datetime(&at), id],
        )?;

        if rows == 0 {
            return Err(transition_error(&conn, "upgrade_requests", id));
        }

        query_upgrade_request(&conn, id)?.ok_or(Error::NotFound)
    }
}

fn insert_user(conn: &Connection, user: &User) -> Result<()> {
    conn.execute(
        "INSERT INTO users (id, tenant_id, identity_id, first_name, last_name, email, role,
                            is_demo, is_superadmin, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            user.id,
            user.tenant_id,
            user.identity_id,
            user.first_name,
            user.last_name,
            user.email,
            user.role.as_str(),
            user.is_demo,
            user.is_superadmin,
            format_datetime(&user.created_at),
            format_datetime(&user.updated_at),
        ],
    )
    .map_err(map_unique)?;
    Ok(())
}
