pub const DEMO_TENANT_ID: &str = "demo-tenant";

pub const SCHEMA: &str = r#"
-- Login credentials; owned by the identity layer
CREATE TABLE IF NOT EXISTS identities (
    id TEXT PRIMARY KEY,
    email TEXT NOT NULL UNIQUE,
    is_demo INTEGER NOT NULL DEFAULT 0,  -- chose the demo path, never auto-provisioned
    created_at TEXT DEFAULT (datetime('now'))
);

-- Sessions are opaque bearer credentials for identities
CREATE TABLE IF NOT EXISTS sessions (
    id TEXT PRIMARY KEY,
    token_hash TEXT NOT NULL,          -- argon2id hash with embedded salt
    token_lookup TEXT NOT NULL,        -- first 8 chars of a UUID for fast lookup
    identity_id TEXT NOT NULL REFERENCES identities(id) ON DELETE CASCADE,
    created_at TEXT DEFAULT (datetime('now')),
    expires_at TEXT NOT NULL
);

-- Single-use codes exchanged for sessions at /auth/callback
CREATE TABLE IF NOT EXISTS auth_codes (
    code_hash TEXT PRIMARY KEY,        -- sha256 of the raw code
    identity_id TEXT NOT NULL REFERENCES identities(id) ON DELETE CASCADE,
    created_at TEXT DEFAULT (datetime('now')),
    expires_at TEXT NOT NULL,
    used_at TEXT
);

-- Tenants (companies) isolate users and warehouses
CREATE TABLE IF NOT EXISTS tenants (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    is_demo INTEGER NOT NULL DEFAULT 0,
    created_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS warehouses (
    id TEXT PRIMARY KEY,
    tenant_id TEXT NOT NULL REFERENCES tenants(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    is_default INTEGER NOT NULL DEFAULT 0,
    created_at TEXT DEFAULT (datetime('now')),

    UNIQUE(tenant_id, name)
);

-- Tenant-scoped profiles; at most one per identity
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    tenant_id TEXT NOT NULL REFERENCES tenants(id) ON DELETE CASCADE,
    identity_id TEXT NOT NULL UNIQUE REFERENCES identities(id) ON DELETE CASCADE,
    first_name TEXT,
    last_name TEXT,
    email TEXT NOT NULL,
    role TEXT NOT NULL DEFAULT 'staff',
    is_demo INTEGER NOT NULL DEFAULT 0,
    is_superadmin INTEGER NOT NULL DEFAULT 0,
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now')),

    UNIQUE(tenant_id, identity_id)
);

-- Platform invites and access requests; never deleted, only transitioned
CREATE TABLE IF NOT EXISTS invites (
    id TEXT PRIMARY KEY,
    code TEXT,                          -- NULL for access requests
    email TEXT NOT NULL,                -- always lowercased
    invite_type TEXT NOT NULL DEFAULT 'platform',
    kind TEXT NOT NULL,                 -- platform_invite | access_request
    status TEXT NOT NULL DEFAULT 'pending',
    invited_by TEXT,
    company_name TEXT,
    expires_at TEXT,                    -- NULL for access requests
    rejected_by TEXT,
    rejected_at TEXT,
    approved_at TEXT,
    created_at TEXT DEFAULT (datetime('now')),
    metadata TEXT NOT NULL DEFAULT '{}'
);

-- Demo identities asking for a real tenant
CREATE TABLE IF NOT EXISTS upgrade_requests (
    id TEXT PRIMARY KEY,
    email TEXT NOT NULL,
    identity_id TEXT NOT NULL REFERENCES identities(id) ON DELETE CASCADE,
    company_name TEXT,
    status TEXT NOT NULL DEFAULT 'pending',
    rejection_reason TEXT,
    rejected_by TEXT,
    rejected_at TEXT,
    approved_by TEXT,
    approved_at TEXT,
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now'))
);

-- Create indexes
CREATE UNIQUE INDEX IF NOT EXISTS idx_sessions_lookup ON sessions(token_lookup);
CREATE INDEX IF NOT EXISTS idx_sessions_identity ON sessions(identity_id);
CREATE UNIQUE INDEX IF NOT EXISTS idx_tenants_single_demo ON tenants(is_demo) WHERE is_demo = 1;
CREATE INDEX IF NOT EXISTS idx_warehouses_tenant ON warehouses(tenant_id);
CREATE INDEX IF NOT EXISTS idx_users_tenant ON users(tenant_id);
CREATE UNIQUE INDEX IF NOT EXISTS idx_invites_pending_code
    ON invites(code) WHERE status = 'pending' AND code IS NOT NULL;
CREATE UNIQUE INDEX IF NOT EXISTS idx_invites_pending_access_request
    ON invites(email) WHERE status = 'pending' AND kind = 'access_request';
CREATE INDEX IF NOT EXISTS idx_invites_email ON invites(email);
CREATE UNIQUE INDEX IF NOT EXISTS idx_upgrade_requests_pending_email
    ON upgrade_requests(email) WHERE status = 'pending';
"#;

/// Seeds the shared demo tenant and its warehouse.
pub const SEED_DEMO_TENANT: &str = r#"
INSERT OR IGNORE INTO tenants (id, name, is_demo) VALUES ('demo-tenant', 'Demo Company', 1);
INSERT OR IGNORE INTO warehouses (id, tenant_id, name, is_default)
    VALUES ('demo-warehouse', 'demo-tenant', 'Demo Warehouse', 1);
"#;
