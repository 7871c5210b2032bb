use std::net::SocketAddr;
use std::path::PathBuf;

use chrono::Duration;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    /// Public base URL for external access (e.g., "https://app.example.com").
    /// Used for magic links. If not set, the origin is derived from request headers.
    pub public_base_url: Option<String>,
    /// Session cookies are named `sb-<cookie_project_ref>-auth-token`.
    pub cookie_project_ref: String,
    pub session_ttl_hours: i64,
    /// Lifetime of invites created through `/api/create-invite`.
    pub invite_ttl_hours: i64,
    /// Lifetime of invites issued when an admin approves an access request.
    pub direct_invite_ttl_hours: i64,
    pub auth_code_ttl_minutes: i64,
    /// Path prefixes that require an authenticated identity.
    pub protected_paths: Vec<String>,
    /// Paths that only make sense for anonymous visitors.
    pub auth_only_paths: Vec<String>,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("stockyard.db")
    }

    #[must_use]
    pub fn session_cookie_name(&self) -> String {
        format!("sb-{}-auth-token", self.cookie_project_ref)
    }

    #[must_use]
    pub fn session_ttl(&self) -> Duration {
        Duration::hours(self.session_ttl_hours)
    }

    #[must_use]
    pub fn invite_ttl(&self) -> Duration {
        Duration::hours(self.invite_ttl_hours)
    }

    #[must_use]
    pub fn direct_invite_ttl(&self) -> Duration {
        Duration::hours(self.direct_invite_ttl_hours)
    }

    #[must_use]
    pub fn auth_code_ttl(&self) -> Duration {
        Duration::minutes(self.auth_code_ttl_minutes)
    }

    /// Cookies carry `Secure` once the public origin is https.
    pub fn secure_cookies(&self) -> bool {
        self.public_base_url
            .as_deref()
            .is_some_and(|url| url.starts_with("https://"))
    }

    pub fn is_protected_path(&self, path: &str) -> bool {
        self.protected_paths
            .iter()
            .any(|prefix| path_has_prefix(path, prefix))
    }

    pub fn is_auth_only_path(&self, path: &str) -> bool {
        self.auth_only_paths
            .iter()
            .any(|prefix| path_has_prefix(path, prefix))
    }
}

/// `/dashboard` matches `/dashboard` and `/dashboard/x`, not `/dashboards`.
fn path_has_prefix(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            data_dir: PathBuf::from("./data"),
            public_base_url: None,
            cookie_project_ref: "stockyard".to_string(),
            session_ttl_hours: 24 * 7,
            invite_ttl_hours: 24 * 7,
            direct_invite_ttl_hours: 48,
            auth_code_ttl_minutes: 10,
            protected_paths: [
                "/dashboard",
                "/admin",
                "/inventory",
                "/accounting",
                "/goods-receipts",
                "/transactions",
                "/staff",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            auth_only_paths: ["/login", "/signup"].into_iter().map(String::from).collect(),
        }
    }
}
