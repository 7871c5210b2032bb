use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use tempfile::TempDir;
use tokio::task::JoinHandle;
use uuid::Uuid;

use stockyard::auth::{issue_session, start_login};
use stockyard::config::ServerConfig;
use stockyard::server::{AppState, create_router};
use stockyard::store::{DEMO_TENANT_ID, SqliteStore, Store};
use stockyard::types::{Identity, Role, User};

/// A router served on an ephemeral port, backed by a throwaway database.
/// The store stays reachable so tests can arrange state directly.
pub struct TestServer {
    pub temp_dir: TempDir,
    pub base_url: String,
    pub store: Arc<SqliteStore>,
    pub config: ServerConfig,
    handle: JoinHandle<()>,
}

impl TestServer {
    pub async fn start() -> Self {
        let temp_dir = TempDir::new().expect("create temp dir");

        let config = ServerConfig {
            data_dir: temp_dir.path().to_path_buf(),
            ..ServerConfig::default()
        };

        let store = Arc::new(SqliteStore::new(config.db_path()).expect("open store"));
        store.initialize().expect("initialize store");

        let state = Arc::new(AppState::new(store.clone(), config.clone()));
        let app = create_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let port = listener.local_addr().expect("local addr").port();
        let base_url = format!("http://127.0.0.1:{}", port);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve");
        });

        Self::wait_for_ready(&base_url).await;

        Self {
            temp_dir,
            base_url,
            store,
            config,
            handle,
        }
    }

    async fn wait_for_ready(base_url: &str) {
        let client = reqwest::Client::new();
        for _ in 0..50 {
            if client
                .get(format!("{}/health", base_url))
                .send()
                .await
                .is_ok()
            {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        panic!("Server did not become ready");
    }

    pub fn data_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Client that reports redirects instead of following them.
    pub fn client(&self) -> reqwest::Client {
        reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("build client")
    }

    pub fn identity(&self, email: &str) -> Identity {
        let identity = Identity {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            is_demo: false,
            created_at: Utc::now(),
        };
        self.store.create_identity(&identity).expect("create identity");
        identity
    }

    pub fn session_token(&self, identity_id: &str) -> String {
        let (token, _session) = issue_session(self.store.as_ref(), identity_id, self.config.session_ttl())
            .expect("issue session");
        token
    }

    /// A user record in the demo tenant with the given flags, plus a session token.
    pub fn user(&self, email: &str, role: Role, is_demo: bool, is_superadmin: bool) -> (User, String) {
        let identity = self.identity(email);
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4().to_string(),
            tenant_id: DEMO_TENANT_ID.to_string(),
            identity_id: identity.id.clone(),
            first_name: None,
            last_name: None,
            email: email.to_string(),
            role,
            is_demo,
            is_superadmin,
            created_at: now,
            updated_at: now,
        };
        self.store.create_user(&user).expect("create user");
        let token = self.session_token(&identity.id);
        (user, token)
    }

    pub fn admin_token(&self, email: &str) -> String {
        self.user(email, Role::Admin, false, false).1
    }

    pub fn superadmin_token(&self, email: &str) -> String {
        self.user(email, Role::Admin, false, true).1
    }

    /// Issues a login code the way `/api/auth/otp` does and returns it raw.
    pub fn login_code(&self, email: &str) -> String {
        let (_identity, code) = start_login(self.store.as_ref(), email, self.config.auth_code_ttl())
            .expect("start login");
        code
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
