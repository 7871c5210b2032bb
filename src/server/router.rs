use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::http::{HeaderMap, header};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::{Router, routing::get};

use super::admin::admin_router;
use super::login::login_router;
use super::pages::{self, pages_router};
use super::session::session_gate;
use super::user::user_router;
use crate::config::ServerConfig;
use crate::store::Store;

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: ServerConfig,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: ServerConfig) -> Self {
        Self { store, config }
    }

    /// Origin used in links handed to users: the configured public URL, else the request's host.
    pub fn origin(&self, headers: &HeaderMap) -> String {
        if let Some(url) = &self.config.public_base_url {
            return url.trim_end_matches('/').to_string();
        }

        let host = headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("localhost");

        let scheme = headers
            .get("x-forwarded-proto")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("http");

        format!("{scheme}://{host}")
    }
}

async fn health() -> &'static str {
    "OK"
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status();

    tracing::info!(
        "{} {} {} {}ms",
        method,
        uri.path(),
        status.as_u16(),
        latency.as_millis()
    );

    response
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/admin", admin_router())
        .nest("/api", user_router())
        .merge(login_router())
        .merge(pages_router())
        .fallback(pages::not_found)
        .layer(middleware::from_fn_with_state(state.clone(), session_gate))
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{HeaderValue, StatusCode};
    use tower::ServiceExt;

    use super::*;
    use crate::store::SqliteStore;

    fn state(public_base_url: Option<&str>) -> Arc<AppState> {
        let store = SqliteStore::in_memory().unwrap();
        store.initialize().unwrap();
        let config = ServerConfig {
            public_base_url: public_base_url.map(String::from),
            ..ServerConfig::default()
        };
        Arc::new(AppState::new(Arc::new(store), config))
    }

    #[test]
    fn test_origin_prefers_public_url() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("internal:8080"));

        assert_eq!(
            state(Some("https://app.example.com/")).origin(&headers),
            "https://app.example.com"
        );
        assert_eq!(state(None).origin(&headers), "http://internal:8080");

        headers.insert("x-forwarded-proto", HeaderValue::from_static("https"));
        assert_eq!(state(None).origin(&headers), "https://internal:8080");
    }

    #[tokio::test]
    async fn test_health() {
        let app = create_router(state(None));
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_protected_path_redirects() {
        let app = create_router(state(None));
        let response = app
            .oneshot(Request::get("/inventory/items").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers()[header::LOCATION],
            "/login?next=%2Finventory%2Fitems"
        );
    }
}
