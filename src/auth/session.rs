use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::{HeaderMap, HeaderValue};
use chrono::{Duration, Utc};
use uuid::Uuid;

use super::{TokenGenerator, parse_token};
use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{Identity, Session};

const MAX_SESSION_RETRIES: u32 = 3;

/// A session token that resolved to a live session.
#[derive(Debug, Clone)]
pub struct ResolvedSession {
    pub session: Session,
    pub identity: Identity,
}

/// Returns true for cookie names the identity layer uses for session tokens.
pub fn is_auth_cookie_name(name: &str) -> bool {
    name.starts_with("sb-") && (name.contains("auth-token") || name.contains("access-token"))
}

/// Iterates over `name=value` pairs of every Cookie header.
pub fn request_cookies(headers: &HeaderMap) -> impl Iterator<Item = (&str, &str)> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            Some((name.trim(), value.trim()))
        })
}

/// Cheap pre-check: does the request carry anything that could be a session?
/// Looks at names only; nothing is validated.
pub fn has_session_credentials(headers: &HeaderMap) -> bool {
    headers.contains_key(AUTHORIZATION)
        || request_cookies(headers).any(|(name, value)| is_auth_cookie_name(name) && !value.is_empty())
}

/// Extracts the raw session token from a Bearer header or an auth cookie.
pub fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());

    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    request_cookies(headers)
        .find(|(name, value)| is_auth_cookie_name(name) && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// Resolves a raw session token to its identity.
/// Malformed, unknown and expired tokens all resolve to `None`; only store
/// failures are errors.
pub fn resolve_session(store: &dyn Store, raw_token: &str) -> Result<Option<ResolvedSession>> {
    let Ok((lookup, _secret)) = parse_token(raw_token) else {
        return Ok(None);
    };

    let Some(session) = store.get_session_by_lookup(&lookup)? else {
        return Ok(None);
    };

    let generator = TokenGenerator::new();
    if !generator.verify(raw_token, &session.token_hash)? {
        return Ok(None);
    }

    if session.expires_at <= Utc::now() {
        return Ok(None);
    }

    let Some(identity) = store.get_identity(&session.identity_id)? else {
        tracing::warn!("Session {} references missing identity", session.id);
        return Ok(None);
    };

    Ok(Some(ResolvedSession { session, identity }))
}

/// Creates a session for an identity and returns the raw token.
pub fn issue_session(store: &dyn Store, identity_id: &str, ttl: Duration) -> Result<(String, Session)> {
    let generator = TokenGenerator::new();

    for _ in 0..MAX_SESSION_RETRIES {
        let (raw_token, lookup, hash) = generator.generate()?;
        let now = Utc::now();
        let session = Session {
            id: Uuid::new_v4().to_string(),
            token_hash: hash,
            token_lookup: lookup,
            identity_id: identity_id.to_string(),
            created_at: now,
            expires_at: now + ttl,
        };

        match store.create_session(&session) {
            Ok(()) => return Ok((raw_token, session)),
            Err(Error::AlreadyExists) => continue,
            Err(e) => return Err(e),
        }
    }

    Err(Error::Conflict("session lookup collision".to_string()))
}

/// True once less than half of the session's lifetime remains.
pub fn needs_refresh(session: &Session, ttl: Duration) -> bool {
    session.expires_at - Utc::now() < ttl / 2
}

pub fn session_cookie(name: &str, token: &str, ttl: Duration, secure: bool) -> HeaderValue {
    let cookie = format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}{}",
        name,
        token,
        ttl.num_seconds(),
        if secure { "; Secure" } else { "" }
    );
    HeaderValue::from_str(&cookie).unwrap_or_else(|_| HeaderValue::from_static(""))
}

pub fn clear_session_cookie(name: &str) -> HeaderValue {
    let cookie = format!("{name}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0");
    HeaderValue::from_str(&cookie).unwrap_or_else(|_| HeaderValue::from_static(""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(*name, HeaderValue::from_str(value).unwrap());
        }
        map
    }

    fn store_with_identity() -> SqliteStore {
        let store = SqliteStore::in_memory().unwrap();
        store.initialize().unwrap();
        store
            .create_identity(&Identity {
                id: "id-1".to_string(),
                email: "a@x.com".to_string(),
                is_demo: false,
                created_at: Utc::now(),
            })
            .unwrap();
        store
    }

    #[test]
    fn test_auth_cookie_names() {
        assert!(is_auth_cookie_name("sb-stockyard-auth-token"));
        assert!(is_auth_cookie_name("sb-abc-access-token"));
        assert!(!is_auth_cookie_name("sb-abc-refresh"));
        assert!(!is_auth_cookie_name("session-auth-token"));
    }

    #[test]
    fn test_extract_prefers_bearer() {
        let map = headers(&[
            ("authorization", "Bearer from-header"),
            ("cookie", "sb-x-auth-token=from-cookie"),
        ]);
        assert_eq!(extract_session_token(&map).as_deref(), Some("from-header"));
    }

    #[test]
    fn test_extract_from_cookie() {
        let map = headers(&[("cookie", "theme=dark; sb-x-auth-token=abc; other=1")]);
        assert_eq!(extract_session_token(&map).as_deref(), Some("abc"));
        assert!(has_session_credentials(&map));
    }

    #[test]
    fn test_no_credentials() {
        let map = headers(&[("cookie", "theme=dark; sb-x-auth-token=")]);
        assert!(!has_session_credentials(&map));
        assert!(extract_session_token(&map).is_none());
    }

    #[test]
    fn test_issue_and_resolve_session() {
        let store = store_with_identity();
        let (raw, session) = issue_session(&store, "id-1", Duration::hours(1)).unwrap();

        let resolved = resolve_session(&store, &raw).unwrap().unwrap();
        assert_eq!(resolved.identity.id, "id-1");
        assert_eq!(resolved.session.id, session.id);
        assert!(!needs_refresh(&resolved.session, Duration::hours(1)));
    }

    #[test]
    fn test_resolve_rejects_garbage_and_expired() {
        let store = store_with_identity();
        assert!(resolve_session(&store, "garbage").unwrap().is_none());
        assert!(
            resolve_session(&store, "sy_12345678_123456789012345678901234")
                .unwrap()
                .is_none()
        );

        let (raw, _) = issue_session(&store, "id-1", Duration::seconds(-5)).unwrap();
        assert!(resolve_session(&store, &raw).unwrap().is_none());
    }

    #[test]
    fn test_cookie_formatting() {
        let cookie = session_cookie("sb-x-auth-token", "tok", Duration::hours(1), true);
        let cookie = cookie.to_str().unwrap();
        assert!(cookie.starts_with("sb-x-auth-token=tok;"));
        assert!(cookie.contains("Max-Age=3600"));
        assert!(cookie.ends_with("; Secure"));

        let cleared = clear_session_cookie("sb-x-auth-token");
        assert!(cleared.to_str().unwrap().contains("Max-Age=0"));
    }
}
