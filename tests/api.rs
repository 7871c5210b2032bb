mod common;

use chrono::{Duration, SecondsFormat, Utc};
use reqwest::StatusCode;
use reqwest::header::{COOKIE, LOCATION, SET_COOKIE};
use serde_json::{Value, json};

use common::TestServer;
use stockyard::store::Store;
use stockyard::types::Role;
use stockyard::workflow::invites;

async fn post_json(
    server: &TestServer,
    path: &str,
    token: Option<&str>,
    body: Value,
) -> (StatusCode, Value) {
    let mut req = server.client().post(server.url(path)).json(&body);
    if let Some(token) = token {
        req = req.bearer_auth(token);
    }
    let resp = req.send().await.expect("send request");
    let status = resp.status();
    let body = resp.json().await.unwrap_or(Value::Null);
    (status, body)
}

async fn get_json(server: &TestServer, path: &str, token: Option<&str>) -> (StatusCode, Value) {
    let mut req = server.client().get(server.url(path));
    if let Some(token) = token {
        req = req.bearer_auth(token);
    }
    let resp = req.send().await.expect("send request");
    let status = resp.status();
    let body = resp.json().await.unwrap_or(Value::Null);
    (status, body)
}

fn location(resp: &reqwest::Response) -> &str {
    resp.headers()
        .get(LOCATION)
        .expect("location header")
        .to_str()
        .expect("location is ascii")
}

async fn file_access_request(server: &TestServer, email: &str) -> String {
    let (status, body) = post_json(
        server,
        "/api/request-access",
        None,
        json!({ "email": email, "companyName": "Acme Supply" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["requestId"].as_str().expect("request id").to_string()
}

#[tokio::test]
async fn test_health() {
    let server = TestServer::start().await;
    let resp = server
        .client()
        .get(server.url("/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_admin_routes_require_authentication() {
    let server = TestServer::start().await;

    let (status, body) = post_json(
        &server,
        "/api/admin/reject-invite",
        None,
        json!({ "requestId": "x" }),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Authentication required");

    let (status, _) = get_json(&server, "/api/admin/upgrade-requests", Some("sy_bogus_token")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_routes_forbid_non_admins() {
    let server = TestServer::start().await;
    let request_id = file_access_request(&server, "lead@acme.test").await;

    let (_, demo_admin) = server.user("demo@acme.test", Role::Admin, true, false);
    let (_, staff) = server.user("staff@acme.test", Role::Staff, false, false);
    let demo_identity = server.identity("visitor@acme.test");
    let visitor = server.session_token(&demo_identity.id);

    for token in [&demo_admin, &staff, &visitor] {
        let (status, body) = post_json(
            &server,
            "/api/admin/reject-invite",
            Some(token),
            json!({ "requestId": request_id }),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "Forbidden");
    }

    // Still pending after the refused attempts.
    let invite = server.store.get_invite(&request_id).unwrap().unwrap();
    assert_eq!(invite.status.as_str(), "pending");
}

#[tokio::test]
async fn test_reject_invite_is_a_one_time_transition() {
    let server = TestServer::start().await;
    let admin = server.admin_token("admin@acme.test");
    let request_id = file_access_request(&server, "lead@acme.test").await;

    let (status, body) = post_json(
        &server,
        "/api/admin/reject-invite",
        Some(&admin),
        json!({ "requestId": request_id }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["message"], "Invite request rejected");

    let (status, body) = post_json(
        &server,
        "/api/admin/reject-invite",
        Some(&admin),
        json!({ "requestId": request_id }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Request has already been revoked");

    let (status, body) = post_json(
        &server,
        "/api/admin/reject-invite",
        Some(&admin),
        json!({ "requestId": "no-such-request" }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Invite not found");

    let (status, body) = post_json(&server, "/api/admin/reject-invite", Some(&admin), json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "requestId is required");
}

#[tokio::test]
async fn test_duplicate_access_request_conflicts() {
    let server = TestServer::start().await;
    file_access_request(&server, "lead@acme.test").await;

    let (status, _) = post_json(
        &server,
        "/api/request-access",
        None,
        json!({ "email": "LEAD@acme.test" }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = post_json(&server, "/api/request-access", None, json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Email is required");
}

#[tokio::test]
async fn test_approve_access_issues_invite_link() {
    let server = TestServer::start().await;
    let admin = server.admin_token("admin@acme.test");
    let request_id = file_access_request(&server, "lead@acme.test").await;

    let (status, body) = get_json(&server, "/api/admin/invites?kind=access_request", Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["invites"].as_array().unwrap().len(), 1);

    let (status, body) = post_json(
        &server,
        "/api/admin/approve-access",
        Some(&admin),
        json!({ "requestId": request_id }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let code = body["invite"]["code"].as_str().unwrap();
    assert_eq!(code.len(), 4);
    let link = body["invite"]["magicLink"].as_str().unwrap();
    assert!(link.contains(&format!("/signup?invite={code}&email=lead%40acme.test")));

    let (status, body) = post_json(
        &server,
        "/api/admin/approve-access",
        Some(&admin),
        json!({ "requestId": request_id }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Request has already been approved");

    let (status, _) = get_json(&server, "/api/admin/invites?kind=bogus", Some(&admin)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_validate_invite_always_answers_ok() {
    let server = TestServer::start().await;
    let token = server.admin_token("owner@acme.test");

    let (status, body) = post_json(
        &server,
        "/api/create-invite",
        Some(&token),
        json!({ "email": "New.Hire@Acme.test" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let code = body["invite"]["code"].as_str().unwrap().to_string();
    assert_eq!(body["invite"]["email"], "new.hire@acme.test");

    let (status, body) = post_json(
        &server,
        "/api/validate-invite",
        None,
        json!({ "code": code, "email": "NEW.HIRE@acme.test" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], true);
    assert_eq!(body["invite"]["email"], "new.hire@acme.test");

    let cases = [
        (json!({ "code": "12", "email": "new.hire@acme.test" }), "Invalid invite code format"),
        (json!({ "code": code }), "Email is required"),
        (json!({ "code": code, "email": "other@acme.test" }), "Invalid or expired invite code"),
    ];
    for (body, expected) in cases {
        let (status, resp) = post_json(&server, "/api/validate-invite", None, body).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(resp["valid"], false);
        assert_eq!(resp["error"], expected);
    }

    let past = (Utc::now() - Duration::hours(1)).to_rfc3339_opts(SecondsFormat::Micros, true);
    server
        .store
        .connection()
        .execute(
            "UPDATE invites SET expires_at = ?1 WHERE code = ?2",
            rusqlite::params![past, code],
        )
        .unwrap();

    let (status, body) = post_json(
        &server,
        "/api/validate-invite",
        None,
        json!({ "code": code, "email": "new.hire@acme.test" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], false);
    assert_eq!(body["error"], "Invalid or expired invite code");
}

#[tokio::test]
async fn test_create_invite_requires_session() {
    let server = TestServer::start().await;

    let (status, _) = post_json(
        &server,
        "/api/create-invite",
        None,
        json!({ "email": "a@acme.test" }),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let token = server.admin_token("owner@acme.test");
    let (status, body) = post_json(&server, "/api/create-invite", Some(&token), json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Email is required");

    let (status, body) = post_json(
        &server,
        "/api/create-invite",
        Some(&token),
        json!({ "email": "Owner@Acme.test" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "You cannot invite yourself");
}

#[tokio::test]
async fn test_demo_identity_cannot_invite_itself_out_of_demo() {
    let server = TestServer::start().await;
    let identity = server.identity("lurker@acme.test");
    let token = server.session_token(&identity.id);

    let (status, body) = post_json(
        &server,
        "/api/create-invite",
        Some(&token),
        json!({ "email": "lurker@acme.test" }),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Forbidden");

    // Demo users in the shared tenant are refused too.
    let (_, demo_token) = server.user("demo@acme.test", Role::Admin, true, false);
    let (status, _) = post_json(
        &server,
        "/api/create-invite",
        Some(&demo_token),
        json!({ "email": "friend@acme.test" }),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    assert!(invites::usable_for_email(server.store.as_ref(), "lurker@acme.test")
        .unwrap()
        .is_none());

    let (status, body) = post_json(&server, "/api/auth/setup", Some(&token), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": false, "demo": true }));
    assert!(server.store.get_user_by_identity(&identity.id).unwrap().is_none());
}

#[tokio::test]
async fn test_malformed_json_body_gets_error_envelope() {
    let server = TestServer::start().await;

    let resp = server
        .client()
        .post(server.url("/api/request-access"))
        .header(reqwest::header::CONTENT_TYPE, "application/json")
        .body("{\"email\": ")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.expect("json error body");
    assert_eq!(body["success"], false);
    assert!(body["error"].is_string());

    let resp = server
        .client()
        .post(server.url("/api/validate-invite"))
        .body("code=1234")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    let body: Value = resp.json().await.expect("json error body");
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_upgrade_flow_requires_super_admin() {
    let server = TestServer::start().await;
    let visitor = server.identity("visitor@acme.test");
    let visitor_token = server.session_token(&visitor.id);

    let (status, _) = post_json(&server, "/api/request-upgrade", None, json!({})).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = post_json(
        &server,
        "/api/request-upgrade",
        Some(&visitor_token),
        json!({ "companyName": "Visitor Goods" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let request_id = body["requestId"].as_str().unwrap().to_string();

    let (status, _) = post_json(
        &server,
        "/api/request-upgrade",
        Some(&visitor_token),
        json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let admin = server.admin_token("admin@acme.test");
    let (status, body) = post_json(
        &server,
        "/api/admin/approve-upgrade",
        Some(&admin),
        json!({ "requestId": request_id }),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Forbidden");

    let root = server.superadmin_token("root@stockyard.test");
    let (status, body) = get_json(&server, "/api/admin/upgrade-requests", Some(&root)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["requests"].as_array().unwrap().len(), 1);

    let (status, body) = post_json(
        &server,
        "/api/admin/approve-upgrade",
        Some(&root),
        json!({ "requestId": request_id }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let tenant_id = body["tenantId"].as_str().unwrap().to_string();

    let (status, body) = get_json(&server, "/api/me", Some(&visitor_token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tenant"]["id"], tenant_id.as_str());
    assert_eq!(body["tenant"]["name"], "Visitor Goods");
    assert_eq!(body["user"]["role"], "admin");
    assert_eq!(body["warehouses"][0]["name"], "Main Warehouse");

    let (status, body) = post_json(
        &server,
        "/api/admin/reject-upgrade",
        Some(&root),
        json!({ "requestId": request_id, "reason": "late" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Request has already been approved");
}

#[tokio::test]
async fn test_reject_upgrade_twice() {
    let server = TestServer::start().await;
    let visitor = server.identity("visitor@acme.test");
    let visitor_token = server.session_token(&visitor.id);
    let root = server.superadmin_token("root@stockyard.test");

    let (_, body) = post_json(&server, "/api/request-upgrade", Some(&visitor_token), json!({})).await;
    let request_id = body["requestId"].as_str().unwrap().to_string();

    let (status, body) = post_json(
        &server,
        "/api/admin/reject-upgrade",
        Some(&root),
        json!({ "requestId": request_id, "reason": "Not a business" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["message"], "Upgrade request rejected");

    let rejected = server.store.get_upgrade_request(&request_id).unwrap().unwrap();
    assert_eq!(rejected.rejection_reason.as_deref(), Some("Not a business"));

    let (status, body) = post_json(
        &server,
        "/api/admin/reject-upgrade",
        Some(&root),
        json!({ "requestId": request_id }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Request has already been rejected");

    let (status, _) = post_json(
        &server,
        "/api/admin/reject-upgrade",
        Some(&root),
        json!({ "requestId": "missing" }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_callback_failures_redirect_to_login() {
    let server = TestServer::start().await;
    let client = server.client();

    let resp = client.get(server.url("/auth/callback")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/login?error=missing_code");

    let resp = client
        .get(server.url("/auth/callback?code=deadbeef"))
        .send()
        .await
        .unwrap();
    assert_eq!(location(&resp), "/login?error=exchange_failed");
    assert!(resp.headers().get(SET_COOKIE).is_none());
}

#[tokio::test]
async fn test_callback_provisions_invited_identity() {
    let server = TestServer::start().await;
    invites::seed(
        server.store.as_ref(),
        "founder@acme.test",
        Some("Acme Supply"),
        Duration::days(7),
    )
    .unwrap();
    let code = server.login_code("founder@acme.test");

    let resp = server
        .client()
        .get(server.url(&format!("/auth/callback?code={code}&next=/inventory")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/inventory");

    let cookie = resp
        .headers()
        .get(SET_COOKIE)
        .expect("session cookie")
        .to_str()
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("sb-stockyard-auth-token="));
    assert!(cookie.contains("HttpOnly"));

    let identity = server
        .store
        .get_identity_by_email("founder@acme.test")
        .unwrap()
        .unwrap();
    let user = server.store.get_user_by_identity(&identity.id).unwrap().unwrap();
    let tenant = server.store.get_tenant(&user.tenant_id).unwrap().unwrap();
    assert_eq!(tenant.name, "Acme Supply");
    assert!(invites::usable_for_email(server.store.as_ref(), "founder@acme.test")
        .unwrap()
        .is_none());

    // Codes are single-use.
    let resp = server
        .client()
        .get(server.url(&format!("/auth/callback?code={code}")))
        .send()
        .await
        .unwrap();
    assert_eq!(location(&resp), "/login?error=exchange_failed");
}

#[tokio::test]
async fn test_callback_without_invite_lands_in_demo() {
    let server = TestServer::start().await;
    let code = server.login_code("curious@elsewhere.test");

    let resp = server
        .client()
        .get(server.url(&format!("/auth/callback?code={code}&next=//evil.test")))
        .send()
        .await
        .unwrap();
    assert_eq!(location(&resp), "/dashboard");
    assert!(resp.headers().get(SET_COOKIE).is_some());

    // Control characters never reach the Location header.
    let code = server.login_code("curious@elsewhere.test");
    let resp = server
        .client()
        .get(server.url(&format!(
            "/auth/callback?code={code}&next=/dash%0D%0ASet-Cookie:%20x=1"
        )))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/dashboard");
    assert!(resp.headers().get(SET_COOKIE).is_some());

    let identity = server
        .store
        .get_identity_by_email("curious@elsewhere.test")
        .unwrap()
        .unwrap();
    assert!(server.store.get_user_by_identity(&identity.id).unwrap().is_none());
}

#[tokio::test]
async fn test_setup_is_idempotent() {
    let server = TestServer::start().await;
    invites::seed(server.store.as_ref(), "owner@acme.test", None, Duration::days(1)).unwrap();
    let identity = server.identity("owner@acme.test");
    let token = server.session_token(&identity.id);

    let (status, body) = post_json(&server, "/api/auth/setup", Some(&token), json!({})).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["success"], true);
    assert!(body["tenantId"].is_string());

    let (status, body) = post_json(&server, "/api/auth/setup", Some(&token), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": false, "alreadyExists": true }));

    let (status, _) = post_json(&server, "/api/auth/setup", None, json!({})).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_create_demo_account() {
    let server = TestServer::start().await;
    let identity = server.identity("trial@acme.test");
    let token = server.session_token(&identity.id);

    let (status, body) = post_json(
        &server,
        "/api/create-demo-account",
        Some(&token),
        json!({ "email": "trial@acme.test" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "userId is required");

    let (status, _) = post_json(
        &server,
        "/api/create-demo-account",
        None,
        json!({ "userId": identity.id, "email": "trial@acme.test" }),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = post_json(
        &server,
        "/api/create-demo-account",
        Some(&token),
        json!({ "userId": "someone-else", "email": "trial@acme.test" }),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = post_json(
        &server,
        "/api/create-demo-account",
        Some(&token),
        json!({ "userId": identity.id, "email": "trial@acme.test" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["hasFullAccess"], false);
    assert!(server.store.get_identity(&identity.id).unwrap().unwrap().is_demo);

    let (status, body) = get_json(&server, "/api/me", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isDemo"], true);
    assert!(body["user"].is_null());
}

#[tokio::test]
async fn test_session_gate_redirects() {
    let server = TestServer::start().await;
    let client = server.client();

    let resp = client.get(server.url("/inventory/items")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/login?next=%2Finventory%2Fitems");

    let resp = client.get(server.url("/login")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let identity = server.identity("member@acme.test");
    let token = server.session_token(&identity.id);
    let cookie = format!("{}={}", server.config.session_cookie_name(), token);

    let resp = client
        .get(server.url("/dashboard"))
        .header(COOKIE, &cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client
        .get(server.url("/login"))
        .header(COOKIE, &cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/dashboard");

    let resp = client
        .get(server.url("/login?error=setup_failed"))
        .header(COOKIE, &cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    // A stale cookie is treated as no session at all.
    let resp = client
        .get(server.url("/dashboard"))
        .header(COOKIE, "sb-stockyard-auth-token=sy_stale_value")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_otp_and_logout() {
    let server = TestServer::start().await;

    let (status, body) = post_json(
        &server,
        "/api/auth/otp",
        None,
        json!({ "email": "  Someone@Acme.test " }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(server
        .store
        .get_identity_by_email("someone@acme.test")
        .unwrap()
        .is_some());

    let (status, _) = post_json(&server, "/api/auth/otp", None, json!({ "email": "nope" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let identity = server.identity("leaving@acme.test");
    let token = server.session_token(&identity.id);
    let (status, _) = get_json(&server, "/api/me", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);

    let resp = server
        .client()
        .post(server.url("/api/auth/logout"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let cleared = resp.headers().get(SET_COOKIE).unwrap().to_str().unwrap();
    assert!(cleared.contains("Max-Age=0"));

    let (status, _) = get_json(&server, "/api/me", Some(&token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
