//! Integration tests for the login, renewal, and logout flows.

mod helpers;

use http::StatusCode;

use helpers::TestApp;

#[tokio::test]
async fn test_login_without_remember() {
    let app = TestApp::new().await;
    app.create_test_user("alice").await;

    let response = app.login("alice", false, "web").await;

    assert_eq!(response.status, StatusCode::OK);
    let token = response.field("token").expect("token in body");
    assert!(!token.is_empty());
    assert!(response.body.get("refresh_token").is_none());
    assert_eq!(response.set_cookie("jwt").as_deref(), Some(token));
    assert!(response.set_cookie("refresh_token").is_none());
}

#[tokio::test]
async fn test_login_with_remember_sets_both_cookies() {
    let app = TestApp::new().await;
    let alice = app.create_test_user("alice").await;

    let response = app.login("alice", true, "phone").await;

    assert_eq!(response.status, StatusCode::OK);
    let refresh = response.field("refresh_token").expect("refresh token in body");
    assert!(response.body.get("refresh_token_expires").is_some());
    assert_eq!(response.set_cookie("refresh_token").as_deref(), Some(refresh));
    assert_eq!(app.store.live_tokens(alice.id, "phone").len(), 1);
}

#[tokio::test]
async fn test_login_wrong_password() {
    let app = TestApp::new().await;
    app.create_test_user("alice").await;

    let response = app
        .request(
            "POST",
            "/api/auth/login?provider=password&device=web",
            Some(serde_json::json!({ "username": "alice", "password": "wrongpw" })),
            None,
            &[],
        )
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.field("error"), Some("CREDENTIAL_REJECTED"));
}

#[tokio::test]
async fn test_login_nonexistent_user_looks_like_wrong_password() {
    let app = TestApp::new().await;
    app.create_test_user("alice").await;

    let missing = app.login("nobody", false, "web").await;
    let wrong = app
        .request(
            "POST",
            "/api/auth/login?provider=password",
            Some(serde_json::json!({ "username": "alice", "password": "Wr0ng!Passw0rd" })),
            None,
            &[],
        )
        .await;

    assert_eq!(missing.status, StatusCode::UNAUTHORIZED);
    assert_eq!(missing.body, wrong.body);
}

#[tokio::test]
async fn test_login_unknown_provider() {
    let app = TestApp::new().await;

    let response = app
        .request(
            "POST",
            "/api/auth/login?provider=carrier_pigeon",
            Some(serde_json::json!({})),
            None,
            &[],
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.field("error"), Some("UNKNOWN_PROVIDER"));
}

#[tokio::test]
async fn test_me_requires_authentication() {
    let app = TestApp::new().await;
    app.create_test_user("alice").await;

    let anonymous = app.request("GET", "/api/auth/me", None, None, &[]).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let login = app.login("alice", false, "web").await;
    let token = login.field("token").unwrap().to_string();

    let me = app
        .request("GET", "/api/auth/me", None, Some(&token), &[])
        .await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.field("username"), Some("alice"));

    let by_cookie = app
        .request("GET", "/api/auth/session", None, None, &[("jwt", &token)])
        .await;
    assert_eq!(by_cookie.status, StatusCode::OK);
    assert_eq!(by_cookie.body["user_id"], me.body["id"]);
}

#[tokio::test]
async fn test_renew_from_body_and_cookie() {
    let app = TestApp::new().await;
    app.create_test_user("alice").await;
    let login = app.login("alice", true, "phone").await;
    let refresh = login.field("refresh_token").unwrap().to_string();

    let via_body = app
        .request(
            "PUT",
            "/api/auth/login",
            Some(serde_json::json!({ "refresh_token": refresh })),
            None,
            &[],
        )
        .await;
    assert_eq!(via_body.status, StatusCode::OK);
    assert!(via_body.field("token").is_some());
    assert!(via_body.body.get("refresh_token").is_none());
    assert!(via_body.set_cookie("jwt").is_some());

    let via_cookie = app
        .request(
            "POST",
            "/api/auth/renew",
            None,
            None,
            &[("refresh_token", &refresh)],
        )
        .await;
    assert_eq!(via_cookie.status, StatusCode::OK);
    assert!(via_cookie.field("token").is_some());
}

#[tokio::test]
async fn test_renew_rejects_garbage() {
    let app = TestApp::new().await;

    let response = app
        .request(
            "POST",
            "/api/auth/renew",
            Some(serde_json::json!({ "refresh_token": "not-a-token" })),
            None,
            &[],
        )
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.field("error"), Some("INVALID_TOKEN"));

    let malformed = app
        .request("POST", "/api/auth/renew", Some(serde_json::json!([1, 2])), None, &[])
        .await;
    assert_eq!(malformed.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_refresh_cookie_renews_access_implicitly() {
    let app = TestApp::new().await;
    app.create_test_user("alice").await;
    let login = app.login("alice", true, "phone").await;
    let refresh = login.field("refresh_token").unwrap().to_string();

    let me = app
        .request(
            "GET",
            "/api/auth/me",
            None,
            None,
            &[("jwt", "expired.or.bogus"), ("refresh_token", &refresh)],
        )
        .await;

    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.field("username"), Some("alice"));
    let renewed = me.set_cookie("jwt").expect("renewed access cookie");
    assert!(app.sessions.verify_access_token(&renewed).is_ok());
}

#[tokio::test]
async fn test_bad_credentials_are_cleared() {
    let app = TestApp::new().await;

    let response = app
        .request(
            "GET",
            "/api/auth/session",
            None,
            None,
            &[("jwt", "bogus"), ("refresh_token", "bogus")],
        )
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.set_cookie("jwt").as_deref(), Some(""));
    assert_eq!(response.set_cookie("refresh_token").as_deref(), Some(""));
}

#[tokio::test]
async fn test_logout_revokes_tokens() {
    let app = TestApp::new().await;
    let alice = app.create_test_user("alice").await;
    let login = app.login("alice", true, "phone").await;
    let token = login.field("token").unwrap().to_string();
    let refresh = login.field("refresh_token").unwrap().to_string();

    let logout = app
        .request("DELETE", "/api/auth/login?device=phone", None, Some(&token), &[])
        .await;
    assert_eq!(logout.status, StatusCode::OK);
    assert_eq!(logout.field("message"), Some("Logged out"));
    assert_eq!(logout.set_cookie("jwt").as_deref(), Some(""));
    assert_eq!(logout.set_cookie("refresh_token").as_deref(), Some(""));
    assert!(app.store.live_tokens(alice.id, "phone").is_empty());

    let me = app
        .request("GET", "/api/auth/me", None, Some(&token), &[])
        .await;
    assert_eq!(me.status, StatusCode::UNAUTHORIZED);

    let renew = app
        .request(
            "PUT",
            "/api/auth/login",
            Some(serde_json::json!({ "refresh_token": refresh })),
            None,
            &[],
        )
        .await;
    assert_eq!(renew.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_when_not_logged_in() {
    let app = TestApp::new().await;

    let response = app
        .request("POST", "/api/auth/logout?device=web", None, None, &[])
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.field("message"), Some("Not logged in"));
}

#[tokio::test]
async fn test_health_lists_providers() {
    let app = TestApp::new().await;

    let response = app.request("GET", "/api/health", None, None, &[]).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.field("status"), Some("ok"));
    assert_eq!(response.body["providers"], serde_json::json!(["password"]));
}
