//! End-to-end DingTalk login against a local stand-in for the open API.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::Json;
use axum::Router;
use axum::extract::{Query, State};
use axum::routing::get;
use serde_json::{Value, json};

use gatehouse_auth::LoginProvider;
use gatehouse_core::config::DingtalkConfig;
use gatehouse_core::error::ErrorKind;
use gatehouse_database::{CredentialStore, MemoryCredentialStore};
use gatehouse_entity::CreateUser;

#[derive(Default)]
struct Stub {
    tokens_issued: AtomicUsize,
    busy_calls: AtomicUsize,
}

type Params = Query<HashMap<String, String>>;

fn param<'a>(params: &'a HashMap<String, String>, key: &str) -> &'a str {
    params.get(key).map(String::as_str).unwrap_or_default()
}

async fn gettoken(State(stub): State<Arc<Stub>>, Query(params): Params) -> Json<Value> {
    if param(&params, "appkey") != "ding-key" || param(&params, "appsecret") != "shh" {
        return Json(json!({"errcode": 40089, "errmsg": "invalid appkey or appsecret"}));
    }
    let n = stub.tokens_issued.fetch_add(1, Ordering::SeqCst) + 1;
    Json(json!({"errcode": 0, "access_token": format!("t{n}"), "expires_in": 7200}))
}

async fn getuserinfo(State(stub): State<Arc<Stub>>, Query(params): Params) -> Json<Value> {
    match (param(&params, "code"), param(&params, "access_token")) {
        ("rotate", "t1") => Json(json!({"errcode": 42001, "errmsg": "access_token expired"})),
        ("rotate", _) | ("alice", _) => Json(json!({"errcode": 0, "userid": "u-alice"})),
        ("bob", _) => Json(json!({"errcode": 0, "userid": "u-bob"})),
        ("busy", _) => {
            stub.busy_calls.fetch_add(1, Ordering::SeqCst);
            Json(json!({"errcode": -1, "errmsg": "system busy"}))
        }
        _ => Json(json!({"errcode": 40078, "errmsg": "code does not exist"})),
    }
}

async fn user_get(Query(params): Params) -> Json<Value> {
    match param(&params, "userid") {
        "u-alice" => Json(json!({
            "errcode": 0,
            "userid": "u-alice",
            "name": "Alice",
            "mobile": "13800000001",
            "avatar": "https://img.example.com/alice.png",
            "department": [1]
        })),
        "u-bob" => Json(json!({"errcode": 0, "userid": "u-bob", "name": "Bob", "mobile": "13800000002"})),
        _ => Json(json!({"errcode": 60121, "errmsg": "user not found"})),
    }
}

async fn spawn_stub() -> (String, Arc<Stub>) {
    let stub = Arc::new(Stub::default());
    let app = Router::new()
        .route("/gettoken", get(gettoken))
        .route("/user/getuserinfo", get(getuserinfo))
        .route("/user/get", get(user_get))
        .with_state(Arc::clone(&stub));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), stub)
}

fn config(api_base: String) -> DingtalkConfig {
    DingtalkConfig {
        app_key: "ding-key".to_string(),
        app_secret: "shh".to_string(),
        api_base,
        timeout_seconds: 5,
    }
}

#[tokio::test]
async fn test_login_creates_user_once() {
    let (base, stub) = spawn_stub().await;
    let store = Arc::new(MemoryCredentialStore::new());
    let provider = gatehouse_provider_dingtalk::provider(&config(base), store.clone()).unwrap();
    assert_eq!(provider.name(), "dingtalk");

    let first = provider.login(br#"{"code":"alice"}"#).await.unwrap();
    assert_eq!(first.username, "13800000001@telephone");
    assert_eq!(first.name, "Alice");
    assert_eq!(first.avatar, "https://img.example.com/alice.png");

    let second = provider.login(br#"{"Code":"alice"}"#).await.unwrap();
    assert_eq!(second.id, first.id);

    let identity = store.find_identity("dingtalk", "u-alice").await.unwrap();
    assert_eq!(identity.user_id, first.id);
    assert_eq!(identity.data.unwrap()["mobile"], "13800000001");

    // The access token is cached across calls.
    assert_eq!(stub.tokens_issued.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_existing_mobile_user_is_linked() {
    let (base, _stub) = spawn_stub().await;
    let store = Arc::new(MemoryCredentialStore::new());
    let existing = store
        .create_user(CreateUser {
            username: "13800000002@telephone".to_string(),
            name: "Robert".to_string(),
            avatar: None,
        })
        .await
        .unwrap();

    let provider = gatehouse_provider_dingtalk::provider(&config(base), store.clone()).unwrap();
    let user = provider.login(br#"{"code":"bob"}"#).await.unwrap();
    assert_eq!(user.id, existing.id);
    assert_eq!(user.name, "Robert");

    let identity = store.find_identity("dingtalk", "u-bob").await.unwrap();
    assert_eq!(identity.user_id, existing.id);
}

#[tokio::test]
async fn test_stale_token_is_refreshed() {
    let (base, stub) = spawn_stub().await;
    let store = Arc::new(MemoryCredentialStore::new());
    let provider = gatehouse_provider_dingtalk::provider(&config(base), store).unwrap();

    let user = provider.login(br#"{"code":"rotate"}"#).await.unwrap();
    assert_eq!(user.username, "13800000001@telephone");
    assert_eq!(stub.tokens_issued.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_busy_server_retried_then_fails() {
    let (base, stub) = spawn_stub().await;
    let store = Arc::new(MemoryCredentialStore::new());
    let provider = gatehouse_provider_dingtalk::provider(&config(base), store).unwrap();

    let err = provider.login(br#"{"code":"busy"}"#).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::ExternalService);
    assert_eq!(stub.busy_calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_rejected_code_is_external_error() {
    let (base, _stub) = spawn_stub().await;
    let store = Arc::new(MemoryCredentialStore::new());
    let provider = gatehouse_provider_dingtalk::provider(&config(base.clone()), store.clone()).unwrap();

    let err = provider.login(br#"{"code":"bad"}"#).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::ExternalService);

    let err = provider.login(b"not json").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);

    let mut wrong_secret = config(base);
    wrong_secret.app_secret = "nope".to_string();
    let provider = gatehouse_provider_dingtalk::provider(&wrong_secret, store).unwrap();
    let err = provider.login(br#"{"code":"alice"}"#).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::ExternalService);
}
