//! Shared test helpers for integration tests.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use http::header::{AUTHORIZATION, CONTENT_TYPE, COOKIE, SET_COOKIE};
use http::{HeaderMap, Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use gatehouse_api::AppState;
use gatehouse_auth::provider::password::PROVIDER_NAME;
use gatehouse_auth::{PasswordProvider, SessionService};
use gatehouse_core::config::AppConfig;
use gatehouse_database::{CredentialStore, MemoryCredentialStore};
use gatehouse_entity::User;

/// Password that satisfies the strength policy.
pub const STRONG_PASSWORD: &str = "Str0ng!Passw0rd";

/// Test application context
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    /// Session service behind the router
    pub sessions: Arc<SessionService>,
    /// Password provider, for registering users directly
    pub passwords: Arc<PasswordProvider>,
    /// Backing store
    pub store: MemoryCredentialStore,
}

impl TestApp {
    /// Create a new test application on an in-memory store
    pub async fn new() -> Self {
        let mut config = AppConfig::default();
        config.auth.bcrypt_cost = 4;
        config.auth.secret_key = "integration-test-secret".to_string();

        let store = MemoryCredentialStore::new();
        let shared: Arc<dyn CredentialStore> = Arc::new(store.clone());

        let sessions = Arc::new(SessionService::new(
            Arc::clone(&shared),
            &config.auth,
            &config.session,
        ));
        let passwords = Arc::new(PasswordProvider::new(shared, &config.auth));
        sessions
            .register_provider(PROVIDER_NAME, passwords.clone())
            .await;

        let state = AppState::new(Arc::new(config), Arc::clone(&sessions));
        let router = gatehouse_api::build_app(state);

        Self {
            router,
            sessions,
            passwords,
            store,
        }
    }

    /// Create a password user
    pub async fn create_test_user(&self, username: &str) -> User {
        self.passwords
            .register(username, STRONG_PASSWORD, None)
            .await
            .expect("Failed to create test user")
    }

    /// Log in with the password provider and return the response
    pub async fn login(&self, username: &str, remember: bool, device: &str) -> TestResponse {
        let uri = format!(
            "/api/auth/login?provider=password&device={device}&remember={}",
            if remember { "1" } else { "0" }
        );
        let body = serde_json::json!({ "username": username, "password": STRONG_PASSWORD });
        self.request("POST", &uri, Some(body), None, &[]).await
    }

    /// Make an HTTP request to the test app
    pub async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        token: Option<&str>,
        cookies: &[(&str, &str)],
    ) -> TestResponse {
        let body_str = body
            .map(|b| serde_json::to_string(&b).expect("Failed to serialize body"))
            .unwrap_or_default();

        let mut req = Request::builder()
            .method(method)
            .uri(path)
            .header(CONTENT_TYPE, "application/json");

        if let Some(token) = token {
            req = req.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        if !cookies.is_empty() {
            let header = cookies
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("; ");
            req = req.header(COOKIE, header);
        }

        let req = req
            .body(Body::from(body_str))
            .expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let body_bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("Failed to read body");

        let body: Value = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

        TestResponse {
            status,
            headers,
            body,
        }
    }
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Response headers
    pub headers: HeaderMap,
    /// Parsed JSON body
    pub body: Value,
}

impl TestResponse {
    /// String field of the JSON body
    pub fn field(&self, name: &str) -> Option<&str> {
        self.body.get(name).and_then(Value::as_str)
    }

    /// Value of the `Set-Cookie` header for `name`, if any
    pub fn set_cookie(&self, name: &str) -> Option<String> {
        let prefix = format!("{name}=");
        self.headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find(|v| v.starts_with(&prefix))
            .map(|v| {
                v[prefix.len()..]
                    .split(';')
                    .next()
                    .unwrap_or_default()
                    .to_string()
            })
    }
}
