//! Application state shared across all handlers and middleware.

use std::sync::Arc;

use gatehouse_auth::{RequestAuthenticator, SessionService};
use gatehouse_core::config::AppConfig;

/// Passed to every Axum handler via `State<AppState>`.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Login, renewal, and logout
    pub sessions: Arc<SessionService>,
    /// Request authentication stages
    pub authenticator: RequestAuthenticator,
}

impl AppState {
    /// Create state around a session service.
    pub fn new(config: Arc<AppConfig>, sessions: Arc<SessionService>) -> Self {
        let authenticator = RequestAuthenticator::new(Arc::clone(&sessions));
        Self {
            config,
            sessions,
            authenticator,
        }
    }

    /// Whether session cookies carry the `Secure` attribute.
    pub fn secure_cookies(&self) -> bool {
        self.config.session.cookie_secure
    }
}
