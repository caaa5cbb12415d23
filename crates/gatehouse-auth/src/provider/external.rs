//! Providers backed by a third-party code exchange.
//!
//! The exchange turns a one-time code into a stable external id; this
//! module owns the shared find-or-create and link flow.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use gatehouse_core::error::ErrorKind;
use gatehouse_core::result::AppResult;
use gatehouse_database::CredentialStore;
use gatehouse_entity::{CreateUser, User, UserIdentity};

use super::LoginProvider;

/// What a successful exchange yields.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalIdentity {
    /// Stable id within the provider, used as the identity's open id.
    pub open_id: String,
    /// Username to create or adopt when the identity is new.
    pub username: String,
    /// Display name, when the provider supplies one.
    pub name: Option<String>,
    /// Avatar URL, when the provider supplies one.
    pub avatar: Option<String>,
    /// Profile payload stored with the identity.
    pub data: Option<serde_json::Value>,
}

/// A third-party code exchange.
#[async_trait]
pub trait IdentityExchange: Send + Sync + 'static {
    /// Provider key the resulting identities are stored under.
    fn provider_name(&self) -> &str;

    /// Exchange raw request credentials for an external identity.
    async fn exchange(&self, credentials: &[u8]) -> AppResult<ExternalIdentity>;
}

/// [`LoginProvider`] that links external identities to local users.
pub struct ExternalIdentityProvider<E> {
    exchange: E,
    store: Arc<dyn CredentialStore>,
}

impl<E: IdentityExchange> ExternalIdentityProvider<E> {
    /// Wrap an exchange client.
    pub fn new(exchange: E, store: Arc<dyn CredentialStore>) -> Self {
        Self { exchange, store }
    }

    /// Find the user named `identity.username`, creating it when absent.
    async fn find_or_create_user(&self, identity: &ExternalIdentity) -> AppResult<User> {
        match self.store.find_user_by_username(&identity.username).await {
            Ok(user) => return Ok(user),
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }

        let create = CreateUser {
            username: identity.username.clone(),
            name: identity.name.clone().unwrap_or_default(),
            avatar: identity.avatar.clone(),
        };
        match self.store.create_user(create).await {
            Ok(user) => Ok(user),
            // Lost a race with a concurrent first login.
            Err(e) if e.kind == ErrorKind::SaveConflict => {
                self.store.find_user_by_username(&identity.username).await
            }
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl<E: IdentityExchange> LoginProvider for ExternalIdentityProvider<E> {
    fn name(&self) -> &str {
        self.exchange.provider_name()
    }

    async fn login(&self, credentials: &[u8]) -> AppResult<User> {
        let identity = self.exchange.exchange(credentials).await?;
        let provider = self.exchange.provider_name();

        match self.store.find_user_by_open_id(provider, &identity.open_id).await {
            Ok(user) => {
                if let Some(data) = identity.data.clone() {
                    if let Err(e) = self
                        .store
                        .update_identity_data(provider, &identity.open_id, data)
                        .await
                    {
                        warn!(provider, user_id = user.id, error = %e, "Failed to refresh identity data");
                    }
                }
                return Ok(user);
            }
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }

        let user = self.find_or_create_user(&identity).await?;
        let link = UserIdentity {
            user_id: user.id,
            provider: provider.to_string(),
            open_id: identity.open_id.clone(),
            data: identity.data,
        };
        match self.store.create_identity(link).await {
            Ok(_) => {
                info!(provider, user_id = user.id, open_id = %identity.open_id, "External identity linked");
                Ok(user)
            }
            Err(e) if e.kind == ErrorKind::SaveConflict => {
                self.store
                    .find_user_by_open_id(provider, &identity.open_id)
                    .await
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use gatehouse_core::error::AppError;
    use gatehouse_database::MemoryCredentialStore;

    use super::*;

    struct StubExchange;

    #[async_trait]
    impl IdentityExchange for StubExchange {
        fn provider_name(&self) -> &str {
            "stub"
        }

        async fn exchange(&self, credentials: &[u8]) -> AppResult<ExternalIdentity> {
            let code = std::str::from_utf8(credentials)
                .map_err(|_| AppError::validation("bad code"))?;
            if code == "expired" {
                return Err(AppError::external_service("code expired"));
            }
            Ok(ExternalIdentity {
                open_id: format!("{code}@app"),
                username: format!("{code}@stub"),
                name: Some(code.to_string()),
                avatar: None,
                data: Some(serde_json::json!({ "code": code })),
            })
        }
    }

    #[tokio::test]
    async fn test_first_login_creates_and_links() {
        let store = Arc::new(MemoryCredentialStore::new());
        let provider = ExternalIdentityProvider::new(StubExchange, store.clone());

        let first = provider.login(b"abc").await.unwrap();
        assert_eq!(first.username, "abc@stub");
        assert_eq!(first.name, "abc");

        let again = provider.login(b"abc").await.unwrap();
        assert_eq!(again.id, first.id);

        let identity = store.find_identity("stub", "abc@app").await.unwrap();
        assert_eq!(identity.user_id, first.id);
    }

    #[tokio::test]
    async fn test_adopts_existing_username() {
        let store = Arc::new(MemoryCredentialStore::new());
        let existing = store
            .create_user(CreateUser::named("xyz@stub"))
            .await
            .unwrap();

        let provider = ExternalIdentityProvider::new(StubExchange, store);
        assert_eq!(provider.login(b"xyz").await.unwrap().id, existing.id);
    }

    #[tokio::test]
    async fn test_exchange_errors_pass_through() {
        let store = Arc::new(MemoryCredentialStore::new());
        let provider = ExternalIdentityProvider::new(StubExchange, store);
        let err = provider.login(b"expired").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::ExternalService);
    }
}
