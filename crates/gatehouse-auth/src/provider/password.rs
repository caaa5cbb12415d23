//! Username/password provider.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use gatehouse_core::config::AuthConfig;
use gatehouse_core::error::AppError;
use gatehouse_core::result::AppResult;
use gatehouse_database::CredentialStore;
use gatehouse_entity::{CreateUser, User, UserIdentity};

use super::LoginProvider;
use crate::blocking::run_blocking;
use crate::password::{PasswordHasher, PasswordValidator};

/// Registry key of the password provider.
pub const PROVIDER_NAME: &str = "password";

/// Login request body.
#[derive(Debug, Clone, Deserialize)]
pub struct PasswordCredentials {
    /// Username, which doubles as the identity's open id.
    pub username: String,
    /// Plaintext password.
    pub password: String,
}

/// Identity payload stored for password logins.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PasswordData {
    password_hash: String,
}

/// Verifies usernames and passwords against stored bcrypt hashes.
pub struct PasswordProvider {
    store: Arc<dyn CredentialStore>,
    hasher: PasswordHasher,
    validator: PasswordValidator,
}

impl std::fmt::Debug for PasswordProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordProvider")
            .field("hasher", &self.hasher)
            .field("validator", &self.validator)
            .finish()
    }
}

impl PasswordProvider {
    /// Create the provider from auth configuration.
    pub fn new(store: Arc<dyn CredentialStore>, config: &AuthConfig) -> Self {
        Self {
            store,
            hasher: PasswordHasher::new(config.secret_key.clone(), config.bcrypt_cost),
            validator: PasswordValidator::new(config),
        }
    }

    /// Register a password identity.
    ///
    /// With `bind_user_id` the identity is attached to that existing user;
    /// otherwise a new user named `username` is created. The password must
    /// pass the strength policy before anything is written.
    pub async fn register(
        &self,
        username: &str,
        password: &str,
        bind_user_id: Option<i64>,
    ) -> AppResult<User> {
        if username.trim().is_empty() {
            return Err(AppError::validation("Username must not be empty"));
        }
        self.validator.validate(password)?;
        let hash = self.hash(password).await?;

        let user = match bind_user_id {
            Some(id) => self.store.find_user_by_id(id).await?,
            None => self.store.create_user(CreateUser::named(username)).await?,
        };

        self.store
            .create_identity(UserIdentity {
                user_id: user.id,
                provider: PROVIDER_NAME.to_string(),
                open_id: username.to_string(),
                data: Some(serde_json::to_value(PasswordData {
                    password_hash: hash,
                })?),
            })
            .await?;

        info!(user_id = user.id, username = %username, "Password identity registered");
        Ok(user)
    }

    /// Replace the password of an existing identity.
    pub async fn set_password(&self, username: &str, password: &str) -> AppResult<()> {
        self.validator.validate(password)?;
        self.store.find_identity(PROVIDER_NAME, username).await?;

        let hash = self.hash(password).await?;
        self.store
            .update_identity_data(
                PROVIDER_NAME,
                username,
                serde_json::to_value(PasswordData {
                    password_hash: hash,
                })?,
            )
            .await?;

        info!(username = %username, "Password updated");
        Ok(())
    }

    async fn hash(&self, password: &str) -> AppResult<String> {
        let hasher = self.hasher.clone();
        let password = password.to_string();
        run_blocking(move || hasher.hash_password(&password)).await?
    }

    async fn verify(&self, password: &str, hash: String) -> AppResult<bool> {
        let hasher = self.hasher.clone();
        let password = password.to_string();
        run_blocking(move || hasher.verify_password(&password, &hash)).await
    }
}

/// Collapse a missing row into the generic credential failure.
fn reject_missing(err: AppError) -> AppError {
    if err.is_not_found() {
        AppError::credential_rejected()
    } else {
        err
    }
}

#[async_trait]
impl LoginProvider for PasswordProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn login(&self, credentials: &[u8]) -> AppResult<User> {
        let credentials: PasswordCredentials = serde_json::from_slice(credentials)
            .map_err(|_| AppError::validation("Expected JSON body with username and password"))?;

        let identity = self
            .store
            .find_identity(PROVIDER_NAME, &credentials.username)
            .await
            .map_err(reject_missing)?;

        let Some(data) = identity.decode_data::<PasswordData>() else {
            debug!(user_id = identity.user_id, "Password identity payload unreadable");
            return Err(AppError::credential_rejected());
        };

        if !self.verify(&credentials.password, data.password_hash).await? {
            return Err(AppError::credential_rejected());
        }

        self.store
            .find_user_by_id(identity.user_id)
            .await
            .map_err(reject_missing)
    }
}
