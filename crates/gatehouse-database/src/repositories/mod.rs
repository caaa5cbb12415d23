//! PostgreSQL repositories and the store that composes them.

pub mod identity;
pub mod token;
pub mod user;

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;

use gatehouse_core::error::{AppError, ErrorKind};
use gatehouse_core::result::AppResult;
use gatehouse_entity::{CreateUser, NewToken, Token, User, UserIdentity};

use crate::store::CredentialStore;

pub use identity::IdentityRepository;
pub use token::TokenRepository;
pub use user::UserRepository;

/// Classify a failed insert: unique violations are conflicts, the rest are
/// backend failures.
pub(crate) fn map_write_error(err: sqlx::Error, context: &str) -> AppError {
    let conflict = err
        .as_database_error()
        .is_some_and(|db| db.is_unique_violation());
    let kind = if conflict {
        ErrorKind::SaveConflict
    } else {
        ErrorKind::Database
    };
    AppError::with_source(kind, context.to_string(), err)
}

/// [`CredentialStore`] backed by PostgreSQL.
#[derive(Debug, Clone)]
pub struct PgCredentialStore {
    users: UserRepository,
    identities: IdentityRepository,
    tokens: TokenRepository,
}

impl PgCredentialStore {
    /// Build the store over an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self {
            users: UserRepository::new(pool.clone()),
            identities: IdentityRepository::new(pool.clone()),
            tokens: TokenRepository::new(pool),
        }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_user_by_id(&self, id: i64) -> AppResult<User> {
        self.users
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("User {id} not found")))
    }

    async fn find_user_by_username(&self, username: &str) -> AppResult<User> {
        self.users
            .find_by_username(username)
            .await?
            .ok_or_else(|| AppError::not_found(format!("User '{username}' not found")))
    }

    async fn create_user(&self, user: CreateUser) -> AppResult<User> {
        let created = self.users.create(&user).await?;
        debug!(user_id = created.id, username = %created.username, "User created");
        Ok(created)
    }

    async fn find_identity(&self, provider: &str, open_id: &str) -> AppResult<UserIdentity> {
        self.identities
            .find(provider, open_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Identity {provider}/{open_id} not found")))
    }

    async fn create_identity(&self, identity: UserIdentity) -> AppResult<UserIdentity> {
        if identity.user_id <= 0 {
            return Err(AppError::validation("Identity requires an owning user"));
        }
        self.identities.create(&identity).await
    }

    async fn update_identity_data(
        &self,
        provider: &str,
        open_id: &str,
        data: serde_json::Value,
    ) -> AppResult<()> {
        match self.identities.update_data(provider, open_id, &data).await? {
            0 => Err(AppError::not_found(format!(
                "Identity {provider}/{open_id} not found"
            ))),
            _ => Ok(()),
        }
    }

    async fn find_token_by_id(&self, id: i64) -> AppResult<Token> {
        self.tokens
            .find_live_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Token {id} not found")))
    }

    async fn create_token(&self, token: NewToken) -> AppResult<Token> {
        self.tokens.create(&token).await
    }

    async fn delete_token(&self, user_id: i64, device: &str) -> AppResult<u64> {
        self.tokens.soft_delete(user_id, device).await
    }
}
