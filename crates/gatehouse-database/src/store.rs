//! Credential store contract.

use async_trait::async_trait;

use gatehouse_core::result::AppResult;
use gatehouse_entity::{CreateUser, NewToken, Token, User, UserIdentity};

/// Durable lookup and creation of users, identities, and refresh-token rows.
///
/// Every lookup reports a missing row as [`ErrorKind::NotFound`] so callers
/// can tell "absent" apart from a failing backend. Each method is atomic on
/// its own; no multi-call transaction is offered.
///
/// [`ErrorKind::NotFound`]: gatehouse_core::error::ErrorKind::NotFound
#[async_trait]
pub trait CredentialStore: Send + Sync + 'static {
    /// Find a user by primary key.
    async fn find_user_by_id(&self, id: i64) -> AppResult<User>;

    /// Find a user by unique username.
    async fn find_user_by_username(&self, username: &str) -> AppResult<User>;

    /// Create a user. A taken username is a `SaveConflict`.
    async fn create_user(&self, user: CreateUser) -> AppResult<User>;

    /// Find the identity bound to `(provider, open_id)`.
    async fn find_identity(&self, provider: &str, open_id: &str) -> AppResult<UserIdentity>;

    /// Link an identity to a user. A taken `(provider, open_id)` is a
    /// `SaveConflict`.
    async fn create_identity(&self, identity: UserIdentity) -> AppResult<UserIdentity>;

    /// Replace an identity's payload.
    async fn update_identity_data(
        &self,
        provider: &str,
        open_id: &str,
        data: serde_json::Value,
    ) -> AppResult<()>;

    /// Find a live (not deleted) refresh-token row.
    async fn find_token_by_id(&self, id: i64) -> AppResult<Token>;

    /// Persist a refresh-token row and return it with its assigned id.
    async fn create_token(&self, token: NewToken) -> AppResult<Token>;

    /// Delete every live row for `(user_id, device)`. Returns the count.
    async fn delete_token(&self, user_id: i64, device: &str) -> AppResult<u64>;

    /// Resolve the user an identity points at.
    async fn find_user_by_open_id(&self, provider: &str, open_id: &str) -> AppResult<User> {
        let identity = self.find_identity(provider, open_id).await?;
        self.find_user_by_id(identity.user_id).await
    }
}
