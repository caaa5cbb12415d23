//! In-memory credential store.
//!
//! Suitable for tests and single-node development. Deleted tokens are
//! dropped outright rather than soft-deleted.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::debug;

use gatehouse_core::error::AppError;
use gatehouse_core::result::AppResult;
use gatehouse_entity::{CreateUser, NewToken, Token, User, UserIdentity};

use crate::store::CredentialStore;

/// [`CredentialStore`] held entirely in process memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryCredentialStore {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    users: DashMap<i64, User>,
    usernames: DashMap<String, i64>,
    identities: DashMap<(String, String), UserIdentity>,
    tokens: DashMap<i64, Token>,
    next_user_id: AtomicI64,
    next_token_id: AtomicI64,
}

impl MemoryCredentialStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ids of the live tokens for a `(user, device)` pair.
    pub fn live_tokens(&self, user_id: i64, device: &str) -> Vec<i64> {
        let mut ids: Vec<i64> = self
            .inner
            .tokens
            .iter()
            .filter(|t| t.user_id == user_id && t.device == device)
            .map(|t| t.id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Total number of live tokens.
    pub fn token_count(&self) -> usize {
        self.inner.tokens.len()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn find_user_by_id(&self, id: i64) -> AppResult<User> {
        self.inner
            .users
            .get(&id)
            .map(|u| u.clone())
            .ok_or_else(|| AppError::not_found(format!("User {id} not found")))
    }

    async fn find_user_by_username(&self, username: &str) -> AppResult<User> {
        let id = self
            .inner
            .usernames
            .get(username)
            .map(|id| *id)
            .ok_or_else(|| AppError::not_found(format!("User '{username}' not found")))?;
        self.find_user_by_id(id).await
    }

    async fn create_user(&self, user: CreateUser) -> AppResult<User> {
        let id = match self.inner.usernames.entry(user.username.clone()) {
            Entry::Occupied(_) => {
                return Err(AppError::save_conflict(format!(
                    "Username '{}' is already taken",
                    user.username
                )));
            }
            Entry::Vacant(slot) => {
                let id = self.inner.next_user_id.fetch_add(1, Ordering::SeqCst) + 1;
                slot.insert(id);
                id
            }
        };

        let now = Utc::now();
        let created = User {
            id,
            username: user.username,
            name: user.name,
            avatar: user.avatar.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        };
        self.inner.users.insert(id, created.clone());
        debug!(user_id = id, username = %created.username, "User created");
        Ok(created)
    }

    async fn find_identity(&self, provider: &str, open_id: &str) -> AppResult<UserIdentity> {
        self.inner
            .identities
            .get(&(provider.to_string(), open_id.to_string()))
            .map(|i| i.clone())
            .ok_or_else(|| AppError::not_found(format!("Identity {provider}/{open_id} not found")))
    }

    async fn create_identity(&self, identity: UserIdentity) -> AppResult<UserIdentity> {
        if identity.user_id <= 0 {
            return Err(AppError::validation("Identity requires an owning user"));
        }
        let key = (identity.provider.clone(), identity.open_id.clone());
        match self.inner.identities.entry(key) {
            Entry::Occupied(_) => Err(AppError::save_conflict(format!(
                "Identity {}/{} already exists",
                identity.provider, identity.open_id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(identity.clone());
                Ok(identity)
            }
        }
    }

    async fn update_identity_data(
        &self,
        provider: &str,
        open_id: &str,
        data: serde_json::Value,
    ) -> AppResult<()> {
        let mut identity = self
            .inner
            .identities
            .get_mut(&(provider.to_string(), open_id.to_string()))
            .ok_or_else(|| AppError::not_found(format!("Identity {provider}/{open_id} not found")))?;
        identity.data = Some(data);
        Ok(())
    }

    async fn find_token_by_id(&self, id: i64) -> AppResult<Token> {
        self.inner
            .tokens
            .get(&id)
            .map(|t| t.clone())
            .ok_or_else(|| AppError::not_found(format!("Token {id} not found")))
    }

    async fn create_token(&self, token: NewToken) -> AppResult<Token> {
        let id = self.inner.next_token_id.fetch_add(1, Ordering::SeqCst) + 1;
        let token = token.into_token(id);
        self.inner.tokens.insert(id, token.clone());
        Ok(token)
    }

    async fn delete_token(&self, user_id: i64, device: &str) -> AppResult<u64> {
        let before = self.inner.tokens.len();
        self.inner
            .tokens
            .retain(|_, t| !(t.user_id == user_id && t.device == device));
        Ok(before.saturating_sub(self.inner.tokens.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatehouse_core::error::ErrorKind;

    fn draft(user_id: i64, device: &str) -> NewToken {
        let now = Utc::now();
        NewToken {
            user_id,
            device: device.to_string(),
            remark: String::new(),
            hash: "hash".to_string(),
            issued_at: now,
            expires_at: now + chrono::Duration::days(1),
        }
    }

    #[tokio::test]
    async fn test_user_ids_are_positive_and_usernames_unique() {
        let store = MemoryCredentialStore::new();
        let alice = store.create_user(CreateUser::named("alice")).await.unwrap();
        assert!(alice.id > 0);

        let err = store
            .create_user(CreateUser::named("alice"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::SaveConflict);

        let found = store.find_user_by_username("alice").await.unwrap();
        assert_eq!(found, alice);
    }

    #[tokio::test]
    async fn test_missing_rows_are_not_found() {
        let store = MemoryCredentialStore::new();
        assert!(store.find_user_by_id(9).await.unwrap_err().is_not_found());
        assert!(
            store
                .find_identity("password", "nobody")
                .await
                .unwrap_err()
                .is_not_found()
        );
        assert!(store.find_token_by_id(1).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_identity_resolves_to_user() {
        let store = MemoryCredentialStore::new();
        let bob = store.create_user(CreateUser::named("bob")).await.unwrap();
        store
            .create_identity(UserIdentity {
                user_id: bob.id,
                provider: "password".to_string(),
                open_id: "bob".to_string(),
                data: None,
            })
            .await
            .unwrap();

        let user = store.find_user_by_open_id("password", "bob").await.unwrap();
        assert_eq!(user.id, bob.id);

        store
            .update_identity_data("password", "bob", serde_json::json!({"k": 1}))
            .await
            .unwrap();
        let identity = store.find_identity("password", "bob").await.unwrap();
        assert_eq!(identity.data, Some(serde_json::json!({"k": 1})));
    }

    #[tokio::test]
    async fn test_identity_without_owner_is_rejected() {
        let store = MemoryCredentialStore::new();
        let err = store
            .create_identity(UserIdentity {
                user_id: 0,
                provider: "password".to_string(),
                open_id: "ghost".to_string(),
                data: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_delete_token_scoped_to_device() {
        let store = MemoryCredentialStore::new();
        store.create_token(draft(1, "web")).await.unwrap();
        store.create_token(draft(1, "web")).await.unwrap();
        let mobile = store.create_token(draft(1, "mobile")).await.unwrap();
        store.create_token(draft(2, "web")).await.unwrap();

        assert_eq!(store.delete_token(1, "web").await.unwrap(), 2);
        assert!(store.live_tokens(1, "web").is_empty());
        assert_eq!(store.live_tokens(1, "mobile"), vec![mobile.id]);
        assert_eq!(store.live_tokens(2, "web").len(), 1);
    }
}
