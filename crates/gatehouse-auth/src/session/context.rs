//! Request-scoped authentication state.

use gatehouse_entity::User;

/// What the authentication stages have learned about the caller.
///
/// Starts anonymous. `ParseToken` may attach a user id (from an access
/// token) or a full user (after a refresh-token renewal);
/// `AuthenticatedWithUser` guarantees the full user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    /// Authenticated user id.
    pub user_id: Option<i64>,
    /// Loaded user record.
    pub user: Option<User>,
}

impl SessionContext {
    /// An unauthenticated context.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Authenticated by id only.
    pub fn for_user_id(user_id: i64) -> Self {
        Self {
            user_id: Some(user_id),
            user: None,
        }
    }

    /// Authenticated with the full record.
    pub fn for_user(user: User) -> Self {
        Self {
            user_id: Some(user.id),
            user: Some(user),
        }
    }

    /// Whether a user id has been resolved.
    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }
}
