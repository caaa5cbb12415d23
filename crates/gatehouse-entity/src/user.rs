//! User entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct User {
    /// Store-assigned identifier, always positive.
    pub id: i64,
    /// Unique login name.
    pub username: String,
    /// Display name.
    pub name: String,
    /// Avatar URL, empty when unset.
    pub avatar: String,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Data required to create a new user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    /// Desired username.
    pub username: String,
    /// Display name.
    pub name: String,
    /// Avatar URL (optional).
    pub avatar: Option<String>,
}

impl CreateUser {
    /// A user whose display name defaults to the username.
    pub fn named(username: impl Into<String>) -> Self {
        let username = username.into();
        Self {
            name: username.clone(),
            username,
            avatar: None,
        }
    }
}
