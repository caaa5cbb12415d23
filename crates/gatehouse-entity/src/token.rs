//! Refresh-token row model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A persisted refresh-token grant.
///
/// Only the bcrypt hash of the token's nonce is stored; the nonce itself
/// exists solely inside the encrypted token string handed to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Token {
    /// Store-assigned identifier, always positive.
    pub id: i64,
    /// Owning user.
    pub user_id: i64,
    /// Client-chosen scope, e.g. `"web"` or `"mobile"`.
    pub device: String,
    /// Human-readable label.
    pub remark: String,
    /// bcrypt hash of the nonce.
    #[serde(skip_serializing)]
    pub hash: String,
    /// When the grant was issued.
    pub issued_at: DateTime<Utc>,
    /// When the grant stops being accepted.
    pub expires_at: DateTime<Utc>,
    /// Soft-deletion marker.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Token {
    /// Whether the grant is past its expiry at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }

    /// Whether the grant has been deleted.
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// A refresh-token row that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewToken {
    /// Owning user.
    pub user_id: i64,
    /// Client-chosen scope.
    pub device: String,
    /// Human-readable label.
    pub remark: String,
    /// bcrypt hash of the nonce.
    pub hash: String,
    /// When the grant was issued.
    pub issued_at: DateTime<Utc>,
    /// When the grant stops being accepted.
    pub expires_at: DateTime<Utc>,
}

impl NewToken {
    /// Re-base the expiry on the issue time.
    pub fn expires_after(mut self, lifetime: chrono::Duration) -> Self {
        self.expires_at = self.issued_at + lifetime;
        self
    }

    /// Materialize the row once the store has assigned an id.
    pub fn into_token(self, id: i64) -> Token {
        Token {
            id,
            user_id: self.user_id,
            device: self.device,
            remark: self.remark,
            hash: self.hash,
            issued_at: self.issued_at,
            expires_at: self.expires_at,
            deleted_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> NewToken {
        let now = Utc::now();
        NewToken {
            user_id: 7,
            device: "web".to_string(),
            remark: "laptop".to_string(),
            hash: "$2b$04$placeholder".to_string(),
            issued_at: now,
            expires_at: now + chrono::Duration::days(365),
        }
    }

    #[test]
    fn test_expires_after_rebases_on_issue_time() {
        let token = draft().expires_after(chrono::Duration::minutes(5));
        assert_eq!(
            token.expires_at - token.issued_at,
            chrono::Duration::minutes(5)
        );
    }

    #[test]
    fn test_into_token_carries_fields() {
        let token = draft().into_token(42);
        assert_eq!(token.id, 42);
        assert_eq!(token.user_id, 7);
        assert!(!token.is_deleted());
        assert!(!token.is_expired_at(Utc::now()));
    }

    #[test]
    fn test_expired_token() {
        let token = draft()
            .expires_after(chrono::Duration::seconds(-1))
            .into_token(1);
        assert!(token.is_expired_at(Utc::now()));
    }
}
