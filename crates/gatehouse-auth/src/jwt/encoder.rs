//! Access-token signing.

use std::time::Duration;

use chrono::{DateTime, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};

use gatehouse_core::error::AppError;

use super::claims::AccessClaims;

/// A signed access token and its expiry.
#[derive(Debug, Clone)]
pub struct AccessToken {
    /// Compact JWT.
    pub token: String,
    /// When the token stops being accepted.
    pub expires_at: DateTime<Utc>,
}

/// Signs HS256 access tokens.
#[derive(Clone)]
pub struct JwtEncoder {
    /// HMAC secret key for signing.
    encoding_key: EncodingKey,
    /// Access token lifetime.
    ttl: chrono::Duration,
}

impl std::fmt::Debug for JwtEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtEncoder").field("ttl", &self.ttl).finish()
    }
}

impl JwtEncoder {
    /// Creates a new encoder.
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            ttl: chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::hours(1)),
        }
    }

    /// Issue an access token for `user_id`, valid from now.
    pub fn issue(&self, user_id: i64) -> Result<AccessToken, AppError> {
        let claims = AccessClaims::new(user_id, Utc::now(), self.ttl);
        let token = self.sign(&claims)?;
        Ok(AccessToken {
            token,
            expires_at: claims.expires_at(),
        })
    }

    /// Sign arbitrary claims.
    pub fn sign(&self, claims: &AccessClaims) -> Result<String, AppError> {
        encode(&Header::default(), claims, &self.encoding_key)
            .map_err(|e| AppError::internal(format!("Failed to sign access token: {e}")))
    }
}
