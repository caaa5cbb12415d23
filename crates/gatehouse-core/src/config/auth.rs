//! Authentication configuration.

use serde::{Deserialize, Serialize};

/// Placeholder secret shipped in the default configuration.
pub const DEFAULT_SECRET_KEY: &str = "CHANGE_ME_IN_PRODUCTION";

/// Authentication and credential configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Server secret: signs access tokens, keys the refresh-token cipher,
    /// and is appended to passwords before hashing.
    #[serde(default = "default_secret_key")]
    pub secret_key: String,
    /// bcrypt cost factor for refresh-token nonces and passwords.
    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,
    /// Minimum password length.
    #[serde(default = "default_password_min")]
    pub password_min_length: usize,
    /// Additionally reject passwords with a low zxcvbn score.
    #[serde(default)]
    pub password_entropy_check: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret_key: default_secret_key(),
            bcrypt_cost: default_bcrypt_cost(),
            password_min_length: default_password_min(),
            password_entropy_check: false,
        }
    }
}

fn default_secret_key() -> String {
    DEFAULT_SECRET_KEY.to_string()
}

fn default_bcrypt_cost() -> u32 {
    10
}

fn default_password_min() -> usize {
    8
}
