//! bcrypt password hashing and verification.
//!
//! The server secret is appended to the password before hashing, so a
//! leaked hash cannot be attacked offline without the secret as well.

use gatehouse_core::error::AppError;

/// Hashes and verifies peppered passwords.
#[derive(Clone)]
pub struct PasswordHasher {
    /// Server-side pepper.
    secret: String,
    /// bcrypt cost factor.
    cost: u32,
}

impl std::fmt::Debug for PasswordHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordHasher")
            .field("cost", &self.cost)
            .finish()
    }
}

impl PasswordHasher {
    /// Creates a new password hasher instance.
    pub fn new(secret: impl Into<String>, cost: u32) -> Self {
        Self {
            secret: secret.into(),
            cost,
        }
    }

    /// Hashes `password || secret` with a random salt.
    pub fn hash_password(&self, password: &str) -> Result<String, AppError> {
        bcrypt::hash(self.peppered(password), self.cost)
            .map_err(|e| AppError::internal(format!("Password hashing failed: {e}")))
    }

    /// Verifies a plaintext password against a stored hash.
    ///
    /// A malformed hash counts as a mismatch.
    pub fn verify_password(&self, password: &str, hash: &str) -> bool {
        bcrypt::verify(self.peppered(password), hash).unwrap_or(false)
    }

    fn peppered(&self, password: &str) -> String {
        format!("{password}{}", self.secret)
    }
}
