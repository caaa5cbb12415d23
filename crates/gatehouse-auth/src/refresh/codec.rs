//! Refresh-token codec.
//!
//! A refresh token string is `base64url(aead_nonce || AES-256-GCM(id_be || nonce))`
//! with no padding. The cipher key is the SHA-256 digest of the server
//! secret. Only `bcrypt(nonce)` is persisted, so a database dump alone cannot
//! be turned back into usable tokens.

use std::time::Duration;

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use rand::RngCore;
use sha2::{Digest, Sha256};

use gatehouse_core::error::AppError;
use gatehouse_core::result::AppResult;
use gatehouse_entity::NewToken;

/// Length of the per-token secret nonce.
pub const NONCE_LEN: usize = 12;

/// Length of the AEAD nonce prefixed to the ciphertext.
const AEAD_NONCE_LEN: usize = 12;

/// `id (8, big-endian) || nonce (12)`.
const PLAINTEXT_LEN: usize = 8 + NONCE_LEN;

/// The per-token secret that only the client's token string carries.
pub type TokenNonce = [u8; NONCE_LEN];

/// A freshly minted, not yet persisted refresh token.
#[derive(Debug, Clone)]
pub struct IssuedRefreshToken {
    /// The row to hand to the credential store.
    pub draft: NewToken,
    /// The nonce, needed once more to stringify after the store assigns an id.
    pub nonce: TokenNonce,
}

/// Mints, encodes, decodes, and verifies refresh tokens.
#[derive(Clone)]
pub struct RefreshTokenCodec {
    cipher: Aes256Gcm,
    bcrypt_cost: u32,
    lifetime: chrono::Duration,
}

impl std::fmt::Debug for RefreshTokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshTokenCodec")
            .field("bcrypt_cost", &self.bcrypt_cost)
            .field("lifetime", &self.lifetime)
            .finish()
    }
}

impl RefreshTokenCodec {
    /// Create a codec keyed by `secret`.
    pub fn new(secret: &str, bcrypt_cost: u32, lifetime: Duration) -> Self {
        let key = Sha256::digest(secret.as_bytes());
        Self {
            cipher: Aes256Gcm::new(&key),
            bcrypt_cost,
            lifetime: chrono::Duration::from_std(lifetime)
                .unwrap_or_else(|_| chrono::Duration::days(365)),
        }
    }

    /// Mint a token for `(user_id, device)`.
    ///
    /// Hashing runs bcrypt at the configured cost; call this off the async
    /// executor.
    ///
    /// # Panics
    ///
    /// Panics if `user_id` is zero or `device` is empty.
    pub fn create(&self, user_id: i64, device: &str, remark: &str) -> AppResult<IssuedRefreshToken> {
        assert!(user_id != 0, "refresh token requires a user id");
        assert!(!device.is_empty(), "refresh token requires a device");

        let mut nonce = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce);

        let hash = bcrypt::hash(nonce, self.bcrypt_cost)
            .map_err(|e| AppError::internal(format!("Failed to hash refresh nonce: {e}")))?;

        let issued_at = Utc::now();
        Ok(IssuedRefreshToken {
            draft: NewToken {
                user_id,
                device: device.to_string(),
                remark: remark.to_string(),
                hash,
                issued_at,
                expires_at: issued_at + self.lifetime,
            },
            nonce,
        })
    }

    /// Encode a persisted token into its wire string.
    ///
    /// # Panics
    ///
    /// Panics if `id` has not been assigned.
    pub fn stringify(&self, id: i64, nonce: &TokenNonce) -> AppResult<String> {
        assert!(id > 0, "refresh token must be persisted before stringify");

        let mut plaintext = [0u8; PLAINTEXT_LEN];
        plaintext[..8].copy_from_slice(&id.to_be_bytes());
        plaintext[8..].copy_from_slice(nonce);

        let mut aead_nonce = [0u8; AEAD_NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut aead_nonce);

        let sealed = self
            .cipher
            .encrypt(Nonce::from_slice(&aead_nonce), plaintext.as_ref())
            .map_err(|e| AppError::internal(format!("Failed to seal refresh token: {e}")))?;

        let mut out = Vec::with_capacity(AEAD_NONCE_LEN + sealed.len());
        out.extend_from_slice(&aead_nonce);
        out.extend_from_slice(&sealed);
        Ok(URL_SAFE_NO_PAD.encode(out))
    }

    /// Decode a wire string back into `(id, nonce)`.
    ///
    /// Every failure is the same [`AppError::invalid_token`].
    pub fn parse(&self, token: &str) -> AppResult<(i64, TokenNonce)> {
        let raw = URL_SAFE_NO_PAD
            .decode(token)
            .map_err(|_| AppError::invalid_token())?;
        if raw.len() <= AEAD_NONCE_LEN {
            return Err(AppError::invalid_token());
        }

        let (aead_nonce, sealed) = raw.split_at(AEAD_NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(aead_nonce), sealed)
            .map_err(|_| AppError::invalid_token())?;
        if plaintext.len() != PLAINTEXT_LEN {
            return Err(AppError::invalid_token());
        }

        let (id_bytes, nonce_bytes) = plaintext.split_at(8);
        let id = id_bytes
            .try_into()
            .map(i64::from_be_bytes)
            .map_err(|_| AppError::invalid_token())?;
        if id <= 0 {
            return Err(AppError::invalid_token());
        }
        let nonce: TokenNonce = nonce_bytes
            .try_into()
            .map_err(|_| AppError::invalid_token())?;

        Ok((id, nonce))
    }

    /// Check a nonce against its stored bcrypt hash.
    pub fn verify(&self, hash: &str, nonce: &TokenNonce) -> bool {
        bcrypt::verify(nonce, hash).unwrap_or(false)
    }
}
