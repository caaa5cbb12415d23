//! Provider identity link.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Binds a `(provider, open_id)` pair to exactly one user.
///
/// `data` is provider-owned: the password provider keeps its hash here,
/// external providers keep the profile they received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct UserIdentity {
    /// Owning user.
    pub user_id: i64,
    /// Provider key, e.g. `"password"`.
    pub provider: String,
    /// Identifier within the provider.
    pub open_id: String,
    /// Opaque provider payload.
    pub data: Option<serde_json::Value>,
}

impl UserIdentity {
    /// Decode the payload into a provider-specific shape.
    pub fn decode_data<T: serde::de::DeserializeOwned>(&self) -> Option<T> {
        self.data
            .as_ref()
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}
