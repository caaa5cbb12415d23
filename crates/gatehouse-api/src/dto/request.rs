//! Request DTOs.

use serde::Deserialize;

/// Query string of `POST /api/auth/login`.
///
/// The raw request body is handed to the provider untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginQuery {
    /// Provider name.
    #[serde(default)]
    pub provider: String,
    /// Device scope of the refresh token.
    #[serde(default)]
    pub device: String,
    /// `1` or `true` to also issue a refresh token.
    #[serde(default)]
    pub remember: Option<String>,
    /// Label stored with the refresh token.
    #[serde(default)]
    pub remark: Option<String>,
}

impl LoginQuery {
    /// Whether a refresh token was requested.
    pub fn remember(&self) -> bool {
        matches!(self.remember.as_deref(), Some("1" | "true"))
    }
}

/// Query string of the logout endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogoutQuery {
    /// Device whose refresh token is dropped.
    #[serde(default)]
    pub device: String,
}

/// Body of the renew endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct RenewRequest {
    /// Refresh token to exchange.
    pub refresh_token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remember_flag() {
        for (raw, expected) in [
            (Some("1"), true),
            (Some("true"), true),
            (Some("0"), false),
            (Some("false"), false),
            (Some("null"), false),
            (Some("yes"), false),
            (None, false),
        ] {
            let query = LoginQuery {
                remember: raw.map(str::to_string),
                ..LoginQuery::default()
            };
            assert_eq!(query.remember(), expected, "{raw:?}");
        }
    }
}
