//! DingTalk login configuration.

use serde::{Deserialize, Serialize};

/// Credentials for the `dingtalk` login provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DingtalkConfig {
    /// Internal app key.
    pub app_key: String,
    /// Internal app secret.
    pub app_secret: String,
    /// Base URL of the DingTalk open API, overridable for testing.
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

fn default_api_base() -> String {
    "https://oapi.dingtalk.com".to_string()
}

fn default_timeout() -> u64 {
    2
}
