//! WeChat mini-program login configuration.

use serde::{Deserialize, Serialize};

/// Credentials for the `wechat_weapp` login provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeappConfig {
    /// Mini-program app id.
    pub app_id: String,
    /// Mini-program app secret.
    pub app_secret: String,
    /// Base URL of the WeChat API, overridable for testing.
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

fn default_api_base() -> String {
    "https://api.weixin.qq.com".to_string()
}

fn default_timeout() -> u64 {
    10
}
