//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section.

pub mod auth;
pub mod database;
pub mod dingtalk;
pub mod logging;
pub mod server;
pub mod session;
pub mod weapp;

use serde::{Deserialize, Serialize};

pub use self::auth::AuthConfig;
pub use self::database::{DatabaseConfig, StoreKind};
pub use self::dingtalk::DingtalkConfig;
pub use self::logging::LoggingConfig;
pub use self::server::{CorsConfig, ServerConfig};
pub use self::session::SessionConfig;
pub use self::weapp::WeappConfig;

use crate::error::AppError;

/// Root application configuration.
///
/// This struct is the top-level deserialization target for the merged
/// TOML configuration files (default.toml + environment overlay).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Credential store settings.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Authentication settings.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Token lifetime settings.
    #[serde(default)]
    pub session: SessionConfig,
    /// WeChat mini-program login; the provider is only registered when set.
    #[serde(default)]
    pub weapp: Option<WeappConfig>,
    /// DingTalk login; the provider is only registered when set.
    #[serde(default)]
    pub dingtalk: Option<DingtalkConfig>,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges the default configuration with an environment-specific overlay
    /// and environment variables prefixed with `GATEHOUSE__`.
    pub fn load(env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("GATEHOUSE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let loaded: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;

        loaded.validate(env)?;
        Ok(loaded)
    }

    /// Reject settings that are unsafe for the given environment.
    pub fn validate(&self, env: &str) -> Result<(), AppError> {
        if self.auth.secret_key.is_empty() {
            return Err(AppError::configuration("auth.secret_key must not be empty"));
        }
        if env == "production" && self.auth.secret_key == auth::DEFAULT_SECRET_KEY {
            return Err(AppError::configuration(
                "auth.secret_key must be changed in production",
            ));
        }
        if !(4..=31).contains(&self.auth.bcrypt_cost) {
            return Err(AppError::configuration(
                "auth.bcrypt_cost must be between 4 and 31",
            ));
        }
        if self.session.access_token_ttl_seconds == 0 || self.session.logout_sweep_interval_ms == 0
        {
            return Err(AppError::configuration(
                "session lifetimes and sweep interval must be positive",
            ));
        }
        if self.session.refresh_token_ttl_days == 0
            || self.session.refresh_token_ttl_days > session::MAX_REFRESH_TTL_DAYS
        {
            return Err(AppError::configuration(format!(
                "session.refresh_token_ttl_days must be between 1 and {}",
                session::MAX_REFRESH_TTL_DAYS
            )));
        }
        Ok(())
    }
}
