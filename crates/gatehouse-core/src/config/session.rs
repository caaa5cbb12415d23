//! Session and token lifetime configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Upper bound on `refresh_token_ttl_days` accepted by validation.
pub const MAX_REFRESH_TTL_DAYS: u64 = 100 * 365;

/// Token lifetimes and revocation-registry tuning.
///
/// These are fixed at construction of the session service; changing them
/// afterwards has no effect on a running sweeper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Access token lifetime in seconds.
    #[serde(default = "default_access_ttl")]
    pub access_token_ttl_seconds: u64,
    /// Refresh token lifetime in days.
    #[serde(default = "default_refresh_ttl")]
    pub refresh_token_ttl_days: u64,
    /// How often the logout registry evicts stale records, in milliseconds.
    #[serde(default = "default_sweep_interval")]
    pub logout_sweep_interval_ms: u64,
    /// Clock skew tolerated when checking access-token expiry, in seconds.
    #[serde(default = "default_clock_leeway")]
    pub clock_leeway_seconds: u64,
    /// Mark session cookies `Secure`.
    #[serde(default)]
    pub cookie_secure: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            access_token_ttl_seconds: default_access_ttl(),
            refresh_token_ttl_days: default_refresh_ttl(),
            logout_sweep_interval_ms: default_sweep_interval(),
            clock_leeway_seconds: default_clock_leeway(),
            cookie_secure: false,
        }
    }
}

impl SessionConfig {
    /// Access token lifetime.
    pub fn access_token_ttl(&self) -> Duration {
        Duration::from_secs(self.access_token_ttl_seconds)
    }

    /// Refresh token lifetime. Saturates instead of overflowing.
    pub fn refresh_token_ttl(&self) -> Duration {
        Duration::from_secs(self.refresh_token_ttl_days.saturating_mul(24 * 60 * 60))
    }

    /// Access-token expiry leeway.
    pub fn clock_leeway(&self) -> Duration {
        Duration::from_secs(self.clock_leeway_seconds)
    }

    /// Logout registry sweep interval.
    pub fn logout_sweep_interval(&self) -> Duration {
        Duration::from_millis(self.logout_sweep_interval_ms)
    }
}

fn default_access_ttl() -> u64 {
    60 * 60
}

fn default_refresh_ttl() -> u64 {
    365
}

fn default_sweep_interval() -> u64 {
    10_000
}

fn default_clock_leeway() -> u64 {
    5
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.access_token_ttl(), Duration::from_secs(3600));
        assert_eq!(
            config.refresh_token_ttl(),
            Duration::from_secs(365 * 86_400)
        );
        assert_eq!(config.logout_sweep_interval(), Duration::from_secs(10));
        assert_eq!(config.clock_leeway(), Duration::from_secs(5));
    }

    #[test]
    fn test_huge_refresh_lifetime_saturates() {
        let config = SessionConfig {
            refresh_token_ttl_days: u64::MAX,
            ..SessionConfig::default()
        };
        assert_eq!(config.refresh_token_ttl(), Duration::from_secs(u64::MAX));
    }
}
