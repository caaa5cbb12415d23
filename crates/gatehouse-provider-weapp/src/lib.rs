//! # gatehouse-provider-weapp
//!
//! Login through a WeChat mini-program: the client sends the one-time code
//! from `wx.login()`, the server trades it for an open id via
//! `jscode2session`, and the shared external-identity flow links it to a
//! local user.

pub mod client;
pub mod exchange;

use std::sync::Arc;

use gatehouse_auth::ExternalIdentityProvider;
use gatehouse_core::config::WeappConfig;
use gatehouse_core::result::AppResult;
use gatehouse_database::CredentialStore;

pub use client::{UserSession, WeappClient};
pub use exchange::{PROVIDER_NAME, WeappExchange};

/// The `wechat_weapp` login provider.
pub type WeappProvider = ExternalIdentityProvider<WeappExchange>;

/// Build the provider from configuration.
pub fn provider(config: &WeappConfig, store: Arc<dyn CredentialStore>) -> AppResult<WeappProvider> {
    let client = WeappClient::new(config)?;
    Ok(ExternalIdentityProvider::new(WeappExchange::new(client), store))
}
