//! # gatehouse-provider-dingtalk
//!
//! Login through DingTalk: the client sends the free-login code issued to
//! an internal app, the server resolves it to a DingTalk user id and
//! profile, and the shared external-identity flow links it to a local
//! user named after the mobile number.

pub mod client;
pub mod exchange;

use std::sync::Arc;

use gatehouse_auth::ExternalIdentityProvider;
use gatehouse_core::config::DingtalkConfig;
use gatehouse_core::result::AppResult;
use gatehouse_database::CredentialStore;

pub use client::{DingtalkClient, UserInfo};
pub use exchange::{DingtalkExchange, PROVIDER_NAME};

/// The `dingtalk` login provider.
pub type DingtalkProvider = ExternalIdentityProvider<DingtalkExchange>;

/// Build the provider from configuration.
pub fn provider(
    config: &DingtalkConfig,
    store: Arc<dyn CredentialStore>,
) -> AppResult<DingtalkProvider> {
    let client = DingtalkClient::new(config)?;
    Ok(ExternalIdentityProvider::new(DingtalkExchange::new(client), store))
}
