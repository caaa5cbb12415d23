//! Login providers.
//!
//! A provider turns raw, provider-specific credentials into a [`User`].
//! The session service looks providers up by name and never inspects the
//! credentials itself.

pub mod external;
pub mod password;
pub mod registry;

use async_trait::async_trait;

use gatehouse_core::result::AppResult;
use gatehouse_entity::User;

pub use external::{ExternalIdentity, ExternalIdentityProvider, IdentityExchange};
pub use password::PasswordProvider;
pub use registry::ProviderRegistry;

/// A credential verifier.
#[async_trait]
pub trait LoginProvider: Send + Sync + 'static {
    /// Registry key, e.g. `"password"`.
    fn name(&self) -> &str;

    /// Verify `credentials` and resolve the user they belong to.
    async fn login(&self, credentials: &[u8]) -> AppResult<User>;
}
