//! Mapping a WeChat session onto an external identity.

use async_trait::async_trait;
use serde::Deserialize;

use gatehouse_auth::{ExternalIdentity, IdentityExchange};
use gatehouse_core::error::AppError;
use gatehouse_core::result::AppResult;

use crate::client::{UserSession, WeappClient};

/// Registry key of the mini-program provider.
pub const PROVIDER_NAME: &str = "wechat_weapp";

/// Suffix of usernames derived from a union id.
const UNION_ID_SUFFIX: &str = "wechat_unionID";

#[derive(Debug, Deserialize)]
struct LoginCode {
    #[serde(alias = "Code")]
    code: String,
}

/// [`IdentityExchange`] over `jscode2session`.
#[derive(Debug, Clone)]
pub struct WeappExchange {
    client: WeappClient,
}

impl WeappExchange {
    /// Wrap a client.
    pub fn new(client: WeappClient) -> Self {
        Self { client }
    }
}

/// Build the identity for a session of mini-program `app_id`.
///
/// The open id is `openid@appid`. A union id, when present, names the user
/// so the same person resolves to one account across the developer's apps.
pub fn identity_for(app_id: &str, session: &UserSession) -> ExternalIdentity {
    let open_id = format!("{}@{app_id}", session.openid);
    let union_id = session.unionid.as_deref().filter(|u| !u.is_empty());
    let username = match union_id {
        Some(union_id) => format!("{union_id}@{UNION_ID_SUFFIX}"),
        None => format!("{open_id}@{PROVIDER_NAME}"),
    };

    ExternalIdentity {
        open_id,
        username,
        name: None,
        avatar: None,
        data: union_id.map(|u| serde_json::json!({ "unionid": u })),
    }
}

#[async_trait]
impl IdentityExchange for WeappExchange {
    fn provider_name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn exchange(&self, credentials: &[u8]) -> AppResult<ExternalIdentity> {
        let LoginCode { code } = serde_json::from_slice(credentials)
            .map_err(|_| AppError::validation("Expected JSON body with a login code"))?;
        if code.is_empty() {
            return Err(AppError::validation("Login code must not be empty"));
        }

        let session = self.client.code2session(&code).await?;
        Ok(identity_for(self.client.app_id(), &session))
    }
}
