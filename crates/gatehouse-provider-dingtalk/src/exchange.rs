//! Mapping a DingTalk profile onto an external identity.

use async_trait::async_trait;
use serde::Deserialize;

use gatehouse_auth::{ExternalIdentity, IdentityExchange};
use gatehouse_core::error::AppError;
use gatehouse_core::result::AppResult;

use crate::client::{DingtalkClient, UserInfo};

/// Registry key of the DingTalk provider.
pub const PROVIDER_NAME: &str = "dingtalk";

/// Suffix of usernames derived from a mobile number.
const MOBILE_SUFFIX: &str = "telephone";

#[derive(Debug, Deserialize)]
struct LoginCode {
    #[serde(alias = "Code")]
    code: String,
}

/// [`IdentityExchange`] over the DingTalk free-login API.
#[derive(Debug, Clone)]
pub struct DingtalkExchange {
    client: DingtalkClient,
}

impl DingtalkExchange {
    /// Wrap a client.
    pub fn new(client: DingtalkClient) -> Self {
        Self { client }
    }
}

/// Build the identity for a DingTalk profile.
///
/// The open id is the organization user id. New users are named
/// `mobile@telephone`, so a person who already has an account under that
/// number is linked to it instead of getting a second one.
pub fn identity_for(info: &UserInfo) -> AppResult<ExternalIdentity> {
    if info.userid.is_empty() {
        return Err(AppError::external_service("DingTalk profile has no userid"));
    }
    if info.mobile.is_empty() {
        return Err(AppError::external_service(
            "DingTalk profile has no mobile number",
        ));
    }

    Ok(ExternalIdentity {
        open_id: info.userid.clone(),
        username: format!("{}@{MOBILE_SUFFIX}", info.mobile),
        name: Some(info.name.clone()).filter(|n| !n.is_empty()),
        avatar: Some(info.avatar.clone()).filter(|a| !a.is_empty()),
        data: serde_json::to_value(info).ok(),
    })
}

#[async_trait]
impl IdentityExchange for DingtalkExchange {
    fn provider_name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn exchange(&self, credentials: &[u8]) -> AppResult<ExternalIdentity> {
        let LoginCode { code } = serde_json::from_slice(credentials)
            .map_err(|_| AppError::validation("Expected JSON body with a login code"))?;
        if code.is_empty() {
            return Err(AppError::validation("Login code must not be empty"));
        }

        let info = self.client.user_info_by_code(&code).await?;
        identity_for(&info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatehouse_core::error::ErrorKind;

    fn info(userid: &str, mobile: &str) -> UserInfo {
        UserInfo {
            userid: userid.to_string(),
            mobile: mobile.to_string(),
            name: "Zhang San".to_string(),
            ..UserInfo::default()
        }
    }

    #[test]
    fn test_username_from_mobile() {
        let identity = identity_for(&info("zhangsan", "13800000000")).unwrap();
        assert_eq!(identity.open_id, "zhangsan");
        assert_eq!(identity.username, "13800000000@telephone");
        assert_eq!(identity.name.as_deref(), Some("Zhang San"));
        assert!(identity.avatar.is_none());

        let data = identity.data.unwrap();
        assert_eq!(data["userid"], "zhangsan");
        assert_eq!(data["mobile"], "13800000000");
    }

    #[test]
    fn test_incomplete_profile_rejected() {
        let err = identity_for(&info("zhangsan", "")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ExternalService);

        let err = identity_for(&info("", "13800000000")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ExternalService);
    }
}
