//! `jscode2session` API client.

use std::time::Duration;

use reqwest::Url;
use serde::Deserialize;
use tracing::{debug, warn};

use gatehouse_core::config::WeappConfig;
use gatehouse_core::error::{AppError, ErrorKind};
use gatehouse_core::result::AppResult;

/// Session returned for a login code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UserSession {
    /// User id within this mini-program.
    #[serde(default)]
    pub openid: String,
    /// Session key for decrypting client data. Never persisted.
    #[serde(default)]
    pub session_key: String,
    /// User id across the developer's WeChat apps, when granted.
    #[serde(default)]
    pub unionid: Option<String>,
    /// Non-zero on failure.
    #[serde(default)]
    pub errcode: i64,
    /// Failure description.
    #[serde(default)]
    pub errmsg: String,
}

/// HTTP client for the mini-program login API.
#[derive(Debug, Clone)]
pub struct WeappClient {
    http: reqwest::Client,
    app_id: String,
    app_secret: String,
    api_base: String,
}

impl WeappClient {
    /// Create a client from configuration.
    pub fn new(config: &WeappConfig) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Configuration,
                    format!("Failed to build WeChat HTTP client: {e}"),
                    e,
                )
            })?;

        Ok(Self {
            http,
            app_id: config.app_id.clone(),
            app_secret: config.app_secret.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
        })
    }

    /// The mini-program app id.
    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    /// Trade a login code for a user session.
    pub async fn code2session(&self, code: &str) -> AppResult<UserSession> {
        let url = Url::parse_with_params(
            &format!("{}/sns/jscode2session", self.api_base),
            &[
                ("appid", self.app_id.as_str()),
                ("secret", self.app_secret.as_str()),
                ("js_code", code),
                ("grant_type", "authorization_code"),
            ],
        )
        .map_err(|e| AppError::configuration(format!("Invalid WeChat API base: {e}")))?;

        let response = self
            .http
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                AppError::with_source(ErrorKind::ExternalService, "WeChat API request failed", e)
            })?;

        let session: UserSession = response.json().await.map_err(|e| {
            AppError::with_source(
                ErrorKind::ExternalService,
                "WeChat API returned an unreadable response",
                e,
            )
        })?;

        if session.errcode != 0 {
            warn!(errcode = session.errcode, errmsg = %session.errmsg, "jscode2session rejected code");
            return Err(AppError::external_service(format!(
                "WeChat rejected the login code ({})",
                session.errcode
            )));
        }
        if session.openid.is_empty() {
            return Err(AppError::external_service(
                "WeChat API returned no openid",
            ));
        }

        debug!(openid = %session.openid, has_unionid = session.unionid.is_some(), "jscode2session ok");
        Ok(session)
    }
}
