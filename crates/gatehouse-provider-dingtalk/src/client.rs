//! DingTalk open API client.
//!
//! Every call carries an app access token. The token is cached until
//! shortly before DingTalk expires it and refreshed on demand when a call
//! reports it stale.

use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use gatehouse_core::config::DingtalkConfig;
use gatehouse_core::error::{AppError, ErrorKind};
use gatehouse_core::result::AppResult;

/// Retries after the first attempt of an API call.
const MAX_RETRIES: usize = 3;

/// `errcode` DingTalk returns while the server is busy.
const ERRCODE_BUSY: i64 = -1;

/// `errcode` values meaning the access token is missing, invalid or expired.
const ERRCODE_STALE_TOKEN: [i64; 4] = [40001, 40014, 41001, 42001];

/// Cached tokens are dropped this long before DingTalk expires them.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(120);

/// Token lifetime assumed when the response omits `expires_in`.
const DEFAULT_TOKEN_LIFETIME_SECS: u64 = 7200;

/// Profile of a member of the organization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserInfo {
    /// User id within the organization. Never changes.
    pub userid: String,
    /// User id across DingTalk.
    pub unionid: String,
    /// Display name.
    pub name: String,
    /// Mobile number.
    pub mobile: String,
    /// Avatar URL.
    pub avatar: String,
    /// Work email.
    pub email: String,
    /// Job title.
    pub position: String,
    /// Employee number.
    pub jobnumber: String,
    /// Department ids.
    pub department: Vec<i64>,
    /// Whether the user administers the organization.
    #[serde(rename = "isAdmin")]
    pub is_admin: bool,
    /// Whether the user has activated DingTalk.
    pub active: bool,
}

#[derive(Debug, Deserialize)]
struct AccessTokenResponse {
    #[serde(default)]
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct UserIdResponse {
    #[serde(default)]
    userid: String,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorInfo {
    #[serde(default)]
    errcode: i64,
    #[serde(default)]
    errmsg: String,
}

#[derive(Debug)]
struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// What a single attempt at an API call came to.
enum Attempt {
    Done(Value),
    Retry(AppError),
    RefreshAndRetry(AppError),
}

/// HTTP client for the DingTalk open API.
#[derive(Debug, Clone)]
pub struct DingtalkClient {
    http: reqwest::Client,
    app_key: String,
    app_secret: String,
    api_base: String,
    token: Arc<Mutex<Option<CachedToken>>>,
}

impl DingtalkClient {
    /// Create a client from configuration.
    pub fn new(config: &DingtalkConfig) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Configuration,
                    format!("Failed to build DingTalk HTTP client: {e}"),
                    e,
                )
            })?;

        Ok(Self {
            http,
            app_key: config.app_key.clone(),
            app_secret: config.app_secret.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            token: Arc::new(Mutex::new(None)),
        })
    }

    /// Resolve a free-login code to the user's id and profile.
    pub async fn user_info_by_code(&self, code: &str) -> AppResult<UserInfo> {
        let user_id = self.user_id_by_code(code).await?;
        self.user_info(&user_id).await
    }

    /// Resolve a free-login code to a user id.
    pub async fn user_id_by_code(&self, code: &str) -> AppResult<String> {
        let response: UserIdResponse = self.call("/user/getuserinfo", &[("code", code)]).await?;
        if response.userid.is_empty() {
            return Err(AppError::external_service(
                "DingTalk API returned no userid",
            ));
        }
        Ok(response.userid)
    }

    /// Fetch the profile of `user_id`.
    pub async fn user_info(&self, user_id: &str) -> AppResult<UserInfo> {
        let info: UserInfo = self.call("/user/get", &[("userid", user_id)]).await?;
        debug!(userid = %info.userid, "DingTalk profile fetched");
        Ok(info)
    }

    /// Current access token, fetching a new one when absent, expired or
    /// `refresh` is set.
    async fn access_token(&self, refresh: bool) -> AppResult<String> {
        let mut cached = self.token.lock().await;
        if !refresh {
            if let Some(token) = cached.as_ref().filter(|t| t.expires_at > Instant::now()) {
                return Ok(token.value.clone());
            }
        }

        let url = self.url(
            "/gettoken",
            &[
                ("appkey", self.app_key.as_str()),
                ("appsecret", self.app_secret.as_str()),
            ],
        )?;
        let body = self.get(url).await?;
        check_errcode(&body).map_err(|(_, e)| e)?;
        let response: AccessTokenResponse = decode(body)?;
        if response.access_token.is_empty() {
            return Err(AppError::external_service(
                "DingTalk API returned no access token",
            ));
        }

        let lifetime = Duration::from_secs(response.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS))
            .saturating_sub(TOKEN_EXPIRY_MARGIN);
        *cached = Some(CachedToken {
            value: response.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });
        debug!(lifetime_secs = lifetime.as_secs(), "DingTalk access token refreshed");
        Ok(response.access_token)
    }

    /// GET `path` with the access token, retrying busy responses, transport
    /// failures and stale tokens.
    async fn call<T: DeserializeOwned>(&self, path: &str, params: &[(&str, &str)]) -> AppResult<T> {
        let mut refresh = false;
        let mut retries = 0;
        loop {
            let error = match self.attempt(path, params, refresh).await? {
                Attempt::Done(body) => return decode(body),
                Attempt::Retry(e) => {
                    refresh = false;
                    e
                }
                Attempt::RefreshAndRetry(e) => {
                    refresh = true;
                    e
                }
            };
            if retries >= MAX_RETRIES {
                return Err(error);
            }
            retries += 1;
            warn!(path, retries, error = %error, "Retrying DingTalk API call");
        }
    }

    async fn attempt(&self, path: &str, params: &[(&str, &str)], refresh: bool) -> AppResult<Attempt> {
        let token = self.access_token(refresh).await?;
        let mut query = vec![("access_token", token.as_str())];
        query.extend_from_slice(params);
        let url = self.url(path, &query)?;

        let body = match self.get(url).await {
            Ok(body) => body,
            Err(e) => return Ok(Attempt::Retry(e)),
        };
        match check_errcode(&body) {
            Ok(()) => Ok(Attempt::Done(body)),
            Err((ERRCODE_BUSY, e)) => Ok(Attempt::Retry(e)),
            Err((code, e)) if ERRCODE_STALE_TOKEN.contains(&code) => {
                Ok(Attempt::RefreshAndRetry(e))
            }
            Err((_, e)) => Err(e),
        }
    }

    fn url(&self, path: &str, params: &[(&str, &str)]) -> AppResult<Url> {
        Url::parse_with_params(&format!("{}{path}", self.api_base), params)
            .map_err(|e| AppError::configuration(format!("Invalid DingTalk API base: {e}")))
    }

    async fn get(&self, url: Url) -> AppResult<Value> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                AppError::with_source(ErrorKind::ExternalService, "DingTalk API request failed", e)
            })?;

        response.json().await.map_err(|e| {
            AppError::with_source(
                ErrorKind::ExternalService,
                "DingTalk API returned an unreadable response",
                e,
            )
        })
    }
}

/// Split a non-zero `errcode` out of a response body.
fn check_errcode(body: &Value) -> Result<(), (i64, AppError)> {
    let info = ErrorInfo::deserialize(body).unwrap_or_default();
    if info.errcode == 0 {
        return Ok(());
    }
    warn!(errcode = info.errcode, errmsg = %info.errmsg, "DingTalk API returned an error");
    Err((
        info.errcode,
        AppError::external_service(format!("DingTalk API error ({})", info.errcode)),
    ))
}

fn decode<T: DeserializeOwned>(body: Value) -> AppResult<T> {
    serde_json::from_value(body).map_err(|e| {
        AppError::with_source(
            ErrorKind::ExternalService,
            "DingTalk API returned an unexpected response",
            e,
        )
    })
}
