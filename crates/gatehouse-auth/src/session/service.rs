//! Login, renewal, and logout.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use gatehouse_core::config::{AuthConfig, SessionConfig};
use gatehouse_core::error::AppError;
use gatehouse_core::result::AppResult;
use gatehouse_database::CredentialStore;
use gatehouse_entity::User;

use crate::blocking::run_blocking;
use crate::jwt::{AccessClaims, JwtDecoder, JwtEncoder};
use crate::logout::LogoutRegistry;
use crate::provider::{LoginProvider, ProviderRegistry};
use crate::refresh::RefreshTokenCodec;

/// Tokens handed back after a login or renewal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    /// Access token.
    pub token: String,
    /// Access token expiry.
    pub token_expires: DateTime<Utc>,
    /// Refresh token, only when one was requested and issued.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Refresh token expiry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token_expires: Option<DateTime<Utc>>,
}

/// Issues, renews, and revokes sessions.
///
/// Dual tokens: a short-lived stateless access token proves identity on
/// every request, and an optional long-lived refresh token, backed by a
/// store row, mints new access tokens.
pub struct SessionService {
    store: Arc<dyn CredentialStore>,
    providers: ProviderRegistry,
    codec: RefreshTokenCodec,
    encoder: JwtEncoder,
    decoder: JwtDecoder,
    logouts: LogoutRegistry,
}

impl std::fmt::Debug for SessionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionService")
            .field("codec", &self.codec)
            .field("encoder", &self.encoder)
            .field("logouts", &self.logouts)
            .finish_non_exhaustive()
    }
}

impl SessionService {
    /// Build the service and start the logout sweeper.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(store: Arc<dyn CredentialStore>, auth: &AuthConfig, session: &SessionConfig) -> Self {
        Self {
            store,
            providers: ProviderRegistry::new(),
            codec: RefreshTokenCodec::new(
                &auth.secret_key,
                auth.bcrypt_cost,
                session.refresh_token_ttl(),
            ),
            encoder: JwtEncoder::new(&auth.secret_key, session.access_token_ttl()),
            decoder: JwtDecoder::new(&auth.secret_key, session.clock_leeway()),
            logouts: LogoutRegistry::start(
                session.access_token_ttl(),
                session.clock_leeway(),
                session.logout_sweep_interval(),
            ),
        }
    }

    /// Register a login provider, replacing any with the same name.
    pub async fn register_provider(&self, name: impl Into<String>, provider: Arc<dyn LoginProvider>) {
        self.providers.register(name, provider).await;
    }

    /// The registered providers.
    pub fn providers(&self) -> &ProviderRegistry {
        &self.providers
    }

    /// The credential store.
    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    /// The logout registry.
    pub fn logouts(&self) -> &LogoutRegistry {
        &self.logouts
    }

    /// Authenticate through `provider` and issue tokens.
    ///
    /// With `remember`, any refresh token for `(user, device)` is replaced
    /// by a fresh one. Failing to issue the refresh token is logged and the
    /// login still succeeds without it. Failing to issue the access token
    /// fails the login.
    pub async fn login(
        &self,
        provider: &str,
        credentials: &[u8],
        remember: bool,
        device: &str,
        remark: Option<&str>,
    ) -> AppResult<TokenResponse> {
        let login_provider = self
            .providers
            .get(provider)
            .await
            .ok_or_else(|| AppError::unknown_provider(provider))?;

        let user = login_provider.login(credentials).await?;

        let mut refresh = None;
        if remember {
            match self
                .issue_refresh_token(&user, device, remark.unwrap_or_default())
                .await
            {
                Ok(issued) => refresh = Some(issued),
                Err(e) => warn!(
                    user_id = user.id,
                    device = %device,
                    error = %e,
                    "Failed to issue refresh token"
                ),
            }
        }

        let access = self.encoder.issue(user.id)?;
        info!(
            user_id = user.id,
            provider = %provider,
            device = %device,
            remember = refresh.is_some(),
            "User logged in"
        );

        let (refresh_token, refresh_token_expires) = refresh.unzip();
        Ok(TokenResponse {
            token: access.token,
            token_expires: access.expires_at,
            refresh_token,
            refresh_token_expires,
        })
    }

    /// Exchange a refresh token for a new access token.
    ///
    /// Every failure to validate the refresh token is the same
    /// [`AppError::invalid_token`]. The refresh token itself is not rotated.
    pub async fn renew(&self, refresh_token: &str) -> AppResult<(User, TokenResponse)> {
        let (id, nonce) = self.codec.parse(refresh_token)?;

        let token = self
            .store
            .find_token_by_id(id)
            .await
            .map_err(invalid_if_missing)?;
        if token.is_expired_at(Utc::now()) {
            return Err(AppError::invalid_token());
        }

        let codec = self.codec.clone();
        let hash = token.hash.clone();
        if !run_blocking(move || codec.verify(&hash, &nonce)).await? {
            return Err(AppError::invalid_token());
        }

        let user = self
            .store
            .find_user_by_id(token.user_id)
            .await
            .map_err(invalid_if_missing)?;

        let access = self.encoder.issue(user.id)?;
        info!(user_id = user.id, device = %token.device, "Access token renewed");

        Ok((
            user,
            TokenResponse {
                token: access.token,
                token_expires: access.expires_at,
                refresh_token: None,
                refresh_token_expires: None,
            },
        ))
    }

    /// Revoke every outstanding access token of `user_id` and drop the
    /// refresh token for `device`.
    pub async fn logout(&self, user_id: i64, device: &str) -> AppResult<()> {
        let at = self.logouts.record(user_id);
        let deleted = self.store.delete_token(user_id, device).await?;
        info!(user_id, device = %device, deleted, logout_at = %at, "User logged out");
        Ok(())
    }

    /// Whether `claims` were issued at or before the user's last logout.
    pub fn is_revoked(&self, claims: &AccessClaims) -> bool {
        self.logouts.is_revoked(claims.sub, claims.iat)
    }

    /// Decode an access token and reject it if revoked.
    pub fn verify_access_token(&self, token: &str) -> AppResult<AccessClaims> {
        let claims = self.decoder.decode(token)?;
        if self.is_revoked(&claims) {
            return Err(AppError::invalid_token());
        }
        Ok(claims)
    }

    /// Load a user by id.
    pub async fn find_user(&self, user_id: i64) -> AppResult<User> {
        self.store.find_user_by_id(user_id).await
    }

    /// Stop background work.
    pub async fn shutdown(&self) {
        self.logouts.shutdown().await;
    }

    /// Replace the `(user, device)` refresh token and return its wire
    /// string and expiry.
    ///
    /// The delete and the create are separate store calls; two concurrent
    /// logins for the same pair can both end up with a live row.
    async fn issue_refresh_token(
        &self,
        user: &User,
        device: &str,
        remark: &str,
    ) -> AppResult<(String, DateTime<Utc>)> {
        if device.is_empty() {
            return Err(AppError::validation("A device is required to remember a login"));
        }

        self.store.delete_token(user.id, device).await?;

        let codec = self.codec.clone();
        let (user_id, device_owned, remark) = (user.id, device.to_string(), remark.to_string());
        let issued = run_blocking(move || codec.create(user_id, &device_owned, &remark)).await??;

        let token = self.store.create_token(issued.draft).await?;
        let wire = self.codec.stringify(token.id, &issued.nonce)?;
        Ok((wire, token.expires_at))
    }
}

fn invalid_if_missing(err: AppError) -> AppError {
    if err.is_not_found() {
        AppError::invalid_token()
    } else {
        err
    }
}
