//! Request authentication stages.
//!
//! Framework-neutral: the HTTP layer extracts [`Credentials`] from the
//! request, runs a stage, stores the resulting [`SessionContext`], and
//! applies the returned [`CredentialUpdate`] to the response.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use gatehouse_core::error::AppError;
use gatehouse_entity::User;

use super::context::SessionContext;
use super::service::SessionService;

/// Credentials presented by a request.
#[derive(Debug, Clone, Copy, Default)]
pub struct Credentials<'a> {
    /// Access token.
    pub access_token: Option<&'a str>,
    /// Refresh token.
    pub refresh_token: Option<&'a str>,
}

/// What the response should do with the client's stored credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialUpdate {
    /// Leave them alone.
    Keep,
    /// Replace the access token.
    RenewedAccess {
        /// New access token.
        token: String,
        /// Its expiry.
        expires: DateTime<Utc>,
    },
    /// Drop both tokens.
    ClearAll,
}

/// Result of the soft `ParseToken` stage.
#[derive(Debug, Clone)]
pub struct ParseOutcome {
    /// Resolved caller.
    pub context: SessionContext,
    /// Credential changes to send back.
    pub update: CredentialUpdate,
}

/// A hard stage refused the request.
#[derive(Debug)]
pub struct AuthRejection {
    /// Error to report.
    pub error: AppError,
    /// Credential changes to send back with the error.
    pub update: CredentialUpdate,
}

/// Runs the authentication stages on top of a [`SessionService`].
#[derive(Debug, Clone)]
pub struct RequestAuthenticator {
    sessions: Arc<SessionService>,
}

impl RequestAuthenticator {
    /// Create an authenticator.
    pub fn new(sessions: Arc<SessionService>) -> Self {
        Self { sessions }
    }

    /// Soft stage: never rejects.
    ///
    /// A valid, unrevoked access token yields its user id. Otherwise a
    /// refresh token is tried; on success the full user is attached and a
    /// new access token is handed back. Anything else leaves the caller
    /// anonymous and clears whatever credentials were presented.
    pub async fn parse_token(&self, credentials: Credentials<'_>) -> ParseOutcome {
        let access = credentials.access_token.filter(|t| !t.is_empty());
        let refresh = credentials.refresh_token.filter(|t| !t.is_empty());

        if let Some(token) = access {
            match self.sessions.verify_access_token(token) {
                Ok(claims) => {
                    return ParseOutcome {
                        context: SessionContext::for_user_id(claims.sub),
                        update: CredentialUpdate::Keep,
                    };
                }
                Err(e) => debug!(error = %e, "Access token not accepted"),
            }
        }

        if let Some(token) = refresh {
            match self.sessions.renew(token).await {
                Ok((user, tokens)) => {
                    return ParseOutcome {
                        context: SessionContext::for_user(user),
                        update: CredentialUpdate::RenewedAccess {
                            token: tokens.token,
                            expires: tokens.token_expires,
                        },
                    };
                }
                Err(e) => debug!(error = %e, "Refresh token not accepted"),
            }
        }

        let update = if access.is_some() || refresh.is_some() {
            CredentialUpdate::ClearAll
        } else {
            CredentialUpdate::Keep
        };
        ParseOutcome {
            context: SessionContext::anonymous(),
            update,
        }
    }

    /// Hard stage: require a resolved user id.
    pub fn authenticated(&self, context: &SessionContext) -> Result<i64, AppError> {
        context
            .user_id
            .ok_or_else(|| AppError::unauthorized("Authorization required"))
    }

    /// Hard stage: require a resolved user id and the full user record.
    ///
    /// Reuses a record already attached by `parse_token`. If the account no
    /// longer exists the request is refused and both credentials are
    /// cleared.
    pub async fn authenticated_with_user(
        &self,
        context: &mut SessionContext,
    ) -> Result<User, AuthRejection> {
        let user_id = self.authenticated(context).map_err(|error| AuthRejection {
            error,
            update: CredentialUpdate::Keep,
        })?;

        if let Some(user) = context.user.as_ref().filter(|u| u.id == user_id) {
            return Ok(user.clone());
        }

        match self.sessions.find_user(user_id).await {
            Ok(user) => {
                context.user = Some(user.clone());
                Ok(user)
            }
            Err(e) if e.is_not_found() => {
                warn!(user_id, "Authenticated user no longer exists");
                *context = SessionContext::anonymous();
                Err(AuthRejection {
                    error: AppError::unauthorized("Account no longer exists"),
                    update: CredentialUpdate::ClearAll,
                })
            }
            Err(error) => Err(AuthRejection {
                error,
                update: CredentialUpdate::Keep,
            }),
        }
    }
}
