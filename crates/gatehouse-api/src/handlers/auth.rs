//! Auth handlers: login, renew, logout, session, me.

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::{Extension, Json};
use axum_extra::extract::cookie::CookieJar;

use gatehouse_auth::{SessionContext, TokenResponse};
use gatehouse_core::error::AppError;

use crate::cookies::{self, ACCESS_COOKIE, REFRESH_COOKIE};
use crate::dto::request::{LoginQuery, LogoutQuery, RenewRequest};
use crate::dto::response::{MessageResponse, SessionResponse, UserResponse};
use crate::state::AppState;

/// POST /api/auth/login?provider=&device=&remember=&remark=
///
/// The body is passed to the provider as-is.
pub async fn login(
    State(state): State<AppState>,
    Query(query): Query<LoginQuery>,
    jar: CookieJar,
    body: Bytes,
) -> Result<(CookieJar, Json<TokenResponse>), AppError> {
    let tokens = state
        .sessions
        .login(
            &query.provider,
            &body,
            query.remember(),
            &query.device,
            query.remark.as_deref(),
        )
        .await?;

    let secure = state.secure_cookies();
    let mut jar = jar.add(cookies::session_cookie(
        ACCESS_COOKIE,
        tokens.token.clone(),
        tokens.token_expires,
        secure,
    ));
    if let (Some(refresh), Some(expires)) = (&tokens.refresh_token, tokens.refresh_token_expires) {
        jar = jar.add(cookies::session_cookie(
            REFRESH_COOKIE,
            refresh.clone(),
            expires,
            secure,
        ));
    }

    Ok((jar, Json(tokens)))
}

/// PUT /api/auth/login, POST /api/auth/renew
///
/// Reads `{"refresh_token": ...}` from the body, or the `refresh_token`
/// cookie when the body is empty.
pub async fn renew(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Bytes,
) -> Result<(CookieJar, Json<TokenResponse>), AppError> {
    let refresh_token = if body.iter().all(u8::is_ascii_whitespace) {
        jar.get(REFRESH_COOKIE)
            .map(|c| c.value().to_string())
            .ok_or_else(AppError::invalid_token)?
    } else {
        serde_json::from_slice::<RenewRequest>(&body)
            .map_err(|_| AppError::validation("Expected JSON body with refresh_token"))?
            .refresh_token
    };

    let (_, tokens) = state.sessions.renew(&refresh_token).await?;

    let jar = jar.add(cookies::session_cookie(
        ACCESS_COOKIE,
        tokens.token.clone(),
        tokens.token_expires,
        state.secure_cookies(),
    ));
    Ok((jar, Json(tokens)))
}

/// DELETE /api/auth/login?device=, POST /api/auth/logout?device=
///
/// Succeeds without doing anything when the caller is not logged in.
pub async fn logout(
    State(state): State<AppState>,
    Query(query): Query<LogoutQuery>,
    Extension(context): Extension<SessionContext>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<MessageResponse>), AppError> {
    let Some(user_id) = context.user_id else {
        return Ok((jar, Json(MessageResponse::new("Not logged in"))));
    };

    state.sessions.logout(user_id, &query.device).await?;
    Ok((
        cookies::clear_session(jar),
        Json(MessageResponse::new("Logged out")),
    ))
}

/// GET /api/auth/session
pub async fn session(Extension(context): Extension<SessionContext>) -> Result<Json<SessionResponse>, AppError> {
    let user_id = context
        .user_id
        .ok_or_else(|| AppError::unauthorized("Authorization required"))?;
    Ok(Json(SessionResponse { user_id }))
}

/// GET /api/auth/me
pub async fn me(Extension(context): Extension<SessionContext>) -> Result<Json<UserResponse>, AppError> {
    let user = context
        .user
        .ok_or_else(|| AppError::internal("User not loaded by authentication middleware"))?;
    Ok(Json(UserResponse::from(user)))
}
