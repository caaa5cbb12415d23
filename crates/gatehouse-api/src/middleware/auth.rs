//! Authentication middleware stages.
//!
//! Stack with `axum::middleware::from_fn_with_state`. `parse_token` must run
//! first: it stores a [`SessionContext`] in the request extensions that the
//! hard stages read.

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::CookieJar;

use gatehouse_auth::{Credentials, SessionContext};

use crate::cookies::{ACCESS_COOKIE, REFRESH_COOKIE, apply_update};
use crate::state::AppState;

/// Soft stage: resolve the caller if possible, never reject.
///
/// The access token is read from `Authorization: Bearer` or else the `jwt`
/// cookie; the refresh token from the `refresh_token` cookie.
pub async fn parse_token(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> (CookieJar, Response) {
    let bearer = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string);
    let access = bearer.or_else(|| jar.get(ACCESS_COOKIE).map(|c| c.value().to_string()));
    let refresh = jar.get(REFRESH_COOKIE).map(|c| c.value().to_string());

    let outcome = state
        .authenticator
        .parse_token(Credentials {
            access_token: access.as_deref(),
            refresh_token: refresh.as_deref(),
        })
        .await;

    request.extensions_mut().insert(outcome.context);
    let response = next.run(request).await;

    let jar = apply_update(jar, outcome.update, state.secure_cookies(), &response);
    (jar, response)
}

/// Hard stage: reject unless a user id was resolved.
pub async fn authenticated(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let context = current_context(&request);
    match state.authenticator.authenticated(&context) {
        Ok(_) => next.run(request).await,
        Err(e) => e.into_response(),
    }
}

/// Hard stage: reject unless a user id was resolved and the account still
/// exists. The loaded user is stored back into the context.
pub async fn authenticated_with_user(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let mut context = current_context(&request);
    match state
        .authenticator
        .authenticated_with_user(&mut context)
        .await
    {
        Ok(_) => {
            request.extensions_mut().insert(context);
            next.run(request).await
        }
        Err(rejection) => {
            let response = rejection.error.into_response();
            let jar = apply_update(jar, rejection.update, state.secure_cookies(), &response);
            (jar, response).into_response()
        }
    }
}

fn current_context(request: &Request) -> SessionContext {
    request
        .extensions()
        .get::<SessionContext>()
        .cloned()
        .unwrap_or_default()
}
