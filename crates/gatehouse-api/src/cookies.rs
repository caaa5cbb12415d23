//! Session cookies.
//!
//! Both cookies are `HttpOnly` with path `/`, and expire together with the
//! token they carry.

use axum::http::header::SET_COOKIE;
use axum::response::Response;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{DateTime, Utc};
use time::OffsetDateTime;

use gatehouse_auth::CredentialUpdate;

/// Cookie carrying the access token.
pub const ACCESS_COOKIE: &str = "jwt";

/// Cookie carrying the refresh token.
pub const REFRESH_COOKIE: &str = "refresh_token";

/// A session cookie expiring at `expires`.
pub fn session_cookie(
    name: &'static str,
    value: String,
    expires: DateTime<Utc>,
    secure: bool,
) -> Cookie<'static> {
    let mut builder = Cookie::build((name, value))
        .http_only(true)
        .path("/")
        .secure(secure)
        .same_site(SameSite::Lax);
    if let Ok(at) = OffsetDateTime::from_unix_timestamp(expires.timestamp()) {
        builder = builder.expires(at);
    }
    builder.build()
}

/// A cookie instructing the client to drop `name`.
///
/// Rendered as `Max-Age=0` with an `Expires` at the Unix epoch rather than a
/// negative `Max-Age`; RFC 6265 treats both as immediate deletion.
pub fn removal_cookie(name: &'static str) -> Cookie<'static> {
    Cookie::build((name, ""))
        .http_only(true)
        .path("/")
        .max_age(time::Duration::ZERO)
        .expires(OffsetDateTime::UNIX_EPOCH)
        .build()
}

/// Clear both session cookies.
pub fn clear_session(jar: CookieJar) -> CookieJar {
    jar.add(removal_cookie(ACCESS_COOKIE))
        .add(removal_cookie(REFRESH_COOKIE))
}

/// Apply an authentication outcome to the outgoing cookies, leaving alone
/// any cookie the handler already set.
pub fn apply_update(
    jar: CookieJar,
    update: CredentialUpdate,
    secure: bool,
    response: &Response,
) -> CookieJar {
    match update {
        CredentialUpdate::Keep => jar,
        CredentialUpdate::RenewedAccess { token, expires } => {
            if sets_cookie(response, ACCESS_COOKIE) {
                jar
            } else {
                jar.add(session_cookie(ACCESS_COOKIE, token, expires, secure))
            }
        }
        CredentialUpdate::ClearAll => [ACCESS_COOKIE, REFRESH_COOKIE]
            .into_iter()
            .filter(|name| !sets_cookie(response, name))
            .fold(jar, |jar, name| jar.add(removal_cookie(name))),
    }
}

/// Whether `response` already carries a `Set-Cookie` for `name`.
fn sets_cookie(response: &Response, name: &str) -> bool {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.split('=').next() == Some(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_cookie_attributes() {
        let expires = DateTime::from_timestamp(1_900_000_000, 0).unwrap();
        let cookie = session_cookie(ACCESS_COOKIE, "abc".to_string(), expires, false);
        let rendered = cookie.to_string();
        assert!(rendered.starts_with("jwt=abc"));
        assert!(rendered.contains("HttpOnly"));
        assert!(rendered.contains("Path=/"));
        assert!(!rendered.contains("Secure"));
        assert_eq!(
            cookie.expires_datetime().map(|t| t.unix_timestamp()),
            Some(1_900_000_000)
        );
    }

    #[test]
    fn test_removal_cookie_expires_immediately() {
        let cookie = removal_cookie(REFRESH_COOKIE);
        let rendered = cookie.to_string();
        assert!(rendered.starts_with("refresh_token=;"));
        assert!(rendered.contains("Max-Age=0"));
        assert!(rendered.contains("Path=/"));
        assert_eq!(
            cookie.expires_datetime().map(|t| t.unix_timestamp()),
            Some(0)
        );
    }

    #[test]
    fn test_update_skips_cookies_set_by_handler() {
        let mut response = Response::new(axum::body::Body::empty());
        response
            .headers_mut()
            .append(SET_COOKIE, "jwt=; Max-Age=0".parse().unwrap());

        let jar = apply_update(
            CookieJar::new(),
            CredentialUpdate::ClearAll,
            false,
            &response,
        );
        assert!(jar.get(ACCESS_COOKIE).is_none());
        assert!(jar.get(REFRESH_COOKIE).is_some());
    }
}
