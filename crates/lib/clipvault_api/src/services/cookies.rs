//! Cookie service: set/get/clear httpOnly auth cookies.
//!
//! Cookie names: `accessToken`, `refreshToken`.

use axum_extra::extract::cookie::{Cookie, SameSite};
use time::Duration;

/// Cookie name for the access token.
pub const ACCESS_COOKIE: &str = "accessToken";
/// Cookie name for the refresh token.
pub const REFRESH_COOKIE: &str = "refreshToken";

fn build(name: &str, value: &str, max_age: Duration, secure: bool) -> Cookie<'static> {
    // Cross-site cookies need `SameSite=None`, which browsers only honor with `Secure`.
    let same_site = if secure { SameSite::None } else { SameSite::Lax };
    Cookie::build((name.to_string(), value.to_string()))
        .http_only(true)
        .secure(secure)
        .same_site(same_site)
        .path("/".to_string())
        .max_age(max_age)
        .build()
}

/// Build a httpOnly cookie for the access token.
pub fn access_cookie(token: &str, max_age_secs: i64, secure: bool) -> Cookie<'static> {
    build(ACCESS_COOKIE, token, Duration::seconds(max_age_secs), secure)
}

/// Build a httpOnly cookie for the refresh token.
pub fn refresh_cookie(token: &str, max_age_secs: i64, secure: bool) -> Cookie<'static> {
    build(REFRESH_COOKIE, token, Duration::seconds(max_age_secs), secure)
}

/// Build expired cookie to clear the access token.
pub fn clear_access_cookie(secure: bool) -> Cookie<'static> {
    build(ACCESS_COOKIE, "", Duration::ZERO, secure)
}

/// Build expired cookie to clear the refresh token.
pub fn clear_refresh_cookie(secure: bool) -> Cookie<'static> {
    build(REFRESH_COOKIE, "", Duration::ZERO, secure)
}
