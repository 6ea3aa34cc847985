//! Authentication middleware: access token extraction and the authorization gate.

use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use clipvault_core::models::auth::SessionClaims;

use crate::AppState;
use crate::error::AppError;
use crate::services::cookies::ACCESS_COOKIE;

/// Identity resolved for this request, inserted into request extensions.
///
/// Handlers receive it as `Extension<AuthenticatedUser>`.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub SessionClaims);

/// Axum middleware: reads `Authorization: Bearer <token>` (or the
/// `accessToken` cookie), runs the authorization gate, and injects
/// `AuthenticatedUser` into request extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = access_token(request.headers());
    let claims = state.gate.authorize(token.as_deref()).await?;

    request.extensions_mut().insert(AuthenticatedUser(claims));

    Ok(next.run(request).await)
}

/// Bearer header first, then the access cookie.
fn access_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());
    if bearer.is_some() {
        return bearer;
    }
    CookieJar::from_headers(headers)
        .get(ACCESS_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|t| !t.is_empty())
}
