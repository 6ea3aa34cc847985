//! Account and session request handlers.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum_extra::extract::cookie::CookieJar;
use clipvault_core::auth::AuthError;
use clipvault_core::models::auth::Registration;
use tracing::debug;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{
    ChangePasswordRequest, LoginRequest, LoginResponse, RefreshRequest, RegisterRequest,
    SuccessResponse, TokenResponse, UserProfile,
};
use crate::services::cookies;

/// `POST /api/v1/users/register`: create a new account.
pub async fn register_handler(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<UserProfile>)> {
    let profile = state
        .sessions
        .register(Registration {
            username: body.username,
            email: body.email,
            fullname: body.fullname,
            password: body.password,
            avatar: body.avatar,
            cover_image: body.cover_image,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(profile.into())))
}

/// `POST /api/v1/users/login`: authenticate with username or email + password.
pub async fn login_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<LoginRequest>,
) -> AppResult<(CookieJar, Json<LoginResponse>)> {
    let username = body.username.filter(|u| !u.trim().is_empty());
    let email = body.email.filter(|e| !e.trim().is_empty());

    // Either identifier may match, as with a username-or-email lookup.
    let outcome = match (username, email) {
        (Some(username), Some(email)) => {
            match state.sessions.login(&username, &body.password).await {
                Err(AuthError::NotFound) => state.sessions.login(&email, &body.password).await?,
                other => other?,
            }
        }
        (Some(identifier), None) | (None, Some(identifier)) => {
            state.sessions.login(&identifier, &body.password).await?
        }
        (None, None) => {
            return Err(AppError::Validation("Username or email is required".into()));
        }
    };

    let secure = state.config.secure_cookies;
    let jar = jar
        .add(cookies::access_cookie(
            &outcome.tokens.access_token,
            outcome.tokens.access_expires_in,
            secure,
        ))
        .add(cookies::refresh_cookie(
            &outcome.tokens.refresh_token,
            outcome.tokens.refresh_expires_in,
            secure,
        ));

    Ok((
        jar,
        Json(LoginResponse {
            user: outcome.profile.into(),
            tokens: outcome.tokens.into(),
        }),
    ))
}

/// `POST /api/v1/users/refresh-token`: exchange the refresh token (cookie or
/// body) for a new pair.
pub async fn refresh_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Bytes,
) -> AppResult<(CookieJar, Json<TokenResponse>)> {
    let from_body = if body.trim_ascii().is_empty() {
        RefreshRequest::default()
    } else {
        serde_json::from_slice::<RefreshRequest>(&body).map_err(|e| {
            debug!(error = %e, "unparseable refresh body");
            AppError::Validation("Malformed request body".into())
        })?
    };
    let presented = jar
        .get(cookies::REFRESH_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|t| !t.is_empty())
        .or(from_body.refresh_token);

    let tokens = state.sessions.refresh(presented.as_deref()).await?;

    let secure = state.config.secure_cookies;
    let jar = jar
        .add(cookies::access_cookie(&tokens.access_token, tokens.access_expires_in, secure))
        .add(cookies::refresh_cookie(&tokens.refresh_token, tokens.refresh_expires_in, secure));

    Ok((jar, Json(tokens.into())))
}

/// `POST /api/v1/users/logout`: clear the stored refresh token and the cookies.
pub async fn logout_handler(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<AuthenticatedUser>,
    jar: CookieJar,
) -> AppResult<(CookieJar, Json<SuccessResponse>)> {
    state.sessions.logout(&user.0.account_id).await?;

    let secure = state.config.secure_cookies;
    let jar = jar
        .add(cookies::clear_access_cookie(secure))
        .add(cookies::clear_refresh_cookie(secure));

    Ok((jar, Json(SuccessResponse { success: true })))
}

/// `POST /api/v1/users/change-password`: replace the password after checking the old one.
pub async fn change_password_handler(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<AuthenticatedUser>,
    Json(body): Json<ChangePasswordRequest>,
) -> AppResult<Json<SuccessResponse>> {
    if body.old_password.is_empty() || body.new_password.is_empty() {
        return Err(AppError::Validation(
            "Old and new passwords are required".into(),
        ));
    }
    state
        .sessions
        .change_password(&user.0.account_id, &body.old_password, &body.new_password)
        .await?;
    Ok(Json(SuccessResponse { success: true }))
}
