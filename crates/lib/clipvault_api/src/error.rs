//! Application error types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use clipvault_core::auth::AuthError;
use thiserror::Error;
use tracing::{debug, error};

use crate::models::ErrorResponse;

/// Convenience alias for handler return types.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level errors with HTTP status mapping.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Internal server error")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, message) = match &self {
            AppError::Validation(m) => (StatusCode::BAD_REQUEST, "validation_error", m.as_str()),
            AppError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, "unauthorized", m.as_str()),
            AppError::Conflict(m) => (StatusCode::CONFLICT, "conflict", m.as_str()),
            AppError::Unavailable(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "unavailable",
                "Service temporarily unavailable",
            ),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "Internal server error",
            ),
        };
        let body = Json(ErrorResponse {
            error: error.to_string(),
            message: message.to_string(),
        });
        (status, body).into_response()
    }
}

/// The only message clients see for any rejected credential or token.
pub const UNAUTHORIZED_MESSAGE: &str = "Invalid credentials";

// The specific rejection reason stays in the logs.
impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::NotFound => {
                debug!("auth rejected: account not found");
                AppError::Unauthorized(UNAUTHORIZED_MESSAGE.into())
            }
            AuthError::Unauthorized(reason) => {
                debug!(%reason, "auth rejected");
                AppError::Unauthorized(UNAUTHORIZED_MESSAGE.into())
            }
            AuthError::Conflict => {
                debug!("auth rejected: refresh token rotated concurrently");
                AppError::Unauthorized(UNAUTHORIZED_MESSAGE.into())
            }
            AuthError::AlreadyExists => AppError::Conflict("User already exists".into()),
            AuthError::Validation(msg) => AppError::Validation(msg),
            AuthError::Configuration(msg) => {
                error!(error = %msg, "auth configuration error");
                AppError::Internal(msg)
            }
            AuthError::Database(e) => {
                error!(error = %e, "credential store unavailable");
                AppError::Unavailable(e.to_string())
            }
            AuthError::Infrastructure(msg) => {
                error!(error = %msg, "auth infrastructure failure");
                AppError::Unavailable(msg)
            }
        }
    }
}
