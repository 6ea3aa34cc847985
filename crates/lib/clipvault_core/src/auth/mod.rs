//! Authentication and authorization logic.
//!
//! Provides password hashing, JWT issuance and verification, the credential
//! store seam, the session manager (login, refresh rotation, logout, password
//! change) and the authorization gate run on every protected request.

pub mod gate;
pub mod jwt;
pub mod memory;
pub mod password;
pub mod queries;
pub mod session;
pub mod store;

#[cfg(test)]
pub(crate) mod test_support;

use thiserror::Error;

pub use gate::AuthorizationGate;
pub use session::SessionManager;
pub use store::{CredentialStore, RefreshTokenUpdate};

/// Authentication errors.
///
/// `NotFound`, `Unauthorized`, `Conflict`, `AlreadyExists` and `Validation`
/// are business outcomes. `Database` and `Infrastructure` are transient
/// system failures; `Configuration` is fatal at startup.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Account not found")]
    NotFound,

    /// The string is an internal reason for logs, never shown to clients.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Refresh token was rotated concurrently")]
    Conflict,

    #[error("Account already exists")]
    AlreadyExists,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Infrastructure error: {0}")]
    Infrastructure(String),
}

impl AuthError {
    pub(crate) fn unauthorized(reason: impl Into<String>) -> Self {
        AuthError::Unauthorized(reason.into())
    }

    /// True for store/hashing failures the caller may retry.
    pub fn is_infrastructure(&self) -> bool {
        matches!(self, AuthError::Database(_) | AuthError::Infrastructure(_))
    }
}
