//! Authentication domain models.
//!
//! These are internal domain models, distinct from the API models in
//! `clipvault_api` (which rename fields to camelCase).

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::password::PasswordHash;

/// Stored account record, including credentials.
#[derive(Clone)]
pub struct Account {
    pub id: String,
    /// Lowercase, unique.
    pub username: String,
    /// Unique.
    pub email: String,
    pub fullname: String,
    pub avatar: Option<String>,
    pub cover_image: Option<String>,
    pub password_hash: PasswordHash,
    /// The single refresh token currently valid for this account.
    pub refresh_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// The account without password hash or refresh token.
    pub fn profile(&self) -> Profile {
        Profile {
            id: self.id.clone(),
            username: self.username.clone(),
            email: self.email.clone(),
            fullname: self.fullname.clone(),
            avatar: self.avatar.clone(),
            cover_image: self.cover_image.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("has_refresh_token", &self.refresh_token.is_some())
            .finish_non_exhaustive()
    }
}

/// A new account as handed to the credential store.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub fullname: String,
    pub avatar: Option<String>,
    pub cover_image: Option<String>,
    pub password_hash: PasswordHash,
}

/// Registration input with the plaintext password.
#[derive(Clone)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub fullname: String,
    pub password: String,
    pub avatar: Option<String>,
    pub cover_image: Option<String>,
}

/// Redacted account view safe to return to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub username: String,
    pub email: String,
    pub fullname: String,
    pub avatar: Option<String>,
    pub cover_image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// JWT claims embedded in access and refresh tokens.
///
/// Refresh tokens carry only `sub`, `jti`, `iat` and `exp`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject: account id.
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Unique token id.
    pub jti: String,
    /// Issued at (unix timestamp).
    pub iat: i64,
    /// Expiry (unix timestamp).
    pub exp: i64,
}

/// Freshly minted access/refresh pair.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub access_expires_in: i64,
    /// Refresh token lifetime in seconds.
    pub refresh_expires_in: i64,
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_expires_in", &self.access_expires_in)
            .field("refresh_expires_in", &self.refresh_expires_in)
            .finish_non_exhaustive()
    }
}

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub tokens: TokenPair,
    pub profile: Profile,
}

/// Identity resolved by the authorization gate for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionClaims {
    pub account_id: String,
    /// Username as embedded in the access token.
    pub username: String,
    /// Email as embedded in the access token.
    pub email: String,
    pub issued_at: i64,
    pub expires_at: i64,
    /// Current profile loaded from the store.
    pub profile: Profile,
}
