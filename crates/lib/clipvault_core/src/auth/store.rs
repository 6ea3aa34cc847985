//! Credential store seam.
//!
//! The session manager and the authorization gate only ever touch account
//! records through this trait. Implementations: [`super::queries::PgCredentialStore`]
//! and [`super::memory::MemoryCredentialStore`].

use async_trait::async_trait;

use super::AuthError;
use super::password::PasswordHash;
use crate::models::auth::{Account, NewAccount};

/// Outcome of a refresh-token write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTokenUpdate {
    Applied,
    /// The stored value did not equal the expected one; nothing was written.
    Conflict,
    /// No account with that id.
    Missing,
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Match `identifier` against the username (case-insensitive) or the
    /// email (exact, as stored).
    async fn find_account_by_username_or_email(
        &self,
        identifier: &str,
    ) -> Result<Option<Account>, AuthError>;

    async fn find_account_by_id(&self, id: &str) -> Result<Option<Account>, AuthError>;

    /// Set (or clear, with `None`) the stored refresh token.
    ///
    /// With `expected = Some(x)` the write only happens if the stored value
    /// currently equals `x`, atomically with respect to other writers of the
    /// same account. With `expected = None` the write is unconditional.
    async fn update_refresh_token(
        &self,
        id: &str,
        new_value: Option<&str>,
        expected: Option<&str>,
    ) -> Result<RefreshTokenUpdate, AuthError>;

    /// Replace the password hash. `NotFound` if the account is gone.
    async fn update_password_hash(&self, id: &str, new_hash: &PasswordHash) -> Result<(), AuthError>;

    /// Replace fullname and email, returning the updated account.
    /// `NotFound` if the account is gone, `AlreadyExists` if another account
    /// holds the email.
    async fn update_account_details(
        &self,
        id: &str,
        fullname: &str,
        email: &str,
    ) -> Result<Account, AuthError>;

    /// Insert a new account. `AlreadyExists` on a username or email clash.
    async fn create_account(&self, account: NewAccount) -> Result<Account, AuthError>;
}
