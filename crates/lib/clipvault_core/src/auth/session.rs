//! Session manager: registration, login, refresh rotation, logout, account
//! details and password change.
//!
//! An account is logged out while its stored refresh token is absent and
//! active while one is present. Exactly one refresh token is valid per
//! account: the one most recently written to the store.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::AuthError;
use super::gate::AuthorizationGate;
use super::jwt::{TokenError, TokenIssuer, TokenKind, TokenVerifier};
use super::password::PasswordHasher;
use super::store::{CredentialStore, RefreshTokenUpdate};
use crate::config::AuthConfig;
use crate::models::auth::{LoginOutcome, NewAccount, Profile, Registration, TokenPair};

#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn CredentialStore>,
    hasher: PasswordHasher,
    issuer: TokenIssuer,
    verifier: TokenVerifier,
    revoke_sessions_on_password_change: bool,
}

impl SessionManager {
    /// Build the engine. Fails with `Configuration` on unusable settings.
    pub fn new(config: &AuthConfig, store: Arc<dyn CredentialStore>) -> Result<Self, AuthError> {
        config.validate()?;
        Ok(Self {
            store,
            hasher: PasswordHasher::new(config.bcrypt_cost)?,
            issuer: TokenIssuer::from_config(config)?,
            verifier: TokenVerifier::from_config(config)?,
            revoke_sessions_on_password_change: config.revoke_sessions_on_password_change,
        })
    }

    /// Authorization gate sharing this manager's store and verifier.
    pub fn gate(&self) -> AuthorizationGate {
        AuthorizationGate::new(self.store.clone(), self.verifier.clone())
    }

    /// Create an account. Does not log it in.
    pub async fn register(&self, registration: Registration) -> Result<Profile, AuthError> {
        let username = registration.username.trim().to_lowercase();
        let email = registration.email.trim().to_lowercase();
        let fullname = registration.fullname.trim().to_string();
        if username.is_empty()
            || email.is_empty()
            || fullname.is_empty()
            || registration.password.trim().is_empty()
        {
            return Err(AuthError::Validation("All fields are required".into()));
        }

        if self.store.find_account_by_username_or_email(&username).await?.is_some()
            || self.store.find_account_by_username_or_email(&email).await?.is_some()
        {
            return Err(AuthError::AlreadyExists);
        }

        let password_hash = self.hasher.hash(&registration.password).await?;
        let account = self
            .store
            .create_account(NewAccount {
                username,
                email,
                fullname,
                avatar: non_blank(registration.avatar),
                cover_image: non_blank(registration.cover_image),
                password_hash,
            })
            .await?;

        info!(account_id = %account.id, username = %account.username, "account registered");
        Ok(account.profile())
    }

    /// Authenticate with username or email plus password.
    ///
    /// Writes the new refresh token to the store exactly once.
    pub async fn login(&self, identifier: &str, password: &str) -> Result<LoginOutcome, AuthError> {
        let account = self
            .store
            .find_account_by_username_or_email(identifier.trim())
            .await?
            .ok_or(AuthError::NotFound)?;

        if !self.hasher.verify(password, &account.password_hash).await? {
            debug!(account_id = %account.id, "login rejected: wrong password");
            return Err(AuthError::unauthorized("wrong password"));
        }

        let tokens = self
            .issuer
            .issue_pair(&account.id, &account.username, &account.email)?;

        match self
            .store
            .update_refresh_token(&account.id, Some(&tokens.refresh_token), None)
            .await?
        {
            RefreshTokenUpdate::Applied => {}
            RefreshTokenUpdate::Missing => return Err(AuthError::NotFound),
            RefreshTokenUpdate::Conflict => return Err(AuthError::Conflict),
        }

        info!(account_id = %account.id, username = %account.username, "account logged in");
        Ok(LoginOutcome {
            tokens,
            profile: account.profile(),
        })
    }

    /// Exchange the current refresh token for a new pair, rotating it.
    pub async fn refresh(&self, presented: Option<&str>) -> Result<TokenPair, AuthError> {
        let presented = presented
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AuthError::unauthorized("missing refresh token"))?;

        let claims = match self.verifier.verify(presented, TokenKind::Refresh) {
            Ok(claims) => claims,
            Err(TokenError::Expired) => {
                debug!("refresh token expired, re-login required");
                return Err(AuthError::unauthorized("refresh token expired"));
            }
            Err(TokenError::Invalid) => {
                warn!("invalid refresh token presented");
                return Err(AuthError::unauthorized("invalid refresh token"));
            }
        };

        let account = self
            .store
            .find_account_by_id(&claims.sub)
            .await?
            .ok_or_else(|| AuthError::unauthorized("refresh token for unknown account"))?;

        if account.refresh_token.as_deref() != Some(presented) {
            warn!(account_id = %account.id, "refresh token does not match stored value (reuse or logged out)");
            return Err(AuthError::unauthorized("refresh token does not match"));
        }

        let tokens = self
            .issuer
            .issue_pair(&account.id, &account.username, &account.email)?;

        match self
            .store
            .update_refresh_token(&account.id, Some(&tokens.refresh_token), Some(presented))
            .await?
        {
            RefreshTokenUpdate::Applied => {
                info!(account_id = %account.id, "refresh token rotated");
                Ok(tokens)
            }
            RefreshTokenUpdate::Conflict => {
                warn!(account_id = %account.id, "refresh token rotated concurrently");
                Err(AuthError::Conflict)
            }
            RefreshTokenUpdate::Missing => Err(AuthError::unauthorized("account removed during refresh")),
        }
    }

    /// Clear the stored refresh token. Idempotent.
    pub async fn logout(&self, account_id: &str) -> Result<(), AuthError> {
        match self.store.update_refresh_token(account_id, None, None).await? {
            RefreshTokenUpdate::Applied => info!(account_id, "account logged out"),
            RefreshTokenUpdate::Missing => debug!(account_id, "logout for unknown account"),
            RefreshTokenUpdate::Conflict => return Err(AuthError::Conflict),
        }
        Ok(())
    }

    /// Set fullname and email on the account. The email is normalized the
    /// same way as at registration and must not belong to another account.
    ///
    /// Access tokens already issued keep the old email claim until they expire.
    pub async fn update_account_details(
        &self,
        account_id: &str,
        fullname: &str,
        email: &str,
    ) -> Result<Profile, AuthError> {
        let fullname = fullname.trim();
        let email = email.trim().to_lowercase();
        if fullname.is_empty() || email.is_empty() {
            return Err(AuthError::Validation("All fields are required".into()));
        }

        let account = self
            .store
            .update_account_details(account_id, fullname, &email)
            .await?;

        info!(account_id, "account details updated");
        Ok(account.profile())
    }

    /// Replace the password after checking the old one.
    ///
    /// The refresh token is left alone unless
    /// `revoke_sessions_on_password_change` is set.
    pub async fn change_password(
        &self,
        account_id: &str,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        if new_password.trim().is_empty() {
            return Err(AuthError::Validation("New password is required".into()));
        }

        let account = self
            .store
            .find_account_by_id(account_id)
            .await?
            .ok_or(AuthError::NotFound)?;

        if !self.hasher.verify(old_password, &account.password_hash).await? {
            debug!(account_id, "password change rejected: wrong old password");
            return Err(AuthError::unauthorized("old password is incorrect"));
        }

        let new_hash = self.hasher.hash(new_password).await?;
        self.store.update_password_hash(account_id, &new_hash).await?;

        if self.revoke_sessions_on_password_change {
            self.store.update_refresh_token(account_id, None, None).await?;
            info!(account_id, "password changed, sessions revoked");
        } else {
            info!(account_id, "password changed");
        }
        Ok(())
    }
}

#[cfg(test)]
impl SessionManager {
    pub(crate) fn issuer_for_tests(&self) -> &TokenIssuer {
        &self.issuer
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
