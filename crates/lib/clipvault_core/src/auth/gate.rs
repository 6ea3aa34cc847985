//! Authorization gate: resolves the caller of a protected request.
//!
//! Read-only: the gate never writes to the credential store.

use std::sync::Arc;

use tracing::debug;

use super::AuthError;
use super::jwt::{TokenError, TokenKind, TokenVerifier};
use super::store::CredentialStore;
use crate::models::auth::SessionClaims;

#[derive(Clone)]
pub struct AuthorizationGate {
    store: Arc<dyn CredentialStore>,
    verifier: TokenVerifier,
}

impl AuthorizationGate {
    pub fn new(store: Arc<dyn CredentialStore>, verifier: TokenVerifier) -> Self {
        Self { store, verifier }
    }

    /// Verify a bearer access token and load the account it names.
    ///
    /// Invalid and expired tokens both come back as `Unauthorized`; only the
    /// log line tells them apart.
    pub async fn authorize(&self, access_token: Option<&str>) -> Result<SessionClaims, AuthError> {
        let token = access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AuthError::unauthorized("missing access token"))?;

        let claims = self
            .verifier
            .verify(token, TokenKind::Access)
            .map_err(|e| {
                match e {
                    TokenError::Expired => debug!("access token expired"),
                    TokenError::Invalid => debug!("access token invalid"),
                }
                AuthError::unauthorized(e.to_string())
            })?;

        let account = self
            .store
            .find_account_by_id(&claims.sub)
            .await?
            .ok_or_else(|| {
                debug!(account_id = %claims.sub, "access token for deleted account");
                AuthError::unauthorized("account no longer exists")
            })?;

        Ok(SessionClaims {
            account_id: account.id.clone(),
            username: claims.username.unwrap_or_else(|| account.username.clone()),
            email: claims.email.unwrap_or_else(|| account.email.clone()),
            issued_at: claims.iat,
            expires_at: claims.exp,
            profile: account.profile(),
        })
    }
}
