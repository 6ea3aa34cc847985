//! JWT token generation and verification.
//!
//! Access and refresh tokens are HS256 JWTs signed with distinct secrets, so a
//! token of one class never verifies as the other.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use thiserror::Error;

use super::AuthError;
use crate::config::AuthConfig;
use crate::models::auth::{TokenClaims, TokenPair};
use crate::uuid::uuidv7;

/// Which signing key a token belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Why a presented token was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    /// Malformed, wrong signature, or wrong key class.
    #[error("invalid token")]
    Invalid,
    /// Signature is valid but `exp` has passed.
    #[error("token expired")]
    Expired,
}

/// Mints signed, time-bounded tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    access_key: EncodingKey,
    refresh_key: EncodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenIssuer {
    pub fn from_config(config: &AuthConfig) -> Result<Self, AuthError> {
        config.validate()?;
        Ok(Self {
            access_key: EncodingKey::from_secret(config.access_token_secret.as_bytes()),
            refresh_key: EncodingKey::from_secret(config.refresh_token_secret.as_bytes()),
            access_ttl: config.access_token_ttl,
            refresh_ttl: config.refresh_token_ttl,
        })
    }

    /// Generate a signed access token carrying username and email.
    pub fn issue_access(&self, account_id: &str, username: &str, email: &str) -> Result<String, AuthError> {
        self.issue_access_at(Utc::now(), account_id, username, email)
    }

    /// Generate a signed refresh token carrying only the account id.
    pub fn issue_refresh(&self, account_id: &str) -> Result<String, AuthError> {
        self.issue_refresh_at(Utc::now(), account_id)
    }

    /// Generate a fresh access/refresh pair.
    pub fn issue_pair(&self, account_id: &str, username: &str, email: &str) -> Result<TokenPair, AuthError> {
        let now = Utc::now();
        Ok(TokenPair {
            access_token: self.issue_access_at(now, account_id, username, email)?,
            refresh_token: self.issue_refresh_at(now, account_id)?,
            access_expires_in: self.access_ttl.num_seconds(),
            refresh_expires_in: self.refresh_ttl.num_seconds(),
        })
    }

    pub(crate) fn issue_access_at(
        &self,
        now: DateTime<Utc>,
        account_id: &str,
        username: &str,
        email: &str,
    ) -> Result<String, AuthError> {
        let claims = TokenClaims {
            sub: account_id.to_string(),
            username: Some(username.to_string()),
            email: Some(email.to_string()),
            jti: uuidv7().to_string(),
            iat: now.timestamp(),
            exp: (now + self.access_ttl).timestamp(),
        };
        sign(&claims, &self.access_key)
    }

    pub(crate) fn issue_refresh_at(&self, now: DateTime<Utc>, account_id: &str) -> Result<String, AuthError> {
        let claims = TokenClaims {
            sub: account_id.to_string(),
            username: None,
            email: None,
            jti: uuidv7().to_string(),
            iat: now.timestamp(),
            exp: (now + self.refresh_ttl).timestamp(),
        };
        sign(&claims, &self.refresh_key)
    }
}

fn sign(claims: &TokenClaims, key: &EncodingKey) -> Result<String, AuthError> {
    encode(&Header::new(Algorithm::HS256), claims, key)
        .map_err(|e| AuthError::Configuration(format!("jwt encode: {e}")))
}

/// Checks signature and expiry of presented tokens.
#[derive(Clone)]
pub struct TokenVerifier {
    access_key: DecodingKey,
    refresh_key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn from_config(config: &AuthConfig) -> Result<Self, AuthError> {
        config.validate()?;
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "sub"]);
        Ok(Self {
            access_key: DecodingKey::from_secret(config.access_token_secret.as_bytes()),
            refresh_key: DecodingKey::from_secret(config.refresh_token_secret.as_bytes()),
            validation,
        })
    }

    /// Verify a token against the key of `kind`, returning its claims.
    pub fn verify(&self, token: &str, kind: TokenKind) -> Result<TokenClaims, TokenError> {
        let key = match kind {
            TokenKind::Access => &self.access_key,
            TokenKind::Refresh => &self.refresh_key,
        };
        decode::<TokenClaims>(token, key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AuthConfig {
        AuthConfig::new("access-secret", "refresh-secret")
    }

    fn pair() -> (TokenIssuer, TokenVerifier) {
        let config = config();
        (
            TokenIssuer::from_config(&config).unwrap(),
            TokenVerifier::from_config(&config).unwrap(),
        )
    }

    #[test]
    fn access_token_carries_profile_claims() {
        let (issuer, verifier) = pair();
        let token = issuer.issue_access("acc-1", "alice", "alice@example.com").unwrap();
        let claims = verifier.verify(&token, TokenKind::Access).unwrap();
        assert_eq!(claims.sub, "acc-1");
        assert_eq!(claims.username.as_deref(), Some("alice"));
        assert_eq!(claims.email.as_deref(), Some("alice@example.com"));
        assert_eq!(claims.exp - claims.iat, 15 * 60);
    }

    #[test]
    fn refresh_token_carries_only_account_id() {
        let (issuer, verifier) = pair();
        let token = issuer.issue_refresh("acc-1").unwrap();
        let claims = verifier.verify(&token, TokenKind::Refresh).unwrap();
        assert_eq!(claims.sub, "acc-1");
        assert!(claims.username.is_none());
        assert!(claims.email.is_none());
    }

    #[test]
    fn key_classes_do_not_cross_verify() {
        let (issuer, verifier) = pair();
        let access = issuer.issue_access("acc-1", "alice", "a@x.io").unwrap();
        let refresh = issuer.issue_refresh("acc-1").unwrap();
        assert_eq!(verifier.verify(&access, TokenKind::Refresh), Err(TokenError::Invalid));
        assert_eq!(verifier.verify(&refresh, TokenKind::Access), Err(TokenError::Invalid));
    }

    #[test]
    fn tokens_issued_together_are_unique() {
        let (issuer, _) = pair();
        let a = issuer.issue_refresh("acc-1").unwrap();
        let b = issuer.issue_refresh("acc-1").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn expired_token_is_distinguished() {
        let (issuer, verifier) = pair();
        let past = Utc::now() - Duration::hours(2);
        let token = issuer.issue_access_at(past, "acc-1", "alice", "a@x.io").unwrap();
        assert_eq!(verifier.verify(&token, TokenKind::Access), Err(TokenError::Expired));
    }

    #[test]
    fn tampered_signature_is_invalid() {
        let (issuer, verifier) = pair();
        let token = issuer.issue_access("acc-1", "alice", "a@x.io").unwrap();
        let (head, sig) = token.rsplit_once('.').unwrap();
        let flipped = if sig.starts_with('A') { "B" } else { "A" };
        let tampered = format!("{head}.{flipped}{}", &sig[1..]);
        assert_eq!(verifier.verify(&tampered, TokenKind::Access), Err(TokenError::Invalid));
    }

    #[test]
    fn foreign_secret_is_invalid() {
        let (_, verifier) = pair();
        let other = TokenIssuer::from_config(&AuthConfig::new("other-a", "other-r")).unwrap();
        let token = other.issue_access("acc-1", "alice", "a@x.io").unwrap();
        assert_eq!(verifier.verify(&token, TokenKind::Access), Err(TokenError::Invalid));
    }

    #[test]
    fn garbage_is_invalid() {
        let (_, verifier) = pair();
        assert_eq!(verifier.verify("", TokenKind::Access), Err(TokenError::Invalid));
        assert_eq!(verifier.verify("a.b.c", TokenKind::Refresh), Err(TokenError::Invalid));
    }

    #[test]
    fn issuer_rejects_invalid_config() {
        assert!(TokenIssuer::from_config(&AuthConfig::new("", "r")).is_err());
        assert!(TokenVerifier::from_config(&AuthConfig::new("k", "k")).is_err());
    }
}
