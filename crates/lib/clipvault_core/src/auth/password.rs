//! Password hashing via bcrypt.

use std::fmt;

use tracing::debug;

use super::AuthError;

/// bcrypt cost factor used unless configured otherwise.
pub const DEFAULT_BCRYPT_COST: u32 = 10;
pub const MIN_BCRYPT_COST: u32 = 4;
pub const MAX_BCRYPT_COST: u32 = 31;

/// An opaque bcrypt hash.
///
/// Only [`PasswordHasher::hash`] produces new values; values loaded from the
/// store come back through [`PasswordHash::from_stored`]. There is no way to
/// turn a plaintext into a `PasswordHash` without hashing it.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// Wrap a hash read back from the credential store.
    pub fn from_stored(value: String) -> Self {
        Self(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PasswordHash(<redacted>)")
    }
}

/// Salted bcrypt hasher. The work runs on the blocking pool.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Result<Self, AuthError> {
        if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&cost) {
            return Err(AuthError::Configuration(format!(
                "bcrypt cost {cost} outside {MIN_BCRYPT_COST}..={MAX_BCRYPT_COST}"
            )));
        }
        Ok(Self { cost })
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Hash a plaintext password with a fresh random salt.
    pub async fn hash(&self, plaintext: &str) -> Result<PasswordHash, AuthError> {
        let plaintext = plaintext.to_owned();
        let cost = self.cost;
        tokio::task::spawn_blocking(move || bcrypt::hash(plaintext, cost))
            .await
            .map_err(|e| AuthError::Infrastructure(format!("bcrypt task: {e}")))?
            .map(PasswordHash)
            .map_err(|e| AuthError::Infrastructure(format!("bcrypt hash: {e}")))
    }

    /// Verify a password against a stored hash.
    ///
    /// A malformed hash verifies as `false`; only a failed hashing task is an
    /// error.
    pub async fn verify(&self, plaintext: &str, hash: &PasswordHash) -> Result<bool, AuthError> {
        let plaintext = plaintext.to_owned();
        let hash = hash.0.clone();
        let outcome = tokio::task::spawn_blocking(move || bcrypt::verify(plaintext, &hash))
            .await
            .map_err(|e| AuthError::Infrastructure(format!("bcrypt task: {e}")))?;
        match outcome {
            Ok(matches) => Ok(matches),
            Err(e) => {
                debug!(error = %e, "stored password hash is malformed");
                Ok(false)
            }
        }
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self {
            cost: DEFAULT_BCRYPT_COST,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> PasswordHasher {
        PasswordHasher::new(MIN_BCRYPT_COST).unwrap()
    }

    #[tokio::test]
    async fn verify_accepts_original_password() {
        let h = hasher();
        let hash = h.hash("correct horse").await.unwrap();
        assert!(h.verify("correct horse", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn verify_rejects_other_password() {
        let h = hasher();
        let hash = h.hash("correct horse").await.unwrap();
        assert!(!h.verify("battery staple", &hash).await.unwrap());
        assert!(!h.verify("", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn hash_is_salted_and_never_plaintext() {
        let h = hasher();
        let a = h.hash("same").await.unwrap();
        let b = h.hash("same").await.unwrap();
        assert_ne!(a, b);
        assert_ne!(a.as_str(), "same");
        assert!(a.as_str().starts_with("$2"));
    }

    #[tokio::test]
    async fn malformed_hash_verifies_false() {
        let h = hasher();
        let garbage = PasswordHash::from_stored("not-a-bcrypt-hash".into());
        assert!(!h.verify("anything", &garbage).await.unwrap());
        let empty = PasswordHash::from_stored(String::new());
        assert!(!h.verify("anything", &empty).await.unwrap());
    }

    #[test]
    fn cost_out_of_range_is_configuration_error() {
        assert!(matches!(
            PasswordHasher::new(2),
            Err(AuthError::Configuration(_))
        ));
        assert!(PasswordHasher::new(MAX_BCRYPT_COST + 1).is_err());
        assert_eq!(PasswordHasher::default().cost(), DEFAULT_BCRYPT_COST);
    }

    #[test]
    fn debug_does_not_leak_hash() {
        let hash = PasswordHash::from_stored("$2b$04$abcdefghijklmnopqrstuv".into());
        assert_eq!(format!("{hash:?}"), "PasswordHash(<redacted>)");
    }
}
