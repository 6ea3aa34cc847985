//! Credential engine configuration.

use std::fmt;

use chrono::Duration;

use crate::auth::AuthError;
use crate::auth::password::{DEFAULT_BCRYPT_COST, MAX_BCRYPT_COST, MIN_BCRYPT_COST};

pub const ACCESS_TOKEN_SECRET_VAR: &str = "ACCESS_TOKEN_SECRET";
pub const REFRESH_TOKEN_SECRET_VAR: &str = "REFRESH_TOKEN_SECRET";
pub const ACCESS_TOKEN_EXPIRES_IN_VAR: &str = "ACCESS_TOKEN_EXPIRES_IN";
pub const REFRESH_TOKEN_EXPIRES_IN_VAR: &str = "REFRESH_TOKEN_EXPIRES_IN";
pub const BCRYPT_COST_VAR: &str = "BCRYPT_COST";
pub const REVOKE_SESSIONS_VAR: &str = "REVOKE_SESSIONS_ON_PASSWORD_CHANGE";

/// Access token lifetime: 15 minutes.
const DEFAULT_ACCESS_TOKEN_TTL_SECS: i64 = 15 * 60;

/// Refresh token lifetime: 10 days.
const DEFAULT_REFRESH_TOKEN_TTL_SECS: i64 = 10 * 24 * 60 * 60;

/// Configuration for password hashing and token signing.
#[derive(Clone)]
pub struct AuthConfig {
    /// HS256 secret for access tokens.
    pub access_token_secret: String,
    /// HS256 secret for refresh tokens. Must differ from the access secret.
    pub refresh_token_secret: String,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
    /// bcrypt work factor.
    pub bcrypt_cost: u32,
    /// Clear the stored refresh token when the password changes.
    ///
    /// Off by default: existing sessions survive a password change.
    pub revoke_sessions_on_password_change: bool,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("access_token_secret", &"<redacted>")
            .field("refresh_token_secret", &"<redacted>")
            .field("access_token_ttl", &self.access_token_ttl)
            .field("refresh_token_ttl", &self.refresh_token_ttl)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .field(
                "revoke_sessions_on_password_change",
                &self.revoke_sessions_on_password_change,
            )
            .finish()
    }
}

impl AuthConfig {
    /// Build a config from two secrets with default lifetimes and cost.
    pub fn new(access_token_secret: impl Into<String>, refresh_token_secret: impl Into<String>) -> Self {
        Self {
            access_token_secret: access_token_secret.into(),
            refresh_token_secret: refresh_token_secret.into(),
            access_token_ttl: Duration::seconds(DEFAULT_ACCESS_TOKEN_TTL_SECS),
            refresh_token_ttl: Duration::seconds(DEFAULT_REFRESH_TOKEN_TTL_SECS),
            bcrypt_cost: DEFAULT_BCRYPT_COST,
            revoke_sessions_on_password_change: false,
        }
    }

    /// Reads configuration from environment variables.
    ///
    /// | Variable                             | Default    |
    /// |--------------------------------------|------------|
    /// | `ACCESS_TOKEN_SECRET`                | required   |
    /// | `REFRESH_TOKEN_SECRET`               | required   |
    /// | `ACCESS_TOKEN_EXPIRES_IN`            | `15m`      |
    /// | `REFRESH_TOKEN_EXPIRES_IN`           | `10d`      |
    /// | `BCRYPT_COST`                        | `10`       |
    /// | `REVOKE_SESSIONS_ON_PASSWORD_CHANGE` | `false`    |
    pub fn from_env() -> Result<Self, AuthError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`AuthConfig::from_env`] over an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AuthError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::new(
            lookup(ACCESS_TOKEN_SECRET_VAR).unwrap_or_default(),
            lookup(REFRESH_TOKEN_SECRET_VAR).unwrap_or_default(),
        );

        if let Some(raw) = lookup(ACCESS_TOKEN_EXPIRES_IN_VAR) {
            config.access_token_ttl = parse_duration(&raw).ok_or_else(|| {
                AuthError::Configuration(format!("{ACCESS_TOKEN_EXPIRES_IN_VAR}: invalid duration '{raw}'"))
            })?;
        }
        if let Some(raw) = lookup(REFRESH_TOKEN_EXPIRES_IN_VAR) {
            config.refresh_token_ttl = parse_duration(&raw).ok_or_else(|| {
                AuthError::Configuration(format!("{REFRESH_TOKEN_EXPIRES_IN_VAR}: invalid duration '{raw}'"))
            })?;
        }
        if let Some(raw) = lookup(BCRYPT_COST_VAR) {
            config.bcrypt_cost = raw.trim().parse().map_err(|_| {
                AuthError::Configuration(format!("{BCRYPT_COST_VAR}: not a number '{raw}'"))
            })?;
        }
        if let Some(raw) = lookup(REVOKE_SESSIONS_VAR) {
            config.revoke_sessions_on_password_change = parse_bool(&raw).ok_or_else(|| {
                AuthError::Configuration(format!("{REVOKE_SESSIONS_VAR}: not a boolean '{raw}'"))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the engine cannot run with.
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.access_token_secret.is_empty() {
            return Err(AuthError::Configuration(format!("{ACCESS_TOKEN_SECRET_VAR} is not set")));
        }
        if self.refresh_token_secret.is_empty() {
            return Err(AuthError::Configuration(format!("{REFRESH_TOKEN_SECRET_VAR} is not set")));
        }
        if self.access_token_secret == self.refresh_token_secret {
            return Err(AuthError::Configuration(
                "access and refresh token secrets must differ".into(),
            ));
        }
        if self.access_token_ttl <= Duration::zero() {
            return Err(AuthError::Configuration("access token lifetime must be positive".into()));
        }
        if self.refresh_token_ttl <= Duration::zero() {
            return Err(AuthError::Configuration("refresh token lifetime must be positive".into()));
        }
        if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&self.bcrypt_cost) {
            return Err(AuthError::Configuration(format!(
                "bcrypt cost {} outside {MIN_BCRYPT_COST}..={MAX_BCRYPT_COST}",
                self.bcrypt_cost
            )));
        }
        Ok(())
    }
}

/// Parse `<n>`, `<n>s`, `<n>m`, `<n>h` or `<n>d` into a duration.
///
/// A bare number is seconds.
pub fn parse_duration(value: &str) -> Option<Duration> {
    let value = value.trim();
    let split = value.find(|c: char| !c.is_ascii_digit()).unwrap_or(value.len());
    let (digits, unit) = value.split_at(split);
    let n: i64 = digits.parse().ok()?;
    let duration = match unit {
        "" | "s" => Duration::try_seconds(n)?,
        "m" => Duration::try_minutes(n)?,
        "h" => Duration::try_hours(n)?,
        "d" => Duration::try_days(n)?,
        _ => return None,
    };
    Some(duration)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn parse_duration_units() {
        assert_eq!(parse_duration("90"), Some(Duration::seconds(90)));
        assert_eq!(parse_duration("30s"), Some(Duration::seconds(30)));
        assert_eq!(parse_duration("15m"), Some(Duration::minutes(15)));
        assert_eq!(parse_duration("1h"), Some(Duration::hours(1)));
        assert_eq!(parse_duration("10d"), Some(Duration::days(10)));
    }

    #[test]
    fn parse_duration_rejects_garbage() {
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration("m"), None);
        assert_eq!(parse_duration("5w"), None);
        assert_eq!(parse_duration("-5m"), None);
    }

    #[test]
    fn from_lookup_applies_defaults() {
        let config = AuthConfig::from_lookup(lookup_from(&[
            (ACCESS_TOKEN_SECRET_VAR, "access"),
            (REFRESH_TOKEN_SECRET_VAR, "refresh"),
        ]))
        .expect("config");
        assert_eq!(config.access_token_ttl, Duration::minutes(15));
        assert_eq!(config.refresh_token_ttl, Duration::days(10));
        assert_eq!(config.bcrypt_cost, DEFAULT_BCRYPT_COST);
        assert!(!config.revoke_sessions_on_password_change);
    }

    #[test]
    fn from_lookup_reads_overrides() {
        let config = AuthConfig::from_lookup(lookup_from(&[
            (ACCESS_TOKEN_SECRET_VAR, "access"),
            (REFRESH_TOKEN_SECRET_VAR, "refresh"),
            (ACCESS_TOKEN_EXPIRES_IN_VAR, "1h"),
            (REFRESH_TOKEN_EXPIRES_IN_VAR, "30d"),
            (BCRYPT_COST_VAR, "12"),
            (REVOKE_SESSIONS_VAR, "true"),
        ]))
        .expect("config");
        assert_eq!(config.access_token_ttl, Duration::hours(1));
        assert_eq!(config.refresh_token_ttl, Duration::days(30));
        assert_eq!(config.bcrypt_cost, 12);
        assert!(config.revoke_sessions_on_password_change);
    }

    #[test]
    fn missing_secret_is_configuration_error() {
        let err = AuthConfig::from_lookup(lookup_from(&[(ACCESS_TOKEN_SECRET_VAR, "access")]))
            .unwrap_err();
        assert!(matches!(err, AuthError::Configuration(_)));
    }

    #[test]
    fn shared_secret_is_rejected() {
        let err = AuthConfig::new("same", "same").validate().unwrap_err();
        assert!(matches!(err, AuthError::Configuration(_)));
    }

    #[test]
    fn out_of_range_cost_is_rejected() {
        let mut config = AuthConfig::new("a", "b");
        config.bcrypt_cost = 3;
        assert!(config.validate().is_err());
        config.bcrypt_cost = 32;
        assert!(config.validate().is_err());
    }

    #[test]
    fn bad_duration_is_rejected() {
        let err = AuthConfig::from_lookup(lookup_from(&[
            (ACCESS_TOKEN_SECRET_VAR, "access"),
            (REFRESH_TOKEN_SECRET_VAR, "refresh"),
            (ACCESS_TOKEN_EXPIRES_IN_VAR, "soon"),
        ]))
        .unwrap_err();
        assert!(matches!(err, AuthError::Configuration(_)));
    }

    #[test]
    fn debug_redacts_secrets() {
        let rendered = format!("{:?}", AuthConfig::new("top-secret-a", "top-secret-b"));
        assert!(!rendered.contains("top-secret"));
    }
}
