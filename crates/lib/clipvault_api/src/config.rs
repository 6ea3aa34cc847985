//! API server configuration.

use clipvault_core::auth::AuthError;
use clipvault_core::config::AuthConfig;

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:8000").
    pub bind_addr: String,
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// Mark auth cookies `Secure` with `SameSite=None`.
    pub secure_cookies: bool,
    /// Browser origin allowed to call the API with credentials.
    pub cors_origin: Option<String>,
    /// Token secrets, lifetimes and hashing cost.
    pub auth: AuthConfig,
}

impl ApiConfig {
    /// Reads configuration from environment variables.
    ///
    /// | Variable         | Default                                  |
    /// |------------------|------------------------------------------|
    /// | `BIND_ADDR`      | `127.0.0.1:8000`                         |
    /// | `DATABASE_URL`   | `postgres://localhost:5432/clipvault`    |
    /// | `SECURE_COOKIES` | `true`                                   |
    /// | `CORS_ORIGIN`    | unset (same-origin only)                 |
    ///
    /// Token settings come from [`AuthConfig::from_env`]; missing secrets are
    /// a `Configuration` error.
    pub fn from_env() -> Result<Self, AuthError> {
        Ok(Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8000".into()),
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost:5432/clipvault".into()),
            secure_cookies: std::env::var("SECURE_COOKIES")
                .map(|v| !matches!(v.trim().to_ascii_lowercase().as_str(), "0" | "false" | "no" | "off"))
                .unwrap_or(true),
            cors_origin: std::env::var("CORS_ORIGIN").ok().filter(|v| !v.is_empty()),
            auth: AuthConfig::from_env()?,
        })
    }
}
