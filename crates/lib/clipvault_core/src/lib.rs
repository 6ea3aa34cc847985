//! # clipvault_core
//!
//! Credential lifecycle engine for ClipVault: password hashing, access/refresh
//! token issuance and rotation, and the authorization gate.

pub mod auth;
pub mod config;
pub mod migrate;
pub mod models;
pub mod uuid;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_not_empty() {
        assert!(!version().is_empty());
    }
}
