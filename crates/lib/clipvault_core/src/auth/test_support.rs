//! Shared fixtures for the auth unit tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Barrier;

use crate::auth::AuthError;
use crate::auth::memory::MemoryCredentialStore;
use crate::auth::password::{MIN_BCRYPT_COST, PasswordHash};
use crate::auth::session::SessionManager;
use crate::auth::store::{CredentialStore, RefreshTokenUpdate};
use crate::config::AuthConfig;
use crate::models::auth::{Account, NewAccount, Profile, Registration};

pub const PASSWORD: &str = "p4ssw0rd-one";

pub fn test_config() -> AuthConfig {
    let mut config = AuthConfig::new("test-access-secret", "test-refresh-secret");
    config.bcrypt_cost = MIN_BCRYPT_COST;
    config
}

pub fn test_manager() -> (SessionManager, Arc<MemoryCredentialStore>) {
    let store = Arc::new(MemoryCredentialStore::new());
    let manager = SessionManager::new(&test_config(), store.clone()).unwrap();
    (manager, store)
}

pub async fn register_alice(manager: &SessionManager) -> Profile {
    manager
        .register(Registration {
            username: "alice".into(),
            email: "alice@example.com".into(),
            fullname: "Alice Liddell".into(),
            password: PASSWORD.into(),
            avatar: Some("https://cdn.example.com/alice.png".into()),
            cover_image: None,
        })
        .await
        .unwrap()
}

/// Memory store whose `find_account_by_id`, once armed, holds each reader at
/// a barrier after the read so that `parties` readers all see the same
/// snapshot before any of them writes.
pub struct ReadBarrierStore {
    inner: MemoryCredentialStore,
    barrier: Barrier,
    armed: AtomicBool,
}

impl ReadBarrierStore {
    pub fn new(parties: usize) -> Self {
        Self {
            inner: MemoryCredentialStore::new(),
            barrier: Barrier::new(parties),
            armed: AtomicBool::new(false),
        }
    }

    pub fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    pub fn disarm(&self) {
        self.armed.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl CredentialStore for ReadBarrierStore {
    async fn find_account_by_username_or_email(
        &self,
        identifier: &str,
    ) -> Result<Option<Account>, AuthError> {
        self.inner.find_account_by_username_or_email(identifier).await
    }

    async fn find_account_by_id(&self, id: &str) -> Result<Option<Account>, AuthError> {
        let found = self.inner.find_account_by_id(id).await;
        if self.armed.load(Ordering::SeqCst) {
            self.barrier.wait().await;
        }
        found
    }

    async fn update_refresh_token(
        &self,
        id: &str,
        new_value: Option<&str>,
        expected: Option<&str>,
    ) -> Result<RefreshTokenUpdate, AuthError> {
        self.inner.update_refresh_token(id, new_value, expected).await
    }

    async fn update_password_hash(&self, id: &str, new_hash: &PasswordHash) -> Result<(), AuthError> {
        self.inner.update_password_hash(id, new_hash).await
    }

    async fn update_account_details(
        &self,
        id: &str,
        fullname: &str,
        email: &str,
    ) -> Result<Account, AuthError> {
        self.inner.update_account_details(id, fullname, email).await
    }

    async fn create_account(&self, account: NewAccount) -> Result<Account, AuthError> {
        self.inner.create_account(account).await
    }
}
