//! In-process credential store.
//!
//! Every compare-and-swap runs under the write lock, so concurrent refresh
//! rotations resolve the same way as the conditional `UPDATE` in
//! [`super::queries`].

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::AuthError;
use super::password::PasswordHash;
use super::store::{CredentialStore, RefreshTokenUpdate};
use crate::models::auth::{Account, NewAccount};
use crate::uuid::uuidv7;

/// Accounts keyed by id.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    accounts: RwLock<HashMap<String, Account>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove an account, as account deletion elsewhere would.
    pub async fn remove_account(&self, id: &str) -> Option<Account> {
        self.accounts.write().await.remove(id)
    }

    pub async fn len(&self) -> usize {
        self.accounts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.accounts.read().await.is_empty()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn find_account_by_username_or_email(
        &self,
        identifier: &str,
    ) -> Result<Option<Account>, AuthError> {
        let username = fold_case(identifier);
        let accounts = self.accounts.read().await;
        Ok(accounts
            .values()
            .find(|a| a.username == username || a.email == identifier)
            .cloned())
    }

    async fn find_account_by_id(&self, id: &str) -> Result<Option<Account>, AuthError> {
        Ok(self.accounts.read().await.get(id).cloned())
    }

    async fn update_refresh_token(
        &self,
        id: &str,
        new_value: Option<&str>,
        expected: Option<&str>,
    ) -> Result<RefreshTokenUpdate, AuthError> {
        let mut accounts = self.accounts.write().await;
        let Some(account) = accounts.get_mut(id) else {
            return Ok(RefreshTokenUpdate::Missing);
        };
        if let Some(expected) = expected
            && account.refresh_token.as_deref() != Some(expected)
        {
            return Ok(RefreshTokenUpdate::Conflict);
        }
        account.refresh_token = new_value.map(str::to_string);
        account.updated_at = Utc::now();
        Ok(RefreshTokenUpdate::Applied)
    }

    async fn update_password_hash(&self, id: &str, new_hash: &PasswordHash) -> Result<(), AuthError> {
        let mut accounts = self.accounts.write().await;
        let account = accounts.get_mut(id).ok_or(AuthError::NotFound)?;
        account.password_hash = new_hash.clone();
        account.updated_at = Utc::now();
        Ok(())
    }

    async fn update_account_details(
        &self,
        id: &str,
        fullname: &str,
        email: &str,
    ) -> Result<Account, AuthError> {
        let mut accounts = self.accounts.write().await;
        let folded = fold_case(email);
        if accounts
            .values()
            .any(|a| a.id != id && fold_case(&a.email) == folded)
        {
            return Err(AuthError::AlreadyExists);
        }
        let account = accounts.get_mut(id).ok_or(AuthError::NotFound)?;
        account.fullname = fullname.to_string();
        account.email = email.to_string();
        account.updated_at = Utc::now();
        Ok(account.clone())
    }

    async fn create_account(&self, account: NewAccount) -> Result<Account, AuthError> {
        let mut accounts = self.accounts.write().await;
        let username = fold_case(&account.username);
        let email = fold_case(&account.email);
        let clash = accounts
            .values()
            .any(|a| fold_case(&a.username) == username || fold_case(&a.email) == email);
        if clash {
            return Err(AuthError::AlreadyExists);
        }
        let now = Utc::now();
        let created = Account {
            id: uuidv7().to_string(),
            username: account.username,
            email: account.email,
            fullname: account.fullname,
            avatar: account.avatar,
            cover_image: account.cover_image,
            password_hash: account.password_hash,
            refresh_token: None,
            created_at: now,
            updated_at: now,
        };
        accounts.insert(created.id.clone(), created.clone());
        Ok(created)
    }
}

/// Same folding as the `lower()` unique indexes in the `users` migration.
fn fold_case(value: &str) -> String {
    value.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_account(username: &str, email: &str) -> NewAccount {
        NewAccount {
            username: username.into(),
            email: email.into(),
            fullname: "Test User".into(),
            avatar: None,
            cover_image: None,
            password_hash: PasswordHash::from_stored("$2b$04$placeholder".into()),
        }
    }

    #[tokio::test]
    async fn lookup_by_username_ignores_case() {
        let store = MemoryCredentialStore::new();
        let created = store.create_account(new_account("alice", "alice@example.com")).await.unwrap();
        let found = store.find_account_by_username_or_email("ALICE").await.unwrap().unwrap();
        assert_eq!(found.id, created.id);
    }

    #[tokio::test]
    async fn lookup_by_email_is_exact() {
        let store = MemoryCredentialStore::new();
        store.create_account(new_account("alice", "alice@example.com")).await.unwrap();
        assert!(store.find_account_by_username_or_email("alice@example.com").await.unwrap().is_some());
        assert!(store.find_account_by_username_or_email("Alice@Example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_username_or_email_is_rejected() {
        let store = MemoryCredentialStore::new();
        store.create_account(new_account("alice", "alice@example.com")).await.unwrap();
        assert!(matches!(
            store.create_account(new_account("Alice", "other@example.com")).await,
            Err(AuthError::AlreadyExists)
        ));
        assert!(matches!(
            store.create_account(new_account("bob", "alice@example.com")).await,
            Err(AuthError::AlreadyExists)
        ));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn clash_check_folds_non_ascii_case() {
        let store = MemoryCredentialStore::new();
        store.create_account(new_account("élodie", "elodie@example.com")).await.unwrap();
        assert!(matches!(
            store.create_account(new_account("ÉLODIE", "other@example.com")).await,
            Err(AuthError::AlreadyExists)
        ));
        assert!(store.find_account_by_username_or_email("Élodie").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn account_details_update_rejects_taken_email() {
        let store = MemoryCredentialStore::new();
        let alice = store.create_account(new_account("alice", "alice@example.com")).await.unwrap();
        store.create_account(new_account("bob", "bob@example.com")).await.unwrap();

        assert!(matches!(
            store.update_account_details(&alice.id, "Alice", "bob@example.com").await,
            Err(AuthError::AlreadyExists)
        ));

        // Keeping its own email is not a clash.
        let updated = store
            .update_account_details(&alice.id, "Alice L.", "alice@example.com")
            .await
            .unwrap();
        assert_eq!(updated.fullname, "Alice L.");

        assert!(matches!(
            store.update_account_details("nope", "X", "x@example.com").await,
            Err(AuthError::NotFound)
        ));
    }

    #[tokio::test]
    async fn conditional_update_compares_current_value() {
        let store = MemoryCredentialStore::new();
        let id = store.create_account(new_account("alice", "a@x.io")).await.unwrap().id;

        let first = store.update_refresh_token(&id, Some("r1"), None).await.unwrap();
        assert_eq!(first, RefreshTokenUpdate::Applied);

        let stale = store.update_refresh_token(&id, Some("r2"), Some("r0")).await.unwrap();
        assert_eq!(stale, RefreshTokenUpdate::Conflict);

        let swap = store.update_refresh_token(&id, Some("r2"), Some("r1")).await.unwrap();
        assert_eq!(swap, RefreshTokenUpdate::Applied);

        let stored = store.find_account_by_id(&id).await.unwrap().unwrap();
        assert_eq!(stored.refresh_token.as_deref(), Some("r2"));
    }

    #[tokio::test]
    async fn conditional_update_on_cleared_token_conflicts() {
        let store = MemoryCredentialStore::new();
        let id = store.create_account(new_account("alice", "a@x.io")).await.unwrap().id;
        let outcome = store.update_refresh_token(&id, Some("r1"), Some("r0")).await.unwrap();
        assert_eq!(outcome, RefreshTokenUpdate::Conflict);
    }

    #[tokio::test]
    async fn missing_account_is_reported() {
        let store = MemoryCredentialStore::new();
        let outcome = store.update_refresh_token("nope", None, None).await.unwrap();
        assert_eq!(outcome, RefreshTokenUpdate::Missing);
        let hash = PasswordHash::from_stored("x".into());
        assert!(matches!(
            store.update_password_hash("nope", &hash).await,
            Err(AuthError::NotFound)
        ));
    }
}
