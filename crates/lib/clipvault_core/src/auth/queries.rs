//! PostgreSQL credential store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::AuthError;
use super::password::PasswordHash;
use super::store::{CredentialStore, RefreshTokenUpdate};
use crate::models::auth::{Account, NewAccount};
use crate::uuid::uuidv7;

/// Column list matching [`AccountRow`].
const ACCOUNT_COLUMNS: &str = "id::text, username, email, fullname, avatar, cover_image, \
     password_hash, refresh_token, created_at, updated_at";

type AccountRow = (
    String,
    String,
    String,
    String,
    Option<String>,
    Option<String>,
    String,
    Option<String>,
    DateTime<Utc>,
    DateTime<Utc>,
);

fn account_from_row(row: AccountRow) -> Account {
    let (
        id,
        username,
        email,
        fullname,
        avatar,
        cover_image,
        password_hash,
        refresh_token,
        created_at,
        updated_at,
    ) = row;
    Account {
        id,
        username,
        email,
        fullname,
        avatar,
        cover_image,
        password_hash: PasswordHash::from_stored(password_hash),
        refresh_token,
        created_at,
        updated_at,
    }
}

/// Credential store backed by the `users` table.
#[derive(Debug, Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn account_exists(&self, id: &str) -> Result<bool, AuthError> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1::uuid)")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_account_by_username_or_email(
        &self,
        identifier: &str,
    ) -> Result<Option<Account>, AuthError> {
        let sql = format!(
            "SELECT {ACCOUNT_COLUMNS} FROM users WHERE username = lower($1) OR email = $1 LIMIT 1"
        );
        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(identifier)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(account_from_row))
    }

    async fn find_account_by_id(&self, id: &str) -> Result<Option<Account>, AuthError> {
        // Ids that are not UUIDs cannot exist; skip the cast error.
        if uuid::Uuid::parse_str(id).is_err() {
            return Ok(None);
        }
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM users WHERE id = $1::uuid");
        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(account_from_row))
    }

    async fn update_refresh_token(
        &self,
        id: &str,
        new_value: Option<&str>,
        expected: Option<&str>,
    ) -> Result<RefreshTokenUpdate, AuthError> {
        if uuid::Uuid::parse_str(id).is_err() {
            return Ok(RefreshTokenUpdate::Missing);
        }
        let result = match expected {
            Some(expected) => {
                sqlx::query(
                    "UPDATE users SET refresh_token = $2, updated_at = now() \
                     WHERE id = $1::uuid AND refresh_token = $3",
                )
                .bind(id)
                .bind(new_value)
                .bind(expected)
                .execute(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    "UPDATE users SET refresh_token = $2, updated_at = now() WHERE id = $1::uuid",
                )
                .bind(id)
                .bind(new_value)
                .execute(&self.pool)
                .await?
            }
        };

        if result.rows_affected() == 1 {
            return Ok(RefreshTokenUpdate::Applied);
        }
        if expected.is_some() && self.account_exists(id).await? {
            return Ok(RefreshTokenUpdate::Conflict);
        }
        Ok(RefreshTokenUpdate::Missing)
    }

    async fn update_password_hash(&self, id: &str, new_hash: &PasswordHash) -> Result<(), AuthError> {
        if uuid::Uuid::parse_str(id).is_err() {
            return Err(AuthError::NotFound);
        }
        let result = sqlx::query(
            "UPDATE users SET password_hash = $2, updated_at = now() WHERE id = $1::uuid",
        )
        .bind(id)
        .bind(new_hash.as_str())
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(AuthError::NotFound);
        }
        Ok(())
    }

    async fn update_account_details(
        &self,
        id: &str,
        fullname: &str,
        email: &str,
    ) -> Result<Account, AuthError> {
        if uuid::Uuid::parse_str(id).is_err() {
            return Err(AuthError::NotFound);
        }
        let sql = format!(
            "UPDATE users SET fullname = $2, email = $3, updated_at = now() \
             WHERE id = $1::uuid RETURNING {ACCOUNT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(id)
            .bind(fullname)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_unique_violation)?;
        row.map(account_from_row).ok_or(AuthError::NotFound)
    }

    async fn create_account(&self, account: NewAccount) -> Result<Account, AuthError> {
        let sql = format!(
            "INSERT INTO users (id, username, email, fullname, avatar, cover_image, password_hash) \
             VALUES ($1::uuid, $2, $3, $4, $5, $6, $7) RETURNING {ACCOUNT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(uuidv7().to_string())
            .bind(&account.username)
            .bind(&account.email)
            .bind(&account.fullname)
            .bind(&account.avatar)
            .bind(&account.cover_image)
            .bind(account.password_hash.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(map_unique_violation)?;
        Ok(account_from_row(row))
    }
}

fn map_unique_violation(e: sqlx::Error) -> AuthError {
    match e {
        sqlx::Error::Database(db) if db.is_unique_violation() => AuthError::AlreadyExists,
        other => AuthError::Database(other),
    }
}
