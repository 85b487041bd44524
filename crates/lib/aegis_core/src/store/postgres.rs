//! PostgreSQL credential store.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AuthError;
use crate::models::{NewUser, RefreshTokenRecord, User, UserPatch};
use crate::store::CredentialStore;

/// [`CredentialStore`] backed by a PostgreSQL pool. Call timeouts are owned
/// by the pool configuration (`acquire_timeout` plus statement timeouts),
/// so a wedged database surfaces here as `StoreUnavailable`.
#[derive(Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Map transport-level sqlx failures onto the domain taxonomy. Unique
/// violations are handled at the call sites that can race on them.
fn store_error(e: sqlx::Error) -> AuthError {
    AuthError::StoreUnavailable(e.to_string())
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_error)
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, AuthError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_error)
    }

    async fn create_user(&self, new_user: NewUser) -> Result<User, AuthError> {
        sqlx::query_as::<_, User>(
            "INSERT INTO users (email, password_hash, first_name, last_name) \
             VALUES ($1, $2, $3, $4) \
             RETURNING *",
        )
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .bind(&new_user.first_name)
        .bind(&new_user.last_name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            // Two concurrent registrations can both pass the existence
            // check; the unique index is the arbiter.
            sqlx::Error::Database(db) if db.is_unique_violation() => AuthError::AlreadyExists,
            _ => store_error(e),
        })
    }

    async fn update_user(&self, id: Uuid, patch: UserPatch) -> Result<(), AuthError> {
        sqlx::query(
            "UPDATE users SET \
                 password_hash = COALESCE($2, password_hash), \
                 is_active = COALESCE($3, is_active), \
                 last_login_at = COALESCE($4, last_login_at) \
             WHERE id = $1",
        )
        .bind(id)
        .bind(&patch.password_hash)
        .bind(patch.is_active)
        .bind(patch.last_login_at)
        .execute(&self.pool)
        .await
        .map_err(store_error)?;
        Ok(())
    }

    async fn create_refresh_token(&self, record: RefreshTokenRecord) -> Result<(), AuthError> {
        sqlx::query(
            "INSERT INTO refresh_tokens (token, user_id, expires_at, is_revoked, created_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&record.token)
        .bind(record.user_id)
        .bind(record.expires_at)
        .bind(record.is_revoked)
        .bind(record.created_at)
        .execute(&self.pool)
        .await
        .map_err(store_error)?;
        Ok(())
    }

    async fn find_refresh_token(
        &self,
        token: &str,
    ) -> Result<Option<RefreshTokenRecord>, AuthError> {
        sqlx::query_as::<_, RefreshTokenRecord>("SELECT * FROM refresh_tokens WHERE token = $1")
            .bind(token)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_error)
    }

    async fn revoke_refresh_tokens(
        &self,
        user_id: Uuid,
        token: Option<&str>,
    ) -> Result<u64, AuthError> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET is_revoked = TRUE \
             WHERE user_id = $1 AND ($2::text IS NULL OR token = $2)",
        )
        .bind(user_id)
        .bind(token)
        .execute(&self.pool)
        .await
        .map_err(store_error)?;
        Ok(result.rows_affected())
    }
}
