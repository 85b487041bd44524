//! Credential store boundary.
//!
//! The authoritative home of user and refresh-token state. Every operation
//! is atomic at the single-row or bulk-update level; the session core never
//! assumes in-process mutual exclusion on top of it.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::AuthError;
use crate::models::{NewUser, RefreshTokenRecord, User, UserPatch};

/// Persistence capabilities required by the session core.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AuthError>;

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, AuthError>;

    /// Create a user row. A duplicate email yields [`AuthError::AlreadyExists`].
    async fn create_user(&self, new_user: NewUser) -> Result<User, AuthError>;

    /// Apply a partial update; absent fields are untouched.
    async fn update_user(&self, id: Uuid, patch: UserPatch) -> Result<(), AuthError>;

    async fn create_refresh_token(&self, record: RefreshTokenRecord) -> Result<(), AuthError>;

    async fn find_refresh_token(
        &self,
        token: &str,
    ) -> Result<Option<RefreshTokenRecord>, AuthError>;

    /// Mark refresh tokens revoked by filter: all rows for `user_id`, or
    /// only the row matching `token` when given. A single bulk update, so
    /// it is atomic and idempotent; returns the number of rows touched.
    async fn revoke_refresh_tokens(
        &self,
        user_id: Uuid,
        token: Option<&str>,
    ) -> Result<u64, AuthError>;
}
