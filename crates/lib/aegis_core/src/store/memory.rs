//! In-memory credential store for tests and local development.
//!
//! Mirrors the Postgres backend's semantics (unique email, bulk revocation
//! by filter) without a database. Failure injection lets callers exercise
//! the `StoreUnavailable` paths.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use crate::error::AuthError;
use crate::models::{NewUser, RefreshTokenRecord, User, UserPatch};
use crate::store::CredentialStore;

/// DashMap-backed [`CredentialStore`].
#[derive(Default)]
pub struct MemoryCredentialStore {
    users: DashMap<Uuid, User>,
    refresh_tokens: DashMap<String, RefreshTokenRecord>,
    failing: AtomicBool,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// When set, every operation fails with `StoreUnavailable`.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), AuthError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AuthError::StoreUnavailable("injected failure".into()));
        }
        Ok(())
    }

    /// Number of user rows, for asserting that failed registrations mutate nothing.
    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    /// Number of refresh-token rows (revoked rows included; they are never deleted).
    pub fn refresh_token_count(&self) -> usize {
        self.refresh_tokens.len()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        self.check_available()?;
        Ok(self
            .users
            .iter()
            .find(|u| u.email == email)
            .map(|u| u.value().clone()))
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, AuthError> {
        self.check_available()?;
        Ok(self.users.get(&id).map(|u| u.value().clone()))
    }

    async fn create_user(&self, new_user: NewUser) -> Result<User, AuthError> {
        self.check_available()?;
        if self.users.iter().any(|u| u.email == new_user.email) {
            return Err(AuthError::AlreadyExists);
        }
        let user = User {
            id: Uuid::new_v4(),
            email: new_user.email,
            password_hash: new_user.password_hash,
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            is_active: true,
            is_verified: false,
            created_at: Utc::now(),
            last_login_at: None,
        };
        self.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update_user(&self, id: Uuid, patch: UserPatch) -> Result<(), AuthError> {
        self.check_available()?;
        let mut user = self.users.get_mut(&id).ok_or(AuthError::NotFound)?;
        if let Some(hash) = patch.password_hash {
            user.password_hash = hash;
        }
        if let Some(active) = patch.is_active {
            user.is_active = active;
        }
        if let Some(at) = patch.last_login_at {
            user.last_login_at = Some(at);
        }
        Ok(())
    }

    async fn create_refresh_token(&self, record: RefreshTokenRecord) -> Result<(), AuthError> {
        self.check_available()?;
        self.refresh_tokens.insert(record.token.clone(), record);
        Ok(())
    }

    async fn find_refresh_token(
        &self,
        token: &str,
    ) -> Result<Option<RefreshTokenRecord>, AuthError> {
        self.check_available()?;
        Ok(self.refresh_tokens.get(token).map(|r| r.value().clone()))
    }

    async fn revoke_refresh_tokens(
        &self,
        user_id: Uuid,
        token: Option<&str>,
    ) -> Result<u64, AuthError> {
        self.check_available()?;
        let mut touched = 0;
        for mut entry in self.refresh_tokens.iter_mut() {
            if entry.user_id == user_id && token.is_none_or(|t| t == entry.token) {
                entry.is_revoked = true;
                touched += 1;
            }
        }
        Ok(touched)
    }
}
