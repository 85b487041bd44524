//! Cache-aside profile reads.
//!
//! Read path: cache hit serves the snapshot directly; a miss reads the
//! store, populates the cache, and reports `cached = false`. Mutations
//! invalidate (delete) the entry instead of updating it in place. The
//! cache is a best-effort accelerator here: any cache failure degrades to
//! a direct store read. Misses are never negative-cached, so a hot missing
//! key re-queries the store every time (accepted stampede risk).

use std::sync::Arc;

use tracing::warn;
use uuid::Uuid;

use crate::cache::Cache;
use crate::error::AuthError;
use crate::models::UserProfile;
use crate::store::CredentialStore;

/// Cache key for a user's profile snapshot.
pub fn profile_key(user_id: Uuid) -> String {
    format!("user:{user_id}")
}

/// A profile read, tagged with whether the cache served it.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedProfile {
    pub profile: UserProfile,
    pub cached: bool,
}

/// Read-through / write-invalidate mediator over the credential store.
pub struct ProfileCache {
    store: Arc<dyn CredentialStore>,
    cache: Arc<dyn Cache>,
    ttl_secs: u64,
}

impl ProfileCache {
    pub fn new(store: Arc<dyn CredentialStore>, cache: Arc<dyn Cache>, ttl_secs: u64) -> Self {
        Self {
            store,
            cache,
            ttl_secs,
        }
    }

    /// Fetch a user's public profile, preferring the cached snapshot.
    pub async fn get_profile(&self, user_id: Uuid) -> Result<CachedProfile, AuthError> {
        let key = profile_key(user_id);

        match self.cache.get(&key).await {
            Ok(Some(raw)) => match serde_json::from_str::<UserProfile>(&raw) {
                Ok(profile) => {
                    return Ok(CachedProfile {
                        profile,
                        cached: true,
                    });
                }
                Err(e) => {
                    // Unreadable snapshot: drop it and fall through to the store.
                    warn!(%user_id, error = %e, "discarding undecodable profile snapshot");
                    let _ = self.cache.delete(&key).await;
                }
            },
            Ok(None) => {}
            Err(e) => {
                warn!(%user_id, error = %e, "profile cache read failed, falling back to store");
            }
        }

        let user = self
            .store
            .find_user_by_id(user_id)
            .await?
            .ok_or(AuthError::NotFound)?;
        let profile = user.profile();

        self.populate(&profile).await;

        Ok(CachedProfile {
            profile,
            cached: false,
        })
    }

    /// Write a profile snapshot into the cache. Best-effort.
    pub async fn populate(&self, profile: &UserProfile) {
        let key = profile_key(profile.id);
        match serde_json::to_string(profile) {
            Ok(raw) => {
                if let Err(e) = self.cache.set(&key, &raw, Some(self.ttl_secs)).await {
                    warn!(user_id = %profile.id, error = %e, "profile cache populate failed");
                }
            }
            Err(e) => warn!(user_id = %profile.id, error = %e, "profile snapshot serialize failed"),
        }
    }

    /// Drop a user's snapshot after a mutation. Best-effort.
    pub async fn invalidate(&self, user_id: Uuid) {
        if let Err(e) = self.cache.delete(&profile_key(user_id)).await {
            warn!(%user_id, error = %e, "profile cache invalidate failed");
        }
    }
}
