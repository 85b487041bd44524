//! Key-value cache boundary.
//!
//! One store, two uses: profile snapshots (best-effort accelerator) and
//! rate-limit counters (authoritative, fail-closed). Entries are never the
//! source of truth for user or token state.

pub mod memory;

use async_trait::async_trait;

use crate::error::CacheError;

/// A key-value store with per-key expiry and an atomic increment.
#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Set `key` to `value`, expiring after `ttl_secs` if given.
    async fn set(&self, key: &str, value: &str, ttl_secs: Option<u64>) -> Result<(), CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Atomically increment the counter at `key`, returning the new count.
    ///
    /// Whenever the post-increment count is exactly 1 (fresh key, expired
    /// key, or a counter sitting at zero) the expiry is set from
    /// `ttl_secs`. Any other increment leaves the expiry untouched.
    async fn increment(&self, key: &str, ttl_secs: Option<u64>) -> Result<i64, CacheError>;
}
