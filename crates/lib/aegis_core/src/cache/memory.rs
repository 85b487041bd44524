//! In-process cache backend.
//!
//! DashMap-backed, suitable for a single-node deployment and for tests.
//! Per-key atomicity comes from the map's entry API; expiry is evaluated
//! lazily against the injected clock on access.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::cache::Cache;
use crate::clock::Clock;
use crate::error::CacheError;

#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

impl CacheEntry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(at) if now >= at)
    }
}

/// In-memory [`Cache`] implementation.
pub struct MemoryCache {
    entries: DashMap<String, CacheEntry>,
    clock: Arc<dyn Clock>,
}

impl MemoryCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
        }
    }

    fn expires_at(&self, ttl_secs: Option<u64>) -> Option<DateTime<Utc>> {
        ttl_secs.map(|secs| self.clock.now() + Duration::seconds(secs as i64))
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let now = self.clock.now();
        let expired = match self.entries.get(key) {
            None => return Ok(None),
            Some(entry) if entry.is_expired(now) => true,
            Some(entry) => return Ok(Some(entry.value.clone())),
        };
        if expired {
            self.entries.remove(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: Option<u64>) -> Result<(), CacheError> {
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                value: value.to_string(),
                expires_at: self.expires_at(ttl_secs),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.entries.remove(key);
        Ok(())
    }

    async fn increment(&self, key: &str, ttl_secs: Option<u64>) -> Result<i64, CacheError> {
        let now = self.clock.now();
        // The entry guard is held across read-modify-write, which is what
        // makes concurrent increments on one key yield distinct counts.
        let count = match self.entries.entry(key.to_string()) {
            Entry::Vacant(slot) => {
                slot.insert(CacheEntry {
                    value: "1".to_string(),
                    expires_at: self.expires_at(ttl_secs),
                });
                1
            }
            Entry::Occupied(mut slot) => {
                if slot.get().is_expired(now) {
                    // Window rolled over: restart the counter with a fresh expiry.
                    slot.insert(CacheEntry {
                        value: "1".to_string(),
                        expires_at: self.expires_at(ttl_secs),
                    });
                    1
                } else {
                    let next = slot.get().value.parse::<i64>().unwrap_or(0) + 1;
                    let entry = slot.get_mut();
                    entry.value = next.to_string();
                    // Counting up from zero re-arms the expiry, mirroring
                    // the INCR-then-EXPIRE-if-one idiom.
                    if next == 1 {
                        entry.expires_at = self.expires_at(ttl_secs);
                    }
                    next
                }
            }
        };
        Ok(count)
    }
}
