//! Fixed-window rate limiting over the cache's atomic increment.
//!
//! The window is anchored at a key's first hit (window-reset-at-first-hit),
//! not a sliding window: bursts straddling a window boundary can briefly
//! exceed the nominal rate. That approximation is accepted; the tests pin
//! it down. The counters have no source of truth outside the cache, so a
//! cache outage fails the gated request closed instead of waving traffic
//! through.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::cache::Cache;
use crate::error::AuthError;

/// Ceiling and window for one limiter instance.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum hits per window.
    pub max_requests: i64,
    /// Window length in seconds, applied when a counter is created.
    pub window_secs: u64,
    /// When true, a successful request is un-counted afterwards so only
    /// failures burn the budget.
    pub skip_successful: bool,
}

impl RateLimitConfig {
    /// Authentication endpoints: 5 attempts per 15 minutes, failures only.
    pub fn auth_default() -> Self {
        Self {
            max_requests: 5,
            window_secs: 15 * 60,
            skip_successful: true,
        }
    }

    /// Coarse global ceiling: 100 requests per 15 minutes.
    pub fn global_default() -> Self {
        Self {
            max_requests: 100,
            window_secs: 15 * 60,
            skip_successful: false,
        }
    }
}

/// Counter-based admission gate keyed by `(class, client key)`.
pub struct RateLimiter {
    cache: Arc<dyn Cache>,
    class: String,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(cache: Arc<dyn Cache>, class: impl Into<String>, config: RateLimitConfig) -> Self {
        Self {
            cache,
            class: class.into(),
            config,
        }
    }

    fn counter_key(&self, key: &str) -> String {
        format!("ratelimit:{}:{}", self.class, key)
    }

    /// Count a hit for `key` and admit or reject it.
    ///
    /// Rejects with [`AuthError::RateLimited`] when the post-increment
    /// count exceeds the ceiling, and also when the cache is unreachable
    /// (fail closed).
    pub async fn check(&self, key: &str) -> Result<(), AuthError> {
        let counter_key = self.counter_key(key);
        let count = match self
            .cache
            .increment(&counter_key, Some(self.config.window_secs))
            .await
        {
            Ok(count) => count,
            Err(e) => {
                warn!(class = %self.class, error = %e, "rate-limit cache unreachable, failing closed");
                return Err(AuthError::RateLimited {
                    retry_after_secs: self.config.window_secs,
                });
            }
        };

        if count > self.config.max_requests {
            debug!(class = %self.class, key, count, "rate limit exceeded");
            return Err(AuthError::RateLimited {
                retry_after_secs: self.config.window_secs,
            });
        }
        Ok(())
    }

    /// Un-count a hit after the gated operation succeeded, when the
    /// skip-successful policy is on.
    ///
    /// Only decrements while the stored counter is positive, so racing
    /// decrements can never drive it negative. Best-effort: a cache error
    /// here just leaves the hit counted.
    pub async fn record_success(&self, key: &str) {
        if !self.config.skip_successful {
            return;
        }
        let counter_key = self.counter_key(key);
        let current = match self.cache.get(&counter_key).await {
            Ok(Some(value)) => value.parse::<i64>().unwrap_or(0),
            Ok(None) => return,
            Err(e) => {
                debug!(class = %self.class, error = %e, "skipping success decrement, cache unreachable");
                return;
            }
        };
        if current > 0
            && let Err(e) = self
                .cache
                .set(&counter_key, &(current - 1).to_string(), None)
                .await
        {
            debug!(class = %self.class, error = %e, "success decrement lost");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::memory::MemoryCache;
    use crate::clock::ManualClock;
    use crate::error::CacheError;
    use async_trait::async_trait;
    use chrono::Duration;

    fn limiter_with_clock(config: RateLimitConfig) -> (RateLimiter, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        let cache = Arc::new(MemoryCache::new(clock.clone()));
        (RateLimiter::new(cache, "auth", config), clock)
    }

    fn five_per_window() -> RateLimitConfig {
        RateLimitConfig {
            max_requests: 5,
            window_secs: 900,
            skip_successful: true,
        }
    }

    #[tokio::test]
    async fn sixth_hit_in_window_is_rejected() {
        let (limiter, _) = limiter_with_clock(five_per_window());
        for _ in 0..5 {
            limiter.check("1.2.3.4").await.unwrap();
        }
        assert!(matches!(
            limiter.check("1.2.3.4").await,
            Err(AuthError::RateLimited {
                retry_after_secs: 900
            })
        ));
    }

    #[tokio::test]
    async fn count_restarts_at_one_after_window_elapses() {
        let (limiter, clock) = limiter_with_clock(five_per_window());
        for _ in 0..6 {
            let _ = limiter.check("1.2.3.4").await;
        }
        clock.advance(Duration::seconds(901));
        // Back under the ceiling: the full budget is available again.
        for _ in 0..5 {
            limiter.check("1.2.3.4").await.unwrap();
        }
        assert!(limiter.check("1.2.3.4").await.is_err());
    }

    #[tokio::test]
    async fn window_anchors_at_first_hit_so_boundary_bursts_can_double() {
        // Fixed-window approximation: 5 hits late in one window plus 5
        // early in the next are all admitted, twice the nominal rate.
        let (limiter, clock) = limiter_with_clock(five_per_window());
        clock.advance(Duration::seconds(300));
        for _ in 0..5 {
            limiter.check("1.2.3.4").await.unwrap();
        }
        clock.advance(Duration::seconds(901));
        for _ in 0..5 {
            limiter.check("1.2.3.4").await.unwrap();
        }
    }

    #[tokio::test]
    async fn distinct_keys_have_independent_budgets() {
        let (limiter, _) = limiter_with_clock(five_per_window());
        for _ in 0..6 {
            let _ = limiter.check("1.2.3.4").await;
        }
        limiter.check("5.6.7.8").await.unwrap();
    }

    #[tokio::test]
    async fn success_gives_the_hit_back() {
        let (limiter, _) = limiter_with_clock(five_per_window());
        for _ in 0..5 {
            limiter.check("1.2.3.4").await.unwrap();
            limiter.record_success("1.2.3.4").await;
        }
        // Budget was refunded each time, so the "6th" attempt still fits.
        limiter.check("1.2.3.4").await.unwrap();
    }

    #[tokio::test]
    async fn success_decrement_never_goes_negative() {
        let cache = Arc::new(MemoryCache::new(Arc::new(ManualClock::default())));
        let limiter = RateLimiter::new(cache.clone(), "auth", five_per_window());

        limiter.check("k").await.unwrap();
        limiter.record_success("k").await;
        // Counter is now 0; a racing second decrement must be a no-op.
        limiter.record_success("k").await;
        assert_eq!(
            cache.get("ratelimit:auth:k").await.unwrap().as_deref(),
            Some("0")
        );
    }

    #[tokio::test]
    async fn record_success_is_a_noop_without_skip_policy() {
        let (limiter, _) = limiter_with_clock(RateLimitConfig {
            skip_successful: false,
            ..five_per_window()
        });
        for _ in 0..5 {
            limiter.check("1.2.3.4").await.unwrap();
            limiter.record_success("1.2.3.4").await;
        }
        assert!(limiter.check("1.2.3.4").await.is_err());
    }

    struct DownCache;

    #[async_trait]
    impl Cache for DownCache {
        async fn get(&self, _: &str) -> Result<Option<String>, CacheError> {
            Err(CacheError::Unavailable("down".into()))
        }
        async fn set(&self, _: &str, _: &str, _: Option<u64>) -> Result<(), CacheError> {
            Err(CacheError::Unavailable("down".into()))
        }
        async fn delete(&self, _: &str) -> Result<(), CacheError> {
            Err(CacheError::Unavailable("down".into()))
        }
        async fn increment(&self, _: &str, _: Option<u64>) -> Result<i64, CacheError> {
            Err(CacheError::Unavailable("down".into()))
        }
    }

    #[tokio::test]
    async fn cache_outage_fails_closed() {
        let limiter = RateLimiter::new(Arc::new(DownCache), "auth", five_per_window());
        assert!(matches!(
            limiter.check("1.2.3.4").await,
            Err(AuthError::RateLimited { .. })
        ));
    }
}
