//! Weighted sliding-window rate limiter
//!
//! Approximates a true sliding window with two fixed-window counters: the
//! previous window's count decays linearly as the current window advances.
//! Requests carry a cost so expensive operations consume more of the budget.

use crate::application::keyed_lock::KeyedLock;
use crate::port::{CounterStore, TimeProvider};
use std::sync::Arc;
use tracing::warn;

pub const DEFAULT_LIMIT: u64 = 120;
pub const DEFAULT_WINDOW_MS: i64 = 60_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Cost units allowed per window
    pub limit: u64,
    pub window_ms: i64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            window_ms: DEFAULT_WINDOW_MS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u64,
    pub remaining: u64,
    /// 0 when allowed
    pub retry_after_ms: i64,
}

impl RateLimitDecision {
    fn open(limit: u64) -> Self {
        Self {
            allowed: true,
            limit,
            remaining: limit,
            retry_after_ms: 0,
        }
    }
}

pub struct WeightedRateLimiter {
    store: Arc<dyn CounterStore>,
    time_provider: Arc<dyn TimeProvider>,
    config: RateLimitConfig,
    /// Held from the counter reads to the increment
    keys: KeyedLock,
}

impl WeightedRateLimiter {
    pub fn new(
        store: Arc<dyn CounterStore>,
        time_provider: Arc<dyn TimeProvider>,
        config: RateLimitConfig,
    ) -> Self {
        Self {
            store,
            time_provider,
            config,
            keys: KeyedLock::new(),
        }
    }

    pub fn config(&self) -> RateLimitConfig {
        self.config
    }

    /// Check and, if allowed, consume `cost` units for `key`
    ///
    /// Concurrent checks on one key are serialized, so they never both spend
    /// the same headroom. Store failures let the request through.
    pub async fn check(&self, key: &str, cost: u64) -> RateLimitDecision {
        let _guard = self.keys.lock(key).await;
        let limit = self.config.limit;
        let window_ms = self.config.window_ms.max(1);
        let now = self.time_provider.now_millis();
        let window = now.div_euclid(window_ms);
        let elapsed = now.rem_euclid(window_ms);

        let counts = async {
            let previous = self.store.get(key, window - 1).await?;
            let current = self.store.get(key, window).await?;
            Ok::<_, crate::error::AppError>((previous, current))
        }
        .await;

        let (previous, current) = match counts {
            Ok(counts) => counts,
            Err(e) => {
                warn!(key = %key, error = %e, "Rate limit store unavailable, allowing request");
                return RateLimitDecision::open(limit);
            }
        };

        let decay = (window_ms - elapsed) as f64 / window_ms as f64;
        let estimate = previous as f64 * decay + current as f64;
        let limit_f = limit as f64;
        let cost_f = cost as f64;

        if estimate + cost_f <= limit_f {
            if let Err(e) = self
                .store
                .increment(key, window, cost, 2 * window_ms)
                .await
            {
                warn!(key = %key, error = %e, "Failed to record rate limit usage");
            }
            return RateLimitDecision {
                allowed: true,
                limit,
                remaining: (limit_f - estimate - cost_f).floor().max(0.0) as u64,
                retry_after_ms: 0,
            };
        }

        let retry_after_ms = if current + cost > limit {
            // Only a fresh window can fit this request
            window_ms - elapsed
        } else {
            // prev * (w - t) / w + curr + cost <= limit
            let headroom = (limit - current - cost) as f64;
            let t = window_ms as f64 - headroom * window_ms as f64 / previous as f64;
            ((t - elapsed as f64).ceil() as i64).clamp(1, window_ms - elapsed)
        };

        RateLimitDecision {
            allowed: false,
            limit,
            remaining: (limit_f - estimate).floor().max(0.0) as u64,
            retry_after_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::counter_store::mocks::FailingCounterStore;
    use crate::port::time_provider::mocks::FixedTimeProvider;
    use crate::error::Result;
    use crate::port::InMemoryCounterStore;
    use async_trait::async_trait;
    use tokio::task::JoinSet;

    /// Yields before every call, like a store behind a network hop
    struct YieldingStore(InMemoryCounterStore);

    #[async_trait]
    impl CounterStore for YieldingStore {
        async fn increment(&self, key: &str, window: i64, amount: u64, ttl_ms: i64) -> Result<u64> {
            tokio::task::yield_now().await;
            self.0.increment(key, window, amount, ttl_ms).await
        }

        async fn get(&self, key: &str, window: i64) -> Result<u64> {
            tokio::task::yield_now().await;
            self.0.get(key, window).await
        }
    }

    fn limiter(clock: Arc<FixedTimeProvider>) -> WeightedRateLimiter {
        let store = Arc::new(InMemoryCounterStore::new(clock.clone()));
        WeightedRateLimiter::new(
            store,
            clock,
            RateLimitConfig {
                limit: 10,
                window_ms: 1_000,
            },
        )
    }

    #[tokio::test]
    async fn test_allows_until_cost_exceeds_limit() {
        let clock = Arc::new(FixedTimeProvider::new(0));
        let limiter = limiter(clock);

        let first = limiter.check("tenant:a", 5).await;
        assert!(first.allowed);
        assert_eq!(first.remaining, 5);

        let second = limiter.check("tenant:a", 5).await;
        assert!(second.allowed);
        assert_eq!(second.remaining, 0);

        let third = limiter.check("tenant:a", 1).await;
        assert!(!third.allowed);
        assert_eq!(third.remaining, 0);
        // Current window alone is full: wait for the next one
        assert_eq!(third.retry_after_ms, 1_000);
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let clock = Arc::new(FixedTimeProvider::new(0));
        let limiter = limiter(clock);

        assert!(limiter.check("tenant:a", 10).await.allowed);
        assert!(!limiter.check("tenant:a", 1).await.allowed);
        assert!(limiter.check("tenant:b", 10).await.allowed);
    }

    #[tokio::test]
    async fn test_previous_window_decays() {
        let clock = Arc::new(FixedTimeProvider::new(0));
        let limiter = limiter(clock.clone());

        assert!(limiter.check("k", 10).await.allowed);

        // Halfway through the next window the old 10 weighs 5
        clock.set(1_500);
        let decision = limiter.check("k", 5).await;
        assert!(decision.allowed);
        assert_eq!(decision.remaining, 0);

        // 5 (decayed) + 5 (current) + 1 > 10, but the current window has room
        let denied = limiter.check("k", 1).await;
        assert!(!denied.allowed);
        assert_eq!(denied.retry_after_ms, 100);

        clock.set(1_600);
        assert!(limiter.check("k", 1).await.allowed);
    }

    #[tokio::test]
    async fn test_old_windows_are_forgotten() {
        let clock = Arc::new(FixedTimeProvider::new(0));
        let limiter = limiter(clock.clone());

        assert!(limiter.check("k", 10).await.allowed);
        clock.set(2_000);
        let decision = limiter.check("k", 10).await;
        assert!(decision.allowed);
    }

    #[tokio::test]
    async fn test_cost_larger_than_limit_is_never_allowed() {
        let clock = Arc::new(FixedTimeProvider::new(250));
        let limiter = limiter(clock);

        let decision = limiter.check("k", 11).await;
        assert!(!decision.allowed);
        assert_eq!(decision.remaining, 10);
        assert_eq!(decision.retry_after_ms, 750);
    }

    #[tokio::test]
    async fn test_concurrent_checks_share_one_budget() {
        let clock = Arc::new(FixedTimeProvider::new(0));
        let store = Arc::new(YieldingStore(InMemoryCounterStore::new(clock.clone())));
        let limiter = Arc::new(WeightedRateLimiter::new(
            store.clone(),
            clock,
            RateLimitConfig {
                limit: 10,
                window_ms: 1_000,
            },
        ));

        let mut checks = JoinSet::new();
        for _ in 0..8 {
            let limiter = limiter.clone();
            checks.spawn(async move { limiter.check("tenant:acme", 5).await.allowed });
        }
        let mut allowed = 0;
        while let Some(result) = checks.join_next().await {
            if result.unwrap() {
                allowed += 1;
            }
        }

        assert_eq!(allowed, 2);
        assert_eq!(store.0.get("tenant:acme", 0).await.unwrap(), 10);
    }

    #[tokio::test]
    async fn test_store_failure_fails_open() {
        let clock = Arc::new(FixedTimeProvider::new(0));
        let limiter = WeightedRateLimiter::new(
            Arc::new(FailingCounterStore),
            clock,
            RateLimitConfig::default(),
        );

        let decision = limiter.check("k", 5).await;
        assert!(decision.allowed);
        assert_eq!(decision.remaining, DEFAULT_LIMIT);
    }
}
