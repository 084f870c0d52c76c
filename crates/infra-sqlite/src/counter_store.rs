// SQLite CounterStore Implementation
// Keeps rate-limit windows in the database so budgets survive a daemon restart

use crate::error::map_sqlx_error;
use async_trait::async_trait;
use hireloop_core::error::Result;
use hireloop_core::port::{CounterStore, TimeProvider};
use sqlx::SqlitePool;
use std::sync::Arc;

pub struct SqliteCounterStore {
    pool: SqlitePool,
    time_provider: Arc<dyn TimeProvider>,
}

impl SqliteCounterStore {
    pub fn new(pool: SqlitePool, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            pool,
            time_provider,
        }
    }
}

#[async_trait]
impl CounterStore for SqliteCounterStore {
    async fn increment(&self, key: &str, window: i64, amount: u64, ttl_ms: i64) -> Result<u64> {
        let now = self.time_provider.now_millis();

        sqlx::query("DELETE FROM rate_limit_counters WHERE counter_key = ? AND expires_at <= ?")
            .bind(key)
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        let value: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO rate_limit_counters (counter_key, window_index, value, expires_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(counter_key, window_index) DO UPDATE SET
                value = value + excluded.value
            RETURNING value
            "#,
        )
        .bind(key)
        .bind(window)
        .bind(amount as i64)
        .bind(now + ttl_ms)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(value.max(0) as u64)
    }

    async fn get(&self, key: &str, window: i64) -> Result<u64> {
        let now = self.time_provider.now_millis();

        let value: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT value FROM rate_limit_counters
            WHERE counter_key = ? AND window_index = ? AND expires_at > ?
            "#,
        )
        .bind(key)
        .bind(window)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(value.unwrap_or(0).max(0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::memory_pool;
    use hireloop_core::application::rate_limit::{RateLimitConfig, WeightedRateLimiter};
    use hireloop_core::port::time_provider::mocks::FixedTimeProvider;

    #[tokio::test]
    async fn test_increment_accumulates_per_window() {
        let clock = Arc::new(FixedTimeProvider::new(0));
        let store = SqliteCounterStore::new(memory_pool().await, clock);

        assert_eq!(store.increment("tenant:acme", 7, 3, 2_000).await.unwrap(), 3);
        assert_eq!(store.increment("tenant:acme", 7, 2, 2_000).await.unwrap(), 5);
        assert_eq!(store.increment("tenant:acme", 8, 1, 2_000).await.unwrap(), 1);

        assert_eq!(store.get("tenant:acme", 7).await.unwrap(), 5);
        assert_eq!(store.get("tenant:other", 7).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_counter_expires() {
        let clock = Arc::new(FixedTimeProvider::new(0));
        let store = SqliteCounterStore::new(memory_pool().await, clock.clone());

        store.increment("k", 0, 4, 1_000).await.unwrap();
        clock.set(1_000);
        assert_eq!(store.get("k", 0).await.unwrap(), 0);

        // An expired counter restarts from zero
        assert_eq!(store.increment("k", 0, 1, 1_000).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_limiter_over_sqlite_store() {
        let clock = Arc::new(FixedTimeProvider::new(0));
        let store = Arc::new(SqliteCounterStore::new(memory_pool().await, clock.clone()));
        let limiter = WeightedRateLimiter::new(
            store,
            clock,
            RateLimitConfig {
                limit: 10,
                window_ms: 1_000,
            },
        );

        assert!(limiter.check("tenant:acme", 6).await.allowed);
        let denied = limiter.check("tenant:acme", 5).await;
        assert!(!denied.allowed);
        assert_eq!(denied.remaining, 4);
    }
}
