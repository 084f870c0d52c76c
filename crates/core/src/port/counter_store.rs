// Counter Store Port (INCR/EXPIRE contract used by the rate limiter)

use crate::error::Result;
use crate::port::TimeProvider;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Windowed counters that expire on their own
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Add `amount` to the counter of (key, window) and return the new value
    ///
    /// The counter expires `ttl_ms` after its first increment.
    async fn increment(&self, key: &str, window: i64, amount: u64, ttl_ms: i64) -> Result<u64>;

    /// Current value, 0 if missing or expired
    async fn get(&self, key: &str, window: i64) -> Result<u64>;
}

/// Process-local counter store
pub struct InMemoryCounterStore {
    counters: Mutex<HashMap<(String, i64), Counter>>,
    time_provider: Arc<dyn TimeProvider>,
}

struct Counter {
    value: u64,
    expires_at: i64,
}

impl InMemoryCounterStore {
    pub fn new(time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            counters: Mutex::new(HashMap::new()),
            time_provider,
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<(String, i64), Counter>>> {
        self.counters
            .lock()
            .map_err(|_| crate::error::AppError::Internal("Counter store poisoned".to_string()))
    }
}

#[async_trait]
impl CounterStore for InMemoryCounterStore {
    async fn increment(&self, key: &str, window: i64, amount: u64, ttl_ms: i64) -> Result<u64> {
        let now = self.time_provider.now_millis();
        let mut counters = self.lock()?;

        counters.retain(|_, c| c.expires_at > now);

        let counter = counters
            .entry((key.to_string(), window))
            .or_insert(Counter {
                value: 0,
                expires_at: now + ttl_ms,
            });
        counter.value += amount;
        Ok(counter.value)
    }

    async fn get(&self, key: &str, window: i64) -> Result<u64> {
        let now = self.time_provider.now_millis();
        let counters = self.lock()?;
        Ok(counters
            .get(&(key.to_string(), window))
            .filter(|c| c.expires_at > now)
            .map(|c| c.value)
            .unwrap_or(0))
    }
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;

    /// Store whose every call fails (fail-open tests)
    pub struct FailingCounterStore;

    #[async_trait]
    impl CounterStore for FailingCounterStore {
        async fn increment(&self, _key: &str, _window: i64, _amount: u64, _ttl: i64) -> Result<u64> {
            Err(crate::error::AppError::Database(
                "counter store unavailable".to_string(),
            ))
        }

        async fn get(&self, _key: &str, _window: i64) -> Result<u64> {
            Err(crate::error::AppError::Database(
                "counter store unavailable".to_string(),
            ))
        }
    }
}
