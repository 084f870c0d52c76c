// Striped async locks keyed by string

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use tokio::sync::{Mutex, MutexGuard};

const DEFAULT_STRIPES: usize = 64;

/// Serializes read-decide-write sequences per key within this process
///
/// The same key always maps to the same stripe. Distinct keys may share a
/// stripe and then wait on each other.
pub struct KeyedLock {
    stripes: Vec<Mutex<()>>,
}

impl KeyedLock {
    pub fn new() -> Self {
        Self::with_stripes(DEFAULT_STRIPES)
    }

    pub fn with_stripes(count: usize) -> Self {
        Self {
            stripes: (0..count.max(1)).map(|_| Mutex::new(())).collect(),
        }
    }

    pub async fn lock(&self, key: &str) -> MutexGuard<'_, ()> {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        let stripe = (hasher.finish() % self.stripes.len() as u64) as usize;
        self.stripes[stripe].lock().await
    }
}

impl Default for KeyedLock {
    fn default() -> Self {
        Self::new()
    }
}
