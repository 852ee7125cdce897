//! Per-key mutual exclusion for single-flight computation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Serializes work that shares a key while letting different keys proceed
/// in parallel. Idle keys are pruned.
#[derive(Debug, Default)]
pub struct KeyLocks {
    inner: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl KeyLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` while holding the lock for `key`.
    pub fn with_key<R>(&self, key: &str, f: impl FnOnce() -> R) -> R {
        let lock = {
            let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(map.entry(key.to_string()).or_default())
        };

        let result = {
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            f()
        };

        let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        // One reference in the map and one here means nobody else is waiting.
        if Arc::strong_count(&lock) == 2 {
            map.remove(key);
        }
        result
    }

    /// Number of keys currently held or awaited.
    pub fn active(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
