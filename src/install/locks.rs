//! Per-tool locks.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Serialises operations on the same tool name.
///
/// Operations on distinct names never contend beyond the brief map lookup.
#[derive(Debug, Default)]
pub struct NameLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl NameLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` while holding the lock for `name`.
    pub fn with_lock<T>(&self, name: &str, f: impl FnOnce() -> T) -> T {
        let lock = Arc::clone(self.map().entry(name.to_string()).or_default());
        let value = {
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            f()
        };
        drop(lock);
        self.map().retain(|_, lock| Arc::strong_count(lock) > 1);
        value
    }

    fn map(&self) -> MutexGuard<'_, HashMap<String, Arc<Mutex<()>>>> {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
