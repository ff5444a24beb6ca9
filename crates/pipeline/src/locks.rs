//! Per-key mutual exclusion for same-source writers.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// A lazily populated map of one mutex per key.
///
/// Callers holding different keys never block each other. Entries live as
/// long as the map; the key space is the set of known sources.
#[derive(Debug, Default)]
pub struct KeyedLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` while holding the lock for `key`.
    ///
    /// A panic inside a previous holder does not poison the key: the guarded
    /// data is `()`, so there is no state to protect.
    pub fn with_lock<T>(&self, key: &str, f: impl FnOnce() -> T) -> T {
        let lock = self.lock_for(key);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        f()
    }

    fn lock_for(&self, key: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(key.to_string()).or_default())
    }
}
