//! Per-key mutual exclusion for mutating operations.
//!
//! Saves are keyed by preview ID and exports by user ID. A second operation
//! for a key that is already in flight is rejected with
//! [`PreviewError::Busy`] instead of racing the first one.

use std::collections::HashSet;
use std::fmt::Display;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::{PreviewError, PreviewResult};

/// Set of keys with an operation in flight.
#[derive(Debug)]
pub struct InFlight<K> {
    active: Arc<Mutex<HashSet<K>>>,
}

impl<K> Clone for InFlight<K> {
    fn clone(&self) -> Self {
        Self {
            active: Arc::clone(&self.active),
        }
    }
}

impl<K> Default for InFlight<K> {
    fn default() -> Self {
        Self {
            active: Arc::new(Mutex::new(HashSet::new())),
        }
    }
}

impl<K> InFlight<K>
where
    K: Eq + Hash + Clone + Display,
{
    /// Create an empty guard.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `key` as busy until the returned token is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`PreviewError::Busy`] if `key` is already in flight.
    pub fn try_acquire(&self, key: &K) -> PreviewResult<InFlightToken<K>> {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if !active.insert(key.clone()) {
            tracing::debug!(%key, "rejecting concurrent operation");
            return Err(PreviewError::Busy(key.to_string()));
        }
        Ok(InFlightToken {
            key: key.clone(),
            active: Arc::clone(&self.active),
        })
    }

    /// Whether `key` currently has an operation in flight.
    #[must_use]
    pub fn is_active(&self, key: &K) -> bool {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(key)
    }
}

/// Releases its key when dropped.
#[derive(Debug)]
pub struct InFlightToken<K: Eq + Hash> {
    key: K,
    active: Arc<Mutex<HashSet<K>>>,
}

impl<K: Eq + Hash> InFlightToken<K> {
    /// The key held by this token.
    #[must_use]
    pub fn key(&self) -> &K {
        &self.key
    }
}

impl<K: Eq + Hash> Drop for InFlightToken<K> {
    fn drop(&mut self) {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}
