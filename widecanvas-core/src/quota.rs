//! Per-user usage quota for paid conversions.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::PreviewResult;

/// Authenticated user identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Wrap an identifier issued by the auth provider.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Borrow the raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Storage for remaining-usage counters.
///
/// Counters are unsigned, so they never go below zero.
#[async_trait]
pub trait QuotaStore: Send + Sync {
    /// Remaining conversions, or `None` if the user has no record yet.
    async fn usage_left(&self, user: &UserId) -> PreviewResult<Option<u32>>;

    /// Create the record with zero usage if missing; return the current value.
    async fn ensure_user(&self, user: &UserId) -> PreviewResult<u32>;

    /// Overwrite the counter, e.g. after a purchase.
    async fn set_usage(&self, user: &UserId, usage_left: u32) -> PreviewResult<()>;

    /// Atomically decrement a positive counter.
    ///
    /// Returns the new value, or `None` if the counter was zero or missing.
    async fn decrement_if_positive(&self, user: &UserId) -> PreviewResult<Option<u32>>;
}

/// Thread-safe in-memory quota store.
#[derive(Debug, Clone, Default)]
pub struct MemoryQuotaStore {
    counters: Arc<Mutex<HashMap<UserId, u32>>>,
}

impl MemoryQuotaStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-seeded with one user.
    #[must_use]
    pub fn with_user(user: UserId, usage_left: u32) -> Self {
        let store = Self::new();
        store
            .counters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(user, usage_left);
        store
    }
}

#[async_trait]
impl QuotaStore for MemoryQuotaStore {
    async fn usage_left(&self, user: &UserId) -> PreviewResult<Option<u32>> {
        let counters = self.counters.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(counters.get(user).copied())
    }

    async fn ensure_user(&self, user: &UserId) -> PreviewResult<u32> {
        let mut counters = self.counters.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(*counters.entry(user.clone()).or_insert(0))
    }

    async fn set_usage(&self, user: &UserId, usage_left: u32) -> PreviewResult<()> {
        let mut counters = self.counters.lock().unwrap_or_else(PoisonError::into_inner);
        counters.insert(user.clone(), usage_left);
        Ok(())
    }

    async fn decrement_if_positive(&self, user: &UserId) -> PreviewResult<Option<u32>> {
        let mut counters = self.counters.lock().unwrap_or_else(PoisonError::into_inner);
        match counters.get_mut(user) {
            Some(left) if *left > 0 => {
                *left -= 1;
                Ok(Some(*left))
            }
            _ => Ok(None),
        }
    }
}
