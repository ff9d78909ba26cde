use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::lock::{generate_owner, CacheLock};

use super::Result;

/// Cache operations an expiring key-value backend must provide.
///
/// Reads never return expired items. Writes are last-writer-wins except for
/// `add`, `increment` and `decrement`, which are conditional at the backend.
#[async_trait]
pub trait Store: Send + Sync {
    /// Gets a value by key.
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Gets several values at once. Every requested key is present in the result.
    async fn many(&self, keys: &[String]) -> Result<HashMap<String, Option<Value>>>;

    /// Stores a value for `ttl`. A zero TTL stores an already expired item.
    async fn put(&self, key: &str, value: &Value, ttl: Duration) -> Result<()>;

    /// Stores several values, all expiring at the same instant.
    async fn put_many(&self, values: &HashMap<String, Value>, ttl: Duration) -> Result<()>;

    /// Stores a value only if the key is absent or expired.
    async fn add(&self, key: &str, value: &Value, ttl: Duration) -> Result<bool>;

    /// Atomically adds `delta` to a live numeric value.
    ///
    /// Returns `None` if the key is absent or expired.
    async fn increment(&self, key: &str, delta: i64) -> Result<Option<i64>>;

    /// Atomically subtracts `delta` from a live numeric value.
    async fn decrement(&self, key: &str, delta: i64) -> Result<Option<i64>> {
        self.increment(key, delta.saturating_neg()).await
    }

    /// Stores a value with the longest expiration the backend models.
    async fn forever(&self, key: &str, value: &Value) -> Result<()>;

    /// Removes a value. Succeeds if the key does not exist.
    async fn forget(&self, key: &str) -> Result<()>;

    /// Removes every value.
    async fn flush(&self) -> Result<()>;

    /// The prefix applied to every key.
    fn prefix(&self) -> &str;
}

/// Conditional-write primitives backing [`CacheLock`].
#[async_trait]
pub trait LockProvider: Send + Sync {
    /// Writes `owner` under `name` if no live lock exists.
    async fn acquire_lock(&self, name: &str, owner: &str, ttl: Duration) -> Result<bool>;

    /// Deletes the lock only if it is held by `owner`.
    async fn release_lock(&self, name: &str, owner: &str) -> Result<bool>;

    /// Deletes the lock regardless of its owner.
    async fn force_release_lock(&self, name: &str) -> Result<()>;

    /// Returns the owner of the live lock, if any.
    async fn lock_owner(&self, name: &str) -> Result<Option<String>>;

    /// Creates a lock handle. A random owner token is generated if none is given.
    fn lock(&self, name: &str, ttl: Duration, owner: Option<String>) -> CacheLock<'_, Self>
    where
        Self: Sized,
    {
        CacheLock::new(self, name, ttl, owner.unwrap_or_else(generate_owner))
    }

    /// Rebuilds a handle for a lock already held by `owner`, without acquiring it.
    fn restore_lock(&self, name: &str, owner: &str) -> CacheLock<'_, Self>
    where
        Self: Sized,
    {
        CacheLock::new(self, name, Duration::ZERO, owner.to_string())
    }
}
