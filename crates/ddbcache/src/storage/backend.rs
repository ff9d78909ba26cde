//! The item-level API a cache backend exposes.

use async_trait::async_trait;
use thiserror::Error;

use ddbcache_core::cache::{CacheError, WireValue};

/// Maximum number of keys in one batch read.
pub const MAX_BATCH_GET_ITEMS: usize = 100;

/// Maximum number of items in one batch write.
pub const MAX_BATCH_WRITE_ITEMS: usize = 25;

/// One row of the cache table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredItem {
    pub key: String,
    pub value: WireValue,
    /// Epoch seconds. `None` only for rows written by something else.
    pub expires_at: Option<i64>,
}

impl StoredItem {
    pub fn new(key: impl Into<String>, value: WireValue, expires_at: i64) -> Self {
        Self {
            key: key.into(),
            value,
            expires_at: Some(expires_at),
        }
    }
}

/// Names of the three attributes the cache uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeNames {
    pub key: String,
    pub value: String,
    pub expiration: String,
}

impl Default for AttributeNames {
    fn default() -> Self {
        Self {
            key: "key".to_string(),
            value: "value".to_string(),
            expiration: "expires_at".to_string(),
        }
    }
}

/// Condition a write must satisfy at the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteCondition {
    /// The item does not exist, or its expiration is at or before `now`.
    MissingOrExpired { now: i64 },
    /// The item exists and its expiration is after `now`.
    PresentAndLive { now: i64 },
    /// The item exists and its value equals the given wire value.
    ValueEquals(WireValue),
}

/// Errors reported by an item backend.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// A write condition did not hold. Nothing was written.
    #[error("The conditional request failed")]
    ConditionalCheckFailed,
    /// An item read back from the table does not have the cache's shape.
    #[error("Invalid item: {0}")]
    InvalidItem(String),
    /// Any other failure: network, auth, throttling, validation.
    #[error("{0}")]
    Service(String),
}

impl From<BackendError> for CacheError {
    fn from(err: BackendError) -> Self {
        CacheError::Backend(err.to_string())
    }
}

/// Result type for backend operations.
pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// Result of one batch read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchGetOutput {
    pub items: Vec<StoredItem>,
    /// Keys the backend did not get to.
    pub unprocessed: Vec<String>,
}

/// Item operations of a schema-less key-value table.
///
/// Batch calls accept at most [`MAX_BATCH_GET_ITEMS`] keys or
/// [`MAX_BATCH_WRITE_ITEMS`] items without duplicates. Expired items are
/// returned like any other item.
#[async_trait]
pub trait ItemBackend: Send + Sync {
    /// Reads one item.
    async fn get_item(&self, key: &str) -> BackendResult<Option<StoredItem>>;

    /// Reads up to [`MAX_BATCH_GET_ITEMS`] items.
    async fn batch_get_items(&self, keys: &[String]) -> BackendResult<BatchGetOutput>;

    /// Writes an item, replacing any existing one, if `condition` holds.
    async fn put_item(
        &self,
        item: StoredItem,
        condition: Option<WriteCondition>,
    ) -> BackendResult<()>;

    /// Writes up to [`MAX_BATCH_WRITE_ITEMS`] items unconditionally.
    ///
    /// Returns the keys of the items that were not written.
    async fn batch_put_items(&self, items: Vec<StoredItem>) -> BackendResult<Vec<String>>;

    /// Atomically adds `delta` to a numeric value if `condition` holds.
    ///
    /// Returns the new value as decimal text.
    async fn add_to_value(
        &self,
        key: &str,
        delta: i64,
        condition: WriteCondition,
    ) -> BackendResult<String>;

    /// Deletes an item if `condition` holds. Deleting a missing item succeeds.
    async fn delete_item(&self, key: &str, condition: Option<WriteCondition>)
        -> BackendResult<()>;
}
