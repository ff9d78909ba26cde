//! In-memory implementation of `ItemBackend`.
//!
//! Behaves like a DynamoDB table for the operations the cache uses: write
//! conditions are evaluated with the same semantics as the condition
//! expressions, batch limits and duplicate keys are rejected, and expired
//! items are kept and returned until something overwrites or deletes them.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use ddbcache_core::cache::WireValue;

use crate::storage::{
    BackendError, BackendResult, BatchGetOutput, ItemBackend, StoredItem, WriteCondition,
    MAX_BATCH_GET_ITEMS, MAX_BATCH_WRITE_ITEMS,
};

/// In-memory item backend for testing.
///
/// Clones share the same table.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBackend {
    items: Arc<RwLock<HashMap<String, StoredItem>>>,
    /// Maximum entries one batch call processes before reporting the rest as
    /// unprocessed. `None` processes everything.
    batch_capacity: Option<usize>,
    batch_get_calls: Arc<AtomicUsize>,
    batch_write_calls: Arc<AtomicUsize>,
}

impl InMemoryBackend {
    /// Creates a new empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Processes at most `capacity` entries per batch call, reporting the rest
    /// as unprocessed the way a throttled table does.
    pub fn with_batch_capacity(mut self, capacity: usize) -> Self {
        self.batch_capacity = Some(capacity);
        self
    }

    /// Writes an item directly, bypassing every condition.
    pub async fn insert(&self, item: StoredItem) {
        self.items.write().await.insert(item.key.clone(), item);
    }

    /// Reads an item directly, including expired ones.
    pub async fn raw_item(&self, key: &str) -> Option<StoredItem> {
        self.items.read().await.get(key).cloned()
    }

    /// Number of items in the table, including expired ones.
    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }

    /// Number of batch reads issued so far.
    pub fn batch_get_calls(&self) -> usize {
        self.batch_get_calls.load(Ordering::SeqCst)
    }

    /// Number of batch writes issued so far.
    pub fn batch_write_calls(&self) -> usize {
        self.batch_write_calls.load(Ordering::SeqCst)
    }

    fn processed_len(&self, requested: usize) -> usize {
        self.batch_capacity
            .map_or(requested, |capacity| capacity.min(requested))
    }
}

/// Evaluates a write condition against the current item.
fn condition_holds(condition: &WriteCondition, current: Option<&StoredItem>) -> bool {
    match condition {
        WriteCondition::MissingOrExpired { now } => match current {
            None => true,
            // A missing expiration attribute makes the comparison false.
            Some(item) => item.expires_at.is_some_and(|expires_at| expires_at <= *now),
        },
        WriteCondition::PresentAndLive { now } => {
            current.is_some_and(|item| item.expires_at.is_some_and(|expires_at| expires_at > *now))
        }
        WriteCondition::ValueEquals(expected) => {
            current.is_some_and(|item| &item.value == expected)
        }
    }
}

fn check(condition: Option<&WriteCondition>, current: Option<&StoredItem>) -> BackendResult<()> {
    match condition {
        Some(condition) if !condition_holds(condition, current) => {
            Err(BackendError::ConditionalCheckFailed)
        }
        _ => Ok(()),
    }
}

fn validate_batch<'a>(
    keys: impl Iterator<Item = &'a str>,
    limit: usize,
    operation: &str,
) -> BackendResult<()> {
    let mut seen = HashSet::new();
    for key in keys {
        if !seen.insert(key) {
            return Err(BackendError::Service(format!(
                "{operation} failed: Provided list of item keys contains duplicates"
            )));
        }
    }

    if seen.len() > limit {
        return Err(BackendError::Service(format!(
            "{operation} failed: Too many items requested for the {operation} call"
        )));
    }

    Ok(())
}

/// Adds `delta` to decimal text, keeping integers exact.
fn add_numeric(current: &str, delta: i64) -> Option<String> {
    if let Ok(int) = current.parse::<i64>() {
        return int.checked_add(delta).map(|sum| sum.to_string());
    }

    current
        .parse::<f64>()
        .ok()
        .map(|float| (float + delta as f64).to_string())
}

#[async_trait]
impl ItemBackend for InMemoryBackend {
    async fn get_item(&self, key: &str) -> BackendResult<Option<StoredItem>> {
        Ok(self.items.read().await.get(key).cloned())
    }

    async fn batch_get_items(&self, keys: &[String]) -> BackendResult<BatchGetOutput> {
        self.batch_get_calls.fetch_add(1, Ordering::SeqCst);
        validate_batch(
            keys.iter().map(String::as_str),
            MAX_BATCH_GET_ITEMS,
            "BatchGetItem",
        )?;

        let processed = self.processed_len(keys.len());
        let items = self.items.read().await;

        Ok(BatchGetOutput {
            items: keys[..processed]
                .iter()
                .filter_map(|key| items.get(key).cloned())
                .collect(),
            unprocessed: keys[processed..].to_vec(),
        })
    }

    async fn put_item(
        &self,
        item: StoredItem,
        condition: Option<WriteCondition>,
    ) -> BackendResult<()> {
        let mut items = self.items.write().await;
        check(condition.as_ref(), items.get(&item.key))?;
        items.insert(item.key.clone(), item);
        Ok(())
    }

    async fn batch_put_items(&self, batch: Vec<StoredItem>) -> BackendResult<Vec<String>> {
        self.batch_write_calls.fetch_add(1, Ordering::SeqCst);
        validate_batch(
            batch.iter().map(|item| item.key.as_str()),
            MAX_BATCH_WRITE_ITEMS,
            "BatchWriteItem",
        )?;

        let processed = self.processed_len(batch.len());
        let mut items = self.items.write().await;
        let mut unprocessed = Vec::new();

        for (index, item) in batch.into_iter().enumerate() {
            if index < processed {
                items.insert(item.key.clone(), item);
            } else {
                unprocessed.push(item.key);
            }
        }

        Ok(unprocessed)
    }

    async fn add_to_value(
        &self,
        key: &str,
        delta: i64,
        condition: WriteCondition,
    ) -> BackendResult<String> {
        let mut items = self.items.write().await;
        check(Some(&condition), items.get(key))?;

        let Some(item) = items.get_mut(key) else {
            // Only reachable for conditions that allow a missing item, which
            // the cache never pairs with an increment.
            return Err(BackendError::ConditionalCheckFailed);
        };

        let WireValue::Number(current) = &item.value else {
            return Err(BackendError::Service(
                "UpdateItem failed: An operand in the update expression has an incorrect data type"
                    .to_string(),
            ));
        };

        let updated = add_numeric(current, delta).ok_or_else(|| {
            BackendError::Service("UpdateItem failed: Number overflow".to_string())
        })?;
        item.value = WireValue::Number(updated.clone());

        Ok(updated)
    }

    async fn delete_item(
        &self,
        key: &str,
        condition: Option<WriteCondition>,
    ) -> BackendResult<()> {
        let mut items = self.items.write().await;
        check(condition.as_ref(), items.get(key))?;
        items.remove(key);
        Ok(())
    }
}
