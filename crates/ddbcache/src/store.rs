//! Cache store over an item backend.
//!
//! Implements the `Store` and `LockProvider` contracts from `ddbcache_core`.
//! The backend keeps expired items, so every read goes through
//! [`is_expired`] and every conditional write compares against the same
//! clock reading.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use ddbcache_core::cache::{
    decode_value, encode_value, expiration_for, forever_expiration, is_expired, prefixed_key,
    unprefixed_key, CacheError, LockProvider, Result, Store,
};
use ddbcache_core::clock::{Clock, SystemClock};

use crate::storage::{
    BackendError, ItemBackend, StoredItem, WriteCondition, MAX_BATCH_GET_ITEMS,
    MAX_BATCH_WRITE_ITEMS,
};

/// TTL used when a lock is requested without one.
pub const DEFAULT_LOCK_TTL: Duration = Duration::from_secs(86_400);

/// Expiring cache store backed by a DynamoDB-style item table.
#[derive(Debug, Clone)]
pub struct DynamoDbStore<B, C = SystemClock> {
    backend: B,
    clock: C,
    prefix: String,
}

impl<B: ItemBackend> DynamoDbStore<B, SystemClock> {
    /// Creates a store on the system clock.
    pub fn new(backend: B, prefix: impl Into<String>) -> Self {
        Self::with_clock(backend, SystemClock, prefix)
    }
}

#[cfg(feature = "dynamodb")]
impl DynamoDbStore<crate::storage::DynamoDbBackend, SystemClock> {
    /// Creates a DynamoDB-backed store from configuration.
    pub async fn from_config(config: &crate::config::Config) -> Self {
        let backend = crate::storage::DynamoDbBackend::from_config(config).await;
        Self::new(backend, config.prefix.clone())
    }
}

impl<B: ItemBackend, C: Clock> DynamoDbStore<B, C> {
    /// Creates a store reading time from `clock`.
    pub fn with_clock(backend: B, clock: C, prefix: impl Into<String>) -> Self {
        Self {
            backend,
            clock,
            prefix: prefix.into(),
        }
    }

    /// Changes the prefix applied to keys from now on.
    pub fn set_prefix(&mut self, prefix: impl Into<String>) {
        self.prefix = prefix.into();
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn key(&self, key: &str) -> String {
        prefixed_key(&self.prefix, key)
    }

    /// Returns the item under the backend key if it is still live at `now`.
    async fn live_item(&self, key: &str, now: i64) -> Result<Option<StoredItem>> {
        let item = self.backend.get_item(key).await?;
        Ok(item.filter(|item| !is_expired(item.expires_at, now)))
    }

    /// Writes `value` with an absolute expiration, unconditionally.
    async fn put_until(&self, key: &str, value: &Value, expires_at: i64) -> Result<()> {
        let item = StoredItem::new(self.key(key), encode_value(value)?, expires_at);
        self.backend.put_item(item, None).await?;
        Ok(())
    }

    /// Reports backend keys a batch call did not process, under caller keys.
    fn unprocessed(&self, operation: &'static str, keys: &[String]) -> CacheError {
        CacheError::UnprocessedKeys {
            operation,
            keys: keys
                .iter()
                .map(|key| {
                    unprefixed_key(&self.prefix, key)
                        .unwrap_or(key.as_str())
                        .to_string()
                })
                .collect(),
        }
    }

    /// Conditional put. A failed condition is `false`, not an error.
    async fn put_if_absent(&self, item: StoredItem, now: i64) -> Result<bool> {
        let key = item.key.clone();
        match self
            .backend
            .put_item(item, Some(WriteCondition::MissingOrExpired { now }))
            .await
        {
            Ok(()) => Ok(true),
            Err(BackendError::ConditionalCheckFailed) => {
                tracing::debug!(key = %key, "Conditional put skipped, key is live");
                Ok(false)
            }
            Err(err) => Err(err.into()),
        }
    }
}

/// Parses the number returned by an atomic add.
fn parse_counter(raw: &str) -> Result<i64> {
    if let Ok(int) = raw.parse::<i64>() {
        return Ok(int);
    }

    let float = raw
        .parse::<f64>()
        .map_err(|_| CacheError::InvalidData(format!("Counter value is not a number: {raw}")))?
        .trunc();

    // i64::MIN is exactly -2^63; 2^63 itself is out of range.
    if float.is_finite() && float >= i64::MIN as f64 && float < -(i64::MIN as f64) {
        Ok(float as i64)
    } else {
        Err(CacheError::InvalidData(format!(
            "Counter value is out of range: {raw}"
        )))
    }
}

#[async_trait]
impl<B: ItemBackend, C: Clock> Store for DynamoDbStore<B, C> {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let now = self.clock.timestamp();

        match self.live_item(&self.key(key), now).await? {
            Some(item) => Ok(Some(decode_value(item.value.as_str())?)),
            None => Ok(None),
        }
    }

    async fn many(&self, keys: &[String]) -> Result<HashMap<String, Option<Value>>> {
        // One reading of the clock for the whole batch.
        let now = self.clock.timestamp();

        let mut seen = HashSet::new();
        let backend_keys: Vec<String> = keys
            .iter()
            .filter(|key| seen.insert(key.as_str()))
            .map(|key| self.key(key))
            .collect();

        let mut results: HashMap<String, Option<Value>> =
            keys.iter().map(|key| (key.clone(), None)).collect();
        let mut unprocessed = Vec::new();

        for chunk in backend_keys.chunks(MAX_BATCH_GET_ITEMS) {
            tracing::debug!(keys = chunk.len(), "Reading batch");
            let output = self.backend.batch_get_items(chunk).await?;

            for item in output.items {
                if is_expired(item.expires_at, now) {
                    continue;
                }
                if let Some(key) = unprefixed_key(&self.prefix, &item.key) {
                    results.insert(key.to_string(), Some(decode_value(item.value.as_str())?));
                }
            }

            unprocessed.extend(output.unprocessed);
        }

        if !unprocessed.is_empty() {
            tracing::warn!(count = unprocessed.len(), "Batch read left keys unprocessed");
            return Err(self.unprocessed("many", &unprocessed));
        }

        Ok(results)
    }

    async fn put(&self, key: &str, value: &Value, ttl: Duration) -> Result<()> {
        let expires_at = expiration_for(self.clock.now(), ttl);
        self.put_until(key, value, expires_at).await
    }

    async fn put_many(&self, values: &HashMap<String, Value>, ttl: Duration) -> Result<()> {
        let expires_at = expiration_for(self.clock.now(), ttl);

        let items = values
            .iter()
            .map(|(key, value)| -> Result<StoredItem> {
                Ok(StoredItem::new(self.key(key), encode_value(value)?, expires_at))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut unprocessed = Vec::new();
        for chunk in items.chunks(MAX_BATCH_WRITE_ITEMS) {
            tracing::debug!(items = chunk.len(), "Writing batch");
            unprocessed.extend(self.backend.batch_put_items(chunk.to_vec()).await?);
        }

        if !unprocessed.is_empty() {
            tracing::warn!(count = unprocessed.len(), "Batch write left items unprocessed");
            return Err(self.unprocessed("put_many", &unprocessed));
        }

        Ok(())
    }

    async fn add(&self, key: &str, value: &Value, ttl: Duration) -> Result<bool> {
        let now = self.clock.now();
        let item = StoredItem::new(
            self.key(key),
            encode_value(value)?,
            expiration_for(now, ttl),
        );

        self.put_if_absent(item, now.timestamp()).await
    }

    async fn increment(&self, key: &str, delta: i64) -> Result<Option<i64>> {
        let now = self.clock.timestamp();
        let condition = WriteCondition::PresentAndLive { now };

        match self
            .backend
            .add_to_value(&self.key(key), delta, condition)
            .await
        {
            Ok(raw) => parse_counter(&raw).map(Some),
            Err(BackendError::ConditionalCheckFailed) => {
                tracing::debug!(key = %key, "Increment skipped, key is missing or expired");
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn forever(&self, key: &str, value: &Value) -> Result<()> {
        let expires_at = forever_expiration(self.clock.now());
        self.put_until(key, value, expires_at).await
    }

    async fn forget(&self, key: &str) -> Result<()> {
        self.backend.delete_item(&self.key(key), None).await?;
        Ok(())
    }

    async fn flush(&self) -> Result<()> {
        Err(CacheError::Unsupported(
            "DynamoDB does not support flushing an entire table. Please create a new table.",
        ))
    }

    fn prefix(&self) -> &str {
        &self.prefix
    }
}

#[async_trait]
impl<B: ItemBackend, C: Clock> LockProvider for DynamoDbStore<B, C> {
    async fn acquire_lock(&self, name: &str, owner: &str, ttl: Duration) -> Result<bool> {
        let ttl = if ttl.as_secs() > 0 { ttl } else { DEFAULT_LOCK_TTL };
        let now = self.clock.now();
        let item = StoredItem::new(
            self.key(name),
            encode_value(&Value::from(owner))?,
            expiration_for(now, ttl),
        );

        self.put_if_absent(item, now.timestamp()).await
    }

    async fn release_lock(&self, name: &str, owner: &str) -> Result<bool> {
        let expected = encode_value(&Value::from(owner))?;

        match self
            .backend
            .delete_item(&self.key(name), Some(WriteCondition::ValueEquals(expected)))
            .await
        {
            Ok(()) => Ok(true),
            Err(BackendError::ConditionalCheckFailed) => {
                tracing::debug!(lock = %name, "Release skipped, lock held by another owner");
                Ok(false)
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn force_release_lock(&self, name: &str) -> Result<()> {
        self.forget(name).await
    }

    async fn lock_owner(&self, name: &str) -> Result<Option<String>> {
        Ok(self.get(name).await?.map(|owner| match owner {
            Value::String(owner) => owner,
            other => other.to_string(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryBackend;
    use chrono::{TimeZone, Utc};
    use ddbcache_core::cache::WireValue;
    use ddbcache_core::clock::MockClock;
    use serde_json::json;

    const MINUTE: Duration = Duration::from_secs(60);

    fn store() -> (DynamoDbStore<InMemoryBackend, MockClock>, MockClock) {
        let clock = MockClock::new(Utc.with_ymd_and_hms(2024, 6, 15, 10, 30, 0).unwrap());
        let store = DynamoDbStore::with_clock(InMemoryBackend::new(), clock.clone(), "");
        (store, clock)
    }

    #[tokio::test]
    async fn test_get_missing_key() {
        let (store, _) = store();
        assert_eq!(store.get("nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_put_writes_expiration_and_wire_type() {
        let (store, clock) = store();

        store.put("hits", &json!(3), 10 * MINUTE).await.unwrap();

        let item = store.backend().raw_item("hits").await.unwrap();
        assert_eq!(item.value, WireValue::Number("3".to_string()));
        assert_eq!(item.expires_at, Some(clock.timestamp() + 600));
    }

    #[tokio::test]
    async fn test_item_without_expiration_reads_as_absent() {
        let (store, _) = store();
        store
            .backend()
            .insert(StoredItem {
                key: "foreign".to_string(),
                value: WireValue::Number("1".to_string()),
                expires_at: None,
            })
            .await;

        assert_eq!(store.get("foreign").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_prefix_is_applied() {
        let (mut store, _) = store();
        store.set_prefix("app:");

        store.put("user", &json!("alice"), MINUTE).await.unwrap();

        assert!(store.backend().raw_item("app:user").await.is_some());
        assert_eq!(store.get("user").await.unwrap(), Some(json!("alice")));
        assert_eq!(store.prefix(), "app:");
    }

    #[tokio::test]
    async fn test_many_reports_unprefixed_keys() {
        let (mut store, _) = store();
        store.set_prefix("app:");
        store.put("a", &json!(1), MINUTE).await.unwrap();

        let keys = vec!["a".to_string(), "b".to_string()];
        let result = store.many(&keys).await.unwrap();

        assert_eq!(result.get("a"), Some(&Some(json!(1))));
        assert_eq!(result.get("b"), Some(&None));
    }

    #[tokio::test]
    async fn test_many_tolerates_duplicate_keys() {
        let (store, _) = store();
        store.put("a", &json!(1), MINUTE).await.unwrap();

        let keys = vec!["a".to_string(), "a".to_string()];
        let result = store.many(&keys).await.unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result.get("a"), Some(&Some(json!(1))));
    }

    #[tokio::test]
    async fn test_increment_string_value_is_backend_error() {
        let (store, _) = store();
        store.put("name", &json!("alice"), MINUTE).await.unwrap();

        assert!(matches!(
            store.increment("name", 1).await,
            Err(CacheError::Backend(_))
        ));
    }

    #[tokio::test]
    async fn test_lock_zero_ttl_uses_default() {
        let (store, clock) = store();

        assert!(store.acquire_lock("job", "me", Duration::ZERO).await.unwrap());

        let item = store.backend().raw_item("job").await.unwrap();
        assert_eq!(item.expires_at, Some(clock.timestamp() + 86_400));
    }

    #[tokio::test]
    async fn test_lock_owner_round_trip() {
        let (store, _) = store();
        store.acquire_lock("job", "owner-1", MINUTE).await.unwrap();

        assert_eq!(
            store.lock_owner("job").await.unwrap().as_deref(),
            Some("owner-1")
        );
    }

    #[test]
    fn test_parse_counter() {
        assert_eq!(parse_counter("42").unwrap(), 42);
        assert_eq!(parse_counter("-7.0").unwrap(), -7);
        assert!(parse_counter("x").is_err());
    }

    #[test]
    fn test_parse_counter_out_of_range() {
        assert!(matches!(
            parse_counter("18446744073709551615"),
            Err(CacheError::InvalidData(_))
        ));
        assert!(matches!(
            parse_counter("-1e30"),
            Err(CacheError::InvalidData(_))
        ));
        assert_eq!(parse_counter("-9223372036854775808").unwrap(), i64::MIN);
    }
}
