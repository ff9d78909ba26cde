//! ddbcache maps the generic cache contract from `ddbcache_core` onto the
//! item API of a DynamoDB table.
//!
//! The table stores one item per cache key with three attributes: the key,
//! the value and an expiration timestamp in epoch seconds. DynamoDB does not
//! filter expired items on read, so [`DynamoDbStore`] checks the expiration
//! itself and uses conditional writes for `add`, `increment`, `decrement` and
//! locks.

pub mod config;
pub mod storage;
mod store;

pub use config::Config;
pub use store::DynamoDbStore;
