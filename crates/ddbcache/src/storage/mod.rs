//! Item backends the cache store runs on.
//!
//! # Feature Flags
//!
//! - `dynamodb` (default): AWS DynamoDB backend using `aws-sdk-dynamodb`
//!
//! The in-memory backend is always available. It evaluates the same write
//! conditions as the DynamoDB expressions and is what the tests run against.

mod backend;

#[cfg(feature = "dynamodb")]
pub mod dynamodb;

pub mod inmemory;

pub use backend::{
    AttributeNames, BackendError, BackendResult, BatchGetOutput, ItemBackend, StoredItem,
    WriteCondition, MAX_BATCH_GET_ITEMS, MAX_BATCH_WRITE_ITEMS,
};

#[cfg(feature = "dynamodb")]
pub use dynamodb::DynamoDbBackend;

pub use inmemory::InMemoryBackend;
