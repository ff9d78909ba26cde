use thiserror::Error;

/// Errors that can occur during cache operations.
///
/// A failed conditional write is not an error: `add`, `increment`,
/// `decrement` and lock acquisition report it as `false` / `None`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("Cache backend failed: {0}")]
    Backend(String),
    #[error("Unsupported operation: {0}")]
    Unsupported(&'static str),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Invalid data: {0}")]
    InvalidData(String),
    #[error("{operation} left {} key(s) unprocessed: {}", .keys.len(), .keys.join(", "))]
    UnprocessedKeys {
        operation: &'static str,
        keys: Vec<String>,
    },
    #[error("Timed out waiting for lock: {0}")]
    LockTimeout(String),
}

/// Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_display() {
        let error = CacheError::Backend("Throughput exceeded, please retry".to_string());
        assert_eq!(
            error.to_string(),
            "Cache backend failed: Throughput exceeded, please retry"
        );
    }

    #[test]
    fn test_unsupported_display() {
        let error = CacheError::Unsupported("flush");
        assert_eq!(error.to_string(), "Unsupported operation: flush");
    }

    #[test]
    fn test_unprocessed_keys_display() {
        let error = CacheError::UnprocessedKeys {
            operation: "put_many",
            keys: vec!["a".to_string(), "b".to_string()],
        };
        assert_eq!(error.to_string(), "put_many left 2 key(s) unprocessed: a, b");
    }

    #[test]
    fn test_lock_timeout_display() {
        let error = CacheError::LockTimeout("reports".to_string());
        assert_eq!(error.to_string(), "Timed out waiting for lock: reports");
    }
}
