/// Returns the backend key for a cache key under `prefix`.
pub fn prefixed_key(prefix: &str, key: &str) -> String {
    format!("{prefix}{key}")
}

/// Strips `prefix` from a backend key.
///
/// Returns `None` if the key does not carry the prefix.
///
/// # Examples
///
/// ```
/// use ddbcache_core::cache::unprefixed_key;
///
/// assert_eq!(unprefixed_key("app:", "app:user:1"), Some("user:1"));
/// assert_eq!(unprefixed_key("app:", "other:user:1"), None);
/// ```
pub fn unprefixed_key<'a>(prefix: &str, key: &'a str) -> Option<&'a str> {
    key.strip_prefix(prefix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefixed_key() {
        assert_eq!(prefixed_key("app:", "session:42"), "app:session:42");
    }

    #[test]
    fn test_empty_prefix_is_identity() {
        assert_eq!(prefixed_key("", "session:42"), "session:42");
        assert_eq!(unprefixed_key("", "session:42"), Some("session:42"));
    }
}
