use std::env;

use crate::storage::AttributeNames;

/// Cache store configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// DynamoDB table holding the cache items (default: "cache")
    pub table_name: String,
    /// Partition key attribute (default: "key")
    pub key_attribute: String,
    /// Value attribute (default: "value")
    pub value_attribute: String,
    /// Expiration attribute, epoch seconds (default: "expires_at")
    pub expiration_attribute: String,
    /// Prefix added to every cache key (default: "")
    pub prefix: String,
    /// AWS region (default: "us-east-1")
    pub region: String,
    /// Custom endpoint URL, e.g. a local DynamoDB (default: none)
    pub endpoint_url: Option<String>,
    /// Use strongly consistent reads (default: false)
    pub consistent_read: bool,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `DYNAMODB_CACHE_TABLE` - Table name (default: "cache")
    /// - `DYNAMODB_CACHE_KEY_ATTRIBUTE` - Key attribute (default: "key")
    /// - `DYNAMODB_CACHE_VALUE_ATTRIBUTE` - Value attribute (default: "value")
    /// - `DYNAMODB_CACHE_EXPIRATION_ATTRIBUTE` - Expiration attribute (default: "expires_at")
    /// - `CACHE_PREFIX` - Key prefix (default: "")
    /// - `AWS_REGION` - AWS region (default: "us-east-1")
    /// - `AWS_ENDPOINT_URL` - Custom endpoint URL (optional)
    /// - `DYNAMODB_CACHE_CONSISTENT_READ` - "true" or "1" for consistent reads (default: false)
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let or = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());

        Self {
            table_name: or("DYNAMODB_CACHE_TABLE", "cache"),
            key_attribute: or("DYNAMODB_CACHE_KEY_ATTRIBUTE", "key"),
            value_attribute: or("DYNAMODB_CACHE_VALUE_ATTRIBUTE", "value"),
            expiration_attribute: or("DYNAMODB_CACHE_EXPIRATION_ATTRIBUTE", "expires_at"),
            prefix: or("CACHE_PREFIX", ""),
            region: or("AWS_REGION", "us-east-1"),
            endpoint_url: lookup("AWS_ENDPOINT_URL").filter(|url| !url.is_empty()),
            consistent_read: lookup("DYNAMODB_CACHE_CONSISTENT_READ")
                .map(|v| matches!(v.to_ascii_lowercase().as_str(), "true" | "1"))
                .unwrap_or(false),
        }
    }

    /// The configured attribute names.
    pub fn attribute_names(&self) -> AttributeNames {
        AttributeNames {
            key: self.key_attribute.clone(),
            value: self.value_attribute.clone(),
            expiration: self.expiration_attribute.clone(),
        }
    }

    /// Returns a display string for the target environment.
    pub fn target_display(&self) -> String {
        match &self.endpoint_url {
            Some(url) => format!("Local DynamoDB ({}) table {}", url, self.table_name),
            None => format!(
                "AWS DynamoDB (region: {}) table {}",
                self.region, self.table_name
            ),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
