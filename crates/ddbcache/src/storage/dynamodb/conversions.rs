//! DynamoDB request document builders.
//!
//! Pure functions converting between `StoredItem` and DynamoDB attribute maps
//! and building the condition and update expressions. Attribute names always
//! go through `#` placeholders since `key` and `value` are reserved words.

use std::collections::HashMap;

use aws_sdk_dynamodb::types::AttributeValue;
use ddbcache_core::cache::WireValue;

use crate::storage::{AttributeNames, BackendError, StoredItem, WriteCondition};

pub const KEY_PLACEHOLDER: &str = "#key";
pub const VALUE_PLACEHOLDER: &str = "#value";
pub const EXPIRATION_PLACEHOLDER: &str = "#expires_at";

/// An expression together with the placeholders it uses.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Expression {
    pub expression: String,
    pub names: HashMap<String, String>,
    pub values: HashMap<String, AttributeValue>,
}

impl Expression {
    /// Placeholder values, or `None` when there are none. DynamoDB rejects an
    /// empty `ExpressionAttributeValues` map.
    pub fn values_if_any(&self) -> Option<HashMap<String, AttributeValue>> {
        (!self.values.is_empty()).then(|| self.values.clone())
    }
}

/// Parts of an `UpdateItem` request that adds to the value attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalIncrement {
    pub update_expression: String,
    pub condition_expression: String,
    pub names: HashMap<String, String>,
    pub values: HashMap<String, AttributeValue>,
}

// ============================================================================
// Values
// ============================================================================

/// Convert a wire value to its DynamoDB attribute.
pub fn wire_to_attribute(value: &WireValue) -> AttributeValue {
    match value {
        WireValue::Number(n) => AttributeValue::N(n.clone()),
        WireValue::String(s) => AttributeValue::S(s.clone()),
    }
}

/// Convert a DynamoDB attribute to a wire value. Other attribute types are not
/// written by the cache and yield `None`.
pub fn attribute_to_wire(attribute: &AttributeValue) -> Option<WireValue> {
    match attribute {
        AttributeValue::N(n) => Some(WireValue::Number(n.clone())),
        AttributeValue::S(s) => Some(WireValue::String(s.clone())),
        _ => None,
    }
}

// ============================================================================
// Items
// ============================================================================

/// Primary key map for a cache key.
pub fn key_attributes(key: &str, names: &AttributeNames) -> HashMap<String, AttributeValue> {
    HashMap::from([(names.key.clone(), AttributeValue::S(key.to_string()))])
}

/// Read the cache key out of a primary key or item map.
pub fn key_from_attributes(
    attributes: &HashMap<String, AttributeValue>,
    names: &AttributeNames,
) -> Option<String> {
    attributes
        .get(&names.key)
        .and_then(|v| v.as_s().ok())
        .cloned()
}

/// Convert a StoredItem to a DynamoDB item.
pub fn item_to_attributes(
    item: &StoredItem,
    names: &AttributeNames,
) -> HashMap<String, AttributeValue> {
    let mut attributes = key_attributes(&item.key, names);

    attributes.insert(names.value.clone(), wire_to_attribute(&item.value));
    if let Some(expires_at) = item.expires_at {
        attributes.insert(
            names.expiration.clone(),
            AttributeValue::N(expires_at.to_string()),
        );
    }

    attributes
}

/// Convert a DynamoDB item to a StoredItem.
pub fn attributes_to_item(
    attributes: &HashMap<String, AttributeValue>,
    names: &AttributeNames,
) -> Result<StoredItem, BackendError> {
    let key = key_from_attributes(attributes, names).ok_or_else(|| {
        BackendError::InvalidItem(format!("Missing or invalid field: {}", names.key))
    })?;

    let value = attributes
        .get(&names.value)
        .and_then(attribute_to_wire)
        .ok_or_else(|| {
            BackendError::InvalidItem(format!("Missing or invalid field: {}", names.value))
        })?;

    let expires_at = match attributes.get(&names.expiration) {
        Some(attribute) => Some(parse_expiration(attribute, &names.expiration)?),
        None => None,
    };

    Ok(StoredItem {
        key,
        value,
        expires_at,
    })
}

/// Parse an epoch-seconds attribute. Fractional seconds are truncated.
fn parse_expiration(attribute: &AttributeValue, field: &str) -> Result<i64, BackendError> {
    let invalid = || BackendError::InvalidItem(format!("Invalid expiration {}", field));
    let text = attribute.as_n().map_err(|_| invalid())?;

    text.parse::<i64>()
        .or_else(|_| text.parse::<f64>().map(|f| f.trunc() as i64))
        .map_err(|_| invalid())
}

// ============================================================================
// Expressions
// ============================================================================

/// Build the condition expression for a conditional write.
pub fn condition_expression(condition: &WriteCondition, names: &AttributeNames) -> Expression {
    match condition {
        WriteCondition::MissingOrExpired { now } => Expression {
            expression: format!(
                "attribute_not_exists({KEY_PLACEHOLDER}) OR {EXPIRATION_PLACEHOLDER} <= :now"
            ),
            names: HashMap::from([
                (KEY_PLACEHOLDER.to_string(), names.key.clone()),
                (EXPIRATION_PLACEHOLDER.to_string(), names.expiration.clone()),
            ]),
            values: HashMap::from([(":now".to_string(), AttributeValue::N(now.to_string()))]),
        },
        WriteCondition::PresentAndLive { now } => Expression {
            expression: format!(
                "attribute_exists({KEY_PLACEHOLDER}) AND {EXPIRATION_PLACEHOLDER} > :now"
            ),
            names: HashMap::from([
                (KEY_PLACEHOLDER.to_string(), names.key.clone()),
                (EXPIRATION_PLACEHOLDER.to_string(), names.expiration.clone()),
            ]),
            values: HashMap::from([(":now".to_string(), AttributeValue::N(now.to_string()))]),
        },
        WriteCondition::ValueEquals(expected) => Expression {
            expression: format!(
                "attribute_exists({KEY_PLACEHOLDER}) AND {VALUE_PLACEHOLDER} = :expected"
            ),
            names: HashMap::from([
                (KEY_PLACEHOLDER.to_string(), names.key.clone()),
                (VALUE_PLACEHOLDER.to_string(), names.value.clone()),
            ]),
            values: HashMap::from([(":expected".to_string(), wire_to_attribute(expected))]),
        },
    }
}

/// Build an update adding `delta` to the value attribute, guarded by `condition`.
pub fn conditional_increment(
    delta: i64,
    condition: &WriteCondition,
    names: &AttributeNames,
) -> ConditionalIncrement {
    let guard = condition_expression(condition, names);

    let mut placeholder_names = guard.names;
    placeholder_names.insert(VALUE_PLACEHOLDER.to_string(), names.value.clone());

    let mut values = guard.values;
    values.insert(":amount".to_string(), AttributeValue::N(delta.to_string()));

    ConditionalIncrement {
        update_expression: format!("SET {VALUE_PLACEHOLDER} = {VALUE_PLACEHOLDER} + :amount"),
        condition_expression: guard.expression,
        names: placeholder_names,
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names() -> AttributeNames {
        AttributeNames::default()
    }

    fn custom_names() -> AttributeNames {
        AttributeNames {
            key: "pk".to_string(),
            value: "payload".to_string(),
            expiration: "ttl".to_string(),
        }
    }

    #[test]
    fn test_item_round_trip() {
        let item = StoredItem::new(
            "session:42",
            WireValue::String(r#"{"user":"alice"}"#.to_string()),
            1_718_447_400,
        );
        let attributes = item_to_attributes(&item, &names());
        let parsed = attributes_to_item(&attributes, &names()).unwrap();

        assert_eq!(item, parsed);
    }

    #[test]
    fn test_item_uses_configured_attribute_names() {
        let item = StoredItem::new("hits", WireValue::Number("3".to_string()), 100);
        let attributes = item_to_attributes(&item, &custom_names());

        assert_eq!(attributes.get("pk").unwrap().as_s().unwrap(), "hits");
        assert_eq!(attributes.get("payload").unwrap().as_n().unwrap(), "3");
        assert_eq!(attributes.get("ttl").unwrap().as_n().unwrap(), "100");
        assert!(!attributes.contains_key("key"));
    }

    #[test]
    fn test_numeric_value_uses_n_type() {
        let item = StoredItem::new("hits", WireValue::Number("7".to_string()), 100);
        let attributes = item_to_attributes(&item, &names());

        assert!(attributes.get("value").unwrap().is_n());
    }

    #[test]
    fn test_missing_expiration_reads_as_none() {
        let mut attributes = key_attributes("legacy", &names());
        attributes.insert("value".to_string(), AttributeValue::S("1".to_string()));

        let item = attributes_to_item(&attributes, &names()).unwrap();
        assert_eq!(item.expires_at, None);
    }

    #[test]
    fn test_fractional_expiration_is_truncated() {
        let mut attributes = key_attributes("k", &names());
        attributes.insert("value".to_string(), AttributeValue::N("1".to_string()));
        attributes.insert("expires_at".to_string(), AttributeValue::N("100.9".to_string()));

        let item = attributes_to_item(&attributes, &names()).unwrap();
        assert_eq!(item.expires_at, Some(100));
    }

    #[test]
    fn test_missing_value_is_invalid() {
        let attributes = key_attributes("k", &names());
        assert!(matches!(
            attributes_to_item(&attributes, &names()),
            Err(BackendError::InvalidItem(_))
        ));
    }

    #[test]
    fn test_string_expiration_is_invalid() {
        let mut attributes = key_attributes("k", &names());
        attributes.insert("value".to_string(), AttributeValue::N("1".to_string()));
        attributes.insert("expires_at".to_string(), AttributeValue::S("soon".to_string()));

        assert!(attributes_to_item(&attributes, &names()).is_err());
    }

    #[test]
    fn test_missing_or_expired_condition() {
        let expr = condition_expression(&WriteCondition::MissingOrExpired { now: 500 }, &names());

        assert_eq!(
            expr.expression,
            "attribute_not_exists(#key) OR #expires_at <= :now"
        );
        assert_eq!(expr.names.get("#key").unwrap(), "key");
        assert_eq!(expr.names.get("#expires_at").unwrap(), "expires_at");
        assert_eq!(expr.values.get(":now").unwrap().as_n().unwrap(), "500");
    }

    #[test]
    fn test_present_and_live_condition_uses_custom_names() {
        let expr = condition_expression(
            &WriteCondition::PresentAndLive { now: 500 },
            &custom_names(),
        );

        assert_eq!(
            expr.expression,
            "attribute_exists(#key) AND #expires_at > :now"
        );
        assert_eq!(expr.names.get("#key").unwrap(), "pk");
        assert_eq!(expr.names.get("#expires_at").unwrap(), "ttl");
    }

    #[test]
    fn test_value_equals_condition() {
        let expr = condition_expression(
            &WriteCondition::ValueEquals(WireValue::String("\"owner\"".to_string())),
            &names(),
        );

        assert_eq!(
            expr.expression,
            "attribute_exists(#key) AND #value = :expected"
        );
        assert_eq!(
            expr.values.get(":expected").unwrap().as_s().unwrap(),
            "\"owner\""
        );
    }

    #[test]
    fn test_conditional_increment() {
        let update =
            conditional_increment(-3, &WriteCondition::PresentAndLive { now: 42 }, &names());

        assert_eq!(update.update_expression, "SET #value = #value + :amount");
        assert_eq!(
            update.condition_expression,
            "attribute_exists(#key) AND #expires_at > :now"
        );
        assert_eq!(update.names.len(), 3);
        assert_eq!(update.values.get(":amount").unwrap().as_n().unwrap(), "-3");
        assert_eq!(update.values.get(":now").unwrap().as_n().unwrap(), "42");
    }

    #[test]
    fn test_values_if_any() {
        assert!(Expression::default().values_if_any().is_none());

        let expr = condition_expression(&WriteCondition::MissingOrExpired { now: 1 }, &names());
        assert_eq!(expr.values_if_any().unwrap().len(), 1);
    }
}
