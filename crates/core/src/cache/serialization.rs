//! Pure functions for encoding cache values to and from the backend wire form.
//!
//! Numbers travel as the backend's native numeric type so they can be updated
//! atomically. Every other value is serialized as JSON text and stored with
//! the string type. JSON is the wire contract for non-numeric values: any
//! other reader of the table must decode it the same way.

use serde_json::{Number, Value};

use super::{CacheError, Result};

/// A value as it is stored in the backend's value attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireValue {
    /// Native numeric type (`N`), carried as its decimal text.
    Number(String),
    /// Native string type (`S`), carrying a JSON document.
    String(String),
}

impl WireValue {
    /// Returns the raw text regardless of the wire type.
    pub fn as_str(&self) -> &str {
        match self {
            WireValue::Number(s) | WireValue::String(s) => s,
        }
    }
}

/// Returns true if `s` is the text of a finite number.
///
/// # Examples
///
/// ```
/// use ddbcache_core::cache::is_numeric;
///
/// assert!(is_numeric("42"));
/// assert!(is_numeric("-1.5e3"));
/// assert!(!is_numeric("NaN"));
/// assert!(!is_numeric("forty-two"));
/// ```
pub fn is_numeric(s: &str) -> bool {
    !s.is_empty() && s.trim() == s && s.parse::<f64>().is_ok_and(f64::is_finite)
}

/// Encodes a cache value into its wire form.
///
/// Numbers and numeric strings keep their text and use the numeric type.
/// Everything else is JSON encoded.
pub fn encode_value(value: &Value) -> Result<WireValue> {
    match value {
        Value::Number(n) => Ok(WireValue::Number(n.to_string())),
        Value::String(s) if is_numeric(s) => Ok(WireValue::Number(s.clone())),
        other => serde_json::to_string(other)
            .map(WireValue::String)
            .map_err(|e| CacheError::Serialization(e.to_string())),
    }
}

/// Decodes the stored text back into a cache value.
///
/// Tries a signed integer, an unsigned one, then a finite float, and only
/// then JSON. A JSON string
/// such as `"\"42\""` is never mistaken for a number because its quotes make
/// both numeric parses fail.
pub fn decode_value(raw: &str) -> Result<Value> {
    if let Ok(int) = raw.parse::<i64>() {
        return Ok(Value::from(int));
    }

    if let Ok(int) = raw.parse::<u64>() {
        return Ok(Value::from(int));
    }

    if let Some(float) = raw
        .parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
    {
        return Ok(Value::Number(float));
    }

    serde_json::from_str(raw).map_err(|e| CacheError::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_integer_uses_number_type() {
        assert_eq!(
            encode_value(&json!(42)).unwrap(),
            WireValue::Number("42".to_string())
        );
    }

    #[test]
    fn test_float_uses_number_type() {
        assert_eq!(
            encode_value(&json!(2.5)).unwrap(),
            WireValue::Number("2.5".to_string())
        );
    }

    #[test]
    fn test_numeric_string_uses_number_type() {
        assert_eq!(
            encode_value(&json!("17")).unwrap(),
            WireValue::Number("17".to_string())
        );
        assert_eq!(
            encode_value(&json!("0.75")).unwrap(),
            WireValue::Number("0.75".to_string())
        );
    }

    #[test]
    fn test_padded_numeric_string_is_not_numeric() {
        assert_eq!(
            encode_value(&json!(" 17")).unwrap(),
            WireValue::String("\" 17\"".to_string())
        );
    }

    #[test]
    fn test_structured_value_uses_string_type() {
        let encoded = encode_value(&json!({"user": "alice"})).unwrap();
        assert_eq!(encoded, WireValue::String(r#"{"user":"alice"}"#.to_string()));
    }

    #[test]
    fn test_decode_integer() {
        assert_eq!(decode_value("-12").unwrap(), json!(-12));
    }

    #[test]
    fn test_decode_integer_above_i64_range() {
        let encoded = encode_value(&json!(u64::MAX)).unwrap();

        assert_eq!(encoded, WireValue::Number(u64::MAX.to_string()));
        assert_eq!(decode_value(encoded.as_str()).unwrap(), json!(u64::MAX));
    }

    #[test]
    fn test_decode_float() {
        assert_eq!(decode_value("3.25").unwrap(), json!(3.25));
    }

    #[test]
    fn test_decode_structured() {
        let value = json!({"items": [1, 2, {"nested": true}], "name": null});
        let encoded = encode_value(&value).unwrap();
        assert_eq!(decode_value(encoded.as_str()).unwrap(), value);
    }

    #[test]
    fn test_decode_quoted_number_stays_a_string() {
        assert_eq!(decode_value("\"42\"").unwrap(), json!("42"));
    }

    #[test]
    fn test_decode_non_finite_text_falls_back_to_json() {
        // Rust parses "NaN" as a float; it must not become a number.
        assert!(matches!(
            decode_value("NaN"),
            Err(CacheError::Serialization(_))
        ));
    }

    #[test]
    fn test_decode_garbage_is_serialization_error() {
        assert!(matches!(
            decode_value("{not json"),
            Err(CacheError::Serialization(_))
        ));
    }

    #[test]
    fn test_is_numeric_rejects_empty_and_words() {
        assert!(!is_numeric(""));
        assert!(!is_numeric("inf"));
        assert!(!is_numeric("12abc"));
    }
}
