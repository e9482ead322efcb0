//! Common types used throughout shoptable-sync
//!
//! Shared type aliases, small enums and JSON helpers used across modules.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// JSON object type
pub type JsonObject = serde_json::Map<String, JsonValue>;

/// Generic key-value map with string keys and values
pub type StringMap = HashMap<String, String>;

/// A projected output row, keyed by column key
pub type Row = JsonObject;

// ============================================================================
// HTTP Types
// ============================================================================

/// HTTP method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[default]
    GET,
    POST,
    PUT,
    DELETE,
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::GET => reqwest::Method::GET,
            Method::POST => reqwest::Method::POST,
            Method::PUT => reqwest::Method::PUT,
            Method::DELETE => reqwest::Method::DELETE,
        }
    }
}

// ============================================================================
// Backoff Type
// ============================================================================

/// Type of backoff for retries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffType {
    /// Constant delay between retries
    Constant,
    /// Linear increase in delay
    Linear,
    /// Exponential increase in delay
    #[default]
    Exponential,
}

// ============================================================================
// JSON helpers
// ============================================================================

/// Look up a dot-separated path (`image.src`) inside a JSON object
pub fn lookup_path<'a>(object: &'a JsonObject, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let mut current = object.get(parts.next()?)?;
    for part in parts {
        match current {
            Value::Object(map) => current = map.get(part)?,
            _ => return None,
        }
    }
    Some(current)
}

/// Read a numeric identity that may arrive as a JSON number or a numeric string
pub fn value_as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Whether a row value counts as "present" (not null, not an empty string)
pub fn is_present(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

// ============================================================================
// Utilities
// ============================================================================

/// Extension trait for Option<String> to handle empty strings
pub trait OptionStringExt {
    /// Returns None if the string is empty
    fn none_if_empty(self) -> Option<String>;
}

impl OptionStringExt for Option<String> {
    fn none_if_empty(self) -> Option<String> {
        self.filter(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_method_conversion() {
        let get: reqwest::Method = Method::GET.into();
        assert_eq!(reqwest::Method::GET, get);
        let put: reqwest::Method = Method::PUT.into();
        assert_eq!(reqwest::Method::PUT, put);
    }

    #[test]
    fn test_lookup_path() {
        let object = json!({"title": "Hat", "image": {"src": "https://cdn/x.png"}});
        let object = object.as_object().unwrap();

        assert_eq!(lookup_path(object, "title"), Some(&json!("Hat")));
        assert_eq!(
            lookup_path(object, "image.src"),
            Some(&json!("https://cdn/x.png"))
        );
        assert_eq!(lookup_path(object, "image.alt"), None);
        assert_eq!(lookup_path(object, "title.nested"), None);
    }

    #[test]
    fn test_value_as_u64() {
        assert_eq!(value_as_u64(&json!(42)), Some(42));
        assert_eq!(value_as_u64(&json!("42")), Some(42));
        assert_eq!(value_as_u64(&json!("gid://shopify/Product/42")), None);
        assert_eq!(value_as_u64(&json!(null)), None);
    }

    #[test]
    fn test_is_present() {
        assert!(is_present(Some(&json!(0))));
        assert!(is_present(Some(&json!("kg"))));
        assert!(!is_present(Some(&json!(""))));
        assert!(!is_present(Some(&json!(null))));
        assert!(!is_present(None));
    }

    #[test]
    fn test_option_string_none_if_empty() {
        assert_eq!(
            Some("test".to_string()).none_if_empty(),
            Some("test".to_string())
        );
        assert_eq!(Some(String::new()).none_if_empty(), None);
        assert_eq!(None::<String>.none_if_empty(), None);
    }
}
