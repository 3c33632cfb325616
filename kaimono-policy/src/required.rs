//! Required-field presence check.
//!
//! Runs before any content policy. A field counts as missing when it is
//! absent or holds a falsy value: `null`, `false`, `0`, `""`, `[]`, `{}`.

use crate::error::ValidationError;
use serde_json::{Map, Value};

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
    }
}

/// Names of the required fields that are missing, in request order.
pub fn missing_fields(data: &Map<String, Value>, fields: &[&str]) -> Vec<String> {
    fields
        .iter()
        .filter(|field| !data.get(**field).is_some_and(is_truthy))
        .map(|field| field.to_string())
        .collect()
}

/// Fail with [`ValidationError::FieldsMissing`] if any required field is missing.
pub fn check_required_fields(
    data: &Map<String, Value>,
    fields: &[&str],
) -> Result<(), ValidationError> {
    let missing = missing_fields(data, fields);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::FieldsMissing(missing))
    }
}

/// String value of a field, or `None` if absent or not a string.
pub fn string_field<'a>(data: &'a Map<String, Value>, field: &str) -> Option<&'a str> {
    data.get(field).and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_not_found_fields() {
        let result = check_required_fields(&Map::new(), &["some_required_field"]);
        assert_eq!(
            result,
            Err(ValidationError::FieldsMissing(vec!["some_required_field".to_string()]))
        );
    }

    #[test]
    fn test_empty_value() {
        let data = object(json!({ "test_field": "" }));
        assert_eq!(missing_fields(&data, &["test_field"]), vec!["test_field"]);
    }

    #[test]
    fn test_falsy_values() {
        let data = object(json!({
            "a": null, "b": false, "c": 0, "d": [], "e": {}, "f": "x", "g": 1, "h": true
        }));
        assert_eq!(
            missing_fields(&data, &["a", "b", "c", "d", "e", "f", "g", "h"]),
            vec!["a", "b", "c", "d", "e"]
        );
    }

    #[test]
    fn test_all_present() {
        let data = object(json!({ "email": "user@gmail.com", "password": "secret" }));
        assert!(check_required_fields(&data, &["email", "password"]).is_ok());
        assert_eq!(string_field(&data, "email"), Some("user@gmail.com"));
        assert_eq!(string_field(&data, "full_name"), None);
    }
}
