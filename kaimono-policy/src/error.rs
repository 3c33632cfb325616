//! Validation error types
//!
//! Violation lists are carried whole so one response can tell the caller
//! every fix that is needed.

use serde_json::{Map, Value};
use thiserror::Error;

/// Message reported for every absent or empty required field.
pub const REQUIRED_FIELD_MISSING: &str = "Required field missing";

/// Input rejected by a presence check or a content policy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Required fields absent or falsy, in the order they were requested
    #[error("Required field missing: {}", .0.join(", "))]
    FieldsMissing(Vec<String>),

    /// One field failed one or more content rules
    #[error("{field}: {}", .violations.join("; "))]
    PolicyViolation {
        /// Field name
        field: String,
        /// Messages in rule order
        violations: Vec<String>,
    },
}

impl ValidationError {
    /// Turn a violation list into a result for `field`.
    ///
    /// An empty list means the value was accepted.
    pub fn ensure_accepted(field: &str, violations: Vec<String>) -> Result<(), ValidationError> {
        if violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::PolicyViolation {
                field: field.to_string(),
                violations,
            })
        }
    }

    /// Response body keyed by field name.
    ///
    /// Missing fields map to the single required-field message, policy
    /// violations map to the full message list.
    pub fn to_body(&self) -> Value {
        let mut body = Map::new();
        match self {
            ValidationError::FieldsMissing(fields) => {
                for field in fields {
                    body.insert(field.clone(), Value::from(REQUIRED_FIELD_MISSING));
                }
            }
            ValidationError::PolicyViolation { field, violations } => {
                body.insert(field.clone(), Value::from(violations.clone()));
            }
        }
        Value::Object(body)
    }
}

/// The identity registry could not answer an existence query.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Identity registry unavailable: {0}")]
pub struct RegistryError(pub String);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ensure_accepted() {
        assert!(ValidationError::ensure_accepted("password", Vec::new()).is_ok());

        let err = ValidationError::ensure_accepted("password", vec!["too short".to_string()])
            .unwrap_err();
        assert_eq!(err.to_body(), json!({ "password": ["too short"] }));
    }

    #[test]
    fn test_missing_fields_body() {
        let err = ValidationError::FieldsMissing(vec!["email".to_string(), "password".to_string()]);
        assert_eq!(
            err.to_body(),
            json!({ "email": "Required field missing", "password": "Required field missing" })
        );
        assert_eq!(err.to_string(), "Required field missing: email, password");
    }
}
