//! Account flow error types

use crate::identity::IdentityStoreError;
use kaimono_auth::{AuthError, TokenError};
use kaimono_policy::email::EMAIL_ALREADY_EXISTS;
use kaimono_policy::{RegistryError, ValidationError};
use kaimono_verify::{GateError, TRY_ANOTHER_TIME};
use serde_json::{json, Value};
use thiserror::Error;

/// Message for an unknown email or a wrong password.
pub const INVALID_CREDENTIALS: &str = "Invalid credentials";

/// Message for a profile update with nothing to change.
pub const MISSING_FIELDS_FOR_UPDATE: &str = "it is not possible to update with empty fields";

/// Account flow errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccountError {
    /// Input rejected by a presence check or a policy
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Request authentication failed
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Token could not be issued
    #[error(transparent)]
    Token(#[from] TokenError),

    /// Verification gate refused or failed
    #[error(transparent)]
    Gate(#[from] GateError),

    /// Unknown email or wrong password
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Authenticated identity required but absent
    #[error("Unauthorized")]
    Unauthorized,

    /// Identity not found
    #[error("Not found")]
    NotFound,

    /// Profile update without any field
    #[error("it is not possible to update with empty fields")]
    EmptyUpdate,

    /// Identity store failed
    #[error("Please, try another time.")]
    Store(String),

    /// Unexpected internal failure
    #[error("Please, try another time.")]
    Internal(String),
}

/// Result type for account flows.
pub type AccountResult<T> = Result<T, AccountError>;

impl From<IdentityStoreError> for AccountError {
    fn from(err: IdentityStoreError) -> Self {
        match err {
            IdentityStoreError::NotFound(_) => AccountError::NotFound,
            IdentityStoreError::DuplicateEmail(_) => {
                AccountError::Validation(ValidationError::PolicyViolation {
                    field: "email".to_string(),
                    violations: vec![EMAIL_ALREADY_EXISTS.to_string()],
                })
            }
            IdentityStoreError::Backend(message) => AccountError::Store(message),
        }
    }
}

impl From<RegistryError> for AccountError {
    fn from(err: RegistryError) -> Self {
        AccountError::Store(err.0)
    }
}

impl AccountError {
    /// Check if this error should be logged at error level.
    pub fn is_server_error(&self) -> bool {
        match self {
            AccountError::Auth(e) => e.is_server_error(),
            AccountError::Gate(e) => e.is_server_error(),
            AccountError::Token(_) | AccountError::Store(_) | AccountError::Internal(_) => true,
            _ => false,
        }
    }

    /// Get HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            AccountError::Validation(_) | AccountError::EmptyUpdate => 400,
            AccountError::Auth(e) => e.status_code(),
            AccountError::Gate(e) => e.status_code(),
            AccountError::InvalidCredentials | AccountError::Unauthorized => 401,
            AccountError::NotFound => 404,
            AccountError::Token(_) | AccountError::Store(_) | AccountError::Internal(_) => 500,
        }
    }

    /// Get error code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            AccountError::Validation(ValidationError::FieldsMissing(_)) => "REQUIRED_FIELD_MISSING",
            AccountError::Validation(ValidationError::PolicyViolation { .. }) => {
                "POLICY_VIOLATION"
            }
            AccountError::Auth(e) => e.error_code(),
            AccountError::Gate(e) => e.error_code(),
            AccountError::Token(_) => "INTERNAL_ERROR",
            AccountError::InvalidCredentials => "INVALID_CREDENTIALS",
            AccountError::Unauthorized => "UNAUTHORIZED",
            AccountError::NotFound => "NOT_FOUND",
            AccountError::EmptyUpdate => "EMPTY_UPDATE",
            AccountError::Store(_) => "STORE_ERROR",
            AccountError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Response body for this error.
    ///
    /// Validation failures are keyed by field; everything else carries a
    /// single safe description.
    pub fn to_body(&self) -> Value {
        match self {
            AccountError::Validation(e) => e.to_body(),
            AccountError::Store(_) | AccountError::Internal(_) => {
                json!({ "description": TRY_ANOTHER_TIME })
            }
            other => json!({ "description": other.to_string() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_are_verbatim() {
        assert_eq!(AccountError::InvalidCredentials.to_string(), INVALID_CREDENTIALS);
        assert_eq!(AccountError::EmptyUpdate.to_string(), MISSING_FIELDS_FOR_UPDATE);
        assert_eq!(
            AccountError::from(AuthError::BadScheme).to_string(),
            "Invalid Authorization Key"
        );
        assert_eq!(
            AccountError::from(AuthError::DecodeFailed(TokenError::Expired)).to_string(),
            "Token has expired"
        );
        assert_eq!(
            AccountError::from(GateError::NotEligible(42)).to_string(),
            "Code was sent to email. Try after 42 seconds"
        );
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AccountError::from(ValidationError::FieldsMissing(vec!["email".to_string()]))
                .status_code(),
            400
        );
        assert_eq!(AccountError::InvalidCredentials.status_code(), 401);
        assert_eq!(AccountError::from(AuthError::HeaderMissing).status_code(), 401);
        assert_eq!(AccountError::from(GateError::NotFound).status_code(), 404);
        assert_eq!(AccountError::from(GateError::Anomalous).status_code(), 500);
        assert_eq!(AccountError::Store("down".to_string()).status_code(), 500);
    }

    #[test]
    fn test_store_errors_hide_details() {
        let err = AccountError::from(IdentityStoreError::Backend("pool exhausted".to_string()));
        assert!(err.is_server_error());
        assert_eq!(err.to_body(), json!({ "description": "Please, try another time." }));
    }

    #[test]
    fn test_missing_identity_maps_to_not_found() {
        let err = AccountError::from(IdentityStoreError::NotFound(uuid::Uuid::now_v7()));
        assert_eq!(err, AccountError::NotFound);
    }

    #[test]
    fn test_duplicate_email_is_a_violation() {
        let err = AccountError::from(IdentityStoreError::DuplicateEmail("a@gmail.com".to_string()));
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.to_body(), json!({ "email": ["Email already exists!"] }));
    }

    #[test]
    fn test_validation_body() {
        let err = AccountError::from(ValidationError::FieldsMissing(vec![
            "email".to_string(),
            "password".to_string(),
        ]));
        assert_eq!(
            err.to_body(),
            json!({ "email": "Required field missing", "password": "Required field missing" })
        );
    }
}
