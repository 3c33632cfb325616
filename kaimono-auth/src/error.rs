//! Error types for token and request authentication
//!
//! Token failures are split in exactly two kinds so callers can tell an
//! expired session from a forged or damaged one. Header failures wrap the
//! token failure instead of flattening it.

use thiserror::Error;

/// Invalid/expired token message surfaced to callers.
pub const INVALID_TOKEN: &str = "Invalid token";

/// Expired token message surfaced to callers.
pub const TOKEN_HAS_EXPIRED: &str = "Token has expired";

/// Bad authorization scheme message surfaced to callers.
pub const INVALID_AUTH_HEADER: &str = "Invalid Authorization Key";

/// Token decoding failures.
///
/// Decoding never yields partial claims: every failure maps to one of
/// these variants and the payload is dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// Signature was valid but the expiry instant has passed
    #[error("Token has expired")]
    Expired,

    /// Missing parts, wrong signature, unsupported algorithm, bad payload
    #[error("Invalid token")]
    Malformed,

    /// Signing failed while building a token
    #[error("Token encoding failed: {0}")]
    Encoding(String),
}

/// Result type for token operations.
pub type TokenResult<T> = Result<T, TokenError>;

/// Request authentication failures raised by an auth gate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// Header absent on a gate that requires it
    #[error("Unauthorized")]
    HeaderMissing,

    /// Header did not split into `<scheme> <token>`
    #[error("Invalid token")]
    InvalidToken,

    /// Scheme part did not match the configured literal
    #[error("Invalid Authorization Key")]
    BadScheme,

    /// Token was extracted but failed to decode
    #[error("{0}")]
    DecodeFailed(TokenError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for authentication operations.
pub type AuthResult<T> = Result<T, AuthError>;

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        AuthError::DecodeFailed(err)
    }
}

impl AuthError {
    /// Check if this error should be logged at error level.
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            AuthError::Config(_) | AuthError::DecodeFailed(TokenError::Encoding(_))
        )
    }

    /// Get HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            AuthError::HeaderMissing
            | AuthError::InvalidToken
            | AuthError::BadScheme
            | AuthError::DecodeFailed(TokenError::Expired | TokenError::Malformed) => 401,

            AuthError::DecodeFailed(TokenError::Encoding(_)) | AuthError::Config(_) => 500,
        }
    }

    /// Get error code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::HeaderMissing => "UNAUTHORIZED",
            AuthError::InvalidToken => "INVALID_TOKEN",
            AuthError::BadScheme => "INVALID_AUTH_HEADER",
            AuthError::DecodeFailed(TokenError::Expired) => "TOKEN_EXPIRED",
            AuthError::DecodeFailed(TokenError::Malformed) => "INVALID_TOKEN",
            AuthError::DecodeFailed(TokenError::Encoding(_)) => "INTERNAL_ERROR",
            AuthError::Config(_) => "CONFIG_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_match_catalog() {
        assert_eq!(TokenError::Expired.to_string(), TOKEN_HAS_EXPIRED);
        assert_eq!(TokenError::Malformed.to_string(), INVALID_TOKEN);
        assert_eq!(AuthError::InvalidToken.to_string(), INVALID_TOKEN);
        assert_eq!(AuthError::BadScheme.to_string(), INVALID_AUTH_HEADER);
    }

    #[test]
    fn test_decode_failure_message_is_verbatim() {
        let err = AuthError::from(TokenError::Expired);
        assert_eq!(err.to_string(), "Token has expired");
        assert_eq!(err.status_code(), 401);
        assert_eq!(err.error_code(), "TOKEN_EXPIRED");
    }

    #[test]
    fn test_server_errors() {
        assert!(AuthError::Config("missing secret".to_string()).is_server_error());
        assert!(!AuthError::BadScheme.is_server_error());
        assert_eq!(AuthError::Config("x".to_string()).status_code(), 500);
    }
}
