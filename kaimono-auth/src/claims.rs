//! Claim sets carried inside signed tokens
//!
//! A token payload is an ordered map of named claims plus a mandatory
//! expiry. Session tokens carry four identity fields whose claim names come
//! from configuration ([`ClaimNames`]); the same mapping is applied on issue
//! and on read so both sides always agree.

use crate::error::{TokenError, TokenResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Named claims without the expiry.
pub type ClaimMap = Map<String, Value>;

/// Name of the injected expiry claim.
pub const EXPIRY_CLAIM: &str = "exp";

/// Decoded token payload.
///
/// The expiry is kept apart from the named claims so that a round trip
/// returns exactly the map that was encoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimSet {
    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// All other claims
    #[serde(flatten)]
    pub claims: ClaimMap,
}

impl ClaimSet {
    /// Build a claim set expiring at `expires_at`.
    ///
    /// A caller-supplied `exp` entry in `claims` is discarded; the expiry is
    /// always the one computed by the codec.
    pub fn new(mut claims: ClaimMap, expires_at: DateTime<Utc>) -> Self {
        claims.remove(EXPIRY_CLAIM);
        Self {
            exp: expires_at.timestamp(),
            claims,
        }
    }

    /// Look up a claim by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.claims.get(name)
    }

    /// Get expiration as DateTime.
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or_default()
    }

    /// Check whether the expiry has been reached at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.exp
    }

    /// Drop the expiry and keep the named claims.
    pub fn into_claims(self) -> ClaimMap {
        self.claims
    }
}

/// Which secret a token is signed with.
///
/// The two kinds are never cross-decodable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    /// Repeated-use session token
    Session,

    /// One-time proof of mailbox possession
    Verification,
}

impl TokenKind {
    /// Stable lowercase name, used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Session => "session",
            TokenKind::Verification => "verification",
        }
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Claim names for the identity fields embedded in tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimNames {
    /// Claim holding the identity id
    pub id: String,

    /// Claim holding the email address
    pub email: String,

    /// Claim holding the role
    pub role: String,

    /// Claim holding the email-verified flag
    pub email_verified: String,
}

impl Default for ClaimNames {
    fn default() -> Self {
        Self {
            id: "user_id".to_string(),
            email: "user_email".to_string(),
            role: "user_role".to_string(),
            email_verified: "user_email_verified".to_string(),
        }
    }
}

/// Identity fields carried by session and verification tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Identity id
    pub user_id: Uuid,

    /// Email address
    pub email: String,

    /// Role name
    pub role: String,

    /// Whether the email has been verified
    pub email_verified: bool,
}

impl SessionClaims {
    /// Create identity claims.
    pub fn new(
        user_id: Uuid,
        email: impl Into<String>,
        role: impl Into<String>,
        email_verified: bool,
    ) -> Self {
        Self {
            user_id,
            email: email.into(),
            role: role.into(),
            email_verified,
        }
    }

    /// Render into a claim map under the configured names.
    pub fn to_claims(&self, names: &ClaimNames) -> ClaimMap {
        let mut claims = ClaimMap::new();
        claims.insert(names.id.clone(), Value::String(self.user_id.to_string()));
        claims.insert(names.email.clone(), Value::String(self.email.clone()));
        claims.insert(names.role.clone(), Value::String(self.role.clone()));
        claims.insert(
            names.email_verified.clone(),
            Value::Bool(self.email_verified),
        );
        claims
    }

    /// Read back from a claim map under the configured names.
    ///
    /// Any missing or mistyped field is reported as a malformed token.
    pub fn from_claims(claims: &ClaimMap, names: &ClaimNames) -> TokenResult<Self> {
        let user_id = claims
            .get(&names.id)
            .and_then(Value::as_str)
            .and_then(|s| Uuid::parse_str(s).ok())
            .ok_or(TokenError::Malformed)?;
        let email = claims
            .get(&names.email)
            .and_then(Value::as_str)
            .ok_or(TokenError::Malformed)?;
        let role = claims
            .get(&names.role)
            .and_then(Value::as_str)
            .ok_or(TokenError::Malformed)?;
        let email_verified = claims
            .get(&names.email_verified)
            .and_then(Value::as_bool)
            .ok_or(TokenError::Malformed)?;

        Ok(Self::new(user_id, email, role, email_verified))
    }
}
