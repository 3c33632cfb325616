//! Request authentication gates
//!
//! Every gate follows one contract: read a header, split it into
//! `<scheme> <token>`, check the scheme, decode the token with the gate's
//! secret and merge the claims into the request context. Gates only differ
//! in which header they read, which secret they decode with, and whether a
//! missing header is an error.
//!
//! | Gate              | Header          | Secret       | Missing header |
//! |-------------------|-----------------|--------------|----------------|
//! | [`SessionGate`]   | `Authorization` | session      | no-op          |
//! | [`VerifyTokenGate`] | `X-VERIFY-TOKEN` | verification | error        |

use crate::claims::TokenKind;
use crate::context::RequestContext;
use crate::error::{AuthError, AuthResult};
use crate::jwt::TokenCodec;
use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;
use std::sync::Arc;

/// Read-only view over inbound request headers.
///
/// Header names are matched case-insensitively.
pub trait HeaderSource {
    /// Value of the named header, if present.
    fn header(&self, name: &str) -> Option<&str>;
}

impl<S: BuildHasher> HeaderSource for HashMap<String, String, S> {
    fn header(&self, name: &str) -> Option<&str> {
        self.iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

impl HeaderSource for BTreeMap<String, String> {
    fn header(&self, name: &str) -> Option<&str> {
        self.iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

impl<K: AsRef<str>, V: AsRef<str>> HeaderSource for [(K, V)] {
    fn header(&self, name: &str) -> Option<&str> {
        self.iter()
            .find(|(key, _)| key.as_ref().eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_ref())
    }
}

impl<K: AsRef<str>, V: AsRef<str>> HeaderSource for Vec<(K, V)> {
    fn header(&self, name: &str) -> Option<&str> {
        self.as_slice().header(name)
    }
}

/// Split an authorization header value and return the token part.
///
/// The value must be exactly two space-separated parts and the first part
/// must equal `scheme`.
///
/// # Errors
///
/// - [`AuthError::InvalidToken`] when the value does not split in two
/// - [`AuthError::BadScheme`] when the scheme differs
pub fn parse_authorization<'a>(value: &'a str, scheme: &str) -> AuthResult<&'a str> {
    let mut parts = value.split(' ');
    let (Some(found_scheme), Some(token), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(AuthError::InvalidToken);
    };

    if found_scheme != scheme {
        return Err(AuthError::BadScheme);
    }

    Ok(token)
}

/// Shared request-authentication contract.
pub trait AuthGate: Send + Sync {
    /// Header this gate reads.
    fn header_name(&self) -> &str;

    /// Secret this gate decodes with.
    fn token_kind(&self) -> TokenKind;

    /// Codec used to decode tokens.
    fn codec(&self) -> &TokenCodec;

    /// Whether a missing header is an error.
    fn header_required(&self) -> bool {
        false
    }

    /// Authenticate a request, merging claims into `context`.
    ///
    /// Returns `Ok(false)` when the header is absent on an optional gate,
    /// `Ok(true)` when claims were merged.
    fn authenticate(
        &self,
        headers: &dyn HeaderSource,
        context: &mut RequestContext,
    ) -> AuthResult<bool> {
        let value = match headers.header(self.header_name()) {
            Some(value) if !value.is_empty() => value,
            _ if self.header_required() => return Err(AuthError::HeaderMissing),
            _ => return Ok(false),
        };

        let codec = self.codec();
        let token = parse_authorization(value, &codec.config().scheme)?;
        let claims = codec.decode(token, self.token_kind()).map_err(|e| {
            tracing::debug!(header = %self.header_name(), error = %e, "Authentication failed");
            AuthError::DecodeFailed(e)
        })?;

        context.merge(claims);
        Ok(true)
    }
}

/// Optional session authentication on the generic authorization header.
#[derive(Debug, Clone)]
pub struct SessionGate {
    codec: Arc<TokenCodec>,
}

impl SessionGate {
    /// Create a session gate.
    pub fn new(codec: Arc<TokenCodec>) -> Self {
        Self { codec }
    }
}

impl AuthGate for SessionGate {
    fn header_name(&self) -> &str {
        &self.codec.config().session_header
    }

    fn token_kind(&self) -> TokenKind {
        TokenKind::Session
    }

    fn codec(&self) -> &TokenCodec {
        &self.codec
    }
}

/// Mandatory proof-of-mailbox authentication on the verification header.
#[derive(Debug, Clone)]
pub struct VerifyTokenGate {
    codec: Arc<TokenCodec>,
}

impl VerifyTokenGate {
    /// Create a verification gate.
    pub fn new(codec: Arc<TokenCodec>) -> Self {
        Self { codec }
    }
}

impl AuthGate for VerifyTokenGate {
    fn header_name(&self) -> &str {
        &self.codec.config().verification_header
    }

    fn token_kind(&self) -> TokenKind {
        TokenKind::Verification
    }

    fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    fn header_required(&self) -> bool {
        true
    }
}
