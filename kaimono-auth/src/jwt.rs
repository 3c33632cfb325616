//! Signed token codec
//!
//! This module signs and verifies claim sets with HS256 using the
//! jsonwebtoken crate. Two independent secrets are held: one for session
//! tokens and one for one-time verification tokens. A token signed under
//! one secret always fails to decode under the other with
//! [`TokenError::Malformed`], because the signature is checked before the
//! expiry.

use crate::claims::{ClaimMap, ClaimNames, ClaimSet, SessionClaims, TokenKind, EXPIRY_CLAIM};
use crate::clock::{Clock, SystemClock};
use crate::error::{AuthError, AuthResult, TokenError, TokenResult};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use std::sync::Arc;

/// Default token lifetime (12 hours).
pub const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 43_200;

/// Longest accepted token lifetime (10 years).
pub const MAX_TOKEN_LIFETIME_SECS: i64 = 315_360_000;

/// Default authorization scheme literal.
pub const DEFAULT_SCHEME: &str = "Bearer";

/// Default header carrying session tokens.
pub const DEFAULT_SESSION_HEADER: &str = "Authorization";

/// Default header carrying verification tokens.
pub const DEFAULT_VERIFICATION_HEADER: &str = "X-VERIFY-TOKEN";

const ALGORITHM: Algorithm = Algorithm::HS256;

/// Token configuration shared by the codec and the auth gates.
#[derive(Clone)]
pub struct TokenConfig {
    /// Secret for session tokens
    pub session_secret: String,

    /// Secret for verification tokens
    pub verification_secret: String,

    /// Lifetime applied to both token kinds
    pub lifetime: Duration,

    /// Scheme literal expected before the token in auth headers
    pub scheme: String,

    /// Header read by the session gate
    pub session_header: String,

    /// Header read by the verification gate
    pub verification_header: String,

    /// Claim names for the identity fields
    pub claim_names: ClaimNames,
}

impl std::fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenConfig")
            .field("session_secret", &"[REDACTED]")
            .field("verification_secret", &"[REDACTED]")
            .field("lifetime", &self.lifetime)
            .field("scheme", &self.scheme)
            .field("session_header", &self.session_header)
            .field("verification_header", &self.verification_header)
            .field("claim_names", &self.claim_names)
            .finish()
    }
}

impl TokenConfig {
    /// Create a configuration with the two secrets and default settings.
    pub fn new(session_secret: impl Into<String>, verification_secret: impl Into<String>) -> Self {
        Self {
            session_secret: session_secret.into(),
            verification_secret: verification_secret.into(),
            lifetime: Duration::seconds(DEFAULT_TOKEN_LIFETIME_SECS),
            scheme: DEFAULT_SCHEME.to_string(),
            session_header: DEFAULT_SESSION_HEADER.to_string(),
            verification_header: DEFAULT_VERIFICATION_HEADER.to_string(),
            claim_names: ClaimNames::default(),
        }
    }

    /// Set the token lifetime.
    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    /// Set the authorization scheme literal.
    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    /// Set the claim names.
    pub fn with_claim_names(mut self, claim_names: ClaimNames) -> Self {
        self.claim_names = claim_names;
        self
    }

    /// Reject configurations that would weaken the trust model.
    pub fn validate(&self) -> AuthResult<()> {
        if self.session_secret.is_empty() {
            return Err(AuthError::Config("Session secret is empty".to_string()));
        }
        if self.verification_secret.is_empty() {
            return Err(AuthError::Config("Verification secret is empty".to_string()));
        }
        if self.session_secret == self.verification_secret {
            return Err(AuthError::Config(
                "Session and verification secrets must differ".to_string(),
            ));
        }
        if self.lifetime <= Duration::zero() {
            return Err(AuthError::Config("Token lifetime must be positive".to_string()));
        }
        if self.lifetime > Duration::seconds(MAX_TOKEN_LIFETIME_SECS) {
            return Err(AuthError::Config(format!(
                "Token lifetime must not exceed {} seconds",
                MAX_TOKEN_LIFETIME_SECS
            )));
        }
        if self.scheme.is_empty() || self.scheme.contains(' ') {
            return Err(AuthError::Config(format!("Invalid scheme: {:?}", self.scheme)));
        }
        Ok(())
    }
}

struct SigningKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl SigningKeys {
    fn from_secret(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

/// Codec for session and verification tokens.
pub struct TokenCodec {
    config: TokenConfig,
    session: SigningKeys,
    verification: SigningKeys,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("config", &self.config)
            .field("session_keys", &"[REDACTED]")
            .field("verification_keys", &"[REDACTED]")
            .finish()
    }
}

impl TokenCodec {
    /// Create a codec using the wall clock.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Config`] when the configuration is rejected by
    /// [`TokenConfig::validate`].
    pub fn new(config: TokenConfig) -> AuthResult<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a codec with an explicit time source.
    pub fn with_clock(config: TokenConfig, clock: Arc<dyn Clock>) -> AuthResult<Self> {
        config.validate()?;
        let session = SigningKeys::from_secret(&config.session_secret);
        let verification = SigningKeys::from_secret(&config.verification_secret);

        Ok(Self {
            config,
            session,
            verification,
            clock,
        })
    }

    fn keys(&self, kind: TokenKind) -> &SigningKeys {
        match kind {
            TokenKind::Session => &self.session,
            TokenKind::Verification => &self.verification,
        }
    }

    /// Expiry a token issued now would carry.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Encoding`] when the expiry falls outside the
    /// representable date range.
    pub fn expiry_from_now(&self) -> TokenResult<DateTime<Utc>> {
        self.clock
            .now()
            .checked_add_signed(self.config.lifetime)
            .ok_or_else(|| TokenError::Encoding("Token expiry out of range".to_string()))
    }

    /// Sign `claims` under the secret for `kind`.
    ///
    /// The expiry is injected as now + configured lifetime.
    pub fn encode(&self, claims: ClaimMap, kind: TokenKind) -> TokenResult<String> {
        let set = ClaimSet::new(claims, self.expiry_from_now()?);
        encode(&Header::new(ALGORITHM), &set, &self.keys(kind).encoding)
            .map_err(|e| TokenError::Encoding(e.to_string()))
    }

    /// Verify signature and expiry under the secret for `kind`.
    ///
    /// # Errors
    ///
    /// - [`TokenError::Expired`] when the signature is valid but the expiry
    ///   has passed
    /// - [`TokenError::Malformed`] for everything else
    pub fn decode(&self, token: &str, kind: TokenKind) -> TokenResult<ClaimSet> {
        let mut validation = Validation::new(ALGORITHM);
        // Expiry is checked below against the injected clock.
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&[EXPIRY_CLAIM]);

        let data = decode::<ClaimSet>(token, &self.keys(kind).decoding, &validation).map_err(
            |e| {
                tracing::debug!(kind = %kind, error = %e, "Token rejected");
                TokenError::Malformed
            },
        )?;

        if data.claims.is_expired_at(self.clock.now()) {
            tracing::debug!(kind = %kind, exp = data.claims.exp, "Token expired");
            return Err(TokenError::Expired);
        }

        Ok(data.claims)
    }

    /// Issue a session token for an identity.
    pub fn issue_session_token(&self, identity: &SessionClaims) -> TokenResult<String> {
        self.encode(identity.to_claims(&self.config.claim_names), TokenKind::Session)
    }

    /// Issue a one-time verification token for an identity.
    pub fn issue_verification_token(&self, identity: &SessionClaims) -> TokenResult<String> {
        self.encode(
            identity.to_claims(&self.config.claim_names),
            TokenKind::Verification,
        )
    }

    /// Decode a token and read its identity fields.
    pub fn decode_identity(&self, token: &str, kind: TokenKind) -> TokenResult<SessionClaims> {
        let set = self.decode(token, kind)?;
        SessionClaims::from_claims(&set.claims, &self.config.claim_names)
    }

    /// Get the configuration.
    pub fn config(&self) -> &TokenConfig {
        &self.config
    }

    /// Token lifetime in whole seconds.
    pub fn lifetime_secs(&self) -> i64 {
        self.config.lifetime.num_seconds()
    }
}
