//! Verification gate
//!
//! Decides whether a verification message may be sent to an address and
//! records the cooldown once it has been.
//!
//! # States
//!
//! ```text
//! NO_RECORD ──(reserve + deliver + mark)──▶ COOLING_DOWN
//!     ▲                                         │
//!     └────────────── TTL expiry ───────────────┘
//!
//! ANOMALOUS (key without expiry): terminal, needs external cleanup
//! ```
//!
//! No code path in this module deletes a cooldown key; records only ever
//! leave by expiring.
//!
//! # Single send
//!
//! Reading the TTL and writing the key later leaves a window where two
//! concurrent requests both see `NO_RECORD` and both send. The gate closes
//! it by reserving the key with an atomic set-if-absent before delivery,
//! using a short in-flight TTL, and extending it to the full cooldown after
//! delivery. A request that loses the reservation gets
//! [`GateError::InFlight`] and sends nothing. If delivery fails, the
//! in-flight reservation simply runs out.
//!
//! Delivery is abandoned after `delivery_timeout`, which is kept shorter
//! than the reservation so a slow mailer can never outlive it.

use crate::key::{cooldown_key, DEFAULT_KEY_PREFIX};
use crate::mailer::{render_url, Mailer, MessageContext, VerificationMessage};
use crate::store::{CooldownStore, KeyTtl, StoreError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Default cooldown between two messages to the same address (12 minutes).
pub const DEFAULT_COOLDOWN_SECS: u64 = 720;

/// Default lifetime of a pre-delivery reservation.
pub const DEFAULT_IN_FLIGHT_SECS: u64 = 60;

/// Default time limit for one delivery attempt.
pub const DEFAULT_DELIVERY_TIMEOUT_SECS: u64 = 30;

/// Generic retry-later message surfaced to callers.
pub const TRY_ANOTHER_TIME: &str = "Please, try another time.";

/// Default warning text included in every message.
pub const DEFAULT_WARNING_TEXT: &str = "if it wasn't you. Please ignore this message and do not share \
     the code with anyone.";

/// Verification gate error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GateError {
    /// A message was sent recently; seconds until the cooldown ends
    #[error("Code was sent to email. Try after {0} seconds")]
    NotEligible(i64),

    /// Another request holds the reservation for this address
    #[error("Please, try another time.")]
    InFlight,

    /// Cooldown key exists without an expiry
    #[error("Please, try another time.")]
    Anomalous,

    /// Address unknown or nothing to verify
    #[error("Not found")]
    NotFound,

    /// Mailer rejected the message
    #[error("Please, try another time.")]
    Delivery(String),

    /// Cooldown store failed
    #[error("Please, try another time.")]
    Store(StoreError),

    /// Token lookup failed
    #[error("Please, try another time.")]
    TokenSource(String),
}

/// Result type for gate operations.
pub type GateResult<T> = Result<T, GateError>;

impl From<StoreError> for GateError {
    fn from(err: StoreError) -> Self {
        GateError::Store(err)
    }
}

impl GateError {
    /// Check if this error should be logged at error level.
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            GateError::Anomalous
                | GateError::Delivery(_)
                | GateError::Store(_)
                | GateError::TokenSource(_)
        )
    }

    /// Get HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            GateError::NotEligible(_) | GateError::InFlight => 429,
            GateError::NotFound => 404,
            GateError::Anomalous
            | GateError::Delivery(_)
            | GateError::Store(_)
            | GateError::TokenSource(_) => 500,
        }
    }

    /// Get error code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            GateError::NotEligible(_) => "RATE_LIMIT_EXCEEDED",
            GateError::InFlight => "SEND_IN_FLIGHT",
            GateError::Anomalous => "INTERNAL_ERROR",
            GateError::NotFound => "NOT_FOUND",
            GateError::Delivery(_) => "DELIVERY_FAILED",
            GateError::Store(_) => "STORE_ERROR",
            GateError::TokenSource(_) => "INTERNAL_ERROR",
        }
    }
}

/// Gate state for one address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    /// No cooldown record; a send is permitted
    NoRecord,

    /// Cooldown running; seconds remaining
    CoolingDown(i64),

    /// Record without expiry
    Anomalous,
}

impl From<KeyTtl> for GateState {
    fn from(ttl: KeyTtl) -> Self {
        match ttl {
            KeyTtl::Missing => GateState::NoRecord,
            // TTL rounds down to 0 in the last half second
            KeyTtl::Expiring(secs) => GateState::CoolingDown(secs.max(1)),
            KeyTtl::Persistent => GateState::Anomalous,
        }
    }
}

/// Result of a send that got past the eligibility check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Delivered and cooldown recorded
    Sent,

    /// Delivered, but the cooldown could not be extended
    ///
    /// The caller must not send again; the in-flight reservation still
    /// blocks resends until it expires.
    DeliveredUnmarked,
}

/// Source of fresh one-time verification tokens.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Token for the identity behind `email`, or `None` if there is none.
    async fn verification_token(&self, email: &str) -> GateResult<Option<String>>;
}

/// Gate configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateConfig {
    /// Cooldown after a successful send
    pub cooldown_ttl: Duration,

    /// Reservation lifetime while a send is in progress
    pub in_flight_ttl: Duration,

    /// Time limit for the mailer, below `in_flight_ttl`
    pub delivery_timeout: Duration,

    /// Namespace for cooldown keys
    pub key_prefix: String,

    /// Subject line of the message
    pub email_subject: String,

    /// Brand rendered into the message body
    pub brand: String,

    /// Warning rendered below the link
    pub warning_text: String,

    /// Template name
    pub template: String,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            cooldown_ttl: Duration::from_secs(DEFAULT_COOLDOWN_SECS),
            in_flight_ttl: Duration::from_secs(DEFAULT_IN_FLIGHT_SECS),
            delivery_timeout: Duration::from_secs(DEFAULT_DELIVERY_TIMEOUT_SECS),
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            email_subject: "Verify your email".to_string(),
            brand: "Kaimono".to_string(),
            warning_text: DEFAULT_WARNING_TEXT.to_string(),
            template: "verify_email.html".to_string(),
        }
    }
}

impl GateConfig {
    /// Set the cooldown TTL.
    pub fn with_cooldown(mut self, ttl: Duration) -> Self {
        self.cooldown_ttl = ttl;
        self
    }

    /// Set the in-flight reservation TTL.
    pub fn with_in_flight(mut self, ttl: Duration) -> Self {
        self.in_flight_ttl = ttl;
        self
    }

    /// Set the delivery time limit.
    pub fn with_delivery_timeout(mut self, timeout: Duration) -> Self {
        self.delivery_timeout = timeout;
        self
    }

    /// Delivery time limit, capped to half the reservation.
    fn delivery_budget(&self) -> Duration {
        self.delivery_timeout.min(self.in_flight_ttl / 2)
    }
}

/// TTL-gated sender of verification messages.
pub struct VerificationGate {
    store: Arc<dyn CooldownStore>,
    mailer: Arc<dyn Mailer>,
    config: GateConfig,
}

impl std::fmt::Debug for VerificationGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerificationGate")
            .field("config", &self.config)
            .finish()
    }
}

impl VerificationGate {
    /// Create a gate over a cooldown store and a mailer.
    pub fn new(store: Arc<dyn CooldownStore>, mailer: Arc<dyn Mailer>, config: GateConfig) -> Self {
        Self {
            store,
            mailer,
            config,
        }
    }

    /// Get the configuration.
    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Cooldown key for `email`.
    pub fn key_for(&self, email: &str) -> String {
        cooldown_key(&self.config.key_prefix, email)
    }

    /// Current state for `email`.
    pub async fn state(&self, email: &str) -> GateResult<GateState> {
        let key = self.key_for(email);
        let ttl = self.store.ttl(&key).await.map_err(|e| {
            tracing::warn!(key = %key, error = %e, "Cooldown lookup failed");
            GateError::from(e)
        })?;
        Ok(GateState::from(ttl))
    }

    /// Fail unless a send to `email` is currently permitted.
    pub async fn ensure_eligible(&self, email: &str) -> GateResult<()> {
        match self.state(email).await? {
            GateState::NoRecord => Ok(()),
            GateState::CoolingDown(secs) => Err(GateError::NotEligible(secs)),
            GateState::Anomalous => {
                tracing::error!(
                    key = %self.key_for(email),
                    "Cooldown key exists and has no TTL (it never expires)"
                );
                Err(GateError::Anomalous)
            }
        }
    }

    /// Compose the message for `email` carrying `token`.
    pub fn compose(&self, email: &str, url_template: &str, token: &str) -> VerificationMessage {
        VerificationMessage {
            to: email.to_string(),
            subject: self.config.email_subject.clone(),
            template: self.config.template.clone(),
            context: MessageContext {
                subject: self.config.brand.clone(),
                warning_text: self.config.warning_text.clone(),
                url: render_url(url_template, token),
            },
        }
    }

    /// Send a verification message to `email` if the cooldown allows it.
    ///
    /// `url_template` is passed through opaquely; its `%s` placeholder is
    /// replaced by the token obtained from `tokens`.
    ///
    /// # Errors
    ///
    /// - [`GateError::NotEligible`] while a cooldown runs
    /// - [`GateError::Anomalous`] for a key without expiry
    /// - [`GateError::NotFound`] when `tokens` has nothing for `email`
    /// - [`GateError::InFlight`] when a concurrent send holds the reservation
    /// - [`GateError::Delivery`] when the mailer fails or exceeds its time
    ///   limit
    pub async fn send(
        &self,
        email: &str,
        url_template: &str,
        tokens: &dyn TokenSource,
    ) -> GateResult<SendOutcome> {
        self.ensure_eligible(email).await?;

        let token = tokens
            .verification_token(email)
            .await?
            .ok_or(GateError::NotFound)?;

        let key = self.key_for(email);
        if !self.store.reserve(&key, self.config.in_flight_ttl).await? {
            tracing::info!(key = %key, "Verification send already in flight");
            return Err(GateError::InFlight);
        }

        let message = self.compose(email, url_template, &token);
        let budget = self.config.delivery_budget();
        let delivered = match tokio::time::timeout(budget, self.mailer.deliver(&message)).await {
            Ok(result) => result.map_err(|e| e.to_string()),
            Err(_) => Err(format!("timed out after {}s", budget.as_secs())),
        };
        if let Err(e) = delivered {
            tracing::error!(key = %key, error = %e, "Verification message delivery failed");
            return Err(GateError::Delivery(e));
        }

        match self.store.mark(&key, self.config.cooldown_ttl).await {
            Ok(()) => {
                tracing::info!(
                    key = %key,
                    cooldown_secs = self.config.cooldown_ttl.as_secs(),
                    "Verification message sent"
                );
                Ok(SendOutcome::Sent)
            }
            Err(e) => {
                tracing::error!(
                    key = %key,
                    error = %e,
                    "Verification message delivered but cooldown not recorded"
                );
                Ok(SendOutcome::DeliveredUnmarked)
            }
        }
    }
}
