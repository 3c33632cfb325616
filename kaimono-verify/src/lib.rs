//! # Kaimono Verify
//!
//! Cooldown-gated delivery of verification messages (email confirmation and
//! password reset links).
//!
//! ## Overview
//!
//! The kaimono-verify crate handles:
//! - **Cooldown Store**: TTL-keyed cache with an atomic reservation
//! - **Verification Gate**: At most one message per address per cooldown
//! - **Mailer**: Delivery contract for composed messages
//!
//! ## Features
//!
//! - `redis`: Redis-backed cooldown store for multi-instance deployments
//!
//! ## Usage
//!
//! ```rust,no_run
//! use kaimono_verify::{
//!     GateConfig, GateResult, MemoryCooldownStore, MemoryMailer, TokenSource,
//!     VerificationGate,
//! };
//! use std::sync::Arc;
//!
//! struct Tokens;
//!
//! #[async_trait::async_trait]
//! impl TokenSource for Tokens {
//!     async fn verification_token(&self, _email: &str) -> GateResult<Option<String>> {
//!         Ok(Some("one-time-token".to_string()))
//!     }
//! }
//!
//! async fn example() {
//!     let gate = VerificationGate::new(
//!         Arc::new(MemoryCooldownStore::new()),
//!         Arc::new(MemoryMailer::new()),
//!         GateConfig::default(),
//!     );
//!
//!     match gate
//!         .send("user@gmail.com", "http://localhost:3000/update-password/%s", &Tokens)
//!         .await
//!     {
//!         Ok(outcome) => println!("{:?}", outcome),
//!         Err(e) => println!("{} ({})", e, e.status_code()),
//!     }
//! }
//! ```
//!
//! ## Cooldown keys
//!
//! Keys are `{prefix}:{sha256(email)}` so addresses never appear in the
//! cache. Records carry no payload and are never deleted by this crate.

pub mod gate;
pub mod key;
pub mod mailer;
pub mod store;

#[cfg(feature = "redis")]
pub mod redis;

pub use gate::{
    GateConfig, GateError, GateResult, GateState, SendOutcome, TokenSource, VerificationGate,
    DEFAULT_COOLDOWN_SECS, DEFAULT_DELIVERY_TIMEOUT_SECS, DEFAULT_IN_FLIGHT_SECS,
    TRY_ANOTHER_TIME,
};
pub use key::{cooldown_key, normalize_email, DEFAULT_KEY_PREFIX};
pub use mailer::{
    render_url, DeliveryError, Mailer, MemoryMailer, MessageContext, VerificationMessage,
    TOKEN_PLACEHOLDER,
};
pub use store::{CooldownStore, KeyTtl, MemoryCooldownStore, StoreError, StoreResult};

#[cfg(feature = "redis")]
pub use self::redis::RedisCooldownStore;
