//! # Kaimono Accounts
//!
//! Account flows for the Kaimono account service, built on
//! `kaimono-auth`, `kaimono-policy` and `kaimono-verify`.
//!
//! ## Overview
//!
//! The kaimono-accounts crate handles:
//! - **Identities**: account model plus the store and hasher collaborators
//! - **Configuration**: one immutable [`ServiceConfig`] loaded at startup
//! - **Flows**: login, registration, profile, email verification and
//!   password reset
//!
//! ## Architecture
//!
//! ```text
//! request ─→ AuthGate (session | verification) ─→ RequestContext
//!                                                    │
//!                                              AccountService
//!                     ┌──────────────┬───────────────┼───────────────┐
//!               PasswordPolicy  EmailPolicy   VerificationGate   TokenCodec
//!                                    │               │
//!                              IdentityStore   CooldownStore + Mailer
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use kaimono_accounts::{
//!     AccountService, CredentialHasher, MemoryIdentityStore, ServiceConfig,
//! };
//! use kaimono_verify::{MemoryCooldownStore, MemoryMailer};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! struct Hasher;
//!
//! impl CredentialHasher for Hasher {
//!     fn hash(&self, plain: &str) -> String {
//!         plain.to_string()
//!     }
//!
//!     fn verify(&self, plain: &str, hash: &str) -> bool {
//!         plain == hash
//!     }
//! }
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = AccountService::new(
//!         ServiceConfig::from_env()?,
//!         Arc::new(MemoryIdentityStore::new()),
//!         Arc::new(Hasher),
//!         Arc::new(MemoryCooldownStore::new()),
//!         Arc::new(MemoryMailer::new()),
//!     )?;
//!
//!     let body = json!({
//!         "email": "user@gmail.com",
//!         "password": "ValidP@ssw0rd",
//!         "full_name": "Jane Doe",
//!     });
//!     let registered = service.register(body.as_object().unwrap()).await?;
//!     println!("token: {}", registered.token);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! - `redis`: enables `kaimono_verify::RedisCooldownStore`

pub mod config;
pub mod error;
pub mod identity;
pub mod service;

// Re-export main types for convenience
pub use config::{ConfigError, ServiceConfig};
pub use error::{AccountError, AccountResult, INVALID_CREDENTIALS, MISSING_FIELDS_FOR_UPDATE};
pub use identity::{
    CredentialHasher, Identity, IdentityStore, IdentityStoreError, IdentityStoreResult,
    MemoryIdentityStore, Profile, ProfileUpdate, Role,
};
pub use service::{AccountService, Cookie, TokenResponse, EMAIL_VERIFIED_COOKIE, ROLE_COOKIE};
