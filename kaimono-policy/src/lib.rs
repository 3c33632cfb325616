//! # Kaimono Policy
//!
//! Acceptance policy for credentials submitted to the Kaimono account service.
//!
//! ## Overview
//!
//! The kaimono-policy crate handles:
//! - **Required fields**: presence check that runs before any content policy
//! - **Password policy**: length, mixed case, digit, special character
//! - **Email policy**: structure, allowed domain, uniqueness
//!
//! Every validator runs a fixed, ordered battery of independent checks and
//! collects one message per failed check. Messages are surfaced verbatim to
//! callers, so their order is part of the contract.
//!
//! ## Usage
//!
//! ```rust
//! use kaimono_policy::{PasswordPolicy, EmailPolicy};
//!
//! let passwords = PasswordPolicy::default();
//! assert_eq!(
//!     passwords.validate("no:password123"),
//!     vec!["The password must contain letters of different case"],
//! );
//!
//! let emails = EmailPolicy::default();
//! assert!(emails.is_well_formed("user@gmail.com"));
//! assert!(!emails.has_allowed_domain("user@example.com"));
//! ```

pub mod email;
pub mod error;
pub mod password;
pub mod required;

// Re-export main types for convenience
pub use email::{EmailPolicy, EmailRegistry};
pub use error::{RegistryError, ValidationError, REQUIRED_FIELD_MISSING};
pub use password::{PasswordPolicy, PasswordRule};
pub use required::{check_required_fields, missing_fields, string_field};
