//! # Kaimono Authentication
//!
//! Signed tokens and request authentication for the Kaimono account service.
//!
//! ## Overview
//!
//! The kaimono-auth crate handles:
//! - **Token codec**: HS256 signing of claim sets with an injected expiry
//! - **Two-key trust model**: session tokens and one-time verification
//!   tokens are signed with distinct secrets and never cross-decode
//! - **Auth gates**: one header-parsing contract, specialized per token kind
//! - **Request context**: decoded claims merged per request
//!
//! ## Usage
//!
//! ```rust,no_run
//! use kaimono_auth::{SessionClaims, TokenCodec, TokenConfig, TokenKind};
//! use uuid::Uuid;
//!
//! let codec = TokenCodec::new(TokenConfig::new("session-secret", "verify-secret")).unwrap();
//!
//! let identity = SessionClaims::new(Uuid::now_v7(), "user@gmail.com", "client", false);
//! let token = codec.issue_session_token(&identity).unwrap();
//!
//! let decoded = codec.decode_identity(&token, TokenKind::Session).unwrap();
//! assert_eq!(decoded, identity);
//! ```
//!
//! ### Authenticating a request
//!
//! ```rust,no_run
//! use kaimono_auth::{AuthGate, RequestContext, SessionGate, TokenCodec, TokenConfig};
//! use std::sync::Arc;
//!
//! let codec = Arc::new(TokenCodec::new(TokenConfig::new("session-secret", "verify-secret")).unwrap());
//! let gate = SessionGate::new(codec);
//!
//! let headers = vec![("Authorization", "Bearer <token>")];
//! let mut ctx = RequestContext::new();
//! match gate.authenticate(&headers, &mut ctx) {
//!     Ok(true) => println!("user: {:?}", ctx.get("user_email")),
//!     Ok(false) => println!("anonymous request"),
//!     Err(e) => println!("{} ({})", e, e.status_code()),
//! }
//! ```

pub mod claims;
pub mod clock;
pub mod context;
pub mod error;
pub mod gate;
pub mod jwt;

// Re-export main types
pub use claims::{ClaimMap, ClaimNames, ClaimSet, SessionClaims, TokenKind};
pub use clock::{Clock, FixedClock, SystemClock};
pub use context::RequestContext;
pub use error::{AuthError, AuthResult, TokenError, TokenResult};
pub use gate::{parse_authorization, AuthGate, HeaderSource, SessionGate, VerifyTokenGate};
pub use jwt::{TokenCodec, TokenConfig};
