//! Email acceptance policy
//!
//! Structure, domain allow-list and uniqueness checks for an address.

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::error::{RegistryError, ValidationError};

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\w.-]+@\w+[\w.-]+\w+\.\w+$").expect("email pattern is valid")
});

/// Message for a structurally invalid address.
pub const WRONG_EMAIL: &str = "Wrong email";

/// Message for a host outside the allow-list.
pub const UNSUPPORTED_DOMAIN: &str = "Unsupported domain";

/// Message for an address already registered.
pub const EMAIL_ALREADY_EXISTS: &str = "Email already exists!";

/// Existence lookup over known identities.
#[async_trait]
pub trait EmailRegistry: Send + Sync {
    /// Whether an identity with this email already exists.
    async fn email_exists(&self, email: &str) -> Result<bool, RegistryError>;
}

/// Email acceptance policy.
///
/// Three checks run in fixed order and all of them always run: structure,
/// allowed domain, uniqueness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailPolicy {
    /// Hosts accepted after the `@`
    pub allowed_domains: Vec<String>,
}

impl Default for EmailPolicy {
    fn default() -> Self {
        Self {
            allowed_domains: vec!["gmail.com".to_string(), "mail.ru".to_string()],
        }
    }
}

impl EmailPolicy {
    /// Create a policy accepting the given hosts.
    pub fn new<I, S>(allowed_domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed_domains: allowed_domains.into_iter().map(Into::into).collect(),
        }
    }

    /// Local part, `@`, a host of at least one dot, tail label.
    pub fn is_well_formed(&self, email: &str) -> bool {
        EMAIL_REGEX.is_match(email)
    }

    /// Host portion is on the allow-list.
    pub fn has_allowed_domain(&self, email: &str) -> bool {
        let mut parts = email.split('@');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(_), Some(domain), None) => self.allowed_domains.iter().any(|d| d == domain),
            _ => false,
        }
    }

    /// Messages for an address whose existence is already known.
    pub fn violations(&self, email: &str, exists: bool) -> Vec<String> {
        let mut messages = Vec::new();
        if !self.is_well_formed(email) {
            messages.push(WRONG_EMAIL.to_string());
        }
        if !self.has_allowed_domain(email) {
            messages.push(UNSUPPORTED_DOMAIN.to_string());
        }
        if exists {
            messages.push(EMAIL_ALREADY_EXISTS.to_string());
        }
        messages
    }

    /// Run all three checks, querying `registry` for uniqueness.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] if the existence query fails.
    pub async fn validate(
        &self,
        email: &str,
        registry: &dyn EmailRegistry,
    ) -> Result<Vec<String>, RegistryError> {
        let exists = registry.email_exists(email).await?;
        Ok(self.violations(email, exists))
    }

    /// Validate and report violations under the `email` field.
    ///
    /// The outer error is the registry failure; the inner one is the policy
    /// verdict.
    pub async fn check(
        &self,
        email: &str,
        registry: &dyn EmailRegistry,
    ) -> Result<Result<(), ValidationError>, RegistryError> {
        let violations = self.validate(email, registry).await?;
        Ok(ValidationError::ensure_accepted("email", violations))
    }
}
