//! Verification message composition and the delivery contract
//!
//! Transport lives outside this crate; the gate only hands a composed
//! [`VerificationMessage`] to a [`Mailer`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

/// Placeholder replaced by the one-time token in URL templates.
pub const TOKEN_PLACEHOLDER: &str = "%s";

/// Delivery failed; the message was not sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Delivery failed: {0}")]
pub struct DeliveryError(pub String);

/// Values rendered into the message template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageContext {
    /// Brand shown in the message body
    pub subject: String,

    /// Warning shown below the link
    pub warning_text: String,

    /// Link carrying the one-time token
    pub url: String,
}

/// A composed verification message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationMessage {
    /// Recipient address
    pub to: String,

    /// Message subject line
    pub subject: String,

    /// Template name
    pub template: String,

    /// Template context
    pub context: MessageContext,
}

/// Substitute `token` into an opaque URL template.
///
/// Templates without a placeholder are passed through unchanged.
pub fn render_url(template: &str, token: &str) -> String {
    template.replacen(TOKEN_PLACEHOLDER, token, 1)
}

/// Message delivery collaborator.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver a message.
    async fn deliver(&self, message: &VerificationMessage) -> Result<(), DeliveryError>;
}

/// Mailer that records messages in memory.
///
/// Useful for tests and local development. Can be switched to fail every
/// delivery.
#[derive(Debug, Clone, Default)]
pub struct MemoryMailer {
    sent: Arc<RwLock<Vec<VerificationMessage>>>,
    failing: Arc<AtomicBool>,
}

impl MemoryMailer {
    /// Create a mailer that accepts every message.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent deliveries fail or succeed.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Messages delivered so far.
    pub async fn sent(&self) -> Vec<VerificationMessage> {
        self.sent.read().await.clone()
    }

    /// Number of messages delivered so far.
    pub async fn sent_count(&self) -> usize {
        self.sent.read().await.len()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn deliver(&self, message: &VerificationMessage) -> Result<(), DeliveryError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(DeliveryError("mailer configured to fail".to_string()));
        }
        self.sent.write().await.push(message.clone());
        tracing::debug!(template = %message.template, "Recorded verification message");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message() -> VerificationMessage {
        VerificationMessage {
            to: "user@gmail.com".to_string(),
            subject: "Verify your email".to_string(),
            template: "verify_email.html".to_string(),
            context: MessageContext {
                subject: "Kaimono".to_string(),
                warning_text: "ignore".to_string(),
                url: "http://localhost:3000/login".to_string(),
            },
        }
    }

    #[test]
    fn test_render_url() {
        assert_eq!(
            render_url("http://localhost:3000/update-password/%s", "abc"),
            "http://localhost:3000/update-password/abc"
        );
        assert_eq!(
            render_url("http://localhost:3000/login", "abc"),
            "http://localhost:3000/login"
        );
    }

    #[tokio::test]
    async fn test_memory_mailer_records() {
        let mailer = MemoryMailer::new();
        mailer.deliver(&message()).await.unwrap();

        assert_eq!(mailer.sent_count().await, 1);
        assert_eq!(mailer.sent().await[0].to, "user@gmail.com");
    }

    #[tokio::test]
    async fn test_memory_mailer_failing() {
        let mailer = MemoryMailer::new();
        mailer.set_failing(true);

        assert!(mailer.deliver(&message()).await.is_err());
        assert_eq!(mailer.sent_count().await, 0);
    }
}
