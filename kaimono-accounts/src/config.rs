//! Service configuration.
//!
//! Aggregates the configuration of every component the account flows use.
//! Loaded once at startup, from environment variables with defaults for
//! local development, and never changed afterwards.

use chrono::Duration as ChronoDuration;
use kaimono_auth::jwt::MAX_TOKEN_LIFETIME_SECS;
use kaimono_auth::TokenConfig;
use kaimono_policy::{EmailPolicy, PasswordPolicy};
use kaimono_verify::GateConfig;
use std::time::Duration;
use thiserror::Error;

/// Default email verification link template (`%s` is the token).
pub const DEFAULT_VERIFY_EMAIL_URL: &str = "http://localhost:3000/verify-email/%s";

/// Default password-reset link template.
pub const DEFAULT_RESET_PASSWORD_URL: &str = "http://localhost:3000/update-password/%s";

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Missing required environment variable.
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    /// Invalid configuration value.
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue {
        /// Configuration key.
        key: String,
        /// Error message.
        message: String,
    },
}

/// Configuration for the account service.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Token codec and auth gate settings
    pub tokens: TokenConfig,

    /// Password acceptance policy
    pub password: PasswordPolicy,

    /// Email acceptance policy
    pub email: EmailPolicy,

    /// Verification gate settings
    pub gate: GateConfig,

    /// URL template for email verification messages (`%s` is the token)
    pub verify_email_url: String,

    /// URL template for password reset messages (`%s` is the token)
    pub reset_password_url: String,

    /// Redis URL for the shared cooldown store
    pub redis_url: Option<String>,
}

impl ServiceConfig {
    /// Create a configuration with the two signing secrets and defaults.
    pub fn new(session_secret: impl Into<String>, verification_secret: impl Into<String>) -> Self {
        Self {
            tokens: TokenConfig::new(session_secret, verification_secret),
            password: PasswordPolicy::default(),
            email: EmailPolicy::default(),
            gate: GateConfig::default(),
            verify_email_url: DEFAULT_VERIFY_EMAIL_URL.to_string(),
            reset_password_url: DEFAULT_RESET_PASSWORD_URL.to_string(),
            redis_url: None,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `SECRET_KEY`: Session token secret (required)
    /// - `VERIFY_SECRET_KEY`: Verification token secret (required, distinct)
    /// - `TOKEN_EXP_SECONDS`: Token lifetime (default: 43200)
    /// - `TOKEN_AUTH_SCHEME`: Authorization scheme (default: Bearer)
    /// - `PASSWORD_MIN_LEN`: Minimum password length (default: 10)
    /// - `ALLOWED_EMAIL_DOMAINS`: Comma-separated host allow-list
    ///   (default: gmail.com,mail.ru)
    /// - `VERIFICATION_TTL`: Cooldown between messages in seconds (default: 720)
    /// - `VERIFICATION_DELIVERY_TIMEOUT`: Mailer time limit in seconds (default: 30)
    /// - `VERIFY_EMAIL_REDIRECT_URL`: Verification link template
    /// - `REDIRECT_UPDATE_PWD_URL`: Password reset link template
    /// - `REDIS_URI`: Shared cooldown store
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|value| !value.is_empty())
                .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
        };

        let mut config = Self::new(required("SECRET_KEY")?, required("VERIFY_SECRET_KEY")?);

        if let Some(secs) = parse_var::<i64>(&lookup, "TOKEN_EXP_SECONDS")? {
            let lifetime = ChronoDuration::try_seconds(secs)
                .ok_or_else(|| invalid("TOKEN_EXP_SECONDS", "out of range"))?;
            config.tokens = config.tokens.with_lifetime(lifetime);
        }
        if let Some(scheme) = lookup("TOKEN_AUTH_SCHEME") {
            config.tokens = config.tokens.with_scheme(scheme);
        }
        if let Some(len) = parse_var::<usize>(&lookup, "PASSWORD_MIN_LEN")? {
            config.password = config.password.min(len);
        }
        if let Some(domains) = lookup("ALLOWED_EMAIL_DOMAINS") {
            let domains: Vec<String> = domains
                .split(',')
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string)
                .collect();
            if domains.is_empty() {
                return Err(invalid("ALLOWED_EMAIL_DOMAINS", "no domains listed"));
            }
            config.email = EmailPolicy::new(domains);
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "VERIFICATION_TTL")? {
            config.gate = config.gate.with_cooldown(Duration::from_secs(secs));
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "VERIFICATION_DELIVERY_TIMEOUT")? {
            config.gate = config.gate.with_delivery_timeout(Duration::from_secs(secs));
        }
        if let Some(url) = lookup("VERIFY_EMAIL_REDIRECT_URL") {
            config.verify_email_url = url;
        }
        if let Some(url) = lookup("REDIRECT_UPDATE_PWD_URL") {
            config.reset_password_url = url;
        }
        config.redis_url = lookup("REDIS_URI").filter(|url| !url.is_empty());

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that cannot run safely.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tokens.session_secret == self.tokens.verification_secret {
            return Err(invalid("VERIFY_SECRET_KEY", "must differ from SECRET_KEY"));
        }
        if self.tokens.lifetime <= ChronoDuration::zero() {
            return Err(invalid("TOKEN_EXP_SECONDS", "must be positive"));
        }
        if self.tokens.lifetime > ChronoDuration::seconds(MAX_TOKEN_LIFETIME_SECS) {
            return Err(invalid("TOKEN_EXP_SECONDS", "exceeds the maximum lifetime"));
        }
        if self.tokens.scheme.is_empty() || self.tokens.scheme.contains(' ') {
            return Err(invalid("TOKEN_AUTH_SCHEME", "must be a single word"));
        }
        if self.password.min_length == 0 {
            return Err(invalid("PASSWORD_MIN_LEN", "must be positive"));
        }
        if self.gate.cooldown_ttl.is_zero() {
            return Err(invalid("VERIFICATION_TTL", "must be positive"));
        }
        if self.gate.delivery_timeout.is_zero()
            || self.gate.delivery_timeout >= self.gate.in_flight_ttl
        {
            return Err(invalid(
                "VERIFICATION_DELIVERY_TIMEOUT",
                "must be positive and shorter than the in-flight reservation",
            ));
        }
        Ok(())
    }
}

fn invalid(key: &str, message: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        message: message.to_string(),
    }
}

fn parse_var<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| invalid(key, &e.to_string())),
    }
}
