//! Account flows
//!
//! [`AccountService`] wires the token codec, the auth gates, the acceptance
//! policies and the verification gate over the external collaborators.
//! HTTP routing and marshaling stay with the caller: flows take the parsed
//! JSON body and a header view and return typed results.
//!
//! | Flow                          | Auth              | Checks                                 |
//! |-------------------------------|-------------------|----------------------------------------|
//! | [`login`](AccountService::login)                         | none   | required fields, credentials |
//! | [`register`](AccountService::register)                   | none   | required fields, email, password |
//! | [`profile`](AccountService::profile)                     | session | identity in context |
//! | [`update_profile`](AccountService::update_profile)       | session | email, non-empty update |
//! | [`request_email_verification`](AccountService::request_email_verification) | none | known email, cooldown |
//! | [`request_password_reset`](AccountService::request_password_reset)         | none | known email, cooldown |
//! | [`confirm_email`](AccountService::confirm_email)         | verification | known email, password |
//! | [`update_password`](AccountService::update_password)     | verification | password policy |

use crate::config::ServiceConfig;
use crate::error::{AccountError, AccountResult};
use crate::identity::{CredentialHasher, Identity, IdentityStore, Profile, ProfileUpdate};
use async_trait::async_trait;
use kaimono_auth::{
    AuthError, AuthGate, Clock, HeaderSource, RequestContext, SessionGate, SystemClock,
    TokenCodec, VerifyTokenGate,
};
use kaimono_policy::{check_required_fields, string_field, EmailRegistry, RegistryError};
use kaimono_verify::{
    CooldownStore, GateError, GateResult, Mailer, SendOutcome, TokenSource, VerificationGate,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use uuid::Uuid;

/// Cookie carrying the account role.
pub const ROLE_COOKIE: &str = "user_role";

/// Cookie carrying the email-verified flag (`"1"` / `"0"`).
pub const EMAIL_VERIFIED_COOKIE: &str = "user_email_verified";

/// Cookie the caller should set on the response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cookie {
    /// Cookie name
    pub name: String,

    /// Cookie value
    pub value: String,

    /// Lifetime in seconds
    pub max_age: i64,
}

impl Cookie {
    fn new(name: &str, value: impl Into<String>, max_age: i64) -> Self {
        Self {
            name: name.to_string(),
            value: value.into(),
            max_age,
        }
    }
}

/// Session token issued by login or registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    /// Signed session token
    pub token: String,

    /// Cookies to set alongside the token
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub cookies: Vec<Cookie>,
}

/// Email existence over the identity store.
struct StoreRegistry<'a>(&'a dyn IdentityStore);

#[async_trait]
impl EmailRegistry for StoreRegistry<'_> {
    async fn email_exists(&self, email: &str) -> Result<bool, RegistryError> {
        self.0
            .email_exists(email)
            .await
            .map_err(|e| RegistryError(e.to_string()))
    }
}

/// Verification tokens minted for stored identities.
struct IdentityTokens<'a> {
    identities: &'a dyn IdentityStore,
    codec: &'a TokenCodec,
}

#[async_trait]
impl TokenSource for IdentityTokens<'_> {
    async fn verification_token(&self, email: &str) -> GateResult<Option<String>> {
        let identity = self
            .identities
            .find_by_email(email)
            .await
            .map_err(|e| GateError::TokenSource(e.to_string()))?;

        match identity {
            None => Ok(None),
            Some(identity) => self
                .codec
                .issue_verification_token(&identity.session_claims())
                .map(Some)
                .map_err(|e| GateError::TokenSource(e.to_string())),
        }
    }
}

/// Account service.
pub struct AccountService {
    config: ServiceConfig,
    codec: Arc<TokenCodec>,
    session_gate: SessionGate,
    verify_gate: VerifyTokenGate,
    verification: VerificationGate,
    identities: Arc<dyn IdentityStore>,
    hasher: Arc<dyn CredentialHasher>,
}

impl std::fmt::Debug for AccountService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountService")
            .field("config", &self.config)
            .field("verification", &self.verification)
            .finish_non_exhaustive()
    }
}

impl AccountService {
    /// Create a service using the wall clock.
    ///
    /// # Errors
    ///
    /// Returns [`AccountError::Auth`] when the token configuration is
    /// rejected.
    pub fn new(
        config: ServiceConfig,
        identities: Arc<dyn IdentityStore>,
        hasher: Arc<dyn CredentialHasher>,
        cooldowns: Arc<dyn CooldownStore>,
        mailer: Arc<dyn Mailer>,
    ) -> AccountResult<Self> {
        Self::with_clock(config, identities, hasher, cooldowns, mailer, Arc::new(SystemClock))
    }

    /// Create a service with an explicit time source for tokens.
    pub fn with_clock(
        config: ServiceConfig,
        identities: Arc<dyn IdentityStore>,
        hasher: Arc<dyn CredentialHasher>,
        cooldowns: Arc<dyn CooldownStore>,
        mailer: Arc<dyn Mailer>,
        clock: Arc<dyn Clock>,
    ) -> AccountResult<Self> {
        let codec = Arc::new(TokenCodec::with_clock(config.tokens.clone(), clock)?);
        let verification = VerificationGate::new(cooldowns, mailer, config.gate.clone());

        Ok(Self {
            session_gate: SessionGate::new(codec.clone()),
            verify_gate: VerifyTokenGate::new(codec.clone()),
            codec,
            verification,
            identities,
            hasher,
            config,
        })
    }

    /// Get the configuration.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Get the token codec.
    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Run the optional session gate over request headers.
    ///
    /// A request without the session header yields an empty context.
    pub fn authenticate(&self, headers: &dyn HeaderSource) -> AccountResult<RequestContext> {
        let mut context = RequestContext::new();
        self.session_gate.authenticate(headers, &mut context)?;
        Ok(context)
    }

    /// Exchange email and password for a session token.
    pub async fn login(&self, body: &Map<String, Value>) -> AccountResult<TokenResponse> {
        check_required_fields(body, &["email", "password"])?;
        let email = text_field(body, "email")?;
        let password = text_field(body, "password")?;

        let identity = match self.identities.find_by_email(email).await? {
            Some(identity) if self.hasher.verify(password, &identity.password_hash) => identity,
            _ => {
                tracing::debug!("Login rejected");
                return Err(AccountError::InvalidCredentials);
            }
        };

        let token = self.codec.issue_session_token(&identity.session_claims())?;
        tracing::info!(user_id = %identity.id, "Login succeeded");

        Ok(TokenResponse {
            token,
            cookies: self.session_cookies(&identity),
        })
    }

    /// Register a new client account and issue its session token.
    pub async fn register(&self, body: &Map<String, Value>) -> AccountResult<TokenResponse> {
        check_required_fields(body, &["email", "password", "full_name"])?;
        let email = text_field(body, "email")?;
        let password = text_field(body, "password")?;
        let full_name = text_field(body, "full_name")?;

        self.config
            .email
            .check(email, &StoreRegistry(self.identities.as_ref()))
            .await??;
        self.config.password.check(password)?;

        let identity = Identity::new_client(email, self.hasher.hash(password), full_name);
        let identity = self.identities.create(identity).await?;
        let token = self.codec.issue_session_token(&identity.session_claims())?;

        tracing::info!(user_id = %identity.id, "Account registered");

        Ok(TokenResponse {
            token,
            cookies: Vec::new(),
        })
    }

    /// Profile of the authenticated identity.
    pub async fn profile(&self, context: &RequestContext) -> AccountResult<Profile> {
        let user_id = self.require_identity(context)?;
        let identity = self
            .identities
            .find_by_id(user_id)
            .await?
            .ok_or(AccountError::NotFound)?;
        Ok(identity.profile())
    }

    /// Update email and/or full name of the authenticated identity.
    pub async fn update_profile(
        &self,
        context: &RequestContext,
        body: &Map<String, Value>,
    ) -> AccountResult<Profile> {
        let user_id = self.require_identity(context)?;

        let mut update = ProfileUpdate::default();
        if let Some(email) = non_empty(body, "email") {
            self.config
                .email
                .check(email, &StoreRegistry(self.identities.as_ref()))
                .await??;
            update.email = Some(email.to_string());
        }
        if let Some(full_name) = non_empty(body, "full_name") {
            update.full_name = Some(full_name.to_string());
        }

        if update.is_empty() {
            return Err(AccountError::EmptyUpdate);
        }

        let identity = self.identities.update_profile(user_id, &update).await?;
        tracing::info!(user_id = %user_id, email_changed = update.email.is_some(), "Profile updated");
        Ok(identity.profile())
    }

    /// Send an email verification message, subject to the cooldown.
    pub async fn request_email_verification(&self, email: &str) -> AccountResult<SendOutcome> {
        self.send_verification(email, &self.config.verify_email_url)
            .await
    }

    /// Send a password reset message, subject to the cooldown.
    pub async fn request_password_reset(&self, email: &str) -> AccountResult<SendOutcome> {
        self.send_verification(email, &self.config.reset_password_url)
            .await
    }

    async fn send_verification(&self, email: &str, url_template: &str) -> AccountResult<SendOutcome> {
        if !self.identities.email_exists(email).await? {
            return Err(AccountError::NotFound);
        }

        let tokens = IdentityTokens {
            identities: self.identities.as_ref(),
            codec: &self.codec,
        };
        Ok(self.verification.send(email, url_template, &tokens).await?)
    }

    /// Prove possession of `email` with a verification token and password.
    ///
    /// Returns the cookie flagging the email as verified.
    pub async fn confirm_email(
        &self,
        email: &str,
        headers: &dyn HeaderSource,
        body: &Map<String, Value>,
    ) -> AccountResult<Vec<Cookie>> {
        if !self.identities.email_exists(email).await? {
            return Err(AccountError::NotFound);
        }

        let user_id = self.verified_identity(headers)?;
        check_required_fields(body, &["password"])?;
        let password = text_field(body, "password")?;

        let identity = self
            .identities
            .find_by_id(user_id)
            .await?
            .ok_or(AccountError::NotFound)?;
        if identity.email != email {
            tracing::debug!(user_id = %user_id, "Verification token issued for another address");
            return Err(AccountError::Auth(AuthError::InvalidToken));
        }
        if !self.hasher.verify(password, &identity.password_hash) {
            return Err(AccountError::InvalidCredentials);
        }

        self.identities.mark_email_verified(user_id).await?;
        tracing::info!(user_id = %user_id, "Email verified");

        Ok(vec![Cookie::new(
            EMAIL_VERIFIED_COOKIE,
            "1",
            self.codec.lifetime_secs(),
        )])
    }

    /// Set a new password for the identity behind a verification token.
    pub async fn update_password(
        &self,
        headers: &dyn HeaderSource,
        body: &Map<String, Value>,
    ) -> AccountResult<()> {
        let user_id = self.verified_identity(headers)?;
        check_required_fields(body, &["password"])?;
        let password = text_field(body, "password")?;
        self.config.password.check(password)?;

        self.identities
            .update_password(user_id, &self.hasher.hash(password))
            .await
            .map_err(|e| {
                tracing::error!(user_id = %user_id, error = %e, "Password update failed");
                AccountError::from(e)
            })?;

        tracing::info!(user_id = %user_id, "Password updated");
        Ok(())
    }

    fn require_identity(&self, context: &RequestContext) -> AccountResult<Uuid> {
        context
            .user_id(&self.config.tokens.claim_names)
            .ok_or(AccountError::Unauthorized)
    }

    fn verified_identity(&self, headers: &dyn HeaderSource) -> AccountResult<Uuid> {
        let mut context = RequestContext::new();
        self.verify_gate.authenticate(headers, &mut context)?;
        context
            .user_id(&self.config.tokens.claim_names)
            .ok_or(AccountError::Auth(AuthError::InvalidToken))
    }

    fn session_cookies(&self, identity: &Identity) -> Vec<Cookie> {
        let max_age = self.codec.lifetime_secs();
        vec![
            Cookie::new(ROLE_COOKIE, identity.role.as_str(), max_age),
            Cookie::new(
                EMAIL_VERIFIED_COOKIE,
                if identity.email_verified { "1" } else { "0" },
                max_age,
            ),
        ]
    }
}

/// String value of a field that passed the required check.
fn text_field<'a>(body: &'a Map<String, Value>, field: &str) -> AccountResult<&'a str> {
    string_field(body, field).ok_or_else(|| {
        AccountError::Validation(kaimono_policy::ValidationError::FieldsMissing(vec![
            field.to_string(),
        ]))
    })
}

/// Optional string field, ignoring empty values.
fn non_empty<'a>(body: &'a Map<String, Value>, field: &str) -> Option<&'a str> {
    string_field(body, field).filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::MemoryIdentityStore;
    use kaimono_auth::{SessionClaims, TokenKind};
    use kaimono_verify::{MemoryCooldownStore, MemoryMailer};
    use serde_json::json;

    struct PlainHasher;

    impl CredentialHasher for PlainHasher {
        fn hash(&self, plain: &str) -> String {
            format!("plain:{}", plain)
        }

        fn verify(&self, plain: &str, hash: &str) -> bool {
            hash == self.hash(plain)
        }
    }

    fn service(identities: &MemoryIdentityStore) -> AccountService {
        AccountService::new(
            ServiceConfig::new("session-secret", "verify-secret"),
            Arc::new(identities.clone()),
            Arc::new(PlainHasher),
            Arc::new(MemoryCooldownStore::new()),
            Arc::new(MemoryMailer::new()),
        )
        .unwrap()
    }

    fn body(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_shared_secret_rejected() {
        let result = AccountService::new(
            ServiceConfig::new("same", "same"),
            Arc::new(MemoryIdentityStore::new()),
            Arc::new(PlainHasher),
            Arc::new(MemoryCooldownStore::new()),
            Arc::new(MemoryMailer::new()),
        );
        assert!(matches!(result, Err(AccountError::Auth(AuthError::Config(_)))));
    }

    #[test]
    fn test_text_field_rejects_non_strings() {
        let data = body(json!({ "email": 42 }));
        assert_eq!(
            text_field(&data, "email"),
            Err(AccountError::Validation(
                kaimono_policy::ValidationError::FieldsMissing(vec!["email".to_string()])
            ))
        );
        assert_eq!(non_empty(&body(json!({ "email": "" })), "email"), None);
    }

    #[tokio::test]
    async fn test_identity_tokens_use_verification_secret() {
        let identities = MemoryIdentityStore::new();
        let identity = identities
            .create(Identity::new_client("user@gmail.com", "h", "Jane"))
            .await
            .unwrap();
        let service = service(&identities);

        let tokens = IdentityTokens {
            identities: &identities,
            codec: service.codec(),
        };
        let token = tokens
            .verification_token("user@gmail.com")
            .await
            .unwrap()
            .unwrap();

        let claims = service
            .codec()
            .decode_identity(&token, TokenKind::Verification)
            .unwrap();
        assert_eq!(claims, identity.session_claims());
        assert!(service.codec().decode(&token, TokenKind::Session).is_err());

        assert_eq!(tokens.verification_token("nobody@gmail.com").await, Ok(None));
    }

    #[tokio::test]
    async fn test_store_registry() {
        let identities = MemoryIdentityStore::new();
        identities
            .create(Identity::new_client("user@gmail.com", "h", "Jane"))
            .await
            .unwrap();

        let registry = StoreRegistry(&identities);
        assert_eq!(registry.email_exists("user@gmail.com").await, Ok(true));
        assert_eq!(registry.email_exists("other@gmail.com").await, Ok(false));
    }

    #[tokio::test]
    async fn test_session_cookies() {
        let identities = MemoryIdentityStore::new();
        let service = service(&identities);
        let mut identity = Identity::new_client("user@gmail.com", "h", "Jane");

        let cookies = service.session_cookies(&identity);
        assert_eq!(
            cookies,
            vec![
                Cookie::new("user_role", "client", 43_200),
                Cookie::new("user_email_verified", "0", 43_200),
            ]
        );

        identity.email_verified = true;
        assert_eq!(service.session_cookies(&identity)[1].value, "1");
    }

    #[tokio::test]
    async fn test_authenticate_without_header_is_anonymous() {
        let service = service(&MemoryIdentityStore::new());
        let headers: Vec<(String, String)> = Vec::new();

        let context = service.authenticate(&headers).unwrap();
        assert!(context.values().is_empty());
        assert_eq!(
            service.profile(&context).await,
            Err(AccountError::Unauthorized)
        );
    }

    #[tokio::test]
    async fn test_authenticate_with_session_token() {
        let identities = MemoryIdentityStore::new();
        let service = service(&identities);
        let claims = SessionClaims::new(Uuid::now_v7(), "user@gmail.com", "client", false);
        let token = service.codec().issue_session_token(&claims).unwrap();
        let headers = vec![("Authorization".to_string(), format!("Bearer {}", token))];

        let context = service.authenticate(&headers).unwrap();
        assert_eq!(
            context.user_id(&service.config().tokens.claim_names),
            Some(claims.user_id)
        );
    }
}
