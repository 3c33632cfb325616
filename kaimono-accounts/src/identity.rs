//! Identity model and the collaborators the account flows depend on
//!
//! Persistence and password hashing live outside this crate. Flows only
//! see them through [`IdentityStore`] and [`CredentialHasher`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kaimono_auth::SessionClaims;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Account role.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Self-registered customer
    #[default]
    Client,

    /// Staff account
    Admin,
}

impl Role {
    /// Role name as stored and carried in tokens.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Client => "client",
            Role::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered account.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identity {
    /// Unique identifier
    pub id: Uuid,

    /// Email address (unique)
    pub email: String,

    /// Stored credential hash
    #[serde(skip_serializing, default)]
    pub password_hash: String,

    /// Display name
    pub full_name: String,

    /// Role
    pub role: Role,

    /// Whether the mailbox has been proven
    pub email_verified: bool,

    /// Whether the account is active
    pub is_active: bool,

    /// Registration timestamp
    pub joined_at: DateTime<Utc>,
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("password_hash", &"[REDACTED]")
            .field("full_name", &self.full_name)
            .field("role", &self.role)
            .field("email_verified", &self.email_verified)
            .field("is_active", &self.is_active)
            .field("joined_at", &self.joined_at)
            .finish()
    }
}

impl Identity {
    /// Create a new unverified client account.
    pub fn new_client(
        email: impl Into<String>,
        password_hash: impl Into<String>,
        full_name: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            email: email.into(),
            password_hash: password_hash.into(),
            full_name: full_name.into(),
            role: Role::Client,
            email_verified: false,
            is_active: false,
            joined_at: Utc::now(),
        }
    }

    /// Identity fields carried in tokens.
    pub fn session_claims(&self) -> SessionClaims {
        SessionClaims::new(self.id, &self.email, self.role.as_str(), self.email_verified)
    }

    /// Public profile.
    pub fn profile(&self) -> Profile {
        Profile {
            email: self.email.clone(),
            full_name: self.full_name.clone(),
        }
    }
}

/// Public profile fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Profile {
    /// Email address
    pub email: String,

    /// Display name
    pub full_name: String,
}

/// Partial profile update; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProfileUpdate {
    /// New email address
    pub email: Option<String>,

    /// New display name
    pub full_name: Option<String>,
}

impl ProfileUpdate {
    /// Whether there is nothing to change.
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.full_name.is_none()
    }
}

/// Identity store error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityStoreError {
    /// Another identity already uses this email
    #[error("Email already registered: {0}")]
    DuplicateEmail(String),

    /// No identity with this id
    #[error("Identity not found: {0}")]
    NotFound(Uuid),

    /// Backend failure
    #[error("Identity store error: {0}")]
    Backend(String),
}

/// Result type for identity store operations.
pub type IdentityStoreResult<T> = Result<T, IdentityStoreError>;

/// Persistence for identities.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Find an identity by email.
    async fn find_by_email(&self, email: &str) -> IdentityStoreResult<Option<Identity>>;

    /// Find an identity by id.
    async fn find_by_id(&self, id: Uuid) -> IdentityStoreResult<Option<Identity>>;

    /// Whether an identity with this email exists.
    async fn email_exists(&self, email: &str) -> IdentityStoreResult<bool> {
        Ok(self.find_by_email(email).await?.is_some())
    }

    /// Insert a new identity.
    async fn create(&self, identity: Identity) -> IdentityStoreResult<Identity>;

    /// Replace the stored credential hash.
    async fn update_password(&self, id: Uuid, password_hash: &str) -> IdentityStoreResult<()>;

    /// Apply a profile update and return the result.
    async fn update_profile(&self, id: Uuid, update: &ProfileUpdate)
        -> IdentityStoreResult<Identity>;

    /// Mark the mailbox as proven.
    async fn mark_email_verified(&self, id: Uuid) -> IdentityStoreResult<()>;
}

/// Password hashing capability.
pub trait CredentialHasher: Send + Sync {
    /// Hash a plaintext password for storage.
    fn hash(&self, plain: &str) -> String;

    /// Compare a plaintext password against a stored hash.
    fn verify(&self, plain: &str, hash: &str) -> bool;
}

/// In-memory identity store.
///
/// Useful for tests and local development.
#[derive(Debug, Clone, Default)]
pub struct MemoryIdentityStore {
    identities: Arc<RwLock<HashMap<Uuid, Identity>>>,
}

impl MemoryIdentityStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored identities.
    pub async fn len(&self) -> usize {
        self.identities.read().await.len()
    }

    /// Whether the store is empty.
    pub async fn is_empty(&self) -> bool {
        self.identities.read().await.is_empty()
    }
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn find_by_email(&self, email: &str) -> IdentityStoreResult<Option<Identity>> {
        Ok(self
            .identities
            .read()
            .await
            .values()
            .find(|identity| identity.email == email)
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> IdentityStoreResult<Option<Identity>> {
        Ok(self.identities.read().await.get(&id).cloned())
    }

    async fn create(&self, identity: Identity) -> IdentityStoreResult<Identity> {
        let mut identities = self.identities.write().await;
        if identities.values().any(|existing| existing.email == identity.email) {
            return Err(IdentityStoreError::DuplicateEmail(identity.email));
        }
        identities.insert(identity.id, identity.clone());
        Ok(identity)
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> IdentityStoreResult<()> {
        let mut identities = self.identities.write().await;
        let identity = identities
            .get_mut(&id)
            .ok_or(IdentityStoreError::NotFound(id))?;
        identity.password_hash = password_hash.to_string();
        Ok(())
    }

    async fn update_profile(
        &self,
        id: Uuid,
        update: &ProfileUpdate,
    ) -> IdentityStoreResult<Identity> {
        let mut identities = self.identities.write().await;

        if let Some(email) = &update.email {
            if identities
                .values()
                .any(|other| other.id != id && &other.email == email)
            {
                return Err(IdentityStoreError::DuplicateEmail(email.clone()));
            }
        }

        let identity = identities
            .get_mut(&id)
            .ok_or(IdentityStoreError::NotFound(id))?;
        if let Some(email) = &update.email {
            identity.email = email.clone();
        }
        if let Some(full_name) = &update.full_name {
            identity.full_name = full_name.clone();
        }
        Ok(identity.clone())
    }

    async fn mark_email_verified(&self, id: Uuid) -> IdentityStoreResult<()> {
        let mut identities = self.identities.write().await;
        let identity = identities
            .get_mut(&id)
            .ok_or(IdentityStoreError::NotFound(id))?;
        identity.email_verified = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_names() {
        assert_eq!(Role::Client.as_str(), "client");
        assert_eq!(Role::Admin.to_string(), "admin");
        assert_eq!(serde_json::to_string(&Role::Client).unwrap(), "\"client\"");
    }

    #[test]
    fn test_new_client_defaults() {
        let identity = Identity::new_client("user@gmail.com", "hash", "Jane Doe");
        assert_eq!(identity.role, Role::Client);
        assert!(!identity.email_verified);

        let claims = identity.session_claims();
        assert_eq!(claims.user_id, identity.id);
        assert_eq!(claims.role, "client");
        assert!(!claims.email_verified);
    }

    #[test]
    fn test_identity_debug_redacts_hash() {
        let identity = Identity::new_client("user@gmail.com", "secret-hash", "Jane Doe");
        let debug = format!("{:?}", identity);
        assert!(!debug.contains("secret-hash"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_identity_serialization_skips_hash() {
        let identity = Identity::new_client("user@gmail.com", "secret-hash", "Jane Doe");
        let json = serde_json::to_string(&identity).unwrap();
        assert!(!json.contains("secret-hash"));
    }

    #[tokio::test]
    async fn test_memory_store_create_and_find() {
        let store = MemoryIdentityStore::new();
        let identity = Identity::new_client("user@gmail.com", "hash", "Jane Doe");
        store.create(identity.clone()).await.unwrap();

        assert_eq!(
            store.find_by_email("user@gmail.com").await.unwrap(),
            Some(identity.clone())
        );
        assert_eq!(store.find_by_id(identity.id).await.unwrap(), Some(identity));
        assert!(store.email_exists("user@gmail.com").await.unwrap());
        assert!(!store.email_exists("other@gmail.com").await.unwrap());
    }

    #[tokio::test]
    async fn test_memory_store_unique_email() {
        let store = MemoryIdentityStore::new();
        store
            .create(Identity::new_client("user@gmail.com", "a", "A"))
            .await
            .unwrap();

        let result = store
            .create(Identity::new_client("user@gmail.com", "b", "B"))
            .await;
        assert!(matches!(result, Err(IdentityStoreError::DuplicateEmail(_))));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_memory_store_updates() {
        let store = MemoryIdentityStore::new();
        let identity = store
            .create(Identity::new_client("user@gmail.com", "old", "Jane"))
            .await
            .unwrap();

        store.update_password(identity.id, "new").await.unwrap();
        store.mark_email_verified(identity.id).await.unwrap();
        let updated = store
            .update_profile(
                identity.id,
                &ProfileUpdate {
                    email: None,
                    full_name: Some("Jane Doe".to_string()),
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.password_hash, "new");
        assert!(updated.email_verified);
        assert_eq!(updated.full_name, "Jane Doe");
        assert_eq!(updated.email, "user@gmail.com");
    }

    #[tokio::test]
    async fn test_memory_store_unknown_id() {
        let store = MemoryIdentityStore::new();
        let id = Uuid::now_v7();
        assert_eq!(
            store.mark_email_verified(id).await,
            Err(IdentityStoreError::NotFound(id))
        );
    }
}
