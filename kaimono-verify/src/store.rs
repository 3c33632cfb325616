//! Cooldown store abstraction
//!
//! The gate only needs three primitives from its cache: read the remaining
//! TTL of a key, atomically create a key with a TTL if it is absent, and
//! overwrite a key with a TTL. Records carry no payload; existence and
//! lifetime are the whole state.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::time::Instant;

/// Cooldown store error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Connection error
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Command failed
    #[error("Command failed: {0}")]
    CommandError(String),

    /// Reply outside the documented range
    #[error("Unexpected reply: {0}")]
    UnexpectedReply(String),
}

/// Result type for cooldown store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Remaining lifetime of a cooldown key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTtl {
    /// No such key
    Missing,

    /// Key exists and expires in this many seconds
    Expiring(i64),

    /// Key exists and never expires
    Persistent,
}

impl KeyTtl {
    /// Map a Redis-style TTL reply (`-2`, `-1`, seconds).
    pub fn from_reply(reply: i64) -> StoreResult<Self> {
        match reply {
            -2 => Ok(KeyTtl::Missing),
            -1 => Ok(KeyTtl::Persistent),
            secs if secs >= 0 => Ok(KeyTtl::Expiring(secs)),
            other => Err(StoreError::UnexpectedReply(format!("TTL {}", other))),
        }
    }
}

/// TTL-keyed cache used by the verification gate.
#[async_trait]
pub trait CooldownStore: Send + Sync {
    /// Remaining lifetime of `key`.
    async fn ttl(&self, key: &str) -> StoreResult<KeyTtl>;

    /// Create `key` with `ttl` only if it does not exist.
    ///
    /// Returns `true` when this call created the key.
    async fn reserve(&self, key: &str, ttl: Duration) -> StoreResult<bool>;

    /// Create or overwrite `key` with `ttl`.
    async fn mark(&self, key: &str, ttl: Duration) -> StoreResult<()>;
}

/// In-memory cooldown store.
///
/// Suitable for single-process deployments and tests. Expired entries are
/// treated as absent and dropped lazily. Uses tokio's clock, so paused-time
/// tests can advance it.
#[derive(Debug, Clone, Default)]
pub struct MemoryCooldownStore {
    /// Key -> expiry instant; `None` marks a key without expiry
    entries: Arc<RwLock<HashMap<String, Option<Instant>>>>,
}

impl MemoryCooldownStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a key that never expires.
    ///
    /// The gate never writes such keys; this exists to reproduce state left
    /// behind by other writers.
    pub async fn insert_persistent(&self, key: &str) {
        self.entries.write().await.insert(key.to_string(), None);
    }

    /// Number of live keys.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .values()
            .filter(|expiry| expiry.map_or(true, |at| at > now))
            .count()
    }

    /// Whether the store holds no live keys.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn remaining_secs(at: Instant, now: Instant) -> i64 {
        let remaining = at.saturating_duration_since(now);
        let secs = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
        i64::try_from(secs).unwrap_or(i64::MAX)
    }
}

#[async_trait]
impl CooldownStore for MemoryCooldownStore {
    async fn ttl(&self, key: &str) -> StoreResult<KeyTtl> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;

        match entries.get(key).copied() {
            None => Ok(KeyTtl::Missing),
            Some(None) => Ok(KeyTtl::Persistent),
            Some(Some(at)) if at <= now => {
                entries.remove(key);
                Ok(KeyTtl::Missing)
            }
            Some(Some(at)) => Ok(KeyTtl::Expiring(Self::remaining_secs(at, now))),
        }
    }

    async fn reserve(&self, key: &str, ttl: Duration) -> StoreResult<bool> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;

        let live = match entries.get(key) {
            Some(None) => true,
            Some(Some(at)) => *at > now,
            None => false,
        };
        if live {
            return Ok(false);
        }

        entries.insert(key.to_string(), Some(now + ttl));
        Ok(true)
    }

    async fn mark(&self, key: &str, ttl: Duration) -> StoreResult<()> {
        let now = Instant::now();
        self.entries
            .write()
            .await
            .insert(key.to_string(), Some(now + ttl));
        Ok(())
    }
}
