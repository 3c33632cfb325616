//! Per-request claim context
//!
//! An auth gate merges decoded claims into a [`RequestContext`]; handlers
//! read the identity back out of it.

use crate::claims::{ClaimMap, ClaimNames, ClaimSet, SessionClaims, EXPIRY_CLAIM};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Request-scoped key/value context.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestContext {
    values: ClaimMap,
}

impl RequestContext {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge every claim of a decoded token, overwriting existing keys.
    pub fn merge(&mut self, set: ClaimSet) {
        let exp = set.exp;
        for (name, value) in set.claims {
            self.values.insert(name, value);
        }
        self.values.insert(EXPIRY_CLAIM.to_string(), Value::from(exp));
    }

    /// Insert a single value.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    /// Look up a value.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Check whether a key is present.
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Identity id stored under the configured claim name.
    pub fn user_id(&self, names: &ClaimNames) -> Option<Uuid> {
        self.values
            .get(&names.id)
            .and_then(Value::as_str)
            .and_then(|s| Uuid::parse_str(s).ok())
    }

    /// Full identity, if every identity claim is present.
    pub fn identity(&self, names: &ClaimNames) -> Option<SessionClaims> {
        SessionClaims::from_claims(&self.values, names).ok()
    }

    /// Borrow all values.
    pub fn values(&self) -> &ClaimMap {
        &self.values
    }
}
