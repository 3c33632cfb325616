//! Cooldown key derivation.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use sha2::{Digest, Sha256};

/// Default namespace for cooldown keys.
pub const DEFAULT_KEY_PREFIX: &str = "kaimono:verify";

/// Trim and lowercase an address before keying it.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Namespaced key for the cooldown record of `email`.
///
/// The address is hashed so raw emails never appear in the cache keyspace.
pub fn cooldown_key(prefix: &str, email: &str) -> String {
    let digest = Sha256::digest(normalize_email(email).as_bytes());
    format!("{}:{}", prefix, URL_SAFE_NO_PAD.encode(digest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_is_deterministic_and_normalized() {
        let a = cooldown_key(DEFAULT_KEY_PREFIX, "User@Gmail.com");
        let b = cooldown_key(DEFAULT_KEY_PREFIX, "  user@gmail.com ");
        assert_eq!(a, b);
        assert!(a.starts_with("kaimono:verify:"));
        assert!(!a.contains("gmail"));
    }

    #[test]
    fn test_distinct_emails_distinct_keys() {
        assert_ne!(
            cooldown_key(DEFAULT_KEY_PREFIX, "a@gmail.com"),
            cooldown_key(DEFAULT_KEY_PREFIX, "b@gmail.com")
        );
    }

    #[test]
    fn test_prefix_namespaces_keys() {
        assert_ne!(
            cooldown_key("kaimono:verify", "a@gmail.com"),
            cooldown_key("kaimono:reset", "a@gmail.com")
        );
    }
}
