//! Password acceptance policy
//!
//! Every rule is checked and each failure contributes one message, so a
//! caller can show the full list at once.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Default minimum password length.
pub const DEFAULT_MIN_LENGTH: usize = 10;

/// Default special-character set.
pub const DEFAULT_SPECIAL_CHARS: &str = r"!@#$%^&*()_+{}[]:;<>,.?~\";

/// One password acceptance rule.
///
/// Rules run in [`PasswordRule::ALL`] order and never short-circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PasswordRule {
    /// At least `min_length` characters
    MinLength,
    /// Both an uppercase and a lowercase ASCII letter
    MixedCase,
    /// At least one decimal digit
    Digit,
    /// At least one character from the special set
    SpecialChar,
}

impl PasswordRule {
    /// Every rule, in reporting order.
    pub const ALL: [PasswordRule; 4] = [
        PasswordRule::MinLength,
        PasswordRule::MixedCase,
        PasswordRule::Digit,
        PasswordRule::SpecialChar,
    ];
}

/// Password acceptance policy.
///
/// # Examples
///
/// ```
/// use kaimono_policy::PasswordPolicy;
///
/// let policy = PasswordPolicy::default();
/// assert!(policy.validate("ValidP@ssw0rd").is_empty());
/// assert_eq!(policy.validate("password").len(), 4);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordPolicy {
    /// Minimum password length in characters (default: 10)
    pub min_length: usize,
    /// Characters that satisfy the special-character rule
    pub special_chars: String,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: DEFAULT_MIN_LENGTH,
            special_chars: DEFAULT_SPECIAL_CHARS.to_string(),
        }
    }
}

impl PasswordPolicy {
    /// Creates a new password policy with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the minimum password length.
    #[must_use]
    pub fn min(mut self, len: usize) -> Self {
        self.min_length = len;
        self
    }

    /// Sets the special-character set.
    #[must_use]
    pub fn special_chars(mut self, chars: impl Into<String>) -> Self {
        self.special_chars = chars.into();
        self
    }

    /// Whether `password` satisfies `rule`.
    pub fn passes(&self, rule: PasswordRule, password: &str) -> bool {
        match rule {
            PasswordRule::MinLength => password.chars().count() >= self.min_length,
            PasswordRule::MixedCase => {
                password.chars().any(|c| c.is_ascii_uppercase())
                    && password.chars().any(|c| c.is_ascii_lowercase())
            }
            PasswordRule::Digit => password.chars().any(|c| c.is_ascii_digit()),
            PasswordRule::SpecialChar => password.chars().any(|c| self.special_chars.contains(c)),
        }
    }

    /// Message reported when `rule` fails.
    pub fn message(&self, rule: PasswordRule) -> String {
        match rule {
            PasswordRule::MinLength => {
                format!("The minimum password length must be {}", self.min_length)
            }
            PasswordRule::MixedCase => {
                "The password must contain letters of different case".to_string()
            }
            PasswordRule::Digit => "The password must also contain numbers".to_string(),
            PasswordRule::SpecialChar => format!(
                "A strong password must contain special characters {}",
                self.special_chars
            ),
        }
    }

    /// Rules `password` fails, in reporting order.
    pub fn violated_rules(&self, password: &str) -> Vec<PasswordRule> {
        PasswordRule::ALL
            .into_iter()
            .filter(|rule| !self.passes(*rule, password))
            .collect()
    }

    /// One message per failed rule; empty means accepted.
    pub fn validate(&self, password: &str) -> Vec<String> {
        self.violated_rules(password)
            .into_iter()
            .map(|rule| self.message(rule))
            .collect()
    }

    /// Validates a password, reporting violations under the `password` field.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::PolicyViolation`] listing every failed rule.
    pub fn check(&self, password: &str) -> Result<(), ValidationError> {
        ValidationError::ensure_accepted("password", self.validate(password))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_password() {
        let policy = PasswordPolicy::default();
        for rule in PasswordRule::ALL {
            assert!(policy.passes(rule, "ValidP@ssw0rd"), "{:?}", rule);
        }
        assert!(policy.validate("ValidP@ssw0rd").is_empty());
        assert!(policy.check("ValidP@ssw0rd").is_ok());
    }

    #[test]
    fn test_invalid_length() {
        let policy = PasswordPolicy::new().min(9);
        let messages = policy.validate("ShortPwd");

        assert!(!policy.passes(PasswordRule::MinLength, "ShortPwd"));
        assert_eq!(messages[0], "The minimum password length must be 9");
    }

    #[test]
    fn test_length_counts_characters() {
        let policy = PasswordPolicy::new().min(4);
        assert!(policy.passes(PasswordRule::MinLength, "äöüß"));
    }

    #[test]
    fn test_no_different_case() {
        let policy = PasswordPolicy::default();
        assert_eq!(
            policy.violated_rules("no:password123"),
            vec![PasswordRule::MixedCase]
        );
        assert_eq!(
            policy.validate("no:password123"),
            vec!["The password must contain letters of different case"]
        );
        assert_eq!(
            policy.violated_rules("NO:PASSWORD123"),
            vec![PasswordRule::MixedCase]
        );
    }

    #[test]
    fn test_no_digit() {
        let policy = PasswordPolicy::default();
        assert_eq!(policy.violated_rules("NoDigitPassword!"), vec![PasswordRule::Digit]);
    }

    #[test]
    fn test_no_special_char() {
        let policy = PasswordPolicy::default();
        let messages = policy.validate("NoSpecialCharPassword123");
        assert_eq!(
            messages,
            vec![format!(
                "A strong password must contain special characters {}",
                DEFAULT_SPECIAL_CHARS
            )]
        );
    }

    #[test]
    fn test_weak_password_reports_every_rule_in_order() {
        let policy = PasswordPolicy::default();
        assert_eq!(policy.violated_rules("password"), PasswordRule::ALL.to_vec());

        let err = policy.check("password").unwrap_err();
        match err {
            ValidationError::PolicyViolation { field, violations } => {
                assert_eq!(field, "password");
                assert_eq!(violations[0], "The minimum password length must be 10");
                assert_eq!(violations[1], "The password must contain letters of different case");
                assert_eq!(violations[2], "The password must also contain numbers");
                assert!(violations[3].starts_with("A strong password must contain special characters"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_custom_special_chars() {
        let policy = PasswordPolicy::new().special_chars("#");
        assert!(policy.passes(PasswordRule::SpecialChar, "abc#"));
        assert!(!policy.passes(PasswordRule::SpecialChar, "abc!"));
        assert_eq!(
            policy.message(PasswordRule::SpecialChar),
            "A strong password must contain special characters #"
        );
    }
}
