//! Email Value Object
//!
//! Immutable, validated email address.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Email value object with validation
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    /// Create a new validated email, trimmed and lowercased
    pub fn new(value: impl Into<String>) -> Result<Self, EmailError> {
        let value = value.into().trim().to_lowercase();

        if value.is_empty() {
            return Err(EmailError::Empty);
        }

        if !Self::is_valid_format(&value) {
            return Err(EmailError::InvalidFormat(value));
        }

        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn domain(&self) -> Option<&str> {
        self.0.split('@').nth(1)
    }

    fn is_valid_format(email: &str) -> bool {
        let mut parts = email.split('@');
        let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
            return false;
        };

        !local.is_empty()
            && !domain.is_empty()
            && domain.contains('.')
            && !domain.starts_with('.')
            && !domain.ends_with('.')
            && !email.chars().any(char::is_whitespace)
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EmailError {
    #[error("email cannot be empty")]
    Empty,
    #[error("invalid email format: {0}")]
    InvalidFormat(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_email() {
        let email = Email::new("jane@example.com").unwrap();
        assert_eq!(email.as_str(), "jane@example.com");
        assert_eq!(email.domain(), Some("example.com"));
    }

    #[test]
    fn test_email_normalized() {
        let email = Email::new("  Jane@EXAMPLE.com ").unwrap();
        assert_eq!(email.as_str(), "jane@example.com");
    }

    #[test]
    fn test_empty_email() {
        assert_eq!(Email::new("   "), Err(EmailError::Empty));
    }

    #[test]
    fn test_invalid_emails() {
        for raw in ["invalid", "jane@", "@example.com", "a@b@c.com", "jane@.com", "jane@example", "ja ne@example.com"] {
            assert!(matches!(Email::new(raw), Err(EmailError::InvalidFormat(_))), "{raw} should be rejected");
        }
    }
}
