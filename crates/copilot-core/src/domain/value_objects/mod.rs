//! Value Objects
//!
//! Immutable, self-validating values shared by the aggregates.

mod email;
mod labels;

pub use email::{Email, EmailError};
pub use labels::{Category, ParseLabelError, Priority, Sentiment, TicketSource, TicketStatus};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Ticket identifier: `TKT-YYYYMMDD-XXXXXXXX`
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketId(String);

impl TicketId {
    /// New identifier for a ticket created at `at`; the suffix is random
    pub fn generate(at: DateTime<Utc>) -> Self {
        let suffix = uuid::Uuid::new_v4().simple().to_string()[..8].to_uppercase();
        Self(format!("TKT-{}-{}", at.format("%Y%m%d"), suffix))
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for TicketId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Customer identifier: `CUST-NNNNN`, stable for a given email
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomerId(String);

impl CustomerId {
    pub fn from_email(email: &Email) -> Self {
        let digest = Sha256::digest(email.as_str().as_bytes());
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&digest[..8]);
        let number = u64::from_be_bytes(prefix) % 100_000;
        Self(format!("CUST-{number:05}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Hex digest the identifier was derived from
    pub fn fingerprint(email: &Email) -> String {
        hex::encode(Sha256::digest(email.as_str().as_bytes()))
    }
}

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
