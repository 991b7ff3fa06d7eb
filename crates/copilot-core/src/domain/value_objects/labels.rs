//! Ticket labels: status, priority, category, sentiment and source.
//!
//! Every label deserializes through [`FromStr`], so API input and model
//! output share one case-insensitive parser.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Raised when a string is not a recognised label
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{value}'")]
pub struct ParseLabelError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseLabelError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self { kind, value: value.to_string() }
    }
}

fn token(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c == '-' || c == ' ' { '_' } else { c })
        .collect()
}

macro_rules! label_serde {
    ($ty:ty) => {
        impl TryFrom<String> for $ty {
            type Error = ParseLabelError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

// =============================================================================
// Status
// =============================================================================

/// Ticket lifecycle status. Transitions only move forward.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum TicketStatus {
    #[default]
    New,
    Open,
    InProgress,
    Resolved,
    Closed,
}

impl TicketStatus {
    pub const ALL: [TicketStatus; 5] = [
        TicketStatus::New,
        TicketStatus::Open,
        TicketStatus::InProgress,
        TicketStatus::Resolved,
        TicketStatus::Closed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::Resolved => "resolved",
            Self::Closed => "closed",
        }
    }

    /// Still being worked on (accepts assignment)
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Resolved | Self::Closed)
    }
}

impl FromStr for TicketStatus {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match token(s).as_str() {
            "new" => Ok(Self::New),
            "open" => Ok(Self::Open),
            "in_progress" | "inprogress" => Ok(Self::InProgress),
            "resolved" => Ok(Self::Resolved),
            "closed" => Ok(Self::Closed),
            _ => Err(ParseLabelError::new("status", s)),
        }
    }
}

label_serde!(TicketStatus);

// =============================================================================
// Priority
// =============================================================================

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    /// Lenient mapping for model output; unknown values become `medium`
    pub fn normalize(raw: &str) -> Self {
        raw.parse().unwrap_or_default()
    }
}

impl FromStr for Priority {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match token(s).as_str() {
            "low" | "minor" => Ok(Self::Low),
            "medium" | "normal" | "moderate" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" | "urgent" => Ok(Self::Critical),
            _ => Err(ParseLabelError::new("priority", s)),
        }
    }
}

label_serde!(Priority);

// =============================================================================
// Category
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", try_from = "String")]
pub enum Category {
    Shipping,
    Billing,
    Refund,
    ProductInquiry,
    Technical,
    Returns,
    AccountAccess,
    PaymentIssue,
    Other,
}

impl Category {
    pub const ALL: [Category; 9] = [
        Category::Shipping,
        Category::Billing,
        Category::Refund,
        Category::ProductInquiry,
        Category::Technical,
        Category::Returns,
        Category::AccountAccess,
        Category::PaymentIssue,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Shipping => "SHIPPING",
            Self::Billing => "BILLING",
            Self::Refund => "REFUND",
            Self::ProductInquiry => "PRODUCT_INQUIRY",
            Self::Technical => "TECHNICAL",
            Self::Returns => "RETURNS",
            Self::AccountAccess => "ACCOUNT_ACCESS",
            Self::PaymentIssue => "PAYMENT_ISSUE",
            Self::Other => "OTHER",
        }
    }

    /// Lenient mapping for model output; unknown values become `OTHER`
    pub fn normalize(raw: &str) -> Self {
        raw.parse().unwrap_or(Self::Other)
    }

    /// Whether an agent skill tag covers this category
    pub fn matches_skill(&self, skill: &str) -> bool {
        skill.parse::<Category>().map(|c| c == *self).unwrap_or(false)
    }
}

impl FromStr for Category {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match token(s).as_str() {
            "shipping" | "shipment" | "delivery" | "shipping_delay" | "delivery_issue" | "tracking" => {
                Ok(Self::Shipping)
            }
            "billing" | "invoice" | "billing_issue" | "charge" => Ok(Self::Billing),
            "refund" | "refunds" | "refund_request" => Ok(Self::Refund),
            "product_inquiry" | "product" | "product_question" | "inquiry" => Ok(Self::ProductInquiry),
            "technical" | "tech" | "technical_issue" | "technical_support" | "bug" => Ok(Self::Technical),
            "returns" | "return" | "return_request" | "exchange" => Ok(Self::Returns),
            "account_access" | "account" | "login" | "password" => Ok(Self::AccountAccess),
            "payment_issue" | "payment" | "payments" | "payment_failed" => Ok(Self::PaymentIssue),
            "other" | "general" | "misc" => Ok(Self::Other),
            _ => Err(ParseLabelError::new("category", s)),
        }
    }
}

label_serde!(Category);

// =============================================================================
// Sentiment
// =============================================================================

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Sentiment {
    Positive,
    #[default]
    Neutral,
    Negative,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Neutral => "neutral",
            Self::Negative => "negative",
        }
    }

    pub fn normalize(raw: &str) -> Self {
        raw.parse().unwrap_or_default()
    }
}

impl FromStr for Sentiment {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match token(s).as_str() {
            "positive" => Ok(Self::Positive),
            "neutral" => Ok(Self::Neutral),
            "negative" => Ok(Self::Negative),
            _ => Err(ParseLabelError::new("sentiment", s)),
        }
    }
}

label_serde!(Sentiment);

// =============================================================================
// Source
// =============================================================================

/// Intake channel. `zendesk` and `intercom` mark webhook-originated tickets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum TicketSource {
    #[default]
    Web,
    Email,
    Chat,
    Zendesk,
    Intercom,
}

impl TicketSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Web => "web",
            Self::Email => "email",
            Self::Chat => "chat",
            Self::Zendesk => "zendesk",
            Self::Intercom => "intercom",
        }
    }
}

impl FromStr for TicketSource {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match token(s).as_str() {
            "web" => Ok(Self::Web),
            "email" => Ok(Self::Email),
            "chat" => Ok(Self::Chat),
            "zendesk" => Ok(Self::Zendesk),
            "intercom" => Ok(Self::Intercom),
            _ => Err(ParseLabelError::new("source", s)),
        }
    }
}

label_serde!(TicketSource);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_order_is_lifecycle_order() {
        let mut sorted = TicketStatus::ALL;
        sorted.sort();
        assert_eq!(sorted, TicketStatus::ALL);
        assert!(TicketStatus::Resolved.is_terminal());
        assert!(TicketStatus::InProgress.is_active());
    }

    #[test]
    fn test_status_parse() {
        assert_eq!("In Progress".parse::<TicketStatus>().unwrap(), TicketStatus::InProgress);
        assert_eq!("RESOLVED".parse::<TicketStatus>().unwrap(), TicketStatus::Resolved);
        assert!("reopened".parse::<TicketStatus>().is_err());
    }

    #[test]
    fn test_category_synonyms() {
        assert_eq!(Category::normalize("shipping"), Category::Shipping);
        assert_eq!(Category::normalize("Shipping_Delay"), Category::Shipping);
        assert_eq!(Category::normalize("PRODUCT"), Category::ProductInquiry);
        assert_eq!(Category::normalize("account"), Category::AccountAccess);
        assert_eq!(Category::normalize("GENERAL"), Category::Other);
        assert_eq!(Category::normalize("weather"), Category::Other);
    }

    #[test]
    fn test_priority_and_sentiment_fallbacks() {
        assert_eq!(Priority::normalize("HIGH"), Priority::High);
        assert_eq!(Priority::normalize("urgent"), Priority::Critical);
        assert_eq!(Priority::normalize("p0"), Priority::Medium);
        assert_eq!(Sentiment::normalize("angry"), Sentiment::Neutral);
        assert_eq!(Sentiment::normalize("Negative"), Sentiment::Negative);
    }

    #[test]
    fn test_skill_matching_is_case_insensitive() {
        assert!(Category::Shipping.matches_skill("SHIPPING"));
        assert!(Category::Shipping.matches_skill("shipping"));
        assert!(Category::ProductInquiry.matches_skill("product_inquiry"));
        assert!(!Category::Billing.matches_skill("refund"));
        assert!(!Category::Billing.matches_skill("spanish"));
    }

    #[test]
    fn test_serde_wire_format() {
        assert_eq!(serde_json::to_string(&Category::ProductInquiry).unwrap(), "\"PRODUCT_INQUIRY\"");
        assert_eq!(serde_json::to_string(&TicketStatus::InProgress).unwrap(), "\"in_progress\"");
        assert_eq!(serde_json::to_string(&Priority::Critical).unwrap(), "\"critical\"");

        let category: Category = serde_json::from_str("\"shipping\"").unwrap();
        assert_eq!(category, Category::Shipping);
        assert!(serde_json::from_str::<TicketSource>("\"fax\"").is_err());
    }
}
