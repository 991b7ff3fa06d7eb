//! Local metadata extraction
//!
//! Deterministic patterns that fill gaps left by the classifier's
//! `extracted_info`.

use regex::Regex;
use std::collections::BTreeMap;

const ORDER_ID: &str = r"(?i)(?:\border\s*(?:#|no\.?|number)?\s*:?\s*#?|#)(\d{3,})";
const AMOUNT: &str = r"\$\s?\d+(?:,\d{3})*(?:\.\d{1,2})?";
const DATE_MENTIONED: &str = r"(?i)\b(today|tomorrow|yesterday|next week|monday|tuesday|wednesday|thursday|friday|saturday|sunday|\d{4}-\d{2}-\d{2}|\d{1,2}/\d{1,2}(?:/\d{2,4})?)\b";

/// Pre-compiled extraction patterns
pub struct MetadataExtractor {
    order_id: Option<Regex>,
    amount: Option<Regex>,
    date_mentioned: Option<Regex>,
}

impl Default for MetadataExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataExtractor {
    pub fn new() -> Self {
        Self {
            order_id: Regex::new(ORDER_ID).ok(),
            amount: Regex::new(AMOUNT).ok(),
            date_mentioned: Regex::new(DATE_MENTIONED).ok(),
        }
    }

    /// Extract `order_id`, `amount` and `date_mentioned`.
    /// A structured `order_id` on the ticket beats one found in the text.
    pub fn extract(&self, text: &str, order_id: Option<&str>) -> BTreeMap<String, String> {
        let mut found = BTreeMap::new();

        let order = order_id
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(str::to_string)
            .or_else(|| capture(self.order_id.as_ref(), text));
        if let Some(order) = order {
            found.insert("order_id".to_string(), order);
        }

        if let Some(amount) = self.amount.as_ref().and_then(|re| re.find(text)) {
            found.insert("amount".to_string(), amount.as_str().split_whitespace().collect());
        }

        if let Some(date) = capture(self.date_mentioned.as_ref(), text) {
            found.insert("date_mentioned".to_string(), date);
        }

        found
    }
}

fn capture(re: Option<&Regex>, text: &str) -> Option<String> {
    re?.captures(text)?.get(1).map(|m| m.as_str().to_string())
}

/// Classifier values win; local values only fill missing keys
pub fn merge_metadata(
    primary: BTreeMap<String, String>,
    fallback: BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut merged = fallback;
    merged.extend(primary.into_iter().filter(|(_, v)| !v.trim().is_empty()));
    merged
}
