//! LLM-backed ticket classifier

use async_trait::async_trait;
use copilot_core::{Category, Classification, ClassificationInput, Priority, Sentiment, TicketClassifier};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::client::{ChatRequest, LlmClient};
use crate::error::AiError;
use crate::prompts::{classification_prompt, CLASSIFIER_SYSTEM_PROMPT};

const TEMPERATURE: f32 = 0.1;
const MAX_TOKENS: u32 = 500;
/// Used when the model omits a confidence
const DEFAULT_CONFIDENCE: f32 = 0.5;

/// Model output before normalization; every field is optional
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawClassification {
    category: Option<String>,
    priority: Option<String>,
    sentiment: Option<String>,
    urgency_keywords: Option<Vec<Value>>,
    extracted_info: Option<serde_json::Map<String, Value>>,
    confidence: Option<Value>,
    reasoning: Option<String>,
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

fn confidence_of(value: Option<Value>) -> f32 {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => match s.trim().strip_suffix('%') {
            Some(percent) => percent.trim().parse::<f64>().ok().map(|p| p / 100.0),
            None => s.trim().parse::<f64>().ok(),
        },
        _ => None,
    };
    parsed.map(|c| c as f32).unwrap_or(DEFAULT_CONFIDENCE)
}

fn info_value(value: Value) -> Option<String> {
    let text = match value {
        Value::Null => return None,
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    };
    let text = text.trim().to_string();
    let placeholder = matches!(text.to_lowercase().as_str(), "" | "n/a" | "na" | "none" | "null" | "unknown");
    (!placeholder).then_some(text)
}

/// Parse and normalize a model answer
pub fn parse_classification(raw: &str) -> Result<Classification, AiError> {
    let parsed: RawClassification = serde_json::from_str(strip_code_fence(raw))?;

    let mut urgency_keywords: Vec<String> = Vec::new();
    for keyword in parsed.urgency_keywords.unwrap_or_default().into_iter().filter_map(info_value) {
        if !urgency_keywords.iter().any(|k| k.eq_ignore_ascii_case(&keyword)) {
            urgency_keywords.push(keyword);
        }
    }

    let extracted_info: BTreeMap<String, String> = parsed
        .extracted_info
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(k, v)| info_value(v).map(|v| (k, v)))
        .collect();

    Ok(Classification {
        category: parsed.category.as_deref().map(Category::normalize).unwrap_or(Category::Other),
        priority: parsed.priority.as_deref().map(Priority::normalize).unwrap_or_default(),
        sentiment: parsed.sentiment.as_deref().map(Sentiment::normalize).unwrap_or_default(),
        urgency_keywords,
        extracted_info,
        confidence: confidence_of(parsed.confidence),
        reasoning: parsed
            .reasoning
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| "No reasoning provided".to_string()),
    }
    .normalized())
}

pub struct LlmClassifier {
    client: Option<Arc<dyn LlmClient>>,
}

impl LlmClassifier {
    pub fn new(client: Option<Arc<dyn LlmClient>>) -> Self {
        Self { client }
    }

    pub fn is_enabled(&self) -> bool {
        self.client.is_some()
    }
}

#[async_trait]
impl TicketClassifier for LlmClassifier {
    async fn classify(&self, input: &ClassificationInput) -> Classification {
        let Some(client) = self.client.as_ref() else {
            return Classification::unavailable("AI classification disabled: no API key configured");
        };

        let request = ChatRequest {
            system: CLASSIFIER_SYSTEM_PROMPT.to_string(),
            user: classification_prompt(input),
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
            json_mode: true,
        };

        let result = match client.complete(&request).await {
            Ok(content) => parse_classification(&content),
            Err(e) => Err(e),
        };
        match result {
            Ok(classification) => {
                debug!(
                    category = %classification.category,
                    priority = %classification.priority,
                    confidence = classification.confidence,
                    "ticket classified"
                );
                classification
            }
            Err(e) => {
                warn!(error = %e, model = client.model(), "classification failed, using defaults");
                Classification::unavailable(format!("AI classification unavailable: {e}"))
            }
        }
    }
}
