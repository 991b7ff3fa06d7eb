//! AI stage ports: classification, knowledge retrieval and reply drafting.
//!
//! The pipeline only sees these traits, so each stage can be swapped for a
//! deterministic stub.

use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::domain::services::clamp_confidence;
use crate::domain::value_objects::{Category, Priority, Sentiment};

/// What the classifier sees of a ticket
#[derive(Clone, Debug, Default)]
pub struct ClassificationInput {
    pub subject: String,
    pub description: String,
    pub order_id: Option<String>,
    pub customer_name: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Classification {
    pub category: Category,
    pub priority: Priority,
    pub sentiment: Sentiment,
    pub urgency_keywords: Vec<String>,
    pub extracted_info: BTreeMap<String, String>,
    pub confidence: f32,
    pub reasoning: String,
}

impl Classification {
    /// Default result used whenever the classifier cannot answer
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            category: Category::Other,
            priority: Priority::Medium,
            sentiment: Sentiment::Neutral,
            urgency_keywords: vec![],
            extracted_info: BTreeMap::new(),
            confidence: 0.0,
            reasoning: reason.into(),
        }
    }

    /// Re-clamp confidence after construction by an adapter
    pub fn normalized(mut self) -> Self {
        self.confidence = clamp_confidence(self.confidence);
        self
    }
}

/// Classification never fails; adapters fall back to [`Classification::unavailable`]
#[async_trait]
pub trait TicketClassifier: Send + Sync {
    async fn classify(&self, input: &ClassificationInput) -> Classification;
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct KnowledgeMatch {
    pub article_id: String,
    pub title: String,
    pub content: String,
    pub category: Category,
    pub relevance_score: f32,
}

#[derive(Debug, Clone, Error)]
pub enum SearchError {
    #[error("knowledge base unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait KnowledgeSearch: Send + Sync {
    /// At most `top_k` matches, best first
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<KnowledgeMatch>, SearchError>;
}

#[derive(Clone, Debug)]
pub struct ReplyRequest {
    pub subject: String,
    pub description: String,
    pub category: Category,
    pub priority: Priority,
    pub sentiment: Sentiment,
    pub articles: Vec<KnowledgeMatch>,
}

/// `None` means no draft could be produced
#[async_trait]
pub trait ReplyDrafter: Send + Sync {
    async fn draft(&self, request: &ReplyRequest) -> Option<String>;
}
