//! Ticket pipeline
//!
//! Three typed stages over the AI ports: `classify` → `retrieve` → `draft`,
//! followed by writing the annotation back through the confidence gate.
//! Every stage degrades on its own; none of them fails the pipeline.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::domain::aggregates::{AiAnnotation, Ticket};
use crate::domain::services::{merge_metadata, MetadataExtractor};
use crate::ports::{
    Classification, ClassificationInput, KnowledgeMatch, KnowledgeSearch, ReplyDrafter,
    ReplyRequest, TicketClassifier,
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Suggestions are applied only above this confidence
    pub confidence_threshold: f32,
    /// Knowledge-base articles handed to the reply drafter
    pub kb_top_k: usize,
    /// Delivery attempts per processing job
    pub max_attempts: u32,
    /// Run auto-assignment once a ticket is annotated
    pub auto_assign: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self { confidence_threshold: 0.7, kb_top_k: 2, max_attempts: 3, auto_assign: false }
    }
}

impl PipelineSettings {
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(format!("confidence_threshold must be within [0, 1], got {}", self.confidence_threshold));
        }
        if !(2..=3).contains(&self.kb_top_k) {
            return Err(format!("kb_top_k must be 2 or 3, got {}", self.kb_top_k));
        }
        if self.max_attempts == 0 {
            return Err("max_attempts must be at least 1".to_string());
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineStage {
    Created,
    Classifying,
    KbSearching,
    ReplySynthesizing,
    Annotated,
    AutoAssigned,
    PendingAssignment,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Created => "created",
            Self::Classifying => "classifying",
            Self::KbSearching => "kb_searching",
            Self::ReplySynthesizing => "reply_synthesizing",
            Self::Annotated => "annotated",
            Self::AutoAssigned => "auto_assigned",
            Self::PendingAssignment => "pending_assignment",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Debug)]
pub struct Classified {
    pub classification: Classification,
}

#[derive(Clone, Debug)]
pub struct Retrieved {
    pub classification: Classification,
    pub articles: Vec<KnowledgeMatch>,
}

#[derive(Clone, Debug)]
pub struct Drafted {
    pub classification: Classification,
    pub articles: Vec<KnowledgeMatch>,
    pub reply: Option<String>,
}

pub struct TicketPipeline {
    classifier: Arc<dyn TicketClassifier>,
    knowledge: Arc<dyn KnowledgeSearch>,
    drafter: Arc<dyn ReplyDrafter>,
    extractor: MetadataExtractor,
    settings: PipelineSettings,
}

impl TicketPipeline {
    pub fn new(
        classifier: Arc<dyn TicketClassifier>,
        knowledge: Arc<dyn KnowledgeSearch>,
        drafter: Arc<dyn ReplyDrafter>,
        settings: PipelineSettings,
    ) -> Self {
        Self { classifier, knowledge, drafter, extractor: MetadataExtractor::new(), settings }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub async fn classify(&self, ticket: &Ticket) -> Classified {
        debug!(ticket_id = %ticket.id(), stage = %PipelineStage::Classifying, "pipeline stage");
        let input = ClassificationInput {
            subject: ticket.subject().to_string(),
            description: ticket.description().to_string(),
            order_id: ticket.order_id().map(str::to_string),
            customer_name: ticket.customer_name().map(str::to_string),
        };
        let classification = self.classifier.classify(&input).await.normalized();
        Classified { classification }
    }

    pub async fn retrieve(&self, ticket: &Ticket, classified: Classified) -> Retrieved {
        debug!(ticket_id = %ticket.id(), stage = %PipelineStage::KbSearching, "pipeline stage");
        let articles = match self.knowledge.search(&ticket.search_text(), self.settings.kb_top_k).await {
            Ok(mut articles) => {
                articles.truncate(self.settings.kb_top_k);
                articles
            }
            Err(e) => {
                warn!(ticket_id = %ticket.id(), error = %e, "knowledge search failed, drafting without context");
                vec![]
            }
        };
        Retrieved { classification: classified.classification, articles }
    }

    pub async fn draft(&self, ticket: &Ticket, retrieved: Retrieved) -> Drafted {
        debug!(ticket_id = %ticket.id(), stage = %PipelineStage::ReplySynthesizing, "pipeline stage");
        let request = ReplyRequest {
            subject: ticket.subject().to_string(),
            description: ticket.description().to_string(),
            category: retrieved.classification.category,
            priority: retrieved.classification.priority,
            sentiment: retrieved.classification.sentiment,
            articles: retrieved.articles.clone(),
        };
        let reply = self.drafter.draft(&request).await.filter(|r| !r.trim().is_empty());
        if reply.is_none() {
            warn!(ticket_id = %ticket.id(), "no reply draft produced");
        }
        Drafted { classification: retrieved.classification, articles: retrieved.articles, reply }
    }

    /// All three AI stages; reads the ticket only
    pub async fn run(&self, ticket: &Ticket) -> Drafted {
        let classified = self.classify(ticket).await;
        let retrieved = self.retrieve(ticket, classified).await;
        self.draft(ticket, retrieved).await
    }

    /// Write the stage outputs onto the ticket. Returns whether suggestions were applied.
    pub fn annotate(&self, ticket: &mut Ticket, drafted: Drafted) -> bool {
        let Drafted { classification, articles, reply } = drafted;
        let local = self.extractor.extract(&ticket.search_text(), ticket.order_id());
        let annotation = AiAnnotation {
            suggested_category: classification.category,
            suggested_priority: classification.priority,
            suggested_reply: reply,
            confidence: classification.confidence,
            sentiment: classification.sentiment,
            urgency_keywords: classification.urgency_keywords,
            extracted_metadata: merge_metadata(classification.extracted_info, local),
            reasoning: classification.reasoning,
            kb_article_ids: articles.into_iter().map(|a| a.article_id).collect(),
            annotated_at: Utc::now(),
        };
        ticket.annotate(annotation, self.settings.confidence_threshold)
    }
}
