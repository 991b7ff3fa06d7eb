//! Ticket Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::domain::events::{DomainEvent, TicketEvent};
use crate::domain::services::apply_if_confident;
use crate::domain::value_objects::{
    Category, CustomerId, Email, Priority, Sentiment, TicketId, TicketSource, TicketStatus,
};

/// Output of one pipeline run, stored verbatim on the ticket
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AiAnnotation {
    pub suggested_category: Category,
    pub suggested_priority: Priority,
    pub suggested_reply: Option<String>,
    /// Always within [0, 1]
    pub confidence: f32,
    pub sentiment: Sentiment,
    pub urgency_keywords: Vec<String>,
    pub extracted_metadata: BTreeMap<String, String>,
    pub reasoning: String,
    pub kb_article_ids: Vec<String>,
    pub annotated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Ticket {
    id: TicketId,
    customer_id: CustomerId,
    customer_email: Email,
    customer_name: Option<String>,
    subject: String,
    description: String,
    status: TicketStatus,
    priority: Priority,
    category: Option<Category>,
    order_id: Option<String>,
    source: TicketSource,
    assigned_to: Option<String>,
    team: Option<String>,
    tags: Vec<String>,
    ai: Option<AiAnnotation>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    resolved_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

impl Ticket {
    pub fn create(
        id: TicketId,
        customer_email: Email,
        subject: impl Into<String>,
        description: impl Into<String>,
        source: TicketSource,
    ) -> Self {
        let now = Utc::now();
        let mut t = Self {
            id: id.clone(),
            customer_id: CustomerId::from_email(&customer_email),
            customer_email,
            customer_name: None,
            subject: subject.into(),
            description: description.into(),
            status: TicketStatus::New,
            priority: Priority::Medium,
            category: None,
            order_id: None,
            source,
            assigned_to: None,
            team: None,
            tags: vec![],
            ai: None,
            created_at: now,
            updated_at: now,
            resolved_at: None,
            events: vec![],
        };
        t.raise_event(DomainEvent::Ticket(TicketEvent::Created { ticket_id: id, source, created_at: now }));
        t
    }

    pub fn with_customer_name(mut self, name: Option<String>) -> Self {
        self.customer_name = name;
        self
    }

    pub fn with_order_id(mut self, order_id: Option<String>) -> Self {
        self.order_id = order_id;
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn id(&self) -> &TicketId { &self.id }
    pub fn customer_id(&self) -> &CustomerId { &self.customer_id }
    pub fn customer_email(&self) -> &Email { &self.customer_email }
    pub fn customer_name(&self) -> Option<&str> { self.customer_name.as_deref() }
    pub fn subject(&self) -> &str { &self.subject }
    pub fn description(&self) -> &str { &self.description }
    pub fn status(&self) -> TicketStatus { self.status }
    pub fn priority(&self) -> Priority { self.priority }
    pub fn category(&self) -> Option<Category> { self.category }
    pub fn order_id(&self) -> Option<&str> { self.order_id.as_deref() }
    pub fn source(&self) -> TicketSource { self.source }
    pub fn assigned_to(&self) -> Option<&str> { self.assigned_to.as_deref() }
    pub fn team(&self) -> Option<&str> { self.team.as_deref() }
    pub fn tags(&self) -> &[String] { &self.tags }
    pub fn ai(&self) -> Option<&AiAnnotation> { self.ai.as_ref() }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }
    pub fn resolved_at(&self) -> Option<DateTime<Utc>> { self.resolved_at }

    /// Text sent to the knowledge base
    pub fn search_text(&self) -> String {
        format!("{}\n{}", self.subject, self.description)
    }

    /// Store the annotation and promote the suggestions when `confidence > threshold`.
    /// Returns whether the suggestions were applied.
    pub fn annotate(&mut self, annotation: AiAnnotation, threshold: f32) -> bool {
        let confidence = annotation.confidence;
        let applied = confidence > threshold;

        self.category = apply_if_confident(Some(annotation.suggested_category), self.category, confidence, threshold);
        self.priority = apply_if_confident(annotation.suggested_priority, self.priority, confidence, threshold);

        let annotated_at = annotation.annotated_at;
        self.ai = Some(annotation);
        self.touch();
        self.raise_event(DomainEvent::Ticket(TicketEvent::Annotated {
            ticket_id: self.id.clone(),
            confidence,
            auto_applied: applied,
            annotated_at,
        }));
        applied
    }

    /// Move the ticket forward. Returns `false` when already in `to`.
    pub fn transition_to(&mut self, to: TicketStatus) -> Result<bool, TicketError> {
        let from = self.status;
        if from == to {
            return Ok(false);
        }
        if to < from {
            return Err(TicketError::BackwardTransition { from, to });
        }

        self.status = to;
        if to.is_terminal() && self.resolved_at.is_none() {
            self.resolved_at = Some(Utc::now());
        }
        self.touch();
        self.raise_event(DomainEvent::Ticket(TicketEvent::StatusChanged { ticket_id: self.id.clone(), from, to }));
        Ok(true)
    }

    /// Hand the ticket to an agent and start work on it. Returns the previous assignee.
    pub fn assign(&mut self, agent_id: impl Into<String>) -> Result<Option<String>, TicketError> {
        if self.status.is_terminal() {
            return Err(TicketError::NotAssignable(self.status));
        }
        let agent_id = agent_id.into();
        let previous = self.assigned_to.replace(agent_id.clone());

        if self.status < TicketStatus::InProgress {
            let from = self.status;
            self.status = TicketStatus::InProgress;
            self.raise_event(DomainEvent::Ticket(TicketEvent::StatusChanged {
                ticket_id: self.id.clone(),
                from,
                to: TicketStatus::InProgress,
            }));
        }
        self.touch();
        self.raise_event(DomainEvent::Ticket(TicketEvent::Assigned {
            ticket_id: self.id.clone(),
            agent_id,
            previous_agent: previous.clone(),
        }));
        Ok(previous)
    }

    pub fn set_team(&mut self, team: Option<String>) {
        self.team = team;
        self.touch();
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> {
        std::mem::take(&mut self.events)
    }

    fn raise_event(&mut self, e: DomainEvent) {
        self.events.push(e);
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TicketError {
    #[error("cannot move ticket from {from} back to {to}")]
    BackwardTransition { from: TicketStatus, to: TicketStatus },
    #[error("ticket is {0} and cannot be assigned")]
    NotAssignable(TicketStatus),
}
