//! Domain Events

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::value_objects::{TicketId, TicketSource, TicketStatus};

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "aggregate", rename_all = "snake_case")]
pub enum DomainEvent {
    Ticket(TicketEvent),
}

impl DomainEvent {
    pub fn name(&self) -> &'static str {
        match self {
            DomainEvent::Ticket(e) => e.name(),
        }
    }

    pub fn ticket_id(&self) -> &TicketId {
        match self {
            DomainEvent::Ticket(e) => e.ticket_id(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TicketEvent {
    Created {
        ticket_id: TicketId,
        source: TicketSource,
        created_at: DateTime<Utc>,
    },
    Annotated {
        ticket_id: TicketId,
        confidence: f32,
        auto_applied: bool,
        annotated_at: DateTime<Utc>,
    },
    StatusChanged {
        ticket_id: TicketId,
        from: TicketStatus,
        to: TicketStatus,
    },
    Assigned {
        ticket_id: TicketId,
        agent_id: String,
        previous_agent: Option<String>,
    },
}

impl TicketEvent {
    pub fn name(&self) -> &'static str {
        match self {
            TicketEvent::Created { .. } => "ticket.created",
            TicketEvent::Annotated { .. } => "ticket.annotated",
            TicketEvent::StatusChanged { .. } => "ticket.status_changed",
            TicketEvent::Assigned { .. } => "ticket.assigned",
        }
    }

    pub fn ticket_id(&self) -> &TicketId {
        match self {
            TicketEvent::Created { ticket_id, .. }
            | TicketEvent::Annotated { ticket_id, .. }
            | TicketEvent::StatusChanged { ticket_id, .. }
            | TicketEvent::Assigned { ticket_id, .. } => ticket_id,
        }
    }
}
