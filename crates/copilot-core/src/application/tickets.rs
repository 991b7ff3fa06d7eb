//! Ticket service: intake, lookup, status updates and re-processing

use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::assignment::{release_agent, AssignTarget, AssignmentOutcome, AssignmentService};
use super::queue::ProcessingQueue;
use super::WriteLock;
use crate::domain::aggregates::Ticket;
use crate::domain::value_objects::{CustomerId, Email, TicketId, TicketSource, TicketStatus};
use crate::error::{DeskError, DeskResult};
use crate::ports::{AgentRepository, EventPublisher, TicketFilter, TicketRepository};

const MAX_ID_ATTEMPTS: usize = 5;
const MAX_SUBJECT_LEN: usize = 200;

/// Unvalidated intake request, from the API or a webhook adapter
#[derive(Clone, Debug, Default)]
pub struct NewTicket {
    pub customer_email: String,
    pub customer_name: Option<String>,
    pub subject: String,
    pub description: String,
    pub order_id: Option<String>,
    pub source: Option<String>,
}

#[derive(Clone, Debug)]
pub struct TicketCreated {
    pub ticket: Ticket,
    pub suggested_actions: Vec<String>,
    /// Whether AI processing was queued
    pub queued: bool,
}

pub struct TicketService {
    tickets: Arc<dyn TicketRepository>,
    agents: Arc<dyn AgentRepository>,
    events: Arc<dyn EventPublisher>,
    assignment: Arc<AssignmentService>,
    queue: ProcessingQueue,
    lock: WriteLock,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl TicketService {
    pub fn new(
        tickets: Arc<dyn TicketRepository>,
        agents: Arc<dyn AgentRepository>,
        events: Arc<dyn EventPublisher>,
        assignment: Arc<AssignmentService>,
        queue: ProcessingQueue,
        lock: WriteLock,
    ) -> Self {
        Self { tickets, agents, events, assignment, queue, lock }
    }

    /// Validate and store a ticket, then queue it for AI processing.
    /// Succeeds whenever validation passes, even if the queue is down.
    pub async fn create_ticket(&self, request: NewTicket) -> DeskResult<TicketCreated> {
        let email = Email::new(request.customer_email)?;
        let subject = request.subject.trim().to_string();
        let description = request.description.trim().to_string();
        if subject.is_empty() {
            return Err(DeskError::Validation("subject is required".into()));
        }
        if subject.chars().count() > MAX_SUBJECT_LEN {
            return Err(DeskError::Validation(format!("subject must be at most {MAX_SUBJECT_LEN} characters")));
        }
        if description.is_empty() {
            return Err(DeskError::Validation("description is required".into()));
        }
        let source = match non_blank(request.source) {
            Some(raw) => raw.parse::<TicketSource>()?,
            None => TicketSource::default(),
        };
        let order_id = non_blank(request.order_id);

        let id = self.allocate_id().await?;
        let mut ticket = Ticket::create(id, email, subject, description, source)
            .with_customer_name(non_blank(request.customer_name))
            .with_order_id(order_id.clone());

        self.tickets.save(&ticket).await?;
        self.events.publish(ticket.take_events()).await?;
        info!(
            ticket_id = %ticket.id(),
            customer_id = %ticket.customer_id(),
            fingerprint = %&CustomerId::fingerprint(ticket.customer_email())[..12],
            source = %source,
            "ticket created"
        );

        let mut suggested_actions = vec!["Ticket created successfully".to_string()];
        let queued = match self.queue.submit(ticket.id().clone()) {
            Ok(()) => {
                suggested_actions.push("AI processing queued".to_string());
                suggested_actions.push("Agent will be notified".to_string());
                true
            }
            Err(e) => {
                error!(ticket_id = %ticket.id(), error = %e, "could not queue AI processing");
                suggested_actions.push("AI processing unavailable; triage manually".to_string());
                false
            }
        };
        if let Some(order_id) = order_id {
            suggested_actions.push(format!("Look up order {order_id} before replying"));
        }

        Ok(TicketCreated { ticket, suggested_actions, queued })
    }

    async fn allocate_id(&self) -> DeskResult<TicketId> {
        for _ in 0..MAX_ID_ATTEMPTS {
            let id = TicketId::generate(Utc::now());
            if !self.tickets.exists(&id).await? {
                return Ok(id);
            }
            warn!(ticket_id = %id, "ticket id collision, regenerating");
        }
        Err(DeskError::Conflict("could not allocate a unique ticket id".into()))
    }

    pub async fn get_ticket(&self, id: &TicketId) -> DeskResult<Ticket> {
        self.tickets
            .find_by_id(id)
            .await?
            .ok_or_else(|| DeskError::ticket_not_found(id.as_str()))
    }

    pub async fn list_tickets(&self, filter: &TicketFilter) -> DeskResult<Vec<Ticket>> {
        Ok(self.tickets.list(filter).await?)
    }

    /// Move a ticket forward. Resolving or closing an assigned ticket frees the agent's slot.
    pub async fn update_status(&self, id: &TicketId, status: &str) -> DeskResult<Ticket> {
        let status: TicketStatus = status.parse()?;

        let _guard = self.lock.acquire().await;
        let mut ticket = self.get_ticket(id).await?;
        let was_active = ticket.status().is_active();
        if !ticket.transition_to(status)? {
            return Ok(ticket);
        }

        if was_active && status.is_terminal() {
            if let Some(agent_id) = ticket.assigned_to() {
                release_agent(self.agents.as_ref(), agent_id, true).await?;
            }
        }
        self.tickets.save(&ticket).await?;
        self.events.publish(ticket.take_events()).await?;
        info!(ticket_id = %id, status = %status, "ticket status updated");
        Ok(ticket)
    }

    pub async fn assign(&self, id: &TicketId, target: AssignTarget) -> DeskResult<AssignmentOutcome> {
        self.assignment.assign(id, target).await
    }

    /// Queue the pipeline again for an existing ticket
    pub async fn reprocess(&self, id: &TicketId) -> DeskResult<()> {
        if !self.tickets.exists(id).await? {
            return Err(DeskError::ticket_not_found(id.as_str()));
        }
        self.queue.submit(id.clone())?;
        info!(ticket_id = %id, "ticket re-queued for processing");
        Ok(())
    }
}
