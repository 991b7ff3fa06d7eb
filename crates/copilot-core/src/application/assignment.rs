//! Assignment service
//!
//! All changes to agent load go through the shared [`WriteLock`], so two
//! concurrent assignments can never double-book the same slot.

use std::sync::Arc;
use tracing::{info, warn};

use super::WriteLock;
use crate::domain::aggregates::{Agent, Ticket};
use crate::domain::services::select_agent;
use crate::domain::value_objects::TicketId;
use crate::error::{DeskError, DeskResult};
use crate::ports::{AgentFilter, AgentRepository, EventPublisher, TicketRepository};

/// Who should receive a ticket
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AssignTarget {
    Agent { agent_id: String, force: bool },
    Auto,
}

impl AssignTarget {
    /// Exactly one of an explicit agent or auto-assignment must be requested
    pub fn from_request(agent_id: Option<String>, auto_assign: bool, force: bool) -> DeskResult<Self> {
        let agent_id = agent_id.map(|a| a.trim().to_string()).filter(|a| !a.is_empty());
        match (agent_id, auto_assign) {
            (Some(agent_id), false) => Ok(Self::Agent { agent_id, force }),
            (None, true) => Ok(Self::Auto),
            (Some(_), true) => Err(DeskError::Validation("provide either agent_id or auto_assign, not both".into())),
            (None, false) => Err(DeskError::Validation("provide agent_id or set auto_assign".into())),
        }
    }
}

#[derive(Clone, Debug)]
pub enum AssignmentOutcome {
    Assigned { ticket: Ticket, agent: Agent },
    /// No eligible agent; the ticket is left as it was
    Unassigned { ticket: Ticket, reason: String },
}

impl AssignmentOutcome {
    pub fn ticket(&self) -> &Ticket {
        match self {
            Self::Assigned { ticket, .. } | Self::Unassigned { ticket, .. } => ticket,
        }
    }
}

pub struct AssignmentService {
    tickets: Arc<dyn TicketRepository>,
    agents: Arc<dyn AgentRepository>,
    events: Arc<dyn EventPublisher>,
    lock: WriteLock,
}

impl AssignmentService {
    pub fn new(
        tickets: Arc<dyn TicketRepository>,
        agents: Arc<dyn AgentRepository>,
        events: Arc<dyn EventPublisher>,
        lock: WriteLock,
    ) -> Self {
        Self { tickets, agents, events, lock }
    }

    pub async fn assign(&self, ticket_id: &TicketId, target: AssignTarget) -> DeskResult<AssignmentOutcome> {
        match target {
            AssignTarget::Agent { agent_id, force } => self.assign_to(ticket_id, &agent_id, force).await,
            AssignTarget::Auto => self.auto_assign(ticket_id).await,
        }
    }

    /// Manual assignment. `force` allows exceeding the agent's daily capacity.
    pub async fn assign_to(&self, ticket_id: &TicketId, agent_id: &str, force: bool) -> DeskResult<AssignmentOutcome> {
        let _guard = self.lock.acquire().await;
        let mut ticket = self.load_assignable(ticket_id).await?;
        let mut agent = self
            .agents
            .find_by_id(agent_id)
            .await?
            .ok_or_else(|| DeskError::agent_not_found(agent_id))?;

        if ticket.assigned_to() == Some(agent_id) {
            return Ok(AssignmentOutcome::Assigned { ticket, agent });
        }

        agent.reserve_slot(force)?;
        self.commit(&mut ticket, &mut agent).await?;
        info!(ticket_id = %ticket_id, agent_id, force, load = agent.current_load, "ticket assigned");
        Ok(AssignmentOutcome::Assigned { ticket, agent })
    }

    /// Pick the least-loaded eligible agent for the ticket's category
    pub async fn auto_assign(&self, ticket_id: &TicketId) -> DeskResult<AssignmentOutcome> {
        let _guard = self.lock.acquire().await;
        let mut ticket = self.load_assignable(ticket_id).await?;
        if let Some(current) = ticket.assigned_to() {
            return Err(DeskError::Conflict(format!("ticket {ticket_id} is already assigned to {current}")));
        }

        let roster = self.agents.list(&AgentFilter { active_only: true, ..Default::default() }).await?;
        let Some(chosen) = select_agent(&roster, ticket.category()) else {
            let reason = match ticket.category() {
                Some(c) => format!("no available agent with skill {c} and spare capacity"),
                None => "no available agent with spare capacity".to_string(),
            };
            info!(ticket_id = %ticket_id, reason = %reason, "auto-assignment found no agent");
            return Ok(AssignmentOutcome::Unassigned { ticket, reason });
        };

        let mut agent = chosen.clone();
        agent.reserve_slot(false)?;
        self.commit(&mut ticket, &mut agent).await?;
        info!(ticket_id = %ticket_id, agent_id = %agent.agent_id, load = agent.current_load, "ticket auto-assigned");
        Ok(AssignmentOutcome::Assigned { ticket, agent })
    }

    async fn load_assignable(&self, ticket_id: &TicketId) -> DeskResult<Ticket> {
        let ticket = self
            .tickets
            .find_by_id(ticket_id)
            .await?
            .ok_or_else(|| DeskError::ticket_not_found(ticket_id.as_str()))?;
        if ticket.status().is_terminal() {
            return Err(DeskError::Conflict(format!("ticket {ticket_id} is {} and cannot be assigned", ticket.status())));
        }
        Ok(ticket)
    }

    /// Persist a reserved slot. Releases the previous assignee, if any.
    async fn commit(&self, ticket: &mut Ticket, agent: &mut Agent) -> DeskResult<()> {
        let previous = ticket.assign(agent.agent_id.clone())?;
        if let Some(team) = agent.team.clone() {
            ticket.set_team(Some(team));
        }
        if let Some(previous) = previous {
            release_agent(self.agents.as_ref(), &previous, false).await?;
        }
        self.agents.save(agent).await?;
        self.tickets.save(ticket).await?;
        self.events.publish(ticket.take_events()).await?;
        Ok(())
    }
}

/// Give a slot back to `agent_id`. The caller must hold the [`WriteLock`].
pub(crate) async fn release_agent(agents: &dyn AgentRepository, agent_id: &str, resolved: bool) -> DeskResult<()> {
    match agents.find_by_id(agent_id).await? {
        Some(mut agent) => {
            let load = agent.release_slot(resolved);
            agents.save(&agent).await?;
            info!(agent_id, load, resolved, "agent slot released");
        }
        None => warn!(agent_id, "released ticket belonged to an unknown agent"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::AgentStatus;
    use crate::domain::value_objects::{Category, Email, TicketSource, TicketStatus};
    use crate::infrastructure::{InMemoryAgentRepository, InMemoryEventLog, InMemoryTicketRepository};
    use crate::application::pipeline::tests::pipeline;
    use chrono::Utc;

    struct Fixture {
        tickets: Arc<InMemoryTicketRepository>,
        agents: Arc<InMemoryAgentRepository>,
        service: Arc<AssignmentService>,
    }

    fn fixture() -> Fixture {
        let tickets = Arc::new(InMemoryTicketRepository::new());
        let agents = Arc::new(InMemoryAgentRepository::new());
        let service = Arc::new(AssignmentService::new(
            tickets.clone(),
            agents.clone(),
            Arc::new(InMemoryEventLog::new()),
            WriteLock::new(),
        ));
        Fixture { tickets, agents, service }
    }

    async fn add_agent(f: &Fixture, id: &str, skills: &[&str], load: u32, max: u32) {
        let mut agent = Agent::new(id, id, Email::new(format!("{}@example.com", id.to_lowercase())).unwrap())
            .with_skills(skills.iter().map(|s| s.to_string()).collect())
            .with_team(Some("shipping_team".into()))
            .with_capacity(max)
            .unwrap();
        agent.current_load = load;
        f.agents.save(&agent).await.unwrap();
    }

    async fn add_ticket(f: &Fixture, category: Option<Category>) -> TicketId {
        let mut ticket = Ticket::create(
            TicketId::generate(Utc::now()),
            Email::new("jane@example.com").unwrap(),
            "Order hasn't shipped",
            "Order #2021 is late",
            TicketSource::Web,
        );
        if category.is_some() {
            let p = pipeline(0.95, vec![], false);
            let drafted = p.run(&ticket).await;
            p.annotate(&mut ticket, drafted);
        }
        f.tickets.save(&ticket).await.unwrap();
        ticket.id().clone()
    }

    #[test]
    fn test_target_requires_exactly_one() {
        assert_eq!(AssignTarget::from_request(None, true, false).unwrap(), AssignTarget::Auto);
        assert!(AssignTarget::from_request(Some("A".into()), true, false).is_err());
        assert!(AssignTarget::from_request(Some("  ".into()), false, false).is_err());
        assert_eq!(
            AssignTarget::from_request(Some("A".into()), false, true).unwrap(),
            AssignTarget::Agent { agent_id: "A".into(), force: true }
        );
    }

    #[tokio::test]
    async fn test_manual_assignment_increments_load() {
        let f = fixture();
        add_agent(&f, "AGENT-001", &["SHIPPING"], 0, 15).await;
        let id = add_ticket(&f, None).await;

        let outcome = f.service.assign_to(&id, "AGENT-001", false).await.unwrap();
        let AssignmentOutcome::Assigned { ticket, agent } = outcome else { panic!("expected assignment") };
        assert_eq!(ticket.assigned_to(), Some("AGENT-001"));
        assert_eq!(ticket.status(), TicketStatus::InProgress);
        assert_eq!(ticket.team(), Some("shipping_team"));
        assert_eq!(agent.current_load, 1);
    }

    #[tokio::test]
    async fn test_full_agent_conflicts_and_ticket_stays_unassigned() {
        let f = fixture();
        add_agent(&f, "AGENT-001", &["SHIPPING"], 15, 15).await;
        let id = add_ticket(&f, None).await;

        let err = f.service.assign_to(&id, "AGENT-001", false).await.unwrap_err();
        assert!(matches!(err, DeskError::Conflict(_)));
        let stored = f.tickets.find_by_id(&id).await.unwrap().unwrap();
        assert!(stored.assigned_to().is_none());

        f.service.assign_to(&id, "AGENT-001", true).await.unwrap();
        assert_eq!(f.agents.find_by_id("AGENT-001").await.unwrap().unwrap().current_load, 16);
    }

    #[tokio::test]
    async fn test_reassignment_releases_previous_agent() {
        let f = fixture();
        add_agent(&f, "AGENT-001", &["SHIPPING"], 0, 15).await;
        add_agent(&f, "AGENT-002", &["SHIPPING"], 0, 15).await;
        let id = add_ticket(&f, None).await;

        f.service.assign_to(&id, "AGENT-001", false).await.unwrap();
        f.service.assign_to(&id, "AGENT-002", false).await.unwrap();
        assert_eq!(f.agents.find_by_id("AGENT-001").await.unwrap().unwrap().current_load, 0);
        assert_eq!(f.agents.find_by_id("AGENT-002").await.unwrap().unwrap().current_load, 1);
    }

    #[tokio::test]
    async fn test_auto_assign_by_skill() {
        let f = fixture();
        add_agent(&f, "AGENT-001", &["BILLING"], 0, 15).await;
        add_agent(&f, "AGENT-002", &["shipping"], 4, 15).await;
        add_agent(&f, "AGENT-003", &["SHIPPING"], 2, 15).await;
        let id = add_ticket(&f, Some(Category::Shipping)).await;

        let outcome = f.service.auto_assign(&id).await.unwrap();
        let AssignmentOutcome::Assigned { agent, .. } = outcome else { panic!("expected assignment") };
        assert_eq!(agent.agent_id, "AGENT-003");
    }

    #[tokio::test]
    async fn test_auto_assign_without_candidates() {
        let f = fixture();
        add_agent(&f, "AGENT-001", &["SHIPPING"], 15, 15).await;
        let mut away = Agent::new("AGENT-002", "Bob", Email::new("bob@example.com").unwrap())
            .with_skills(vec!["SHIPPING".into()]);
        away.set_status(AgentStatus::Away);
        f.agents.save(&away).await.unwrap();
        let id = add_ticket(&f, Some(Category::Shipping)).await;

        let outcome = f.service.auto_assign(&id).await.unwrap();
        assert!(matches!(outcome, AssignmentOutcome::Unassigned { .. }));
        assert!(outcome.ticket().assigned_to().is_none());
    }

    #[tokio::test]
    async fn test_resolved_ticket_cannot_be_assigned() {
        let f = fixture();
        add_agent(&f, "AGENT-001", &["SHIPPING"], 0, 15).await;
        let id = add_ticket(&f, None).await;
        let mut t = f.tickets.find_by_id(&id).await.unwrap().unwrap();
        t.transition_to(TicketStatus::Resolved).unwrap();
        f.tickets.save(&t).await.unwrap();

        assert!(matches!(f.service.assign_to(&id, "AGENT-001", true).await, Err(DeskError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_concurrent_auto_assign_respects_capacity() {
        let f = fixture();
        add_agent(&f, "AGENT-001", &["SHIPPING"], 0, 3).await;
        let mut ids = vec![];
        for _ in 0..6 {
            ids.push(add_ticket(&f, Some(Category::Shipping)).await);
        }

        let handles: Vec<_> = ids
            .iter()
            .cloned()
            .map(|id| {
                let service = f.service.clone();
                tokio::spawn(async move { service.auto_assign(&id).await })
            })
            .collect();
        let mut assigned = 0;
        for h in handles {
            if let AssignmentOutcome::Assigned { .. } = h.await.unwrap().unwrap() {
                assigned += 1;
            }
        }

        assert_eq!(assigned, 3);
        assert_eq!(f.agents.find_by_id("AGENT-001").await.unwrap().unwrap().current_load, 3);
    }
}
