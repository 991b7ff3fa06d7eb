//! In-memory repository implementations
//!
//! Process-local storage; contents are lost on restart.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::VecDeque;
use tracing::debug;

use crate::domain::aggregates::{Agent, Ticket};
use crate::domain::value_objects::TicketId;
use crate::domain::DomainEvent;
use crate::ports::{
    AgentFilter, AgentRepository, EventPublisher, RepositoryError, TicketFilter, TicketRepository,
};

#[derive(Default)]
pub struct InMemoryTicketRepository {
    tickets: DashMap<String, Ticket>,
}

impl InMemoryTicketRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tickets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickets.is_empty()
    }
}

#[async_trait]
impl TicketRepository for InMemoryTicketRepository {
    async fn find_by_id(&self, id: &TicketId) -> Result<Option<Ticket>, RepositoryError> {
        Ok(self.tickets.get(id.as_str()).map(|t| t.clone()))
    }

    async fn exists(&self, id: &TicketId) -> Result<bool, RepositoryError> {
        Ok(self.tickets.contains_key(id.as_str()))
    }

    async fn save(&self, ticket: &Ticket) -> Result<(), RepositoryError> {
        self.tickets.insert(ticket.id().to_string(), ticket.clone());
        Ok(())
    }

    async fn list(&self, filter: &TicketFilter) -> Result<Vec<Ticket>, RepositoryError> {
        let mut found: Vec<Ticket> = self
            .tickets
            .iter()
            .filter(|t| filter.matches(t.value()))
            .map(|t| t.value().clone())
            .collect();
        found.sort_by(|a, b| b.created_at().cmp(&a.created_at()).then_with(|| a.id().cmp(b.id())));
        found.truncate(filter.limit);
        Ok(found)
    }

    async fn created_since(&self, since: DateTime<Utc>) -> Result<Vec<DateTime<Utc>>, RepositoryError> {
        Ok(self
            .tickets
            .iter()
            .map(|t| t.created_at())
            .filter(|at| *at >= since)
            .collect())
    }
}

#[derive(Default)]
pub struct InMemoryAgentRepository {
    agents: DashMap<String, Agent>,
}

impl InMemoryAgentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AgentRepository for InMemoryAgentRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<Agent>, RepositoryError> {
        Ok(self.agents.get(id).map(|a| a.clone()))
    }

    async fn save(&self, agent: &Agent) -> Result<(), RepositoryError> {
        self.agents.insert(agent.agent_id.clone(), agent.clone());
        Ok(())
    }

    async fn list(&self, filter: &AgentFilter) -> Result<Vec<Agent>, RepositoryError> {
        let mut found: Vec<Agent> = self
            .agents
            .iter()
            .filter(|a| filter.matches(a.value()))
            .map(|a| a.value().clone())
            .collect();
        found.sort_by(|a, b| a.agent_id.cmp(&b.agent_id));
        Ok(found)
    }

    async fn delete(&self, id: &str) -> Result<bool, RepositoryError> {
        Ok(self.agents.remove(id).is_some())
    }
}

/// Bounded in-memory event log; keeps the most recent events
pub struct InMemoryEventLog {
    events: RwLock<VecDeque<DomainEvent>>,
    capacity: usize,
}

impl Default for InMemoryEventLog {
    fn default() -> Self {
        Self::with_capacity(1024)
    }
}

impl InMemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { events: RwLock::new(VecDeque::new()), capacity: capacity.max(1) }
    }

    pub fn events(&self) -> Vec<DomainEvent> {
        self.events.read().iter().cloned().collect()
    }

    pub fn count(&self, name: &str) -> usize {
        self.events.read().iter().filter(|e| e.name() == name).count()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventLog {
    async fn publish(&self, events: Vec<DomainEvent>) -> Result<(), RepositoryError> {
        let mut log = self.events.write();
        for event in events {
            debug!(event = event.name(), ticket_id = %event.ticket_id(), "domain event");
            if log.len() == self.capacity {
                log.pop_front();
            }
            log.push_back(event);
        }
        Ok(())
    }
}
