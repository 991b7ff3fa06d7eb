//! Outbound ports (Repository and event traits)

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::aggregates::{Agent, AgentStatus, Ticket};
use crate::domain::value_objects::{Category, Priority, TicketId, TicketStatus};
use crate::domain::DomainEvent;

pub const DEFAULT_LIST_LIMIT: usize = 50;

/// Ticket listing filter; every set field must match
#[derive(Clone, Debug)]
pub struct TicketFilter {
    pub status: Option<TicketStatus>,
    pub priority: Option<Priority>,
    pub category: Option<Category>,
    pub assigned_to: Option<String>,
    pub limit: usize,
}

impl Default for TicketFilter {
    fn default() -> Self {
        Self { status: None, priority: None, category: None, assigned_to: None, limit: DEFAULT_LIST_LIMIT }
    }
}

impl TicketFilter {
    pub fn matches(&self, ticket: &Ticket) -> bool {
        self.status.map_or(true, |s| ticket.status() == s)
            && self.priority.map_or(true, |p| ticket.priority() == p)
            && self.category.map_or(true, |c| ticket.category() == Some(c))
            && self.assigned_to.as_deref().map_or(true, |a| ticket.assigned_to() == Some(a))
    }
}

#[derive(Clone, Debug, Default)]
pub struct AgentFilter {
    pub team: Option<String>,
    pub status: Option<AgentStatus>,
    pub active_only: bool,
}

impl AgentFilter {
    pub fn matches(&self, agent: &Agent) -> bool {
        self.team.as_deref().map_or(true, |t| agent.team.as_deref() == Some(t))
            && self.status.map_or(true, |s| agent.status == s)
            && (!self.active_only || agent.active)
    }
}

/// Ticket repository port
#[async_trait]
pub trait TicketRepository: Send + Sync {
    async fn find_by_id(&self, id: &TicketId) -> Result<Option<Ticket>, RepositoryError>;

    async fn exists(&self, id: &TicketId) -> Result<bool, RepositoryError>;

    /// Insert or update
    async fn save(&self, ticket: &Ticket) -> Result<(), RepositoryError>;

    /// Matching tickets, newest first, at most `filter.limit`
    async fn list(&self, filter: &TicketFilter) -> Result<Vec<Ticket>, RepositoryError>;

    /// Creation timestamps at or after `since`
    async fn created_since(&self, since: DateTime<Utc>) -> Result<Vec<DateTime<Utc>>, RepositoryError>;
}

/// Agent roster port
#[async_trait]
pub trait AgentRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<Agent>, RepositoryError>;

    async fn save(&self, agent: &Agent) -> Result<(), RepositoryError>;

    /// Matching agents ordered by id
    async fn list(&self, filter: &AgentFilter) -> Result<Vec<Agent>, RepositoryError>;

    /// Returns whether the agent existed
    async fn delete(&self, id: &str) -> Result<bool, RepositoryError>;
}

/// Event publisher port
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, events: Vec<DomainEvent>) -> Result<(), RepositoryError>;
}

#[derive(Debug, Clone, Error)]
pub enum RepositoryError {
    #[error("storage connection error: {0}")]
    Connection(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("duplicate key: {0}")]
    Duplicate(String),
}
