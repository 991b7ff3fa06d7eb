//! Aggregates

pub mod agent;
pub mod ticket;

pub use agent::{Agent, AgentError, AgentStatus, DEFAULT_MAX_TICKETS, MAX_TICKETS_LIMIT};
pub use ticket::{AiAnnotation, Ticket, TicketError};
