//! Infrastructure adapters

pub mod persistence;

pub use persistence::{InMemoryAgentRepository, InMemoryEventLog, InMemoryTicketRepository};
