//! Support Copilot Core
//!
//! Ticketing domain for the support copilot, laid out hexagonally.
//!
//! ## Architecture
//!
//! - **Domain Layer**: Ticket and Agent aggregates, value objects, domain events
//! - **Ports Layer**: repository, event and AI-stage interfaces
//! - **Application Layer**: ticket pipeline, processing queue, ticket/agent/assignment services
//! - **Infrastructure Layer**: in-memory repositories and event log
//!
//! ## Pipeline
//!
//! A created ticket is queued for processing. The [`TicketPipeline`] classifies it,
//! retrieves knowledge-base context, drafts a reply and writes the annotation
//! back onto the ticket. Suggestions only become authoritative when the
//! classifier is confident enough.

pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod ports;

pub use application::{
    AgentRemoval, AgentService, AgentStats, AgentUpdate, AssignTarget, AssignmentOutcome,
    AssignmentService, NewAgent, NewTicket, PipelineSettings, PipelineStage, ProcessingJob,
    ProcessingQueue, TicketCreated, TicketPipeline, TicketProcessor, TicketService, WriteLock,
};
pub use domain::aggregates::{Agent, AgentError, AgentStatus, AiAnnotation, Ticket, TicketError};
pub use domain::events::{DomainEvent, TicketEvent};
pub use domain::value_objects::{
    Category, CustomerId, Email, EmailError, ParseLabelError, Priority, Sentiment, TicketId,
    TicketSource, TicketStatus,
};
pub use error::{DeskError, DeskResult};
pub use ports::{
    AgentFilter, AgentRepository, Classification, ClassificationInput, EventPublisher,
    KnowledgeMatch, KnowledgeSearch, ReplyDrafter, ReplyRequest, RepositoryError, SearchError,
    TicketClassifier, TicketFilter, TicketRepository,
};
