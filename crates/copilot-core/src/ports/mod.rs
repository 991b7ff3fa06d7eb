//! Ports
//!
//! Hexagonal architecture: the interfaces infrastructure and AI adapters implement.

mod ai;
mod outbound;

pub use ai::{
    Classification, ClassificationInput, KnowledgeMatch, KnowledgeSearch, ReplyDrafter,
    ReplyRequest, SearchError, TicketClassifier,
};
pub use outbound::{
    AgentFilter, AgentRepository, EventPublisher, RepositoryError, TicketFilter, TicketRepository,
    DEFAULT_LIST_LIMIT,
};
