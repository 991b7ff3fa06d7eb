//! Error taxonomy shared by the services and the HTTP layer

use thiserror::Error;

use crate::domain::aggregates::{AgentError, TicketError};
use crate::domain::value_objects::{EmailError, ParseLabelError};
use crate::ports::RepositoryError;

#[derive(Debug, Error)]
pub enum DeskError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl DeskError {
    pub fn ticket_not_found(id: impl Into<String>) -> Self {
        Self::NotFound { entity: "ticket", id: id.into() }
    }

    pub fn agent_not_found(id: impl Into<String>) -> Self {
        Self::NotFound { entity: "agent", id: id.into() }
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Conflict(_) => "CONFLICT",
            Self::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            Self::Repository(_) => "INTERNAL_ERROR",
        }
    }

    /// Transient failures worth another attempt
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Repository(_))
    }
}

impl From<TicketError> for DeskError {
    fn from(e: TicketError) -> Self {
        Self::Conflict(e.to_string())
    }
}

impl From<AgentError> for DeskError {
    fn from(e: AgentError) -> Self {
        match e {
            AgentError::InvalidCapacity(_) => Self::Validation(e.to_string()),
            AgentError::AtCapacity { .. } | AgentError::Inactive(_) => Self::Conflict(e.to_string()),
        }
    }
}

impl From<EmailError> for DeskError {
    fn from(e: EmailError) -> Self {
        Self::Validation(e.to_string())
    }
}

impl From<ParseLabelError> for DeskError {
    fn from(e: ParseLabelError) -> Self {
        Self::Validation(e.to_string())
    }
}

pub type DeskResult<T> = Result<T, DeskError>;
