//! Knowledge base errors

use copilot_core::SearchError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KnowledgeError {
    /// The embedding service could not be reached or answered badly
    #[error("knowledge base unavailable: {0}")]
    Unavailable(String),

    #[error("invalid article data: {0}")]
    InvalidArticles(String),

    #[error("duplicate article id: {0}")]
    DuplicateArticle(String),

    #[error("knowledge base configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for KnowledgeError {
    fn from(e: reqwest::Error) -> Self {
        Self::Unavailable(e.to_string())
    }
}

impl From<serde_json::Error> for KnowledgeError {
    fn from(e: serde_json::Error) -> Self {
        Self::InvalidArticles(e.to_string())
    }
}

impl From<KnowledgeError> for SearchError {
    fn from(e: KnowledgeError) -> Self {
        SearchError::Unavailable(e.to_string())
    }
}
