//! AI adapter errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("LLM request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("LLM API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("LLM returned no choices")]
    EmptyResponse,

    #[error("could not parse model output: {0}")]
    Parse(String),
}

impl From<serde_json::Error> for AiError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e.to_string())
    }
}
