//! Support Copilot AI adapters
//!
//! Implements the classification and reply-drafting ports of `copilot-core`
//! on top of an OpenAI-compatible chat-completions API (Groq by default).
//! Both adapters fail soft: errors are logged and turned into defaults.

pub mod classifier;
pub mod client;
pub mod error;
pub mod prompts;
pub mod reply;

pub use classifier::LlmClassifier;
pub use client::{ChatRequest, LlmClient, LlmSettings, OpenAiCompatClient};
pub use error::AiError;
pub use reply::LlmReplyDrafter;

use std::sync::Arc;

/// Build the shared client, or `None` when no API key is configured
pub fn client_from_settings(settings: &LlmSettings) -> Result<Option<Arc<dyn LlmClient>>, AiError> {
    match settings.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
        Some(key) => {
            let client = OpenAiCompatClient::new(settings, key.to_string())?;
            Ok(Some(Arc::new(client)))
        }
        None => {
            tracing::warn!("no LLM API key configured, AI classification and replies are disabled");
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_disables_client() {
        let settings = LlmSettings { api_key: Some("  ".into()), ..Default::default() };
        assert!(client_from_settings(&settings).unwrap().is_none());
        assert!(client_from_settings(&LlmSettings::default()).unwrap().is_none());
    }

    #[test]
    fn test_key_enables_client() {
        let settings = LlmSettings { api_key: Some("gsk_test".into()), ..Default::default() };
        assert!(client_from_settings(&settings).unwrap().is_some());
    }
}
