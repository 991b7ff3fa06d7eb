//! LLM-backed reply drafter

use async_trait::async_trait;
use copilot_core::{ReplyDrafter, ReplyRequest};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::client::{ChatRequest, LlmClient};
use crate::prompts::{reply_prompt, REPLY_SYSTEM_PROMPT};

const TEMPERATURE: f32 = 0.7;
const MAX_TOKENS: u32 = 300;

pub struct LlmReplyDrafter {
    client: Option<Arc<dyn LlmClient>>,
}

impl LlmReplyDrafter {
    pub fn new(client: Option<Arc<dyn LlmClient>>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ReplyDrafter for LlmReplyDrafter {
    async fn draft(&self, request: &ReplyRequest) -> Option<String> {
        let client = self.client.as_ref()?;
        let chat = ChatRequest {
            system: REPLY_SYSTEM_PROMPT.to_string(),
            user: reply_prompt(request),
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
            json_mode: false,
        };

        match client.complete(&chat).await {
            Ok(reply) if !reply.trim().is_empty() => {
                debug!(chars = reply.len(), articles = request.articles.len(), "reply drafted");
                Some(reply.trim().to_string())
            }
            Ok(_) => {
                warn!("model returned an empty reply");
                None
            }
            Err(e) => {
                warn!(error = %e, "reply drafting failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::tests::CannedClient;
    use copilot_core::{Category, Priority, Sentiment};

    fn request() -> ReplyRequest {
        ReplyRequest {
            subject: "Order hasn't shipped".into(),
            description: "Order #2021".into(),
            category: Category::Shipping,
            priority: Priority::High,
            sentiment: Sentiment::Negative,
            articles: vec![],
        }
    }

    #[tokio::test]
    async fn test_draft_is_trimmed() {
        let drafter = LlmReplyDrafter::new(Some(Arc::new(CannedClient(Ok("\n Sorry for the delay. \n".into())))));
        assert_eq!(drafter.draft(&request()).await.as_deref(), Some("Sorry for the delay."));
    }

    #[tokio::test]
    async fn test_failures_yield_none() {
        let disabled = LlmReplyDrafter::new(None);
        assert!(disabled.draft(&request()).await.is_none());

        let failing = LlmReplyDrafter::new(Some(Arc::new(CannedClient(Err("timeout".into())))));
        assert!(failing.draft(&request()).await.is_none());

        let empty = LlmReplyDrafter::new(Some(Arc::new(CannedClient(Ok("   ".into())))));
        assert!(empty.draft(&request()).await.is_none());
    }
}
