//! OpenAI-compatible chat client
//!
//! Talks to any `/chat/completions` endpoint; defaults target Groq.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::error::AiError;

pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub base_url: String,
    pub model: String,
    /// `None` disables every LLM call
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            timeout_secs: 30,
        }
    }
}

/// One system + user exchange
#[derive(Clone, Debug)]
pub struct ChatRequest {
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub json_mode: bool,
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Content of the first choice
    async fn complete(&self, request: &ChatRequest) -> Result<String, AiError>;

    fn model(&self) -> &str;
}

#[derive(Clone)]
pub struct OpenAiCompatClient {
    api_key: String,
    client: reqwest::Client,
    endpoint: String,
    model: String,
}

impl OpenAiCompatClient {
    pub fn new(settings: &LlmSettings, api_key: String) -> Result<Self, AiError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs.max(1)))
            .build()?;
        Ok(Self {
            api_key,
            client,
            endpoint: format!("{}/chat/completions", settings.base_url.trim_end_matches('/')),
            model: settings.model.clone(),
        })
    }

    fn request_body(&self, request: &ChatRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": &self.model,
            "messages": [
                {"role": "system", "content": &request.system},
                {"role": "user", "content": &request.user}
            ],
            "temperature": request.temperature,
            "max_tokens": request.max_tokens
        });
        if request.json_mode {
            body["response_format"] = serde_json::json!({"type": "json_object"});
        }
        body
    }
}

#[derive(Deserialize)]
struct Message {
    content: Option<String>,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Deserialize)]
struct ApiResponse {
    choices: Vec<Choice>,
}

fn first_choice(raw: &str) -> Result<String, AiError> {
    let response: ApiResponse = serde_json::from_str(raw)?;
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .ok_or(AiError::EmptyResponse)
}

#[async_trait]
impl LlmClient for OpenAiCompatClient {
    async fn complete(&self, request: &ChatRequest) -> Result<String, AiError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(request))
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(AiError::Api { status: status.as_u16(), body: text.chars().take(500).collect() });
        }
        debug!(model = %self.model, bytes = text.len(), "chat completion received");
        first_choice(&text)
    }

    fn model(&self) -> &str {
        &self.model
    }
}
