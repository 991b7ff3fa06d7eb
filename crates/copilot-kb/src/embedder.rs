//! Text embedders
//!
//! The default is a local sentence-transformer (see [`crate::local`]).
//! [`HttpEmbedder`] calls an OpenAI-compatible `/embeddings` endpoint.
//! [`HashingEmbedder`] is an offline mode for tests and air-gapped setups:
//! feature hashing over word tokens, deterministic, no model download.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::Duration;

use crate::error::KnowledgeError;

pub const DEFAULT_DIMENSION: usize = 384;
pub const SEMANTIC_DEFAULT_FLOOR: f32 = 0.5;
/// Bag-of-words vectors score lower than semantic embeddings
pub const HASHING_DEFAULT_FLOOR: f32 = 0.2;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbedderKind {
    /// Candle sentence-transformer, needs the `local-embedder` feature
    #[default]
    Local,
    Http,
    Hashing,
}

#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, KnowledgeError>;

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, KnowledgeError>;

    fn model_name(&self) -> &str;

    fn dimension(&self) -> usize;

    /// Relevance floor that suits this embedder's score distribution
    fn default_floor(&self) -> f32 {
        SEMANTIC_DEFAULT_FLOOR
    }
}

// =============================================================================
// Hashing embedder
// =============================================================================

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "can", "do", "for", "from", "has", "have",
    "how", "i", "if", "in", "is", "it", "me", "my", "no", "not", "of", "on", "or", "our", "so", "that",
    "the", "this", "to", "was", "we", "what", "when", "where", "will", "with", "you", "your",
];

pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension: dimension.max(1) }
    }

    fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
        text.split(|c: char| !c.is_alphanumeric())
            .map(str::to_lowercase)
            .filter(|t| t.chars().count() >= 2 && !STOPWORDS.contains(&t.as_str()))
            .map(|t| {
                if t.len() >= 4 && t.ends_with('s') && !t.ends_with("ss") {
                    t[..t.len() - 1].to_string()
                } else {
                    t
                }
            })
    }

    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        for token in Self::tokens(text) {
            let digest = Sha256::digest(token.as_bytes());
            let mut bucket = [0u8; 8];
            bucket.copy_from_slice(&digest[..8]);
            let index = (u64::from_le_bytes(bucket) % self.dimension as u64) as usize;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[index] += sign;
        }
        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }
        vector
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, KnowledgeError> {
        Ok(self.embed_text(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, KnowledgeError> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }

    fn model_name(&self) -> &str {
        "feature-hashing"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn default_floor(&self) -> f32 {
        HASHING_DEFAULT_FLOOR
    }
}

// =============================================================================
// HTTP embedder
// =============================================================================

pub struct HttpEmbedder {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    dimension: usize,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

impl HttpEmbedder {
    pub fn new(base_url: &str, api_key: String, model: &str, dimension: usize) -> Result<Self, KnowledgeError> {
        let client = reqwest::Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/embeddings", base_url.trim_end_matches('/')),
            api_key,
            model: model.to_string(),
            dimension,
        })
    }

    fn order_response(&self, response: EmbeddingResponse, expected: usize) -> Result<Vec<Vec<f32>>, KnowledgeError> {
        let mut data = response.data;
        if data.len() != expected {
            return Err(KnowledgeError::Unavailable(format!(
                "embedding service returned {} vectors for {expected} inputs",
                data.len()
            )));
        }
        data.sort_by_key(|d| d.index);
        if let Some(bad) = data.iter().find(|d| d.embedding.len() != self.dimension) {
            return Err(KnowledgeError::Unavailable(format!(
                "expected {}-dimensional embeddings, got {}",
                self.dimension,
                bad.embedding.len()
            )));
        }
        Ok(data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, KnowledgeError> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors.pop().ok_or_else(|| KnowledgeError::Unavailable("empty embedding response".into()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, KnowledgeError> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({ "model": &self.model, "input": texts }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(KnowledgeError::Unavailable(format!("embedding API error {status}: {body}")));
        }
        let parsed: EmbeddingResponse = response.json().await?;
        self.order_response(parsed, texts.len())
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::cosine_similarity;

    #[test]
    fn test_hashing_is_deterministic_and_normalized() {
        let e = HashingEmbedder::new(DEFAULT_DIMENSION);
        let a = e.embed_text("Where is my package? Tracking shows nothing");
        let b = e.embed_text("Where is my package? Tracking shows nothing");
        assert_eq!(a, b);
        assert_eq!(a.len(), DEFAULT_DIMENSION);
        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_hashing_similarity_tracks_overlap() {
        let e = HashingEmbedder::new(DEFAULT_DIMENSION);
        let query = e.embed_text("reset my password");
        let close = e.embed_text("How to reset a forgotten password");
        let far = e.embed_text("International shipping customs duties");
        assert!(cosine_similarity(&query, &close) > cosine_similarity(&query, &far));
    }

    #[test]
    fn test_stopwords_only_gives_zero_vector() {
        let e = HashingEmbedder::new(16);
        assert!(e.embed_text("how do I ... the").iter().all(|x| *x == 0.0));
    }

    #[test]
    fn test_plural_stemming() {
        let tokens: Vec<String> = HashingEmbedder::tokens("Orders order address").collect();
        assert_eq!(tokens, vec!["order", "order", "address"]);
    }

    #[test]
    fn test_http_response_ordering() {
        let e = HttpEmbedder::new("https://example.test/v1/", "k".into(), "m", 2).unwrap();
        assert_eq!(e.endpoint, "https://example.test/v1/embeddings");
        let response: EmbeddingResponse = serde_json::from_str(
            r#"{"data":[{"embedding":[0.0,1.0],"index":1},{"embedding":[1.0,0.0],"index":0}]}"#,
        )
        .unwrap();
        let ordered = e.order_response(response, 2).unwrap();
        assert_eq!(ordered, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn test_http_response_count_mismatch() {
        let e = HttpEmbedder::new("https://example.test/v1", "k".into(), "m", 2).unwrap();
        let response: EmbeddingResponse = serde_json::from_str(r#"{"data":[]}"#).unwrap();
        assert!(matches!(e.order_response(response, 1), Err(KnowledgeError::Unavailable(_))));
    }
}
