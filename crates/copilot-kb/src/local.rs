//! Local sentence embeddings with Candle
//!
//! Runs `sentence-transformers/all-MiniLM-L6-v2` (BERT, mean pooling,
//! L2-normalized) on the CPU. Weights are fetched from the HuggingFace Hub on
//! first use and cached under `~/.cache/huggingface`.

use async_trait::async_trait;
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config, DTYPE};
use hf_hub::{api::sync::Api, Repo, RepoType};
use std::sync::Arc;
use tokenizers::{Tokenizer, TruncationParams};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::embedder::Embedder;
use crate::error::KnowledgeError;

const MAX_TOKENS: usize = 256;

fn unavailable(context: &str, e: impl std::fmt::Display) -> KnowledgeError {
    KnowledgeError::Unavailable(format!("{context}: {e}"))
}

struct SentenceModel {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
}

impl SentenceModel {
    fn load(repo_id: &str, dimension: usize) -> Result<Self, KnowledgeError> {
        info!(model = repo_id, "loading local embedding model");
        let device = Device::Cpu;

        let api = Api::new().map_err(|e| unavailable("huggingface hub", e))?;
        let repo = api.repo(Repo::new(repo_id.to_string(), RepoType::Model));
        let config_path = repo.get("config.json").map_err(|e| unavailable("config.json", e))?;
        let tokenizer_path = repo.get("tokenizer.json").map_err(|e| unavailable("tokenizer.json", e))?;
        let weights_path = repo.get("model.safetensors").map_err(|e| unavailable("model.safetensors", e))?;

        let config: Config = serde_json::from_str(&std::fs::read_to_string(&config_path)?)
            .map_err(|e| unavailable("config.json", e))?;
        if config.hidden_size != dimension {
            return Err(KnowledgeError::Config(format!(
                "{repo_id} produces {}-dimensional vectors, knowledge.dimension is {dimension}",
                config.hidden_size
            )));
        }

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path).map_err(|e| unavailable("tokenizer", e))?;
        tokenizer
            .with_truncation(Some(TruncationParams { max_length: MAX_TOKENS, ..Default::default() }))
            .map_err(|e| unavailable("tokenizer", e))?;

        // SAFETY: the safetensors file sits in the hub cache and is not modified while mapped
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path], DTYPE, &device)
                .map_err(|e| unavailable("model weights", e))?
        };
        let model = BertModel::load(vb, &config).map_err(|e| unavailable("bert model", e))?;
        info!(model = repo_id, "local embedding model ready");

        Ok(Self { model, tokenizer, device })
    }

    /// Mean-pooled, L2-normalized embeddings for a batch
    fn encode(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, KnowledgeError> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        let encodings = self.tokenizer.encode_batch(texts, true).map_err(|e| unavailable("tokenization", e))?;
        let max_len = encodings.iter().map(|e| e.get_ids().len()).max().unwrap_or(0).max(1);
        let batch = encodings.len();

        let mut ids = Vec::with_capacity(batch * max_len);
        let mut mask = Vec::with_capacity(batch * max_len);
        let mut type_ids = Vec::with_capacity(batch * max_len);
        for encoding in &encodings {
            let pad = max_len - encoding.get_ids().len();
            ids.extend(encoding.get_ids().iter().copied().chain(std::iter::repeat(0).take(pad)));
            mask.extend(encoding.get_attention_mask().iter().copied().chain(std::iter::repeat(0).take(pad)));
            type_ids.extend(encoding.get_type_ids().iter().copied().chain(std::iter::repeat(0).take(pad)));
        }

        let inference = |e: candle_core::Error| unavailable("inference", e);
        let input_ids = Tensor::from_vec(ids, (batch, max_len), &self.device).map_err(inference)?;
        let token_type_ids = Tensor::from_vec(type_ids, (batch, max_len), &self.device).map_err(inference)?;
        let attention_mask = Tensor::from_vec(mask, (batch, max_len), &self.device).map_err(inference)?;

        let output = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))
            .map_err(inference)?;

        // (batch, seq, hidden) averaged over unmasked tokens
        let weights = attention_mask.to_dtype(DType::F32).map_err(inference)?.unsqueeze(2).map_err(inference)?;
        let summed = output.broadcast_mul(&weights).map_err(inference)?.sum(1).map_err(inference)?;
        let counts = weights.sum(1).map_err(inference)?.clamp(1e-9, f64::MAX).map_err(inference)?;
        let pooled = summed.broadcast_div(&counts).map_err(inference)?;

        let norm = pooled
            .sqr()
            .and_then(|t| t.sum_keepdim(1))
            .and_then(|t| t.sqrt())
            .and_then(|t| t.clamp(1e-12, f64::MAX))
            .map_err(inference)?;
        let normalized = pooled.broadcast_div(&norm).map_err(inference)?;
        debug!(batch, max_len, "local embeddings computed");
        normalized.to_vec2::<f32>().map_err(inference)
    }
}

/// Sentence-transformer embedder; the model loads on first use
pub struct LocalEmbedder {
    repo_id: String,
    dimension: usize,
    model: OnceCell<Arc<SentenceModel>>,
}

impl LocalEmbedder {
    pub fn new(repo_id: impl Into<String>, dimension: usize) -> Self {
        Self { repo_id: repo_id.into(), dimension, model: OnceCell::new() }
    }

    pub fn is_loaded(&self) -> bool {
        self.model.initialized()
    }

    async fn model(&self) -> Result<Arc<SentenceModel>, KnowledgeError> {
        self.model
            .get_or_try_init(|| async {
                let repo_id = self.repo_id.clone();
                let dimension = self.dimension;
                tokio::task::spawn_blocking(move || SentenceModel::load(&repo_id, dimension).map(Arc::new))
                    .await
                    .map_err(|e| unavailable("model loader", e))?
            })
            .await
            .cloned()
    }
}

#[async_trait]
impl Embedder for LocalEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, KnowledgeError> {
        self.embed_batch(&[text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| KnowledgeError::Unavailable("model returned no embedding".into()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, KnowledgeError> {
        let model = self.model().await?;
        let texts = texts.to_vec();
        tokio::task::spawn_blocking(move || model.encode(texts))
            .await
            .map_err(|e| unavailable("embedding task", e))?
    }

    fn model_name(&self) -> &str {
        &self.repo_id
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{cosine_similarity, DEFAULT_LOCAL_MODEL};

    #[test]
    fn test_construction_is_lazy() {
        let embedder = LocalEmbedder::new(DEFAULT_LOCAL_MODEL, 384);
        assert!(!embedder.is_loaded());
        assert_eq!(embedder.model_name(), DEFAULT_LOCAL_MODEL);
        assert_eq!(embedder.dimension(), 384);
        assert_eq!(embedder.default_floor(), crate::embedder::SEMANTIC_DEFAULT_FLOOR);
    }

    #[tokio::test]
    #[ignore] // downloads the model
    async fn test_semantic_neighbours() {
        let embedder = LocalEmbedder::new(DEFAULT_LOCAL_MODEL, 384);
        let vectors = embedder
            .embed_batch(&[
                "I forgot my password and cannot log in".to_string(),
                "How to reset account credentials".to_string(),
                "Standard shipping takes five business days".to_string(),
            ])
            .await
            .unwrap();
        assert_eq!(vectors.len(), 3);
        let norm: f32 = vectors[0].iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 0.01);
        assert!(cosine_similarity(&vectors[0], &vectors[1]) > cosine_similarity(&vectors[0], &vectors[2]));
    }
}
