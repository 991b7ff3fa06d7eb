//! Support Copilot Knowledge Base
//!
//! An in-memory vector index over support articles. Articles are embedded
//! once at startup; queries are ranked by cosine similarity and cut off at a
//! relevance floor.

pub mod article;
pub mod embedder;
pub mod error;
pub mod index;
#[cfg(feature = "local-embedder")]
pub mod local;

pub use article::{load_articles, sample_articles, ArticleSeed, KnowledgeArticle};
pub use embedder::{Embedder, EmbedderKind, HashingEmbedder, HttpEmbedder};
pub use error::KnowledgeError;
pub use index::{cosine_similarity, KnowledgeIndex, KnowledgeStats};
#[cfg(feature = "local-embedder")]
pub use local::LocalEmbedder;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

/// Sentence-transformer served by the local embedder
pub const DEFAULT_LOCAL_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeSettings {
    pub embedder: EmbedderKind,
    /// HuggingFace model id for the local embedder
    pub local_model: String,
    /// Base URL of an OpenAI-compatible API serving `/embeddings`
    pub embedding_url: String,
    pub embedding_model: String,
    pub api_key: Option<String>,
    pub dimension: usize,
    /// Minimum relevance score; unset uses the embedder's default
    pub relevance_floor: Option<f32>,
    /// JSON article file; unset loads the bundled samples
    pub articles_path: Option<PathBuf>,
    /// Default result count of the search endpoint
    pub search_limit: usize,
    pub max_search_limit: usize,
}

impl Default for KnowledgeSettings {
    fn default() -> Self {
        Self {
            embedder: EmbedderKind::Local,
            local_model: DEFAULT_LOCAL_MODEL.to_string(),
            embedding_url: "https://api.openai.com/v1".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            api_key: None,
            dimension: embedder::DEFAULT_DIMENSION,
            relevance_floor: None,
            articles_path: None,
            search_limit: 3,
            max_search_limit: 10,
        }
    }
}

impl KnowledgeSettings {
    pub fn validate(&self) -> Result<(), String> {
        if self.embedder == EmbedderKind::Local && self.local_model.trim().is_empty() {
            return Err("knowledge.local_model must be set for the local embedder".into());
        }
        if self.dimension == 0 {
            return Err("knowledge.dimension must be positive".into());
        }
        if let Some(floor) = self.relevance_floor {
            if !(0.0..=1.0).contains(&floor) {
                return Err(format!("knowledge.relevance_floor must be within [0, 1], got {floor}"));
            }
        }
        if self.search_limit == 0 || self.search_limit > self.max_search_limit {
            return Err("knowledge.search_limit must be between 1 and max_search_limit".into());
        }
        Ok(())
    }

    pub fn embedder(&self) -> Result<Arc<dyn Embedder>, KnowledgeError> {
        match self.embedder {
            #[cfg(feature = "local-embedder")]
            EmbedderKind::Local => Ok(Arc::new(LocalEmbedder::new(self.local_model.clone(), self.dimension))),
            #[cfg(not(feature = "local-embedder"))]
            EmbedderKind::Local => Err(KnowledgeError::Config(
                "copilot-kb was built without the local-embedder feature; set knowledge.embedder to \"http\" or \"hashing\"".into(),
            )),
            EmbedderKind::Hashing => Ok(Arc::new(HashingEmbedder::new(self.dimension))),
            EmbedderKind::Http => {
                let key = self
                    .api_key
                    .clone()
                    .filter(|k| !k.trim().is_empty())
                    .ok_or_else(|| KnowledgeError::Config("knowledge.api_key is required for the http embedder".into()))?;
                Ok(Arc::new(HttpEmbedder::new(&self.embedding_url, key, &self.embedding_model, self.dimension)?))
            }
        }
    }
}

/// Load the configured articles and embed them
pub async fn build_index(settings: &KnowledgeSettings) -> Result<KnowledgeIndex, KnowledgeError> {
    let embedder = settings.embedder()?;
    let floor = settings.relevance_floor.unwrap_or_else(|| embedder.default_floor());
    let seeds = match settings.articles_path.as_deref() {
        Some(path) => load_articles(path)?,
        None => sample_articles()?,
    };
    KnowledgeIndex::build(seeds, embedder, floor).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_local_semantic_embedder() {
        let settings = KnowledgeSettings::default();
        assert_eq!(settings.embedder, EmbedderKind::Local);
        assert_eq!(settings.local_model, DEFAULT_LOCAL_MODEL);
        assert!(settings.relevance_floor.is_none());
    }

    #[cfg(feature = "local-embedder")]
    #[test]
    fn test_local_embedder_uses_semantic_floor() {
        let local = KnowledgeSettings::default().embedder().unwrap();
        assert_eq!(local.model_name(), DEFAULT_LOCAL_MODEL);
        assert_eq!(local.default_floor(), embedder::SEMANTIC_DEFAULT_FLOOR);
        assert_eq!(embedder::SEMANTIC_DEFAULT_FLOOR, 0.5);
    }

    #[tokio::test]
    async fn test_build_offline_index() {
        let settings = KnowledgeSettings { embedder: EmbedderKind::Hashing, ..Default::default() };
        let index = build_index(&settings).await.unwrap();
        assert_eq!(index.len(), 10);
        assert_eq!(index.relevance_floor(), embedder::HASHING_DEFAULT_FLOOR);
    }

    #[test]
    fn test_http_embedder_needs_key() {
        let settings = KnowledgeSettings { embedder: EmbedderKind::Http, ..Default::default() };
        assert!(matches!(settings.embedder(), Err(KnowledgeError::Config(_))));
    }

    #[test]
    fn test_validate() {
        assert!(KnowledgeSettings::default().validate().is_ok());
        assert!(KnowledgeSettings { relevance_floor: Some(1.5), ..Default::default() }.validate().is_err());
        assert!(KnowledgeSettings { search_limit: 20, ..Default::default() }.validate().is_err());
        assert!(KnowledgeSettings { local_model: " ".into(), ..Default::default() }.validate().is_err());
    }
}
