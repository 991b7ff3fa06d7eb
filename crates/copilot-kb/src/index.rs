//! In-memory vector index

use async_trait::async_trait;
use copilot_core::{Category, KnowledgeMatch, KnowledgeSearch, SearchError};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info};

use crate::article::{ArticleSeed, KnowledgeArticle};
use crate::embedder::Embedder;
use crate::error::KnowledgeError;

/// Cosine similarity; 0 for mismatched lengths or zero vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a > 1e-6 && norm_b > 1e-6 {
        dot / (norm_a * norm_b)
    } else {
        0.0
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct KnowledgeStats {
    pub total_articles: usize,
    pub categories: BTreeMap<String, usize>,
    pub embedding_model: String,
    pub dimension: usize,
    pub relevance_floor: f32,
}

pub struct KnowledgeIndex {
    articles: Vec<KnowledgeArticle>,
    embedder: Arc<dyn Embedder>,
    relevance_floor: f32,
}

impl KnowledgeIndex {
    pub fn empty(embedder: Arc<dyn Embedder>, relevance_floor: f32) -> Self {
        Self { articles: vec![], embedder, relevance_floor }
    }

    /// Embed every seed once; insertion order is kept for tie-breaking
    pub async fn build(
        seeds: Vec<ArticleSeed>,
        embedder: Arc<dyn Embedder>,
        relevance_floor: f32,
    ) -> Result<Self, KnowledgeError> {
        let mut seen = HashSet::new();
        if let Some(dup) = seeds.iter().find(|s| !seen.insert(s.article_id.as_str())) {
            return Err(KnowledgeError::DuplicateArticle(dup.article_id.clone()));
        }

        let texts: Vec<String> = seeds.iter().map(ArticleSeed::embedding_text).collect();
        let embeddings = embedder.embed_batch(&texts).await?;
        if embeddings.len() != seeds.len() {
            return Err(KnowledgeError::Unavailable(format!(
                "embedded {} of {} articles",
                embeddings.len(),
                seeds.len()
            )));
        }

        let articles: Vec<KnowledgeArticle> = seeds
            .into_iter()
            .zip(embeddings)
            .map(|(seed, embedding)| KnowledgeArticle {
                article_id: seed.article_id,
                title: seed.title,
                category: seed.category,
                content: seed.content,
                embedding,
            })
            .collect();
        info!(articles = articles.len(), model = embedder.model_name(), "knowledge index built");
        Ok(Self { articles, embedder, relevance_floor })
    }

    pub fn len(&self) -> usize {
        self.articles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }

    pub fn relevance_floor(&self) -> f32 {
        self.relevance_floor
    }

    pub fn get_article(&self, article_id: &str) -> Option<&KnowledgeArticle> {
        self.articles.iter().find(|a| a.article_id == article_id)
    }

    /// Up to `top_k` articles scoring at least the relevance floor, best first.
    /// Equal scores keep insertion order.
    pub async fn search(
        &self,
        query: &str,
        top_k: usize,
        category: Option<Category>,
    ) -> Result<Vec<KnowledgeMatch>, KnowledgeError> {
        if self.articles.is_empty() || top_k == 0 || query.trim().is_empty() {
            return Ok(vec![]);
        }
        let query_vector = self.embedder.embed(query).await?;

        let mut scored: Vec<(f32, &KnowledgeArticle)> = self
            .articles
            .iter()
            .filter(|a| category.map_or(true, |c| a.category == c))
            .map(|a| (cosine_similarity(&query_vector, &a.embedding).clamp(0.0, 1.0), a))
            .filter(|(score, _)| *score >= self.relevance_floor)
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored.truncate(top_k);
        debug!(results = scored.len(), top_k, "knowledge search");

        Ok(scored
            .into_iter()
            .map(|(score, a)| KnowledgeMatch {
                article_id: a.article_id.clone(),
                title: a.title.clone(),
                content: a.content.clone(),
                category: a.category,
                relevance_score: score,
            })
            .collect())
    }

    pub fn stats(&self) -> KnowledgeStats {
        let mut categories = BTreeMap::new();
        for article in &self.articles {
            *categories.entry(article.category.to_string()).or_insert(0) += 1;
        }
        KnowledgeStats {
            total_articles: self.articles.len(),
            categories,
            embedding_model: self.embedder.model_name().to_string(),
            dimension: self.embedder.dimension(),
            relevance_floor: self.relevance_floor,
        }
    }
}

#[async_trait]
impl KnowledgeSearch for KnowledgeIndex {
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<KnowledgeMatch>, SearchError> {
        KnowledgeIndex::search(self, query, top_k, None).await.map_err(SearchError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::article::sample_articles;
    use crate::embedder::HashingEmbedder;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Maps the first letter of a text onto a fixed 2-d vector
    struct LetterEmbedder {
        calls: AtomicUsize,
        fail_queries: bool,
    }

    impl LetterEmbedder {
        fn new(fail_queries: bool) -> Self {
            Self { calls: AtomicUsize::new(0), fail_queries }
        }

        fn vector(text: &str) -> Vec<f32> {
            match text.chars().next() {
                Some('a') => vec![1.0, 0.0],
                Some('b') => vec![0.8, 0.6],
                Some('c') => vec![0.0, 1.0],
                _ => vec![0.6, 0.8],
            }
        }
    }

    #[async_trait]
    impl Embedder for LetterEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, KnowledgeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_queries {
                return Err(KnowledgeError::Unavailable("connection refused".into()));
            }
            Ok(Self::vector(text))
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, KnowledgeError> {
            Ok(texts.iter().map(|t| Self::vector(t)).collect())
        }

        fn model_name(&self) -> &str {
            "letters"
        }

        fn dimension(&self) -> usize {
            2
        }
    }

    fn seed(id: &str, title: &str, category: Category) -> ArticleSeed {
        ArticleSeed { article_id: id.into(), title: title.into(), category, content: "body".into() }
    }

    async fn index(fail_queries: bool, floor: f32) -> KnowledgeIndex {
        KnowledgeIndex::build(
            vec![
                seed("kb-1", "alpha", Category::Shipping),
                seed("kb-2", "bravo", Category::Billing),
                seed("kb-3", "charlie", Category::Shipping),
                seed("kb-4", "apple", Category::Refund),
            ],
            Arc::new(LetterEmbedder::new(fail_queries)),
            floor,
        )
        .await
        .unwrap()
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[tokio::test]
    async fn test_ranking_floor_and_ties() {
        let idx = index(false, 0.5).await;
        let results = idx.search("a query", 3, None).await.unwrap();
        let ids: Vec<&str> = results.iter().map(|r| r.article_id.as_str()).collect();
        // kb-1 and kb-4 tie at 1.0 and keep insertion order; kb-3 (0.0) is below the floor
        assert_eq!(ids, vec!["kb-1", "kb-4", "kb-2"]);
        assert!(results.iter().all(|r| r.relevance_score >= 0.5));
    }

    #[tokio::test]
    async fn test_top_k_and_category_filter() {
        let idx = index(false, 0.0).await;
        assert_eq!(idx.search("a query", 1, None).await.unwrap().len(), 1);
        let shipping = idx.search("a query", 5, Some(Category::Shipping)).await.unwrap();
        assert!(shipping.iter().all(|r| r.category == Category::Shipping));
        assert_eq!(shipping.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_index_skips_embedder() {
        let embedder = Arc::new(LetterEmbedder::new(true));
        let idx = KnowledgeIndex::empty(embedder.clone(), 0.5);
        assert!(idx.search("anything", 3, None).await.unwrap().is_empty());
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_embedder_failure_is_unavailable() {
        let idx = index(true, 0.5).await;
        assert!(matches!(idx.search("a", 2, None).await, Err(KnowledgeError::Unavailable(_))));
        let via_port = KnowledgeSearch::search(&idx, "a", 2).await;
        assert!(matches!(via_port, Err(SearchError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_duplicate_ids_rejected() {
        let result = KnowledgeIndex::build(
            vec![seed("kb-1", "a", Category::Other), seed("kb-1", "b", Category::Other)],
            Arc::new(LetterEmbedder::new(false)),
            0.5,
        )
        .await;
        assert!(matches!(result, Err(KnowledgeError::DuplicateArticle(id)) if id == "kb-1"));
    }

    #[tokio::test]
    async fn test_stats_and_lookup() {
        let idx = index(false, 0.5).await;
        let stats = idx.stats();
        assert_eq!(stats.total_articles, 4);
        assert_eq!(stats.categories["SHIPPING"], 2);
        assert_eq!(idx.get_article("kb-2").unwrap().title, "bravo");
        assert!(idx.get_article("kb-9").is_none());
    }

    #[tokio::test]
    async fn test_sample_articles_with_hashing() {
        let idx = KnowledgeIndex::build(sample_articles().unwrap(), Arc::new(HashingEmbedder::new(384)), 0.05)
            .await
            .unwrap();
        let results = idx.search("How do I reset my password? Login keeps failing", 2, None).await.unwrap();
        assert_eq!(results[0].article_id, "kb_004_account_access");
    }

    proptest! {
        #[test]
        fn search_respects_top_k_and_floor(top_k in 0usize..6, floor in 0.0f32..1.0, query in "[a-d][a-z]{0,8}") {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let results = rt.block_on(async {
                let idx = index(false, floor).await;
                idx.search(&query, top_k, None).await.unwrap()
            });
            prop_assert!(results.len() <= top_k);
            prop_assert!(results.iter().all(|r| r.relevance_score >= floor));
            prop_assert!(results.windows(2).all(|w| w[0].relevance_score >= w[1].relevance_score));
        }
    }
}
