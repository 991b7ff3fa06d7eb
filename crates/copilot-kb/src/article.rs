//! Knowledge articles and their sources

use copilot_core::Category;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::KnowledgeError;

const SAMPLE_ARTICLES: &str = include_str!("../data/articles.json");

/// An article before embedding
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArticleSeed {
    pub article_id: String,
    pub title: String,
    pub category: Category,
    pub content: String,
}

impl ArticleSeed {
    /// Text that gets embedded
    pub fn embedding_text(&self) -> String {
        format!("{}\n\n{}", self.title, self.content)
    }
}

/// An indexed article; immutable once built
#[derive(Clone, Debug, Serialize)]
pub struct KnowledgeArticle {
    pub article_id: String,
    pub title: String,
    pub category: Category,
    pub content: String,
    #[serde(skip)]
    pub embedding: Vec<f32>,
}

fn parse(raw: &str) -> Result<Vec<ArticleSeed>, KnowledgeError> {
    let seeds: Vec<ArticleSeed> = serde_json::from_str(raw)?;
    if let Some(blank) = seeds.iter().find(|s| s.article_id.trim().is_empty() || s.content.trim().is_empty()) {
        return Err(KnowledgeError::InvalidArticles(format!("article '{}' has an empty id or body", blank.title)));
    }
    Ok(seeds)
}

/// Articles bundled with the crate
pub fn sample_articles() -> Result<Vec<ArticleSeed>, KnowledgeError> {
    parse(SAMPLE_ARTICLES)
}

/// Articles from a JSON array on disk
pub fn load_articles(path: &Path) -> Result<Vec<ArticleSeed>, KnowledgeError> {
    parse(&std::fs::read_to_string(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_samples_parse() {
        let seeds = sample_articles().unwrap();
        assert_eq!(seeds.len(), 10);
        assert!(seeds.iter().any(|s| s.category == Category::Shipping));
        assert!(seeds.iter().any(|s| s.category == Category::AccountAccess));
    }

    #[test]
    fn test_lenient_categories_and_blank_rejection() {
        let seeds = parse(r#"[{"article_id":"a","title":"T","category":"general","content":"body"}]"#).unwrap();
        assert_eq!(seeds[0].category, Category::Other);

        let err = parse(r#"[{"article_id":" ","title":"T","category":"billing","content":"body"}]"#).unwrap_err();
        assert!(matches!(err, KnowledgeError::InvalidArticles(_)));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(load_articles(Path::new("/nonexistent/articles.json")), Err(KnowledgeError::Io(_))));
    }
}
