//! Knowledge base endpoints

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use copilot_core::{Category, DeskError};
use std::sync::Arc;

use crate::error::{ApiError, ApiPath, ApiQuery, ApiResult};
use crate::models::*;
use crate::ApiState;

pub fn router() -> Router<Arc<ApiState>> {
    Router::new()
        .route("/search", get(search))
        .route("/stats", get(stats))
        .route("/articles/:id", get(get_article))
}

/// Semantic search over the knowledge base
#[utoipa::path(
    get,
    path = "/api/kb/search",
    params(KbSearchQuery),
    responses(
        (status = 200, body = KbSearchResponse),
        (status = 400, description = "Blank query, bad limit or unknown category", body = ErrorResponse),
        (status = 503, description = "Embedding service unavailable", body = ErrorResponse)
    ),
    tag = "knowledge"
)]
pub async fn search(
    State(state): State<Arc<ApiState>>,
    ApiQuery(query): ApiQuery<KbSearchQuery>,
) -> ApiResult<Json<KbSearchResponse>> {
    let text = query.q.trim();
    if text.is_empty() {
        return Err(ApiError::BadRequest("q must not be blank".into()));
    }
    let settings = &state.config.knowledge;
    let limit = query.limit.unwrap_or(settings.search_limit);
    if limit == 0 || limit > settings.max_search_limit {
        return Err(ApiError::BadRequest(format!(
            "limit must be between 1 and {}",
            settings.max_search_limit
        )));
    }
    let category = query
        .category
        .as_deref()
        .map(str::parse::<Category>)
        .transpose()
        .map_err(DeskError::from)?;

    let results: Vec<KbSearchResult> = state
        .knowledge
        .search(text, limit, category)
        .await?
        .into_iter()
        .map(KbSearchResult::from)
        .collect();
    Ok(Json(KbSearchResponse { query: text.to_string(), count: results.len(), results }))
}

/// Knowledge base size and embedding configuration
#[utoipa::path(
    get,
    path = "/api/kb/stats",
    responses((status = 200, body = KbStatsResponse)),
    tag = "knowledge"
)]
pub async fn stats(State(state): State<Arc<ApiState>>) -> Json<KbStatsResponse> {
    Json(state.knowledge.stats().into())
}

#[utoipa::path(
    get,
    path = "/api/kb/articles/{id}",
    params(("id" = String, Path, description = "Article id")),
    responses(
        (status = 200, body = KbArticleResponse),
        (status = 404, body = ErrorResponse)
    ),
    tag = "knowledge"
)]
pub async fn get_article(
    State(state): State<Arc<ApiState>>,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<KbArticleResponse>> {
    match state.knowledge.get_article(&id) {
        Some(article) => Ok(Json(article.into())),
        None => Err(DeskError::NotFound { entity: "article", id }.into()),
    }
}
