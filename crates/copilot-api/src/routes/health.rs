//! Service info and liveness

use axum::extract::State;
use axum::Json;
use std::sync::Arc;

use crate::models::{HealthResponse, ServiceInfo};
use crate::ApiState;

/// Service info
#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "Service description", body = ServiceInfo)),
    tag = "health"
)]
pub async fn service_info(State(state): State<Arc<ApiState>>) -> Json<ServiceInfo> {
    Json(ServiceInfo {
        service: "support-copilot".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        docs: "/docs".into(),
        ai_enabled: state.ai_enabled,
        knowledge_articles: state.knowledge.len(),
        forecast_ready: state.forecast.is_ready(),
    })
}

/// Health check
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is healthy", body = HealthResponse)),
    tag = "health"
)]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        timestamp: chrono::Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use crate::testing::harness;
    use axum::http::StatusCode;
    use serde_json::Value;

    #[tokio::test]
    async fn test_health_and_info() {
        let h = harness(0.9).await;
        let health = h.server.get("/health").await;
        assert_eq!(health.status_code(), StatusCode::OK);
        assert_eq!(health.json::<Value>()["status"], "healthy");

        let info = h.server.get("/").await.json::<Value>();
        assert_eq!(info["knowledge_articles"], 10);
        assert_eq!(info["forecast_ready"], true);
    }

    #[tokio::test]
    async fn test_openapi_document() {
        let h = harness(0.9).await;
        let doc = h.server.get("/api-docs/openapi.json").await.json::<Value>();
        assert!(doc["paths"]["/api/tickets"].is_object());
        assert!(doc["paths"]["/api/forecast/hourly/{hours}"].is_object());
    }
}
