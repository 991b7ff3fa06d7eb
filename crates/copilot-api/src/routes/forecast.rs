//! Ticket volume forecasting endpoints

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use copilot_forecast::{CurrentStaffing, DailyForecast, HourlyForecast, ModelInfo};
use std::sync::Arc;
use tracing::debug;

use crate::error::{ApiPath, ApiResult};
use crate::models::ErrorResponse;
use crate::ApiState;

pub fn router() -> Router<Arc<ApiState>> {
    Router::new()
        .route("/hourly/:hours", get(hourly))
        .route("/daily/:days", get(daily))
        .route("/staffing/current", get(current_staffing))
        .route("/model/info", get(model_info))
}

/// Hour-by-hour ticket volume forecast
#[utoipa::path(
    get,
    path = "/api/forecast/hourly/{hours}",
    params(("hours" = u32, Path, description = "Horizon in hours (1-168)")),
    responses(
        (status = 200, body = HourlyForecast),
        (status = 400, description = "Horizon out of range", body = ErrorResponse),
        (status = 503, description = "Model not loaded", body = ErrorResponse)
    ),
    tag = "forecast"
)]
pub async fn hourly(
    State(state): State<Arc<ApiState>>,
    ApiPath(hours): ApiPath<u32>,
) -> ApiResult<Json<HourlyForecast>> {
    let now = Utc::now();
    let window = state.forecast_window(now).await?;
    debug!(hours, source = ?window.source, "hourly forecast");
    Ok(Json(state.forecast.hourly_forecast(&window.counts, hours, now)?))
}

/// Day-by-day forecast with staffing per day
#[utoipa::path(
    get,
    path = "/api/forecast/daily/{days}",
    params(("days" = u32, Path, description = "Horizon in days (1-30)")),
    responses(
        (status = 200, body = DailyForecast),
        (status = 400, description = "Horizon out of range", body = ErrorResponse),
        (status = 503, description = "Model not loaded", body = ErrorResponse)
    ),
    tag = "forecast"
)]
pub async fn daily(
    State(state): State<Arc<ApiState>>,
    ApiPath(days): ApiPath<u32>,
) -> ApiResult<Json<DailyForecast>> {
    let now = Utc::now();
    let window = state.forecast_window(now).await?;
    debug!(days, source = ?window.source, "daily forecast");
    Ok(Json(state.forecast.daily_forecast(&window.counts, days, now)?))
}

/// Staffing for the coming shift
#[utoipa::path(
    get,
    path = "/api/forecast/staffing/current",
    responses(
        (status = 200, body = CurrentStaffing),
        (status = 503, description = "Model not loaded", body = ErrorResponse)
    ),
    tag = "forecast"
)]
pub async fn current_staffing(State(state): State<Arc<ApiState>>) -> ApiResult<Json<CurrentStaffing>> {
    let now = Utc::now();
    let window = state.forecast_window(now).await?;
    Ok(Json(state.forecast.current_staffing(&window.counts, now)?))
}

#[utoipa::path(
    get,
    path = "/api/forecast/model/info",
    responses((status = 200, body = ModelInfo)),
    tag = "forecast"
)]
pub async fn model_info(State(state): State<Arc<ApiState>>) -> Json<ModelInfo> {
    Json(state.forecast.model_info())
}

#[cfg(test)]
mod tests {
    use crate::testing::{harness, harness_with};
    use axum::http::StatusCode;
    use serde_json::Value;

    #[tokio::test]
    async fn test_hourly_forecast() {
        let h = harness(0.9).await;
        let response = h.server.get("/api/forecast/hourly/24").await;
        assert_eq!(response.status_code(), StatusCode::OK);

        let body = response.json::<Value>();
        assert_eq!(body["predictions"].as_array().unwrap().len(), 24);
        assert_eq!(body["predictions"][0]["hour_offset"], 1);
        assert_eq!(body["summary"]["total_predicted_tickets"], 120);
        assert_eq!(body["summary"]["avg_per_hour"], 5.0);
        // 5 per hour over an 8 hour shift
        assert_eq!(body["summary"]["recommended_agents"], 3);
    }

    #[tokio::test]
    async fn test_daily_forecast_with_staffing() {
        let h = harness(0.9).await;
        let body = h.server.get("/api/forecast/daily/2").await.json::<Value>();
        let days = body["predictions"].as_array().unwrap();
        assert_eq!(days.len(), 2);
        assert_eq!(days[0]["predicted_tickets"], 120);
        assert_eq!(days[0]["staffing"]["recommended_agents"], 9);
        assert_eq!(days[0]["staffing"]["urgency"], "high");
        assert_eq!(body["summary"]["total_predicted_tickets"], 240);
    }

    #[tokio::test]
    async fn test_current_staffing() {
        let h = harness(0.9).await;
        let body = h.server.get("/api/forecast/staffing/current").await.json::<Value>();
        assert_eq!(body["next_hour_prediction"]["predicted_tickets"], 5);
        assert_eq!(body["shift_tickets"], 40);
        assert_eq!(body["staffing"]["recommended_agents"], 3);
    }

    #[tokio::test]
    async fn test_horizon_validation() {
        let h = harness(0.9).await;
        for path in ["/api/forecast/hourly/0", "/api/forecast/hourly/169", "/api/forecast/daily/31", "/api/forecast/hourly/soon"] {
            let response = h.server.get(path).await;
            assert_eq!(response.status_code(), StatusCode::BAD_REQUEST, "{path}");
        }
    }

    #[tokio::test]
    async fn test_missing_model_is_unavailable() {
        let h = harness_with(0.9, false).await;
        let response = h.server.get("/api/forecast/hourly/24").await;
        assert_eq!(response.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.json::<Value>()["code"], "FORECAST_UNAVAILABLE");

        let info = h.server.get("/api/forecast/model/info").await;
        assert_eq!(info.status_code(), StatusCode::OK);
        let info = info.json::<Value>();
        assert_eq!(info["status"], "not_loaded");
        assert!(info["message"].is_string());
    }

    #[tokio::test]
    async fn test_model_info_when_ready() {
        let h = harness(0.9).await;
        let info = h.server.get("/api/forecast/model/info").await.json::<Value>();
        assert_eq!(info["status"], "ready");
        assert_eq!(info["sequence_length"], 24);
        assert_eq!(info["layers"], serde_json::json!(["lstm(1)", "dense(1, linear)"]));
    }
}
