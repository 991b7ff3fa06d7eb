//! Support Copilot API
//!
//! REST surface over the ticket desk, knowledge base and forecaster.
//!
//! ```text
//!  HTTP ──► routes ──► TicketService ──► ProcessingQueue ──► TicketPipeline
//!                 │                                   classify │ retrieve │ draft
//!                 ├──► AgentService                            ▼
//!                 ├──► KnowledgeIndex  ◄───────────────── KnowledgeSearch
//!                 └──► ForecastService
//! ```

pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod webhooks;

use axum::{routing::get, Router};
use chrono::{DateTime, Duration, Utc};
use copilot_core::infrastructure::{InMemoryAgentRepository, InMemoryEventLog, InMemoryTicketRepository};
use copilot_core::{
    AgentService, AssignmentService, KnowledgeSearch, ProcessingQueue, ReplyDrafter, TicketClassifier,
    TicketPipeline, TicketProcessor, TicketRepository, TicketService, WriteLock,
};
use copilot_forecast::{input_window, ForecastService, InputWindow};
use copilot_kb::{KnowledgeError, KnowledgeIndex};
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use config::{ConfigError, CopilotConfig};
pub use error::{ApiError, ApiResult};
pub use models::*;

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Ai(#[from] copilot_ai::AiError),

    #[error(transparent)]
    Knowledge(#[from] KnowledgeError),
}

/// Adapters behind the AI ports
pub struct AiAdapters {
    pub classifier: Arc<dyn TicketClassifier>,
    pub drafter: Arc<dyn ReplyDrafter>,
    pub enabled: bool,
}

/// API state
pub struct ApiState {
    pub config: CopilotConfig,
    pub tickets: TicketService,
    pub agents: AgentService,
    pub ticket_store: Arc<dyn TicketRepository>,
    pub knowledge: Arc<KnowledgeIndex>,
    pub forecast: ForecastService,
    pub ai_enabled: bool,
}

impl ApiState {
    /// Wire services over in-memory storage and start the processing worker
    pub fn assemble(
        config: CopilotConfig,
        ai: AiAdapters,
        knowledge: Arc<KnowledgeIndex>,
        forecast: ForecastService,
    ) -> (Self, JoinHandle<()>) {
        let tickets = Arc::new(InMemoryTicketRepository::new());
        let agents = Arc::new(InMemoryAgentRepository::new());
        let events = Arc::new(InMemoryEventLog::new());
        let lock = WriteLock::new();

        let assignment = Arc::new(AssignmentService::new(tickets.clone(), agents.clone(), events.clone(), lock.clone()));
        let search: Arc<dyn KnowledgeSearch> = knowledge.clone();
        let pipeline = Arc::new(TicketPipeline::new(ai.classifier, search, ai.drafter, config.pipeline.clone()));

        let mut processor = TicketProcessor::new(tickets.clone(), events.clone(), pipeline, lock.clone());
        if config.pipeline.auto_assign {
            processor = processor.with_auto_assignment(assignment.clone());
        }
        let (queue, worker) = ProcessingQueue::start(Arc::new(processor), config.pipeline.max_attempts);

        let state = Self {
            tickets: TicketService::new(tickets.clone(), agents.clone(), events, assignment, queue, lock.clone()),
            agents: AgentService::new(agents, lock),
            ticket_store: tickets,
            knowledge,
            forecast,
            ai_enabled: ai.enabled,
            config,
        };
        (state, worker)
    }

    /// Hourly history feeding the forecaster, or the baseline profile when empty
    pub async fn forecast_window(&self, now: DateTime<Utc>) -> ApiResult<InputWindow> {
        let hours = self.forecast.window_hours();
        let since = now - Duration::hours(hours as i64 + 1);
        let created = self
            .ticket_store
            .created_since(since)
            .await
            .map_err(copilot_core::DeskError::from)?;
        Ok(input_window(&created, now, hours, &self.forecast.settings().baseline))
    }
}

/// Build the LLM adapters, knowledge index and forecaster from configuration
pub async fn bootstrap(config: CopilotConfig) -> Result<(Arc<ApiState>, JoinHandle<()>), BootstrapError> {
    let client = copilot_ai::client_from_settings(&config.llm)?;
    let ai = AiAdapters {
        enabled: client.is_some(),
        classifier: Arc::new(copilot_ai::LlmClassifier::new(client.clone())),
        drafter: Arc::new(copilot_ai::LlmReplyDrafter::new(client)),
    };

    let knowledge = match copilot_kb::build_index(&config.knowledge).await {
        Ok(index) => index,
        Err(KnowledgeError::Unavailable(reason)) => {
            error!(%reason, "embedding service unavailable, starting with an empty knowledge base");
            let embedder = config.knowledge.embedder()?;
            let floor = config.knowledge.relevance_floor.unwrap_or_else(|| embedder.default_floor());
            KnowledgeIndex::empty(embedder, floor)
        }
        Err(e) => return Err(e.into()),
    };
    info!(articles = knowledge.len(), "knowledge base ready");

    let forecast = ForecastService::load(config.forecast.clone());
    let (state, worker) = ApiState::assemble(config, ai, Arc::new(knowledge), forecast);
    Ok((Arc::new(state), worker))
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Support Copilot API",
        description = "Customer-support ticketing with AI triage, knowledge-base retrieval and volume forecasting",
        license(name = "Apache-2.0")
    ),
    paths(
        routes::health::service_info,
        routes::health::health_check,
        routes::tickets::create_ticket,
        routes::tickets::list_tickets,
        routes::tickets::get_ticket,
        routes::tickets::update_status,
        routes::tickets::assign_ticket,
        routes::tickets::process_ticket,
        routes::tickets::zendesk_webhook,
        routes::tickets::intercom_webhook,
        routes::agents::create_agent,
        routes::agents::list_agents,
        routes::agents::agent_stats,
        routes::agents::available_agents,
        routes::agents::get_agent,
        routes::agents::update_agent,
        routes::agents::delete_agent,
        routes::agents::update_agent_status,
        routes::knowledge::search,
        routes::knowledge::stats,
        routes::knowledge::get_article,
        routes::forecast::hourly,
        routes::forecast::daily,
        routes::forecast::current_staffing,
        routes::forecast::model_info,
    ),
    components(
        schemas(
            ErrorResponse, ServiceInfo, HealthResponse,
            TicketCreateRequest, TicketCreateResponse, TicketResponse, StatusUpdateRequest,
            AssignRequest, AssignmentResponse, ProcessResponse,
            webhooks::ZendeskPayload, webhooks::ZendeskTicket, webhooks::WebhookUser,
            webhooks::IntercomPayload, webhooks::IntercomData, webhooks::IntercomItem, webhooks::IntercomMessage,
            AgentCreateRequest, AgentUpdateRequest, AgentResponse, AgentStatsResponse,
            AvailableAgentsResponse, AgentRemovalResponse,
            KbSearchResult, KbSearchResponse, KbArticleResponse, KbStatsResponse,
            copilot_forecast::HourlyForecast, copilot_forecast::HourlyPrediction, copilot_forecast::HourlySummary,
            copilot_forecast::DailyForecast, copilot_forecast::DailyPrediction, copilot_forecast::DailySummary,
            copilot_forecast::CurrentStaffing, copilot_forecast::ModelInfo, copilot_forecast::ModelStatus,
            copilot_forecast::StaffingRecommendation, copilot_forecast::Urgency,
        )
    ),
    tags(
        (name = "health", description = "Service info and liveness"),
        (name = "tickets", description = "Ticket intake, lifecycle and assignment"),
        (name = "agents", description = "Agent roster"),
        (name = "knowledge", description = "Knowledge base search"),
        (name = "forecast", description = "Ticket volume forecasting")
    )
)]
pub struct ApiDoc;

/// Build the API router
pub fn build_router(state: Arc<ApiState>) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/", get(routes::health::service_info))
        .route("/health", get(routes::health::health_check))
        .nest("/api", api_routes())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

fn api_routes() -> Router<Arc<ApiState>> {
    Router::new()
        .nest("/tickets", routes::tickets::router())
        .nest("/agents", routes::agents::router())
        .nest("/kb", routes::knowledge::router())
        .nest("/forecast", routes::forecast::router())
}
