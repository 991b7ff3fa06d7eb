//! Agent roster endpoints

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use copilot_core::{AgentFilter, AgentRemoval, AgentStatus, AgentUpdate, DeskError};
use std::sync::Arc;

use crate::error::{ApiJson, ApiPath, ApiQuery, ApiResult};
use crate::models::*;
use crate::ApiState;

pub fn router() -> Router<Arc<ApiState>> {
    Router::new()
        .route("/", get(list_agents).post(create_agent))
        .route("/stats", get(agent_stats))
        .route("/available", get(available_agents))
        .route("/:id", get(get_agent).put(update_agent).delete(delete_agent))
        .route("/:id/status", post(update_agent_status))
}

/// Register an agent
#[utoipa::path(
    post,
    path = "/api/agents",
    request_body = AgentCreateRequest,
    responses(
        (status = 201, body = AgentResponse),
        (status = 400, body = ErrorResponse),
        (status = 409, description = "Agent id taken", body = ErrorResponse)
    ),
    tag = "agents"
)]
pub async fn create_agent(
    State(state): State<Arc<ApiState>>,
    ApiJson(request): ApiJson<AgentCreateRequest>,
) -> ApiResult<(StatusCode, Json<AgentResponse>)> {
    let agent = state.agents.register(request.into()).await?;
    Ok((StatusCode::CREATED, Json(AgentResponse::from(&agent))))
}

/// List agents
#[utoipa::path(
    get,
    path = "/api/agents",
    params(AgentListQuery),
    responses((status = 200, body = [AgentResponse])),
    tag = "agents"
)]
pub async fn list_agents(
    State(state): State<Arc<ApiState>>,
    ApiQuery(query): ApiQuery<AgentListQuery>,
) -> ApiResult<Json<Vec<AgentResponse>>> {
    let filter = AgentFilter {
        team: query.team,
        status: query.status.as_deref().map(str::parse::<AgentStatus>).transpose().map_err(DeskError::from)?,
        active_only: query.active_only.unwrap_or(true),
    };
    let agents = state.agents.list(&filter).await?;
    Ok(Json(agents.iter().map(AgentResponse::from).collect()))
}

/// Workload per agent, available agents first
#[utoipa::path(
    get,
    path = "/api/agents/stats",
    params(TeamQuery),
    responses((status = 200, body = [AgentStatsResponse])),
    tag = "agents"
)]
pub async fn agent_stats(
    State(state): State<Arc<ApiState>>,
    ApiQuery(query): ApiQuery<TeamQuery>,
) -> ApiResult<Json<Vec<AgentStatsResponse>>> {
    let stats = state.agents.stats(query.team).await?;
    Ok(Json(stats.into_iter().map(AgentStatsResponse::from).collect()))
}

/// Agents with a skill and spare capacity, least loaded first
#[utoipa::path(
    get,
    path = "/api/agents/available",
    params(SkillQuery),
    responses(
        (status = 200, body = AvailableAgentsResponse),
        (status = 400, body = ErrorResponse)
    ),
    tag = "agents"
)]
pub async fn available_agents(
    State(state): State<Arc<ApiState>>,
    ApiQuery(query): ApiQuery<SkillQuery>,
) -> ApiResult<Json<AvailableAgentsResponse>> {
    let agents = state.agents.available_with_skill(&query.skill).await?;
    Ok(Json(AvailableAgentsResponse {
        skill: query.skill,
        available_count: agents.len(),
        agents: agents.iter().map(AgentResponse::from).collect(),
    }))
}

/// Get an agent
#[utoipa::path(
    get,
    path = "/api/agents/{id}",
    params(("id" = String, Path, description = "Agent id")),
    responses(
        (status = 200, body = AgentResponse),
        (status = 404, body = ErrorResponse)
    ),
    tag = "agents"
)]
pub async fn get_agent(
    State(state): State<Arc<ApiState>>,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<AgentResponse>> {
    let agent = state.agents.get(&id).await?;
    Ok(Json(AgentResponse::from(&agent)))
}

/// Update an agent; absent fields are left unchanged
#[utoipa::path(
    put,
    path = "/api/agents/{id}",
    params(("id" = String, Path, description = "Agent id")),
    request_body = AgentUpdateRequest,
    responses(
        (status = 200, body = AgentResponse),
        (status = 400, body = ErrorResponse),
        (status = 404, body = ErrorResponse)
    ),
    tag = "agents"
)]
pub async fn update_agent(
    State(state): State<Arc<ApiState>>,
    ApiPath(id): ApiPath<String>,
    ApiJson(request): ApiJson<AgentUpdateRequest>,
) -> ApiResult<Json<AgentResponse>> {
    let update = AgentUpdate::try_from(request).map_err(DeskError::from)?;
    let agent = state.agents.update(&id, update).await?;
    Ok(Json(AgentResponse::from(&agent)))
}

/// Deactivate an agent, or delete it with `permanent=true`
#[utoipa::path(
    delete,
    path = "/api/agents/{id}",
    params(("id" = String, Path, description = "Agent id"), DeleteQuery),
    responses(
        (status = 200, body = AgentRemovalResponse),
        (status = 404, body = ErrorResponse)
    ),
    tag = "agents"
)]
pub async fn delete_agent(
    State(state): State<Arc<ApiState>>,
    ApiPath(id): ApiPath<String>,
    ApiQuery(query): ApiQuery<DeleteQuery>,
) -> ApiResult<Json<AgentRemovalResponse>> {
    let response = match state.agents.remove(&id, query.permanent).await? {
        AgentRemoval::Deleted => AgentRemovalResponse {
            message: format!("agent {id} deleted"),
            agent_id: id,
            deleted: true,
            agent: None,
        },
        AgentRemoval::Deactivated(agent) => AgentRemovalResponse {
            message: format!("agent {id} deactivated"),
            agent_id: id,
            deleted: false,
            agent: Some(AgentResponse::from(&agent)),
        },
    };
    Ok(Json(response))
}

/// Change availability; `offline` also deactivates
#[utoipa::path(
    post,
    path = "/api/agents/{id}/status",
    params(("id" = String, Path, description = "Agent id"), AgentStatusQuery),
    responses(
        (status = 200, body = AgentResponse),
        (status = 400, body = ErrorResponse),
        (status = 404, body = ErrorResponse)
    ),
    tag = "agents"
)]
pub async fn update_agent_status(
    State(state): State<Arc<ApiState>>,
    ApiPath(id): ApiPath<String>,
    ApiQuery(query): ApiQuery<AgentStatusQuery>,
) -> ApiResult<Json<AgentResponse>> {
    let status = query.status.parse::<AgentStatus>().map_err(DeskError::from)?;
    let agent = state.agents.set_status(&id, status).await?;
    Ok(Json(AgentResponse::from(&agent)))
}
