//! Ticket endpoints

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use copilot_core::ports::DEFAULT_LIST_LIMIT;
use copilot_core::{AssignTarget, Category, DeskError, NewTicket, Priority, TicketFilter, TicketId, TicketStatus};
use std::sync::Arc;

use crate::error::{ApiError, ApiJson, ApiPath, ApiQuery, ApiResult};
use crate::models::*;
use crate::webhooks::{IntercomPayload, ZendeskPayload};
use crate::ApiState;

pub fn router() -> Router<Arc<ApiState>> {
    Router::new()
        .route("/", get(list_tickets).post(create_ticket))
        .route("/create", post(create_ticket))
        .route("/webhook/zendesk", post(zendesk_webhook))
        .route("/webhook/intercom", post(intercom_webhook))
        .route("/:id", get(get_ticket))
        .route("/:id/status", put(update_status))
        .route("/:id/assign", put(assign_ticket))
        .route("/:id/process", post(process_ticket))
}

async fn create(state: &ApiState, request: NewTicket) -> ApiResult<(StatusCode, Json<TicketCreateResponse>)> {
    let created = state.tickets.create_ticket(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(TicketCreateResponse {
            ticket: TicketResponse::from(&created.ticket),
            suggested_actions: created.suggested_actions,
            ai_processing: if created.queued { "queued" } else { "unavailable" }.to_string(),
        }),
    ))
}

fn parse_filter(query: TicketListQuery) -> ApiResult<TicketFilter> {
    let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    if limit == 0 {
        return Err(ApiError::BadRequest("limit must be positive".into()));
    }
    Ok(TicketFilter {
        status: query.status.as_deref().map(str::parse::<TicketStatus>).transpose().map_err(DeskError::from)?,
        priority: query.priority.as_deref().map(str::parse::<Priority>).transpose().map_err(DeskError::from)?,
        category: query.category.as_deref().map(str::parse::<Category>).transpose().map_err(DeskError::from)?,
        assigned_to: query.assigned_to.filter(|a| !a.trim().is_empty()),
        limit,
    })
}

/// Create a ticket and queue it for AI processing
#[utoipa::path(
    post,
    path = "/api/tickets",
    request_body = TicketCreateRequest,
    responses(
        (status = 201, description = "Ticket created", body = TicketCreateResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse)
    ),
    tag = "tickets"
)]
pub async fn create_ticket(
    State(state): State<Arc<ApiState>>,
    ApiJson(request): ApiJson<TicketCreateRequest>,
) -> ApiResult<(StatusCode, Json<TicketCreateResponse>)> {
    create(&state, request.into()).await
}

/// List tickets, newest first
#[utoipa::path(
    get,
    path = "/api/tickets",
    params(TicketListQuery),
    responses(
        (status = 200, description = "Matching tickets", body = [TicketResponse]),
        (status = 400, description = "Unknown filter value", body = ErrorResponse)
    ),
    tag = "tickets"
)]
pub async fn list_tickets(
    State(state): State<Arc<ApiState>>,
    ApiQuery(query): ApiQuery<TicketListQuery>,
) -> ApiResult<Json<Vec<TicketResponse>>> {
    let filter = parse_filter(query)?;
    let tickets = state.tickets.list_tickets(&filter).await?;
    Ok(Json(tickets.iter().map(TicketResponse::from).collect()))
}

/// Get a ticket
#[utoipa::path(
    get,
    path = "/api/tickets/{id}",
    params(("id" = String, Path, description = "Ticket id")),
    responses(
        (status = 200, body = TicketResponse),
        (status = 404, body = ErrorResponse)
    ),
    tag = "tickets"
)]
pub async fn get_ticket(
    State(state): State<Arc<ApiState>>,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<TicketResponse>> {
    let ticket = state.tickets.get_ticket(&TicketId::from_string(id)).await?;
    Ok(Json(TicketResponse::from(&ticket)))
}

/// Move a ticket forward through its lifecycle
#[utoipa::path(
    put,
    path = "/api/tickets/{id}/status",
    params(("id" = String, Path, description = "Ticket id")),
    request_body = StatusUpdateRequest,
    responses(
        (status = 200, body = TicketResponse),
        (status = 400, description = "Unknown status", body = ErrorResponse),
        (status = 404, body = ErrorResponse),
        (status = 409, description = "Backward transition", body = ErrorResponse)
    ),
    tag = "tickets"
)]
pub async fn update_status(
    State(state): State<Arc<ApiState>>,
    ApiPath(id): ApiPath<String>,
    ApiJson(body): ApiJson<StatusUpdateRequest>,
) -> ApiResult<Json<TicketResponse>> {
    let ticket = state.tickets.update_status(&TicketId::from_string(id), &body.status).await?;
    Ok(Json(TicketResponse::from(&ticket)))
}

/// Assign to a named agent or to the best available one
#[utoipa::path(
    put,
    path = "/api/tickets/{id}/assign",
    params(("id" = String, Path, description = "Ticket id")),
    request_body = AssignRequest,
    responses(
        (status = 200, body = AssignmentResponse),
        (status = 400, body = ErrorResponse),
        (status = 404, body = ErrorResponse),
        (status = 409, description = "Agent at capacity or ticket closed", body = ErrorResponse)
    ),
    tag = "tickets"
)]
pub async fn assign_ticket(
    State(state): State<Arc<ApiState>>,
    ApiPath(id): ApiPath<String>,
    ApiJson(body): ApiJson<AssignRequest>,
) -> ApiResult<Json<AssignmentResponse>> {
    let target = AssignTarget::from_request(body.agent_id, body.auto_assign, body.force)?;
    let outcome = state.tickets.assign(&TicketId::from_string(id), target).await?;
    Ok(Json(AssignmentResponse::from(outcome)))
}

/// Run the AI pipeline again
#[utoipa::path(
    post,
    path = "/api/tickets/{id}/process",
    params(("id" = String, Path, description = "Ticket id")),
    responses(
        (status = 202, body = ProcessResponse),
        (status = 404, body = ErrorResponse),
        (status = 503, description = "Processing queue closed", body = ErrorResponse)
    ),
    tag = "tickets"
)]
pub async fn process_ticket(
    State(state): State<Arc<ApiState>>,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<(StatusCode, Json<ProcessResponse>)> {
    let ticket_id = TicketId::from_string(id);
    state.tickets.reprocess(&ticket_id).await?;
    Ok((StatusCode::ACCEPTED, Json(ProcessResponse { ticket_id: ticket_id.to_string(), status: "queued".into() })))
}

/// Zendesk ticket webhook
#[utoipa::path(
    post,
    path = "/api/tickets/webhook/zendesk",
    request_body = ZendeskPayload,
    responses(
        (status = 201, body = TicketCreateResponse),
        (status = 400, body = ErrorResponse)
    ),
    tag = "tickets"
)]
pub async fn zendesk_webhook(
    State(state): State<Arc<ApiState>>,
    ApiJson(payload): ApiJson<ZendeskPayload>,
) -> ApiResult<(StatusCode, Json<TicketCreateResponse>)> {
    create(&state, payload.into()).await
}

/// Intercom conversation webhook
#[utoipa::path(
    post,
    path = "/api/tickets/webhook/intercom",
    request_body = IntercomPayload,
    responses(
        (status = 201, body = TicketCreateResponse),
        (status = 400, body = ErrorResponse)
    ),
    tag = "tickets"
)]
pub async fn intercom_webhook(
    State(state): State<Arc<ApiState>>,
    ApiJson(payload): ApiJson<IntercomPayload>,
) -> ApiResult<(StatusCode, Json<TicketCreateResponse>)> {
    create(&state, payload.into()).await
}
