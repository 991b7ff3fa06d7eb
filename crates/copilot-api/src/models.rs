//! API models

use chrono::{DateTime, Utc};
use copilot_core::{
    Agent, AgentStats, AgentUpdate, AssignmentOutcome, KnowledgeMatch, NewAgent, NewTicket, Ticket,
};
use copilot_kb::{KnowledgeArticle, KnowledgeStats};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::{IntoParams, ToSchema};

/// Error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

// ============ Service ============

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    pub service: String,
    pub version: String,
    pub docs: String,
    pub ai_enabled: bool,
    pub knowledge_articles: usize,
    pub forecast_ready: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
}

// ============ Tickets ============

/// Ticket intake request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TicketCreateRequest {
    pub customer_email: String,
    pub customer_name: Option<String>,
    pub subject: String,
    pub description: String,
    pub order_id: Option<String>,
    /// `web` (default), `email`, `chat`, `zendesk` or `intercom`
    pub source: Option<String>,
}

impl From<TicketCreateRequest> for NewTicket {
    fn from(r: TicketCreateRequest) -> Self {
        NewTicket {
            customer_email: r.customer_email,
            customer_name: r.customer_name,
            subject: r.subject,
            description: r.description,
            order_id: r.order_id,
            source: r.source,
        }
    }
}

/// Ticket with its AI annotation flattened; AI fields stay null until processed
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TicketResponse {
    pub ticket_id: String,
    pub customer_id: String,
    pub customer_email: String,
    pub customer_name: Option<String>,
    pub subject: String,
    pub description: String,
    pub status: String,
    pub priority: String,
    pub category: Option<String>,
    pub order_id: Option<String>,
    pub source: String,
    pub assigned_to: Option<String>,
    pub team: Option<String>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub ai_suggested_category: Option<String>,
    pub ai_suggested_priority: Option<String>,
    pub ai_suggested_reply: Option<String>,
    pub ai_confidence: Option<f32>,
    pub ai_reasoning: Option<String>,
    pub sentiment: Option<String>,
    pub urgency_keywords: Vec<String>,
    pub extracted_metadata: BTreeMap<String, String>,
    pub kb_article_ids: Vec<String>,
    pub annotated_at: Option<DateTime<Utc>>,
}

impl From<&Ticket> for TicketResponse {
    fn from(t: &Ticket) -> Self {
        let ai = t.ai();
        Self {
            ticket_id: t.id().to_string(),
            customer_id: t.customer_id().to_string(),
            customer_email: t.customer_email().to_string(),
            customer_name: t.customer_name().map(str::to_string),
            subject: t.subject().to_string(),
            description: t.description().to_string(),
            status: t.status().to_string(),
            priority: t.priority().to_string(),
            category: t.category().map(|c| c.to_string()),
            order_id: t.order_id().map(str::to_string),
            source: t.source().to_string(),
            assigned_to: t.assigned_to().map(str::to_string),
            team: t.team().map(str::to_string),
            tags: t.tags().to_vec(),
            created_at: t.created_at(),
            updated_at: t.updated_at(),
            resolved_at: t.resolved_at(),
            ai_suggested_category: ai.map(|a| a.suggested_category.to_string()),
            ai_suggested_priority: ai.map(|a| a.suggested_priority.to_string()),
            ai_suggested_reply: ai.and_then(|a| a.suggested_reply.clone()),
            ai_confidence: ai.map(|a| a.confidence),
            ai_reasoning: ai.map(|a| a.reasoning.clone()),
            sentiment: ai.map(|a| a.sentiment.to_string()),
            urgency_keywords: ai.map(|a| a.urgency_keywords.clone()).unwrap_or_default(),
            extracted_metadata: ai.map(|a| a.extracted_metadata.clone()).unwrap_or_default(),
            kb_article_ids: ai.map(|a| a.kb_article_ids.clone()).unwrap_or_default(),
            annotated_at: ai.map(|a| a.annotated_at),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TicketCreateResponse {
    pub ticket: TicketResponse,
    pub suggested_actions: Vec<String>,
    /// `queued`, or `unavailable` when the processing queue is down
    pub ai_processing: String,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TicketListQuery {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub category: Option<String>,
    pub assigned_to: Option<String>,
    /// Defaults to 50
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatusUpdateRequest {
    pub status: String,
}

/// Either `agent_id` or `auto_assign: true`
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct AssignRequest {
    pub agent_id: Option<String>,
    #[serde(default)]
    pub auto_assign: bool,
    /// Bypass the agent's daily capacity
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AssignmentResponse {
    pub ticket: TicketResponse,
    pub assigned: bool,
    pub agent: Option<AgentResponse>,
    pub message: String,
}

impl From<AssignmentOutcome> for AssignmentResponse {
    fn from(outcome: AssignmentOutcome) -> Self {
        match outcome {
            AssignmentOutcome::Assigned { ticket, agent } => Self {
                message: format!("ticket assigned to {}", agent.name),
                ticket: TicketResponse::from(&ticket),
                assigned: true,
                agent: Some(AgentResponse::from(&agent)),
            },
            AssignmentOutcome::Unassigned { ticket, reason } => Self {
                ticket: TicketResponse::from(&ticket),
                assigned: false,
                agent: None,
                message: reason,
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProcessResponse {
    pub ticket_id: String,
    pub status: String,
}

// ============ Agents ============

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AgentCreateRequest {
    pub agent_id: String,
    pub name: String,
    pub email: String,
    pub team: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    /// 1..=50, defaults to 15
    pub max_tickets_per_day: Option<u32>,
}

impl From<AgentCreateRequest> for NewAgent {
    fn from(r: AgentCreateRequest) -> Self {
        NewAgent {
            agent_id: r.agent_id,
            name: r.name,
            email: r.email,
            team: r.team,
            skills: r.skills,
            max_tickets_per_day: r.max_tickets_per_day,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct AgentUpdateRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub team: Option<String>,
    pub skills: Option<Vec<String>>,
    pub max_tickets_per_day: Option<u32>,
    pub status: Option<String>,
    pub active: Option<bool>,
}

impl TryFrom<AgentUpdateRequest> for AgentUpdate {
    type Error = copilot_core::ParseLabelError;

    fn try_from(r: AgentUpdateRequest) -> Result<Self, Self::Error> {
        Ok(AgentUpdate {
            name: r.name,
            email: r.email,
            team: r.team,
            skills: r.skills,
            max_tickets_per_day: r.max_tickets_per_day,
            status: r.status.as_deref().map(str::parse).transpose()?,
            active: r.active,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AgentResponse {
    pub agent_id: String,
    pub name: String,
    pub email: String,
    pub team: Option<String>,
    pub skills: Vec<String>,
    pub max_tickets_per_day: u32,
    pub current_load: u32,
    pub available_capacity: u32,
    pub status: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
    pub total_tickets_resolved: u64,
}

impl From<&Agent> for AgentResponse {
    fn from(a: &Agent) -> Self {
        Self {
            agent_id: a.agent_id.clone(),
            name: a.name.clone(),
            email: a.email.to_string(),
            team: a.team.clone(),
            skills: a.skills.clone(),
            max_tickets_per_day: a.max_tickets_per_day,
            current_load: a.current_load,
            available_capacity: a.available_capacity(),
            status: a.status.to_string(),
            active: a.active,
            created_at: a.created_at,
            last_active: a.last_active,
            total_tickets_resolved: a.total_tickets_resolved,
        }
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AgentListQuery {
    pub team: Option<String>,
    pub status: Option<String>,
    /// Defaults to true
    pub active_only: Option<bool>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TeamQuery {
    pub team: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SkillQuery {
    pub skill: String,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AgentStatusQuery {
    /// `active`, `away` or `offline`
    pub status: String,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DeleteQuery {
    /// Remove instead of deactivating
    #[serde(default)]
    pub permanent: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AgentStatsResponse {
    pub agent_id: String,
    pub name: String,
    pub team: Option<String>,
    pub current_load: u32,
    pub max_tickets_per_day: u32,
    pub available_capacity: u32,
    pub utilization_percentage: f64,
    pub is_available: bool,
    pub status: String,
    pub total_tickets_resolved: u64,
}

impl From<AgentStats> for AgentStatsResponse {
    fn from(s: AgentStats) -> Self {
        Self {
            agent_id: s.agent_id,
            name: s.name,
            team: s.team,
            current_load: s.current_load,
            max_tickets_per_day: s.max_tickets_per_day,
            available_capacity: s.available_capacity,
            utilization_percentage: s.utilization_percentage,
            is_available: s.is_available,
            status: s.status.to_string(),
            total_tickets_resolved: s.total_tickets_resolved,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AvailableAgentsResponse {
    pub skill: String,
    pub available_count: usize,
    pub agents: Vec<AgentResponse>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AgentRemovalResponse {
    pub agent_id: String,
    pub deleted: bool,
    pub agent: Option<AgentResponse>,
    pub message: String,
}

// ============ Knowledge base ============

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct KbSearchQuery {
    pub q: String,
    pub limit: Option<usize>,
    pub category: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct KbSearchResult {
    pub article_id: String,
    pub title: String,
    pub category: String,
    pub content: String,
    pub relevance_score: f32,
}

impl From<KnowledgeMatch> for KbSearchResult {
    fn from(m: KnowledgeMatch) -> Self {
        Self {
            article_id: m.article_id,
            title: m.title,
            category: m.category.to_string(),
            content: m.content,
            relevance_score: m.relevance_score,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct KbSearchResponse {
    pub query: String,
    pub count: usize,
    pub results: Vec<KbSearchResult>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct KbArticleResponse {
    pub article_id: String,
    pub title: String,
    pub category: String,
    pub content: String,
}

impl From<&KnowledgeArticle> for KbArticleResponse {
    fn from(a: &KnowledgeArticle) -> Self {
        Self {
            article_id: a.article_id.clone(),
            title: a.title.clone(),
            category: a.category.to_string(),
            content: a.content.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct KbStatsResponse {
    pub total_articles: usize,
    pub categories: BTreeMap<String, usize>,
    pub embedding_model: String,
    pub dimension: usize,
    pub relevance_floor: f32,
}

impl From<KnowledgeStats> for KbStatsResponse {
    fn from(s: KnowledgeStats) -> Self {
        Self {
            total_articles: s.total_articles,
            categories: s.categories,
            embedding_model: s.embedding_model,
            dimension: s.dimension,
            relevance_floor: s.relevance_floor,
        }
    }
}
