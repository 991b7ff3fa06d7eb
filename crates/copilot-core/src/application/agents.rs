//! Agent roster management

use std::sync::Arc;
use tracing::info;

use super::WriteLock;
use crate::domain::aggregates::{Agent, AgentStatus, DEFAULT_MAX_TICKETS};
use crate::domain::value_objects::Email;
use crate::error::{DeskError, DeskResult};
use crate::ports::{AgentFilter, AgentRepository};

#[derive(Clone, Debug, Default)]
pub struct NewAgent {
    pub agent_id: String,
    pub name: String,
    pub email: String,
    pub team: Option<String>,
    pub skills: Vec<String>,
    pub max_tickets_per_day: Option<u32>,
}

/// Partial update; `None` leaves a field unchanged
#[derive(Clone, Debug, Default)]
pub struct AgentUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub team: Option<String>,
    pub skills: Option<Vec<String>>,
    pub max_tickets_per_day: Option<u32>,
    pub status: Option<AgentStatus>,
    pub active: Option<bool>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AgentStats {
    pub agent_id: String,
    pub name: String,
    pub team: Option<String>,
    pub current_load: u32,
    pub max_tickets_per_day: u32,
    pub available_capacity: u32,
    pub utilization_percentage: f64,
    pub is_available: bool,
    pub status: AgentStatus,
    pub total_tickets_resolved: u64,
}

impl From<&Agent> for AgentStats {
    fn from(a: &Agent) -> Self {
        Self {
            agent_id: a.agent_id.clone(),
            name: a.name.clone(),
            team: a.team.clone(),
            current_load: a.current_load,
            max_tickets_per_day: a.max_tickets_per_day,
            available_capacity: a.available_capacity(),
            utilization_percentage: (a.utilization() * 100.0).round() / 100.0,
            is_available: a.can_take_ticket(),
            status: a.status,
            total_tickets_resolved: a.total_tickets_resolved,
        }
    }
}

#[derive(Clone, Debug)]
pub enum AgentRemoval {
    Deleted,
    Deactivated(Agent),
}

pub struct AgentService {
    agents: Arc<dyn AgentRepository>,
    lock: WriteLock,
}

fn normalize_skills(skills: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(skills.len());
    for skill in skills.into_iter().map(|s| s.trim().to_string()).filter(|s| !s.is_empty()) {
        if !out.iter().any(|s| s.eq_ignore_ascii_case(&skill)) {
            out.push(skill);
        }
    }
    out
}

impl AgentService {
    pub fn new(agents: Arc<dyn AgentRepository>, lock: WriteLock) -> Self {
        Self { agents, lock }
    }

    pub async fn register(&self, request: NewAgent) -> DeskResult<Agent> {
        let agent_id = request.agent_id.trim().to_string();
        let name = request.name.trim().to_string();
        if agent_id.is_empty() {
            return Err(DeskError::Validation("agent_id is required".into()));
        }
        if name.is_empty() {
            return Err(DeskError::Validation("name is required".into()));
        }
        let agent = Agent::new(agent_id.clone(), name, Email::new(request.email)?)
            .with_team(request.team.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()))
            .with_skills(normalize_skills(request.skills))
            .with_capacity(request.max_tickets_per_day.unwrap_or(DEFAULT_MAX_TICKETS))?;

        let _guard = self.lock.acquire().await;
        if self.agents.find_by_id(&agent_id).await?.is_some() {
            return Err(DeskError::Conflict(format!("agent {agent_id} already exists")));
        }
        self.agents.save(&agent).await?;
        info!(agent_id = %agent.agent_id, skills = ?agent.skills, "agent registered");
        Ok(agent)
    }

    pub async fn get(&self, agent_id: &str) -> DeskResult<Agent> {
        self.agents
            .find_by_id(agent_id)
            .await?
            .ok_or_else(|| DeskError::agent_not_found(agent_id))
    }

    pub async fn list(&self, filter: &AgentFilter) -> DeskResult<Vec<Agent>> {
        Ok(self.agents.list(filter).await?)
    }

    pub async fn update(&self, agent_id: &str, update: AgentUpdate) -> DeskResult<Agent> {
        let _guard = self.lock.acquire().await;
        let mut agent = self.get(agent_id).await?;

        if let Some(name) = update.name.map(|n| n.trim().to_string()) {
            if name.is_empty() {
                return Err(DeskError::Validation("name cannot be blank".into()));
            }
            agent.name = name;
        }
        if let Some(email) = update.email {
            agent.email = Email::new(email)?;
        }
        if let Some(team) = update.team {
            agent.team = Some(team.trim().to_string()).filter(|t| !t.is_empty());
        }
        if let Some(skills) = update.skills {
            agent.skills = normalize_skills(skills);
        }
        if let Some(max) = update.max_tickets_per_day {
            agent.set_capacity(max)?;
        }
        if let Some(status) = update.status {
            agent.set_status(status);
        }
        if let Some(active) = update.active {
            agent.active = active;
        }

        self.agents.save(&agent).await?;
        info!(agent_id, "agent updated");
        Ok(agent)
    }

    pub async fn set_status(&self, agent_id: &str, status: AgentStatus) -> DeskResult<Agent> {
        let _guard = self.lock.acquire().await;
        let mut agent = self.get(agent_id).await?;
        agent.set_status(status);
        self.agents.save(&agent).await?;
        info!(agent_id, status = %status, "agent status changed");
        Ok(agent)
    }

    /// Deactivate by default; `permanent` removes the agent from the roster
    pub async fn remove(&self, agent_id: &str, permanent: bool) -> DeskResult<AgentRemoval> {
        let _guard = self.lock.acquire().await;
        if permanent {
            if !self.agents.delete(agent_id).await? {
                return Err(DeskError::agent_not_found(agent_id));
            }
            info!(agent_id, "agent deleted");
            return Ok(AgentRemoval::Deleted);
        }
        let mut agent = self.get(agent_id).await?;
        agent.deactivate();
        self.agents.save(&agent).await?;
        info!(agent_id, "agent deactivated");
        Ok(AgentRemoval::Deactivated(agent))
    }

    /// Workload per agent: available agents first, then by load
    pub async fn stats(&self, team: Option<String>) -> DeskResult<Vec<AgentStats>> {
        let agents = self.agents.list(&AgentFilter { team, ..Default::default() }).await?;
        let mut stats: Vec<AgentStats> = agents.iter().map(AgentStats::from).collect();
        stats.sort_by_key(|s| (!s.is_available, s.current_load));
        Ok(stats)
    }

    /// Available agents carrying `skill`, least loaded first
    pub async fn available_with_skill(&self, skill: &str) -> DeskResult<Vec<Agent>> {
        if skill.trim().is_empty() {
            return Err(DeskError::Validation("skill is required".into()));
        }
        let mut agents: Vec<Agent> = self
            .agents
            .list(&AgentFilter { active_only: true, ..Default::default() })
            .await?
            .into_iter()
            .filter(|a| a.can_take_ticket() && a.has_skill_tag(skill))
            .collect();
        agents.sort_by_key(|a| a.current_load);
        Ok(agents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::InMemoryAgentRepository;

    fn service() -> AgentService {
        AgentService::new(Arc::new(InMemoryAgentRepository::new()), WriteLock::new())
    }

    fn request(id: &str, skills: &[&str]) -> NewAgent {
        NewAgent {
            agent_id: id.into(),
            name: format!("Agent {id}"),
            email: format!("{}@example.com", id.to_lowercase()),
            team: Some("shipping_team".into()),
            skills: skills.iter().map(|s| s.to_string()).collect(),
            max_tickets_per_day: None,
        }
    }

    #[tokio::test]
    async fn test_register_defaults_and_duplicates() {
        let s = service();
        let agent = s.register(request("AGENT-001", &["SHIPPING", "shipping", " RETURNS "])).await.unwrap();
        assert_eq!(agent.max_tickets_per_day, 15);
        assert_eq!(agent.skills, vec!["SHIPPING", "RETURNS"]);
        assert!(matches!(s.register(request("AGENT-001", &[])).await, Err(DeskError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_register_validation() {
        let s = service();
        assert!(matches!(
            s.register(NewAgent { max_tickets_per_day: Some(51), ..request("A", &[]) }).await,
            Err(DeskError::Validation(_))
        ));
        assert!(matches!(
            s.register(NewAgent { email: "bad".into(), ..request("A", &[]) }).await,
            Err(DeskError::Validation(_))
        ));
        assert!(matches!(s.register(request(" ", &[])).await, Err(DeskError::Validation(_))));
    }

    #[tokio::test]
    async fn test_update_and_status() {
        let s = service();
        s.register(request("AGENT-001", &["SHIPPING"])).await.unwrap();
        let updated = s
            .update("AGENT-001", AgentUpdate { max_tickets_per_day: Some(20), skills: Some(vec!["BILLING".into()]), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(updated.max_tickets_per_day, 20);
        assert_eq!(updated.skills, vec!["BILLING"]);

        let offline = s.set_status("AGENT-001", AgentStatus::Offline).await.unwrap();
        assert!(!offline.active);
        assert!(matches!(s.set_status("nobody", AgentStatus::Away).await, Err(DeskError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_remove_soft_and_permanent() {
        let s = service();
        s.register(request("AGENT-001", &[])).await.unwrap();
        let removal = s.remove("AGENT-001", false).await.unwrap();
        assert!(matches!(removal, AgentRemoval::Deactivated(ref a) if !a.active));
        assert!(matches!(s.remove("AGENT-001", true).await.unwrap(), AgentRemoval::Deleted));
        assert!(matches!(s.remove("AGENT-001", true).await, Err(DeskError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_stats_and_skill_lookup() {
        let s = service();
        s.register(request("AGENT-001", &["SHIPPING"])).await.unwrap();
        s.register(request("AGENT-002", &["shipping"])).await.unwrap();
        s.register(request("AGENT-003", &["BILLING"])).await.unwrap();
        s.set_status("AGENT-001", AgentStatus::Away).await.unwrap();

        let stats = s.stats(None).await.unwrap();
        assert_eq!(stats.len(), 3);
        assert!(stats[0].is_available);
        assert!(!stats[2].is_available);
        assert_eq!(stats[2].agent_id, "AGENT-001");

        let shipping = s.available_with_skill("Shipping").await.unwrap();
        assert_eq!(shipping.len(), 1);
        assert_eq!(shipping[0].agent_id, "AGENT-002");
    }
}
