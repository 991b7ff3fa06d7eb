//! Agent entity
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

use crate::domain::value_objects::{Category, Email, ParseLabelError};

pub const DEFAULT_MAX_TICKETS: u32 = 15;
pub const MAX_TICKETS_LIMIT: u32 = 50;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Agent {
    pub agent_id: String,
    pub name: String,
    pub email: Email,
    pub team: Option<String>,
    pub skills: Vec<String>,
    pub max_tickets_per_day: u32,
    pub current_load: u32,
    pub status: AgentStatus,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
    pub total_tickets_resolved: u64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus { #[default] Active, Away, Offline }

impl AgentStatus {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Active => "active", Self::Away => "away", Self::Offline => "offline" }
    }
}

impl FromStr for AgentStatus {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "away" => Ok(Self::Away),
            "offline" => Ok(Self::Offline),
            _ => Err(ParseLabelError { kind: "agent status", value: s.to_string() }),
        }
    }
}

impl std::fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str(self.as_str()) }
}

impl Agent {
    pub fn new(agent_id: impl Into<String>, name: impl Into<String>, email: Email) -> Self {
        let now = Utc::now();
        Self {
            agent_id: agent_id.into(), name: name.into(), email, team: None, skills: vec![],
            max_tickets_per_day: DEFAULT_MAX_TICKETS, current_load: 0, status: AgentStatus::Active,
            active: true, created_at: now, last_active: now, total_tickets_resolved: 0,
        }
    }

    pub fn with_team(mut self, team: Option<String>) -> Self { self.team = team; self }
    pub fn with_skills(mut self, skills: Vec<String>) -> Self { self.skills = skills; self }

    pub fn with_capacity(mut self, max_tickets_per_day: u32) -> Result<Self, AgentError> {
        self.set_capacity(max_tickets_per_day)?;
        Ok(self)
    }

    pub fn set_capacity(&mut self, max_tickets_per_day: u32) -> Result<(), AgentError> {
        if !(1..=MAX_TICKETS_LIMIT).contains(&max_tickets_per_day) {
            return Err(AgentError::InvalidCapacity(max_tickets_per_day));
        }
        self.max_tickets_per_day = max_tickets_per_day;
        Ok(())
    }

    /// Receiving new work: active flag set and status `active`
    pub fn is_available(&self) -> bool { self.active && self.status == AgentStatus::Active }
    pub fn has_capacity(&self) -> bool { self.current_load < self.max_tickets_per_day }
    pub fn can_take_ticket(&self) -> bool { self.is_available() && self.has_capacity() }
    pub fn available_capacity(&self) -> u32 { self.max_tickets_per_day.saturating_sub(self.current_load) }

    pub fn has_skill(&self, category: Category) -> bool {
        self.skills.iter().any(|s| category.matches_skill(s))
    }

    pub fn has_skill_tag(&self, skill: &str) -> bool {
        self.skills.iter().any(|s| s.eq_ignore_ascii_case(skill.trim()))
    }

    /// Load as a percentage of daily capacity
    pub fn utilization(&self) -> f64 {
        if self.max_tickets_per_day == 0 { return 0.0; }
        f64::from(self.current_load) / f64::from(self.max_tickets_per_day) * 100.0
    }

    /// Take one more ticket. `force` lets a manager exceed capacity.
    pub fn reserve_slot(&mut self, force: bool) -> Result<u32, AgentError> {
        if !self.active {
            return Err(AgentError::Inactive(self.agent_id.clone()));
        }
        if !force && !self.has_capacity() {
            return Err(AgentError::AtCapacity { agent_id: self.agent_id.clone(), max: self.max_tickets_per_day });
        }
        self.current_load += 1;
        self.last_active = Utc::now();
        Ok(self.current_load)
    }

    /// Give back a slot; `resolved` counts the ticket as closed out by this agent
    pub fn release_slot(&mut self, resolved: bool) -> u32 {
        self.current_load = self.current_load.saturating_sub(1);
        if resolved { self.total_tickets_resolved += 1; }
        self.last_active = Utc::now();
        self.current_load
    }

    pub fn set_status(&mut self, status: AgentStatus) {
        self.status = status;
        if status == AgentStatus::Offline { self.active = false; }
        self.last_active = Utc::now();
    }

    pub fn deactivate(&mut self) {
        self.active = false;
        self.status = AgentStatus::Offline;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AgentError {
    #[error("agent {agent_id} is at capacity ({max} tickets)")]
    AtCapacity { agent_id: String, max: u32 },
    #[error("agent {0} is not active")]
    Inactive(String),
    #[error("max_tickets_per_day must be between 1 and 50, got {0}")]
    InvalidCapacity(u32),
}
