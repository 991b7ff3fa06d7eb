//! Domain Services
//!
//! Stateless rules that do not belong to a single aggregate.

mod metadata;

pub use metadata::{merge_metadata, MetadataExtractor};

use crate::domain::aggregates::Agent;
use crate::domain::value_objects::Category;

/// Confidence gate: the suggestion wins only when `confidence > threshold`.
/// A NaN confidence never passes.
pub fn apply_if_confident<T>(suggested: T, current: T, confidence: f32, threshold: f32) -> T {
    if confidence > threshold {
        suggested
    } else {
        current
    }
}

/// Clamp a model-reported confidence into [0, 1]; NaN becomes 0
pub fn clamp_confidence(raw: f32) -> f32 {
    if raw.is_nan() {
        0.0
    } else {
        raw.clamp(0.0, 1.0)
    }
}

/// Pick the agent for auto-assignment.
///
/// Eligible agents are available, below capacity and skilled in `category`
/// (any agent with at least one skill when the ticket has no category).
/// Lowest load wins, then agent id.
pub fn select_agent(agents: &[Agent], category: Option<Category>) -> Option<&Agent> {
    agents
        .iter()
        .filter(|a| a.can_take_ticket())
        .filter(|a| match category {
            Some(c) => a.has_skill(c),
            None => !a.skills.is_empty(),
        })
        .min_by(|a, b| {
            a.current_load
                .cmp(&b.current_load)
                .then_with(|| a.agent_id.cmp(&b.agent_id))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::AgentStatus;
    use crate::domain::value_objects::{Email, Priority};
    use proptest::prelude::*;

    fn agent(id: &str, skills: &[&str], load: u32, max: u32) -> Agent {
        let mut a = Agent::new(id, id, Email::new(format!("{}@example.com", id.to_lowercase())).unwrap())
            .with_skills(skills.iter().map(|s| s.to_string()).collect())
            .with_capacity(max)
            .unwrap();
        a.current_load = load;
        a
    }

    #[test]
    fn test_gate_applies_above_threshold() {
        assert_eq!(apply_if_confident(Priority::High, Priority::Medium, 0.95, 0.7), Priority::High);
        assert_eq!(apply_if_confident(Priority::High, Priority::Medium, 0.7, 0.7), Priority::Medium);
        assert_eq!(apply_if_confident(Priority::High, Priority::Medium, f32::NAN, 0.7), Priority::Medium);
    }

    #[test]
    fn test_clamp_confidence() {
        assert_eq!(clamp_confidence(1.7), 1.0);
        assert_eq!(clamp_confidence(-0.2), 0.0);
        assert_eq!(clamp_confidence(f32::NAN), 0.0);
        assert_eq!(clamp_confidence(0.42), 0.42);
    }

    #[test]
    fn test_select_lowest_load_then_id() {
        let agents = vec![
            agent("AGENT-003", &["SHIPPING"], 1, 15),
            agent("AGENT-002", &["shipping"], 1, 15),
            agent("AGENT-001", &["BILLING"], 0, 15),
        ];
        let chosen = select_agent(&agents, Some(Category::Shipping)).unwrap();
        assert_eq!(chosen.agent_id, "AGENT-002");
    }

    #[test]
    fn test_select_skips_full_and_unavailable() {
        let mut away = agent("AGENT-001", &["SHIPPING"], 0, 15);
        away.set_status(AgentStatus::Away);
        let agents = vec![away, agent("AGENT-002", &["SHIPPING"], 5, 5)];
        assert!(select_agent(&agents, Some(Category::Shipping)).is_none());
    }

    #[test]
    fn test_uncategorized_ticket_needs_a_skilled_agent() {
        let agents = vec![agent("AGENT-001", &[], 0, 15), agent("AGENT-007", &["BILLING"], 3, 15)];
        assert_eq!(select_agent(&agents, None).unwrap().agent_id, "AGENT-007");
        assert!(select_agent(&agents[..1], None).is_none());
    }

    proptest! {
        #[test]
        fn gate_matches_strict_comparison(confidence in -1.0f32..2.0, threshold in 0.0f32..1.0) {
            let chosen = apply_if_confident(1u8, 0u8, confidence, threshold);
            prop_assert_eq!(chosen == 1, confidence > threshold);
        }

        #[test]
        fn selection_never_picks_full_agent(loads in proptest::collection::vec((0u32..20, 1u32..20), 1..12)) {
            let agents: Vec<Agent> = loads
                .iter()
                .enumerate()
                .map(|(i, (load, max))| agent(&format!("AGENT-{i:03}"), &["SHIPPING"], *load, *max))
                .collect();
            if let Some(chosen) = select_agent(&agents, Some(Category::Shipping)) {
                prop_assert!(chosen.current_load < chosen.max_tickets_per_day);
                let min_load = agents.iter().filter(|a| a.has_capacity()).map(|a| a.current_load).min();
                prop_assert_eq!(Some(chosen.current_load), min_load);
            } else {
                prop_assert!(agents.iter().all(|a| !a.has_capacity()));
            }
        }
    }
}
