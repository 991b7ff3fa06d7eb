//! Staffing heuristic

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const DEFAULT_TICKETS_PER_AGENT: u32 = 15;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Normal,
    Medium,
    High,
    Critical,
}

impl Urgency {
    pub fn from_volume(predicted_tickets: u64) -> Self {
        match predicted_tickets {
            p if p > 150 => Urgency::Critical,
            p if p > 100 => Urgency::High,
            p if p > 50 => Urgency::Medium,
            _ => Urgency::Normal,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::Normal => "normal",
            Urgency::Medium => "medium",
            Urgency::High => "high",
            Urgency::Critical => "critical",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Urgency::Normal => "Low volume, minimal staffing needed",
            Urgency::Medium => "Moderate volume, standard staffing",
            Urgency::High => "High volume expected, all hands on deck",
            Urgency::Critical => "Very high volume expected, bring in temporary staff",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StaffingRecommendation {
    pub predicted_tickets: u64,
    pub recommended_agents: u32,
    pub tickets_per_agent: u32,
    pub urgency: Urgency,
    pub message: String,
}

/// Agents needed for `predicted_tickets`, with one extra above 100 tickets
pub fn staffing_recommendation(predicted_tickets: u64, tickets_per_agent: u32) -> StaffingRecommendation {
    let per_agent = u64::from(tickets_per_agent.max(1));
    let base = predicted_tickets.div_ceil(per_agent).max(1);
    let buffer = u64::from(predicted_tickets > 100);
    let recommended = u32::try_from(base + buffer).unwrap_or(u32::MAX);
    let urgency = Urgency::from_volume(predicted_tickets);

    StaffingRecommendation {
        predicted_tickets,
        recommended_agents: recommended,
        tickets_per_agent: tickets_per_agent.max(1),
        urgency,
        message: urgency.message().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_thresholds() {
        let low = staffing_recommendation(0, 15);
        assert_eq!(low.recommended_agents, 1);
        assert_eq!(low.urgency, Urgency::Normal);

        assert_eq!(staffing_recommendation(50, 15).urgency, Urgency::Normal);
        assert_eq!(staffing_recommendation(51, 15).urgency, Urgency::Medium);
        assert_eq!(staffing_recommendation(51, 15).recommended_agents, 4);

        let high = staffing_recommendation(101, 15);
        assert_eq!(high.urgency, Urgency::High);
        assert_eq!(high.recommended_agents, 7 + 1);

        let critical = staffing_recommendation(151, 15);
        assert_eq!(critical.urgency, Urgency::Critical);
        assert_eq!(critical.recommended_agents, 11 + 1);
    }

    #[test]
    fn test_exact_multiple() {
        assert_eq!(staffing_recommendation(45, 15).recommended_agents, 3);
        assert_eq!(staffing_recommendation(100, 15).recommended_agents, 7);
    }

    proptest! {
        #[test]
        fn agents_cover_volume(p in 0u64..100_000) {
            let rec = staffing_recommendation(p, 15);
            prop_assert!(rec.recommended_agents >= 1);
            prop_assert!(u64::from(rec.recommended_agents) * 15 >= p);
        }
    }
}
