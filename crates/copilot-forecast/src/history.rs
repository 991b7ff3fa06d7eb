//! Input windows built from ticket creation times

use chrono::{DateTime, DurationRound, Duration, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// Hourly counts assumed when the store has no recent tickets
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BaselineProfile {
    pub off_hours: f64,
    pub business_hours: f64,
    /// First business hour (UTC, inclusive)
    pub business_start: u32,
    /// Last business hour (UTC, inclusive)
    pub business_end: u32,
}

impl Default for BaselineProfile {
    fn default() -> Self {
        Self { off_hours: 3.0, business_hours: 6.0, business_start: 9, business_end: 17 }
    }
}

impl BaselineProfile {
    pub fn at_hour(&self, hour: u32) -> f64 {
        if (self.business_start..=self.business_end).contains(&hour) {
            self.business_hours
        } else {
            self.off_hours
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowSource {
    History,
    Baseline,
}

#[derive(Clone, Debug, PartialEq)]
pub struct InputWindow {
    /// Hourly counts, oldest first
    pub counts: Vec<f64>,
    pub source: WindowSource,
}

fn bucket_starts(now: DateTime<Utc>, hours: usize) -> Vec<DateTime<Utc>> {
    let current = now.duration_trunc(Duration::hours(1)).unwrap_or(now);
    (1..=hours as i64).rev().map(|back| current - Duration::hours(back)).collect()
}

/// Counts for the `hours` complete hours before `now`
pub fn hourly_counts(created: &[DateTime<Utc>], now: DateTime<Utc>, hours: usize) -> Vec<f64> {
    bucket_starts(now, hours)
        .into_iter()
        .map(|start| {
            let end = start + Duration::hours(1);
            created.iter().filter(|t| **t >= start && **t < end).count() as f64
        })
        .collect()
}

pub fn baseline_counts(profile: &BaselineProfile, now: DateTime<Utc>, hours: usize) -> Vec<f64> {
    bucket_starts(now, hours).into_iter().map(|start| profile.at_hour(start.hour())).collect()
}

/// Observed counts, or the baseline profile when nothing was created in the window
pub fn input_window(
    created: &[DateTime<Utc>],
    now: DateTime<Utc>,
    hours: usize,
    baseline: &BaselineProfile,
) -> InputWindow {
    let counts = hourly_counts(created, now, hours);
    if counts.iter().any(|c| *c > 0.0) {
        InputWindow { counts, source: WindowSource::History }
    } else {
        InputWindow { counts: baseline_counts(baseline, now, hours), source: WindowSource::Baseline }
    }
}
