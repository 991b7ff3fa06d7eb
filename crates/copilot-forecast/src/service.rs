//! Forecast service: model loading and prediction rollouts

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::PathBuf;
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::error::ForecastError;
use crate::history::BaselineProfile;
use crate::model::{ModelArtifact, SequenceModel};
use crate::scaler::MinMaxScaler;
use crate::staffing::{staffing_recommendation, StaffingRecommendation, DEFAULT_TICKETS_PER_AGENT};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastSettings {
    pub model_path: PathBuf,
    pub max_hours: u32,
    pub max_days: u32,
    pub tickets_per_agent: u32,
    pub shift_hours: u32,
    pub baseline: BaselineProfile,
}

impl Default for ForecastSettings {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/forecast.json"),
            max_hours: 168,
            max_days: 30,
            tickets_per_agent: DEFAULT_TICKETS_PER_AGENT,
            shift_hours: 8,
            baseline: BaselineProfile::default(),
        }
    }
}

impl ForecastSettings {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_hours == 0 || self.max_days == 0 {
            return Err("forecast horizons must be positive".into());
        }
        if self.tickets_per_agent == 0 || self.shift_hours == 0 {
            return Err("forecast.tickets_per_agent and forecast.shift_hours must be positive".into());
        }
        if self.baseline.business_start > 23 || self.baseline.business_end > 23 {
            return Err("forecast.baseline business hours must be within 0..=23".into());
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct HourlyPrediction {
    pub timestamp: DateTime<Utc>,
    pub hour_offset: u32,
    pub predicted_tickets: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct HourlySummary {
    pub total_predicted_tickets: u64,
    pub avg_per_hour: f64,
    pub peak_hour: HourlyPrediction,
    pub recommended_agents: u32,
    pub forecast_period_hours: u32,
    pub generated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct HourlyForecast {
    pub predictions: Vec<HourlyPrediction>,
    pub summary: HourlySummary,
}

#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct DailyPrediction {
    pub date: NaiveDate,
    pub day_offset: u32,
    pub predicted_tickets: u64,
    pub staffing: StaffingRecommendation,
}

#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct DailySummary {
    pub total_predicted_tickets: u64,
    pub avg_per_day: f64,
    pub peak_day: NaiveDate,
    pub peak_day_tickets: u64,
    pub forecast_period_days: u32,
    pub generated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct DailyForecast {
    pub predictions: Vec<DailyPrediction>,
    pub summary: DailySummary,
}

#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct CurrentStaffing {
    pub current_time: DateTime<Utc>,
    pub next_hour_prediction: HourlyPrediction,
    pub shift_tickets: u64,
    pub shift_hours: u32,
    pub staffing: StaffingRecommendation,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ModelStatus {
    Ready,
    NotLoaded,
}

#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct ModelInfo {
    pub status: ModelStatus,
    pub model_path: String,
    pub sequence_length: Option<usize>,
    pub layers: Vec<String>,
    pub message: Option<String>,
}

struct LoadedModel {
    network: SequenceModel,
    scaler: MinMaxScaler,
}

/// Read-only after construction; a missing model leaves the service in an
/// unavailable state instead of failing startup.
pub struct ForecastService {
    settings: ForecastSettings,
    model: Option<LoadedModel>,
    load_error: Option<String>,
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

impl ForecastService {
    pub fn load(settings: ForecastSettings) -> Self {
        let loaded = ModelArtifact::from_path(&settings.model_path).and_then(|a| Self::compile(&a));
        match loaded {
            Ok(model) => {
                info!(
                    path = %settings.model_path.display(),
                    sequence_length = model.network.sequence_length(),
                    "forecast model loaded"
                );
                Self { settings, model: Some(model), load_error: None }
            }
            Err(e) => {
                warn!(path = %settings.model_path.display(), error = %e, "forecast model unavailable");
                Self { settings, model: None, load_error: Some(e.to_string()) }
            }
        }
    }

    pub fn from_artifact(artifact: &ModelArtifact, settings: ForecastSettings) -> Result<Self, ForecastError> {
        Ok(Self { settings, model: Some(Self::compile(artifact)?), load_error: None })
    }

    fn compile(artifact: &ModelArtifact) -> Result<LoadedModel, ForecastError> {
        if !artifact.scaler.is_valid() {
            return Err(ForecastError::InvalidModel("scaler bounds are invalid".into()));
        }
        Ok(LoadedModel { network: SequenceModel::from_artifact(artifact)?, scaler: artifact.scaler })
    }

    pub fn settings(&self) -> &ForecastSettings {
        &self.settings
    }

    pub fn is_ready(&self) -> bool {
        self.model.is_some()
    }

    /// Hours of history the model reads
    pub fn window_hours(&self) -> usize {
        self.model
            .as_ref()
            .map(|m| m.network.sequence_length())
            .unwrap_or(crate::model::DEFAULT_SEQUENCE_LENGTH)
    }

    fn model(&self) -> Result<&LoadedModel, ForecastError> {
        self.model.as_ref().ok_or_else(|| {
            ForecastError::Unavailable(
                self.load_error.clone().unwrap_or_else(|| "forecast model not loaded".to_string()),
            )
        })
    }

    /// Autoregressive rollout; each scaled prediction is fed back as input
    fn rollout(&self, window: &[f64], hours: u32, now: DateTime<Utc>) -> Result<Vec<HourlyPrediction>, ForecastError> {
        let model = self.model()?;
        let len = model.network.sequence_length();

        let mut sequence: VecDeque<f64> = window
            .iter()
            .rev()
            .take(len)
            .rev()
            .map(|v| model.scaler.transform(*v))
            .collect();
        while sequence.len() < len {
            sequence.push_front(model.scaler.transform(0.0));
        }

        let mut predictions = Vec::with_capacity(hours as usize);
        for h in 1..=hours {
            let input: Vec<f64> = sequence.iter().copied().collect();
            let scaled = model.network.predict(&input);
            let count = model.scaler.inverse_transform(scaled).round();
            let predicted_tickets = if count.is_finite() && count > 0.0 { count as u64 } else { 0 };

            predictions.push(HourlyPrediction {
                timestamp: now + Duration::hours(i64::from(h)),
                hour_offset: h,
                predicted_tickets,
            });
            sequence.pop_front();
            sequence.push_back(if scaled.is_finite() { scaled } else { 0.0 });
        }
        Ok(predictions)
    }

    pub fn predict_hourly(&self, window: &[f64], hours: u32, now: DateTime<Utc>) -> Result<Vec<HourlyPrediction>, ForecastError> {
        if hours == 0 || hours > self.settings.max_hours {
            return Err(ForecastError::InvalidHorizon(format!(
                "hours must be between 1 and {}",
                self.settings.max_hours
            )));
        }
        self.rollout(window, hours, now)
    }

    pub fn predict_daily(&self, window: &[f64], days: u32, now: DateTime<Utc>) -> Result<Vec<DailyPrediction>, ForecastError> {
        if days == 0 || days > self.settings.max_days {
            return Err(ForecastError::InvalidHorizon(format!(
                "days must be between 1 and {}",
                self.settings.max_days
            )));
        }
        let hourly = self.rollout(window, days * 24, now)?;
        let today = now.date_naive();

        Ok(hourly
            .chunks(24)
            .zip(1u32..)
            .map(|(chunk, day_offset)| {
                let predicted_tickets = chunk.iter().map(|p| p.predicted_tickets).sum();
                DailyPrediction {
                    date: today + Duration::days(i64::from(day_offset)),
                    day_offset,
                    predicted_tickets,
                    staffing: self.staffing(predicted_tickets),
                }
            })
            .collect())
    }

    pub fn staffing(&self, predicted_tickets: u64) -> StaffingRecommendation {
        staffing_recommendation(predicted_tickets, self.settings.tickets_per_agent)
    }

    pub fn hourly_forecast(&self, window: &[f64], hours: u32, now: DateTime<Utc>) -> Result<HourlyForecast, ForecastError> {
        let predictions = self.predict_hourly(window, hours, now)?;
        let total: u64 = predictions.iter().map(|p| p.predicted_tickets).sum();
        let avg = total as f64 / predictions.len() as f64;
        let peak = predictions
            .iter()
            .reduce(|best, p| if p.predicted_tickets > best.predicted_tickets { p } else { best })
            .cloned()
            .ok_or_else(|| ForecastError::InvalidHorizon("empty forecast".into()))?;
        let shift_tickets = (avg * f64::from(self.settings.shift_hours)) as u64;

        Ok(HourlyForecast {
            summary: HourlySummary {
                total_predicted_tickets: total,
                avg_per_hour: round2(avg),
                peak_hour: peak,
                recommended_agents: self.staffing(shift_tickets).recommended_agents,
                forecast_period_hours: hours,
                generated_at: now,
            },
            predictions,
        })
    }

    pub fn daily_forecast(&self, window: &[f64], days: u32, now: DateTime<Utc>) -> Result<DailyForecast, ForecastError> {
        let predictions = self.predict_daily(window, days, now)?;
        let total: u64 = predictions.iter().map(|p| p.predicted_tickets).sum();
        let peak = predictions
            .iter()
            .reduce(|best, p| if p.predicted_tickets > best.predicted_tickets { p } else { best })
            .ok_or_else(|| ForecastError::InvalidHorizon("empty forecast".into()))?;

        Ok(DailyForecast {
            summary: DailySummary {
                total_predicted_tickets: total,
                avg_per_day: round2(total as f64 / predictions.len() as f64),
                peak_day: peak.date,
                peak_day_tickets: peak.predicted_tickets,
                forecast_period_days: days,
                generated_at: now,
            },
            predictions,
        })
    }

    /// Next-hour prediction extended over one shift
    pub fn current_staffing(&self, window: &[f64], now: DateTime<Utc>) -> Result<CurrentStaffing, ForecastError> {
        let next_hour = self
            .rollout(window, 1, now)?
            .pop()
            .ok_or_else(|| ForecastError::Unavailable("model produced no prediction".into()))?;
        let shift_tickets = next_hour.predicted_tickets * u64::from(self.settings.shift_hours);

        Ok(CurrentStaffing {
            current_time: now,
            next_hour_prediction: next_hour,
            shift_tickets,
            shift_hours: self.settings.shift_hours,
            staffing: self.staffing(shift_tickets),
        })
    }

    pub fn model_info(&self) -> ModelInfo {
        let model_path = self.settings.model_path.display().to_string();
        match &self.model {
            Some(model) => ModelInfo {
                status: ModelStatus::Ready,
                model_path,
                sequence_length: Some(model.network.sequence_length()),
                layers: model.network.summary(),
                message: None,
            },
            None => ModelInfo {
                status: ModelStatus::NotLoaded,
                model_path,
                sequence_length: None,
                layers: vec![],
                message: self.load_error.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tests::tiny_lstm;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 5, 12, 0, 0).unwrap()
    }

    /// Constant output: `dense_bias` on the scaled axis of a 0..=10 scaler
    fn service(dense_bias: f64) -> ForecastService {
        let artifact = ModelArtifact {
            sequence_length: 24,
            scaler: MinMaxScaler::new(0.0, 10.0),
            layers: tiny_lstm([0.0; 4], 0.0, dense_bias),
        };
        ForecastService::from_artifact(&artifact, ForecastSettings::default()).unwrap()
    }

    #[test]
    fn test_missing_model_is_unavailable() {
        let settings = ForecastSettings { model_path: "/nonexistent/forecast.json".into(), ..Default::default() };
        let svc = ForecastService::load(settings);
        assert!(!svc.is_ready());
        assert!(matches!(svc.predict_hourly(&[1.0; 24], 4, now()), Err(ForecastError::Unavailable(_))));
        assert!(matches!(svc.current_staffing(&[1.0; 24], now()), Err(ForecastError::Unavailable(_))));
        let info = svc.model_info();
        assert_eq!(info.status, ModelStatus::NotLoaded);
        assert!(info.message.is_some());
    }

    #[test]
    fn test_hourly_constant_model() {
        let svc = service(0.5);
        let predictions = svc.predict_hourly(&[3.0; 24], 3, now()).unwrap();
        assert_eq!(predictions.len(), 3);
        assert!(predictions.iter().all(|p| p.predicted_tickets == 5));
        assert_eq!(predictions[0].hour_offset, 1);
        assert_eq!(predictions[2].timestamp, now() + Duration::hours(3));
    }

    #[test]
    fn test_negative_output_clamped() {
        let svc = service(-0.8);
        let predictions = svc.predict_hourly(&[3.0; 24], 5, now()).unwrap();
        assert!(predictions.iter().all(|p| p.predicted_tickets == 0));
    }

    #[test]
    fn test_horizon_validation() {
        let svc = service(0.5);
        assert!(matches!(svc.predict_hourly(&[], 0, now()), Err(ForecastError::InvalidHorizon(_))));
        assert!(matches!(svc.predict_hourly(&[], 169, now()), Err(ForecastError::InvalidHorizon(_))));
        assert!(svc.predict_hourly(&[], 168, now()).is_ok());
        assert!(matches!(svc.predict_daily(&[], 31, now()), Err(ForecastError::InvalidHorizon(_))));
    }

    #[test]
    fn test_daily_sums_hours() {
        let svc = service(0.5);
        let daily = svc.daily_forecast(&[3.0; 24], 2, now()).unwrap();
        assert_eq!(daily.predictions.len(), 2);
        assert_eq!(daily.predictions[0].predicted_tickets, 120);
        assert_eq!(daily.predictions[0].date, NaiveDate::from_ymd_opt(2024, 3, 6).unwrap());
        assert_eq!(daily.predictions[0].staffing.recommended_agents, 8 + 1);
        assert_eq!(daily.summary.total_predicted_tickets, 240);
        assert_eq!(daily.summary.avg_per_day, 120.0);
    }

    #[test]
    fn test_hourly_summary_and_current_staffing() {
        let svc = service(0.5);
        let forecast = svc.hourly_forecast(&[3.0; 24], 24, now()).unwrap();
        assert_eq!(forecast.summary.total_predicted_tickets, 120);
        assert_eq!(forecast.summary.avg_per_hour, 5.0);
        assert_eq!(forecast.summary.peak_hour.hour_offset, 1);
        // 5/hour over an 8 hour shift = 40 tickets
        assert_eq!(forecast.summary.recommended_agents, 3);

        let current = svc.current_staffing(&[3.0; 24], now()).unwrap();
        assert_eq!(current.shift_tickets, 40);
        assert_eq!(current.staffing.recommended_agents, 3);
    }

    #[test]
    fn test_model_info_ready() {
        let info = service(0.5).model_info();
        assert_eq!(info.status, ModelStatus::Ready);
        assert_eq!(info.sequence_length, Some(24));
        assert_eq!(info.layers.len(), 2);
    }

    #[test]
    fn test_bundled_model_tracks_recent_volume() {
        let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../../models/forecast.json");
        let svc = ForecastService::load(ForecastSettings { model_path: path, ..Default::default() });
        assert!(svc.is_ready());
        assert_eq!(svc.model_info().layers, vec!["lstm(1)", "dense(1, linear)"]);

        let next = svc.predict_hourly(&[6.0; 24], 1, now()).unwrap();
        assert!((5..=6).contains(&next[0].predicted_tickets));
    }

    proptest! {
        #[test]
        fn forecasts_are_non_negative(
            window in proptest::collection::vec(-1_000.0f64..1_000.0, 0..40),
            bias in -5.0f64..5.0,
            hours in 1u32..48,
        ) {
            let svc = service(bias);
            let predictions = svc.predict_hourly(&window, hours, now()).unwrap();
            prop_assert_eq!(predictions.len(), hours as usize);
            if bias < -0.05 {
                prop_assert!(predictions.iter().all(|p| p.predicted_tickets == 0));
            }
        }
    }
}
