//! Support Copilot Forecasting
//!
//! Ticket-volume prediction from a pre-trained stacked LSTM exported to JSON,
//! plus a staffing heuristic over the predicted volume. The model is loaded
//! once and never updated at request time.

pub mod error;
pub mod history;
pub mod model;
pub mod scaler;
pub mod service;
pub mod staffing;

pub use error::ForecastError;
pub use history::{input_window, BaselineProfile, InputWindow, WindowSource};
pub use model::{Activation, LayerSpec, ModelArtifact, SequenceModel};
pub use scaler::MinMaxScaler;
pub use service::{
    CurrentStaffing, DailyForecast, DailyPrediction, DailySummary, ForecastService, ForecastSettings,
    HourlyForecast, HourlyPrediction, HourlySummary, ModelInfo, ModelStatus,
};
pub use staffing::{staffing_recommendation, StaffingRecommendation, Urgency};
