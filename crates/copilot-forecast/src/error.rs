//! Forecasting errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ForecastError {
    /// No model is loaded
    #[error("forecasting unavailable: {0}")]
    Unavailable(String),

    #[error("invalid model artifact: {0}")]
    InvalidModel(String),

    #[error("invalid forecast horizon: {0}")]
    InvalidHorizon(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for ForecastError {
    fn from(e: serde_json::Error) -> Self {
        Self::InvalidModel(e.to_string())
    }
}

impl From<ndarray::ShapeError> for ForecastError {
    fn from(e: ndarray::ShapeError) -> Self {
        Self::InvalidModel(e.to_string())
    }
}
