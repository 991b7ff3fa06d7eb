//! Service configuration: TOML file plus environment overrides

use copilot_ai::LlmSettings;
use copilot_core::PipelineSettings;
use copilot_forecast::ForecastSettings;
use copilot_kb::KnowledgeSettings;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

pub const CONFIG_PATH_ENV: &str = "COPILOT_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "copilot.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { bind: "0.0.0.0:8000".to_string() }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CopilotConfig {
    pub server: ServerSettings,
    pub llm: LlmSettings,
    pub knowledge: KnowledgeSettings,
    pub pipeline: PipelineSettings,
    pub forecast: ForecastSettings,
}

impl CopilotConfig {
    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Read `path`; a missing file yields the defaults
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(raw) => {
                info!(path = %path.display(), "configuration loaded");
                Self::from_toml(&raw)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "configuration file not found, using defaults");
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Io { path: path.to_path_buf(), source }),
        }
    }

    /// File named by `COPILOT_CONFIG`, then environment overrides, then validation
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut config = Self::load_from(Path::new(&path))?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup("GROQ_API_KEY").filter(|v| !v.trim().is_empty()) {
            self.llm.api_key = Some(key);
        }
        if let Some(model) = lookup("COPILOT_LLM_MODEL").filter(|v| !v.trim().is_empty()) {
            self.llm.model = model;
        }
        if let Some(bind) = lookup("COPILOT_BIND").filter(|v| !v.trim().is_empty()) {
            self.server.bind = bind;
        }
        if let Some(path) = lookup("COPILOT_FORECAST_MODEL").filter(|v| !v.trim().is_empty()) {
            self.forecast.model_path = PathBuf::from(path);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bind_addr()?;
        self.pipeline.validate().map_err(ConfigError::Invalid)?;
        self.knowledge.validate().map_err(ConfigError::Invalid)?;
        self.forecast.validate().map_err(ConfigError::Invalid)?;
        if self.llm.timeout_secs == 0 {
            return Err(ConfigError::Invalid("llm.timeout_secs must be positive".into()));
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.server
            .bind
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("server.bind '{}' is not a socket address", self.server.bind)))
    }
}
