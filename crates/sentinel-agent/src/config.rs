//! Agent configuration

use anyhow::{Context, Result};
use sentinel_lib::{
    anomaly::DEFAULT_ANOMALY_CAPACITY,
    history::{DEFAULT_CACHED_METRICS, DEFAULT_HISTORY_CAPACITY, DEFAULT_WINDOW_CAPACITY},
    EngineConfig, Sensitivity,
};
use serde::Deserialize;
use std::path::PathBuf;

/// Agent configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Instance name attached to log events
    #[serde(default = "default_instance_name")]
    pub instance_name: String,

    /// Port for the HTTP API
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Directory for the history and anomaly documents; in-memory when unset
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    #[serde(default = "default_anomaly_capacity")]
    pub anomaly_capacity: usize,

    #[serde(default = "default_rolling_window_capacity")]
    pub rolling_window_capacity: usize,

    /// Comma-separated metric names that get a rolling window
    #[serde(default = "default_cached_metrics")]
    pub cached_metrics: String,

    /// Sensitivity applied when a request does not name one
    #[serde(default)]
    pub default_sensitivity: Sensitivity,
}

fn default_instance_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "sentinel".to_string())
}

fn default_api_port() -> u16 {
    8080
}

fn default_history_capacity() -> usize {
    DEFAULT_HISTORY_CAPACITY
}

fn default_anomaly_capacity() -> usize {
    DEFAULT_ANOMALY_CAPACITY
}

fn default_rolling_window_capacity() -> usize {
    DEFAULT_WINDOW_CAPACITY
}

fn default_cached_metrics() -> String {
    DEFAULT_CACHED_METRICS.join(",")
}

impl AgentConfig {
    /// Load configuration from `SENTINEL_*` environment variables
    pub fn load() -> Result<Self> {
        Self::from_environment(config::Environment::with_prefix("SENTINEL"))
    }

    fn from_environment(environment: config::Environment) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(environment)
            .build()
            .context("Failed to read SENTINEL_* environment")?;

        config
            .try_deserialize()
            .context("Invalid SENTINEL_* configuration")
    }

    /// Engine settings derived from the agent configuration
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            instance: self.instance_name.clone(),
            data_dir: self.data_dir.clone(),
            history_capacity: self.history_capacity,
            anomaly_capacity: self.anomaly_capacity,
            rolling_window_capacity: self.rolling_window_capacity,
            cached_metrics: self
                .cached_metrics
                .split(',')
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(String::from)
                .collect(),
            default_sensitivity: self.default_sensitivity,
        }
    }
}
