//! Engine configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::anomaly::DEFAULT_ANOMALY_CAPACITY;
use crate::detector::Sensitivity;
use crate::history::{DEFAULT_CACHED_METRICS, DEFAULT_HISTORY_CAPACITY, DEFAULT_WINDOW_CAPACITY};

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Instance name attached to every log event
    #[serde(default = "default_instance")]
    pub instance: String,

    /// Directory for persisted documents; in-memory only when unset
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// Global sample cap across all metrics
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    /// Maximum number of anomaly records retained
    #[serde(default = "default_anomaly_capacity")]
    pub anomaly_capacity: usize,

    /// Per-metric rolling window length
    #[serde(default = "default_rolling_window_capacity")]
    pub rolling_window_capacity: usize,

    /// Metrics that get a rolling window
    #[serde(default = "default_cached_metrics")]
    pub cached_metrics: Vec<String>,

    /// Sensitivity used when a caller does not pick one
    #[serde(default)]
    pub default_sensitivity: Sensitivity,
}

fn default_instance() -> String {
    "sentinel".to_string()
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

fn default_cached_metrics() -> Vec<String> {
    DEFAULT_CACHED_METRICS.iter().map(|m| m.to_string()).collect()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            instance: default_instance(),
            data_dir: None,
            history_capacity: default_history_capacity(),
            anomaly_capacity: default_anomaly_capacity(),
            rolling_window_capacity: default_rolling_window_capacity(),
            cached_metrics: default_cached_metrics(),
            default_sensitivity: Sensitivity::default(),
        }
    }
}

impl EngineConfig {
    /// In-memory configuration with default capacities
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// File-backed configuration rooted at `dir`
    pub fn persistent(dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: Some(dir.into()),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.history_capacity, 10_000);
        assert_eq!(config.anomaly_capacity, 1000);
        assert_eq!(config.rolling_window_capacity, 100);
        assert_eq!(config.cached_metrics.len(), 4);
        assert_eq!(config.default_sensitivity, Sensitivity::Medium);
        assert!(config.data_dir.is_none());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: EngineConfig = serde_json::from_str(
            r#"{"data_dir": "/var/lib/sentinel", "default_sensitivity": "high", "cached_metrics": ["cpu"]}"#,
        )
        .unwrap();

        assert_eq!(config.data_dir, Some(PathBuf::from("/var/lib/sentinel")));
        assert_eq!(config.default_sensitivity, Sensitivity::High);
        assert_eq!(config.cached_metrics, vec!["cpu".to_string()]);
        assert_eq!(config.history_capacity, DEFAULT_HISTORY_CAPACITY);
        assert_eq!(config.instance, "sentinel");
    }
}
