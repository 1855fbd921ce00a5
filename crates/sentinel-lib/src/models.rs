//! Core data models for the anomaly engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::detector::MethodResults;

/// A single scalar observation for a named metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    pub metric_name: String,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

/// Severity band assigned to an anomaly at creation time
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Map a confidence percentage onto a severity band
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence >= 80.0 {
            Severity::Critical
        } else if confidence >= 60.0 {
            Severity::High
        } else if confidence >= 40.0 {
            Severity::Medium
        } else {
            Severity::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            "critical" => Ok(Severity::Critical),
            other => Err(format!("unknown severity '{}'", other)),
        }
    }
}

/// Lifecycle state derived from the acknowledgment/resolution flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    Open,
    Acknowledged,
    Resolved,
}

/// A persisted anomaly with its lifecycle state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyRecord {
    pub id: String,
    pub metric: String,
    pub value: f64,
    pub confidence: f64,
    pub methods: MethodResults,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
    pub acknowledged: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub resolved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution_note: Option<String>,
}

impl AnomalyRecord {
    pub fn state(&self) -> LifecycleState {
        if self.resolved {
            LifecycleState::Resolved
        } else if self.acknowledged {
            LifecycleState::Acknowledged
        } else {
            LifecycleState::Open
        }
    }
}

/// Query filter for listing anomalies
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyFilter {
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub severity: Option<Severity>,
    #[serde(default)]
    pub resolved: Option<bool>,
}

fn default_limit() -> usize {
    50
}

impl Default for AnomalyFilter {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            severity: None,
            resolved: None,
        }
    }
}

impl AnomalyFilter {
    pub fn matches(&self, record: &AnomalyRecord) -> bool {
        self.severity.map_or(true, |s| record.severity == s)
            && self.resolved.map_or(true, |r| record.resolved == r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_bands() {
        assert_eq!(Severity::from_confidence(100.0), Severity::Critical);
        assert_eq!(Severity::from_confidence(83.33), Severity::Critical);
        assert_eq!(Severity::from_confidence(80.0), Severity::Critical);
        assert_eq!(Severity::from_confidence(66.67), Severity::High);
        assert_eq!(Severity::from_confidence(50.0), Severity::Medium);
        assert_eq!(Severity::from_confidence(33.33), Severity::Low);
    }

    #[test]
    fn test_severity_parse() {
        assert_eq!("Critical".parse::<Severity>().unwrap(), Severity::Critical);
        assert!("urgent".parse::<Severity>().is_err());
    }

    #[test]
    fn test_default_filter() {
        let filter = AnomalyFilter::default();
        assert_eq!(filter.limit, 50);
        assert!(filter.severity.is_none());
        assert!(filter.resolved.is_none());
    }
}
