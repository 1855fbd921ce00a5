//! Prioritized insights from the last 24 hours of anomalies

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use super::AnomalyRecordStore;
use crate::clock::Clock;
use crate::models::{AnomalyRecord, Severity};

/// Lookback window for insights
const INSIGHT_WINDOW_HOURS: i64 = 24;

/// Window anomaly count above which a pattern alert fires
const PATTERN_ALERT_THRESHOLD: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    MetricAlert,
    SeverityAlert,
    PatternAlert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightPriority {
    Medium,
    High,
    Critical,
}

/// One human-readable finding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    #[serde(rename = "type")]
    pub kind: InsightKind,
    pub priority: InsightPriority,
    pub title: String,
    pub message: String,
    pub recommendation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric: Option<String>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InsightsReport {
    /// Records currently stored, regardless of age
    pub total_anomalies: usize,
    #[serde(default)]
    pub recent_24h: usize,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub by_metric: BTreeMap<String, usize>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub by_severity: BTreeMap<Severity, usize>,
    pub insights: Vec<Insight>,
}

impl InsightsReport {
    /// Build the report from most-recent-first records
    pub fn build(records: &[AnomalyRecord], now: DateTime<Utc>) -> Self {
        if records.is_empty() {
            return Self::default();
        }

        let cutoff = now - Duration::hours(INSIGHT_WINDOW_HOURS);
        let window: Vec<&AnomalyRecord> =
            records.iter().filter(|r| r.timestamp >= cutoff).collect();

        let mut by_metric = BTreeMap::new();
        let mut by_severity = BTreeMap::new();
        // First-seen order keeps ties going to the most recently active metric
        let mut metric_order: Vec<(&str, usize)> = Vec::new();
        for record in &window {
            *by_metric.entry(record.metric.clone()).or_insert(0) += 1;
            *by_severity.entry(record.severity).or_insert(0) += 1;
            match metric_order.iter_mut().find(|(m, _)| *m == record.metric) {
                Some((_, count)) => *count += 1,
                None => metric_order.push((record.metric.as_str(), 1)),
            }
        }

        let mut insights = Vec::new();

        let mut top: Option<(&str, usize)> = None;
        for &(metric, count) in &metric_order {
            if top.map_or(true, |(_, best)| count > best) {
                top = Some((metric, count));
            }
        }
        if let Some((metric, count)) = top {
            insights.push(Insight {
                kind: InsightKind::MetricAlert,
                priority: InsightPriority::High,
                title: "Most anomalous metric".to_string(),
                message: format!(
                    "Metric '{}' has {} anomalies in the last {} hours",
                    metric, count, INSIGHT_WINDOW_HOURS
                ),
                recommendation: format!(
                    "Investigate recent changes affecting '{}'",
                    metric
                ),
                metric: Some(metric.to_string()),
                count,
            });
        }

        let critical = by_severity.get(&Severity::Critical).copied().unwrap_or(0);
        if critical > 0 {
            insights.push(Insight {
                kind: InsightKind::SeverityAlert,
                priority: InsightPriority::Critical,
                title: "Critical anomalies detected".to_string(),
                message: format!(
                    "{} critical anomalies in the last {} hours",
                    critical, INSIGHT_WINDOW_HOURS
                ),
                recommendation: "Review and acknowledge critical anomalies immediately"
                    .to_string(),
                metric: None,
                count: critical,
            });
        }

        if window.len() > PATTERN_ALERT_THRESHOLD {
            insights.push(Insight {
                kind: InsightKind::PatternAlert,
                priority: InsightPriority::Medium,
                title: "Elevated anomaly rate".to_string(),
                message: format!(
                    "{} anomalies in the last {} hours",
                    window.len(),
                    INSIGHT_WINDOW_HOURS
                ),
                recommendation:
                    "Check for a systemic issue or review the detection sensitivity".to_string(),
                metric: None,
                count: window.len(),
            });
        }

        Self {
            total_anomalies: records.len(),
            recent_24h: window.len(),
            by_metric,
            by_severity,
            insights,
        }
    }
}

/// Derives insights from the record store on demand
pub struct InsightEngine {
    records: Arc<AnomalyRecordStore>,
    clock: Arc<dyn Clock>,
}

impl InsightEngine {
    pub fn new(records: Arc<AnomalyRecordStore>, clock: Arc<dyn Clock>) -> Self {
        Self { records, clock }
    }

    pub fn generate(&self) -> InsightsReport {
        InsightsReport::build(&self.records.all(), self.clock.now())
    }
}
