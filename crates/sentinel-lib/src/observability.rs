//! Observability infrastructure for the anomaly engine
//!
//! Provides:
//! - Prometheus metrics (ingest/detection counters, detection latency, store sizes)
//! - Structured logging of engine events with tracing

use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{debug, info, warn};

use crate::detector::DetectionVerdict;
use crate::models::{AnomalyRecord, Severity};

/// Histogram buckets for detection latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.00001, 0.00005, 0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<SentinelMetricsInner> = OnceLock::new();

struct SentinelMetricsInner {
    samples_ingested: IntCounter,
    detections: IntCounter,
    anomalies_recorded: IntCounterVec,
    detection_latency_seconds: Histogram,
    storage_errors: IntCounterVec,
    history_samples: IntGauge,
    open_anomalies: IntGauge,
}

impl SentinelMetricsInner {
    fn new() -> Self {
        Self {
            samples_ingested: register_int_counter!(
                "sentinel_samples_ingested_total",
                "Total number of metric samples ingested"
            )
            .expect("Failed to register samples_ingested"),

            detections: register_int_counter!(
                "sentinel_detections_total",
                "Total number of ensemble detections run"
            )
            .expect("Failed to register detections"),

            anomalies_recorded: register_int_counter_vec!(
                "sentinel_anomalies_recorded_total",
                "Total number of anomaly records created",
                &["severity"]
            )
            .expect("Failed to register anomalies_recorded"),

            detection_latency_seconds: register_histogram!(
                "sentinel_detection_latency_seconds",
                "Time spent running the detection ensemble",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register detection_latency_seconds"),

            storage_errors: register_int_counter_vec!(
                "sentinel_storage_errors_total",
                "Total number of document store read/write failures",
                &["document"]
            )
            .expect("Failed to register storage_errors"),

            history_samples: register_int_gauge!(
                "sentinel_history_samples",
                "Number of samples currently held in the metric history"
            )
            .expect("Failed to register history_samples"),

            open_anomalies: register_int_gauge!(
                "sentinel_open_anomalies",
                "Number of stored anomalies that are not resolved"
            )
            .expect("Failed to register open_anomalies"),
        }
    }
}

/// Engine metrics for Prometheus exposition
///
/// Lightweight handle to the global metrics instance; clones share the
/// same underlying metrics.
#[derive(Clone)]
pub struct SentinelMetrics {
    _private: (),
}

impl Default for SentinelMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl SentinelMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(SentinelMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &SentinelMetricsInner {
        GLOBAL_METRICS.get_or_init(SentinelMetricsInner::new)
    }

    pub fn inc_samples_ingested(&self) {
        self.inner().samples_ingested.inc();
    }

    pub fn inc_detections(&self) {
        self.inner().detections.inc();
    }

    pub fn observe_detection_latency(&self, duration_secs: f64) {
        self.inner().detection_latency_seconds.observe(duration_secs);
    }

    pub fn inc_anomalies_recorded(&self, severity: Severity) {
        self.inner()
            .anomalies_recorded
            .with_label_values(&[severity.as_str()])
            .inc();
    }

    pub fn inc_storage_errors(&self, document: &str) {
        self.inner()
            .storage_errors
            .with_label_values(&[document])
            .inc();
    }

    pub fn set_history_samples(&self, count: usize) {
        self.inner().history_samples.set(count as i64);
    }

    pub fn set_open_anomalies(&self, count: usize) {
        self.inner().open_anomalies.set(count as i64);
    }
}

/// Structured logger for engine events
#[derive(Debug, Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: &str) -> Self {
        Self {
            instance: instance.to_string(),
        }
    }

    pub fn instance(&self) -> &str {
        &self.instance
    }

    pub fn log_sample_ingested(&self, metric: &str, value: f64, cached: bool) {
        debug!(
            event = "sample_ingested",
            instance = %self.instance,
            metric = %metric,
            value = value,
            cached = cached,
            "Metric sample ingested"
        );
    }

    pub fn log_detection(&self, metric: &str, value: f64, verdict: &DetectionVerdict) {
        debug!(
            event = "detection_completed",
            instance = %self.instance,
            metric = %metric,
            value = value,
            is_anomaly = verdict.is_anomaly,
            anomaly_count = verdict.anomaly_count,
            confidence = verdict.confidence,
            flagged = ?verdict.flagged_methods(),
            "Ensemble detection completed"
        );
    }

    /// Log a newly recorded anomaly; high and critical severities log at warn
    pub fn log_anomaly(&self, record: &AnomalyRecord) {
        let methods = record.methods.flagged_names();
        match record.severity {
            Severity::Critical | Severity::High => {
                warn!(
                    event = "anomaly_detected",
                    instance = %self.instance,
                    anomaly_id = %record.id,
                    metric = %record.metric,
                    value = record.value,
                    confidence = record.confidence,
                    severity = %record.severity,
                    methods = ?methods,
                    "Severe anomaly detected"
                );
            }
            Severity::Medium | Severity::Low => {
                info!(
                    event = "anomaly_detected",
                    instance = %self.instance,
                    anomaly_id = %record.id,
                    metric = %record.metric,
                    value = record.value,
                    confidence = record.confidence,
                    severity = %record.severity,
                    methods = ?methods,
                    "Anomaly detected"
                );
            }
        }
    }

    pub fn log_acknowledged(&self, anomaly_id: &str) {
        info!(
            event = "anomaly_acknowledged",
            instance = %self.instance,
            anomaly_id = %anomaly_id,
            "Anomaly acknowledged"
        );
    }

    pub fn log_resolved(&self, anomaly_id: &str, note: &str) {
        info!(
            event = "anomaly_resolved",
            instance = %self.instance,
            anomaly_id = %anomaly_id,
            note = %note,
            "Anomaly resolved"
        );
    }

    pub fn log_lifecycle_miss(&self, action: &str, anomaly_id: &str) {
        debug!(
            event = "anomaly_not_found",
            instance = %self.instance,
            action = %action,
            anomaly_id = %anomaly_id,
            "Lifecycle update for unknown anomaly id"
        );
    }

    pub fn log_storage_error(&self, document: &str, operation: &str, error: &str) {
        warn!(
            event = "storage_error",
            instance = %self.instance,
            document = %document,
            operation = %operation,
            error = %error,
            "Document store failure, continuing with in-memory state"
        );
    }

    pub fn log_startup(&self, version: &str, backend: &str, history: usize, anomalies: usize) {
        info!(
            event = "engine_started",
            instance = %self.instance,
            version = %version,
            backend = %backend,
            history_samples = history,
            anomaly_records = anomalies,
            "Anomaly engine started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "engine_shutdown",
            instance = %self.instance,
            reason = %reason,
            "Anomaly engine shutting down"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_metrics_creation() {
        // Shares the process-wide registry; handles are cheap to create repeatedly
        let metrics = SentinelMetrics::new();
        let again = SentinelMetrics::new();

        metrics.inc_samples_ingested();
        metrics.inc_detections();
        metrics.observe_detection_latency(0.0002);
        metrics.inc_anomalies_recorded(Severity::High);
        again.inc_storage_errors("history");
        again.set_history_samples(42);
        again.set_open_anomalies(3);
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("test-instance");
        assert_eq!(logger.instance(), "test-instance");
    }
}
