//! Engine facade wiring storage, detection and the anomaly lifecycle

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::warn;

use crate::anomaly::{
    AnomalyRecordStore, AnomalyStatistics, InsightEngine, InsightsReport, StatisticsReporter,
};
use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::detector::{DetectionVerdict, EnsembleDetector, Sensitivity};
use crate::health::{components, HealthRegistry};
use crate::history::{MetricHistoryStore, RollingWindowCache};
use crate::models::{AnomalyFilter, AnomalyRecord, MetricSample};
use crate::observability::{SentinelMetrics, StructuredLogger};
use crate::storage::{
    DocumentHandle, DocumentStore, Instrumentation, JsonFileStore, MemoryStore,
    ANOMALIES_DOCUMENT, HISTORY_DOCUMENT,
};

const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Errors returned for input the engine refuses to store or judge
#[derive(Debug, Error, PartialEq)]
pub enum EngineError {
    #[error("value for metric '{metric}' must be finite, got {value}")]
    NonFiniteValue { metric: String, value: f64 },
}

fn ensure_finite(metric: &str, value: f64) -> Result<(), EngineError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(EngineError::NonFiniteValue {
            metric: metric.to_string(),
            value,
        })
    }
}

/// Result of [`SentinelEngine::observe`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub verdict: DetectionVerdict,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record: Option<AnomalyRecord>,
}

/// Anomaly detection engine
///
/// Shared across threads behind an `Arc`; every operation is synchronous.
pub struct SentinelEngine {
    config: EngineConfig,
    backend: Arc<dyn DocumentStore>,
    instrumentation: Instrumentation,
    history: Arc<MetricHistoryStore>,
    cache: RollingWindowCache,
    detector: EnsembleDetector,
    records: Arc<AnomalyRecordStore>,
    insights: InsightEngine,
    statistics: StatisticsReporter,
}

impl SentinelEngine {
    /// Open an engine on the wall clock
    pub fn open(config: EngineConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Open an engine, choosing the backend from `config.data_dir`
    ///
    /// A data directory that cannot be created falls back to in-memory
    /// storage and leaves both stores degraded.
    pub fn with_clock(config: EngineConfig, clock: Arc<dyn Clock>) -> Self {
        let mut open_error = None;
        let backend: Arc<dyn DocumentStore> = match &config.data_dir {
            Some(dir) => match JsonFileStore::open(dir) {
                Ok(store) => Arc::new(store),
                Err(e) => {
                    warn!(
                        data_dir = %dir.display(),
                        error = %e,
                        "Failed to open data directory, falling back to in-memory storage"
                    );
                    open_error = Some(e.to_string());
                    Arc::new(MemoryStore::new())
                }
            },
            None => Arc::new(MemoryStore::new()),
        };

        let engine = Self::with_backend(config, backend, clock);
        if let Some(error) = open_error {
            let health = &engine.instrumentation.health;
            health.set_degraded(components::HISTORY_STORE, error.clone());
            health.set_degraded(components::ANOMALY_STORE, error);
        }
        engine
    }

    /// Open an engine on an explicit backend
    pub fn with_backend(
        config: EngineConfig,
        backend: Arc<dyn DocumentStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let instrumentation = Instrumentation::new(&config.instance);

        let history = Arc::new(MetricHistoryStore::open(
            DocumentHandle::new(
                backend.clone(),
                HISTORY_DOCUMENT,
                components::HISTORY_STORE,
                instrumentation.clone(),
            ),
            config.history_capacity,
            clock.clone(),
        ));
        let records = Arc::new(AnomalyRecordStore::open(
            DocumentHandle::new(
                backend.clone(),
                ANOMALIES_DOCUMENT,
                components::ANOMALY_STORE,
                instrumentation.clone(),
            ),
            config.anomaly_capacity,
            clock.clone(),
        ));

        let cache = RollingWindowCache::new(
            config.cached_metrics.iter().cloned(),
            config.rolling_window_capacity,
        );

        instrumentation.metrics.set_history_samples(history.len());
        instrumentation
            .metrics
            .set_open_anomalies(records.unresolved_count());
        instrumentation.logger.log_startup(
            ENGINE_VERSION,
            &backend.describe(),
            history.len(),
            records.len(),
        );

        Self {
            detector: EnsembleDetector::new(history.clone()),
            insights: InsightEngine::new(records.clone(), clock),
            statistics: StatisticsReporter::new(records.clone()),
            config,
            backend,
            instrumentation,
            history,
            cache,
            records,
        }
    }

    /// Append a sample to the history, and to its rolling window when reserved
    pub fn ingest(
        &self,
        metric: &str,
        value: f64,
        timestamp: Option<DateTime<Utc>>,
    ) -> Result<MetricSample, EngineError> {
        ensure_finite(metric, value)?;
        let sample = self.history.append(metric, value, timestamp);
        let cached = self.cache.push(metric, value);

        let metrics = &self.instrumentation.metrics;
        metrics.inc_samples_ingested();
        metrics.set_history_samples(self.history.len());
        self.instrumentation
            .logger
            .log_sample_ingested(metric, value, cached);

        Ok(sample)
    }

    /// Judge `value` against the stored history of `metric`
    ///
    /// Call before ingesting `value`, otherwise it becomes part of its own baseline.
    pub fn detect(
        &self,
        metric: &str,
        value: f64,
        sensitivity: Sensitivity,
    ) -> Result<DetectionVerdict, EngineError> {
        ensure_finite(metric, value)?;
        let started = Instant::now();
        let verdict = self.detector.detect(metric, value, sensitivity);

        let metrics = &self.instrumentation.metrics;
        metrics.observe_detection_latency(started.elapsed().as_secs_f64());
        metrics.inc_detections();
        self.instrumentation
            .logger
            .log_detection(metric, value, &verdict);

        Ok(verdict)
    }

    /// Store an anomaly when the verdict's method votes flag one
    pub fn record(
        &self,
        metric: &str,
        value: f64,
        verdict: &DetectionVerdict,
    ) -> Result<Option<AnomalyRecord>, EngineError> {
        ensure_finite(metric, value)?;
        let Some(record) = self.records.record(metric, value, verdict) else {
            return Ok(None);
        };

        let metrics = &self.instrumentation.metrics;
        metrics.inc_anomalies_recorded(record.severity);
        metrics.set_open_anomalies(self.records.unresolved_count());
        self.instrumentation.logger.log_anomaly(&record);

        Ok(Some(record))
    }

    /// Detect against prior history, ingest, then record when anomalous
    pub fn observe(
        &self,
        metric: &str,
        value: f64,
        sensitivity: Sensitivity,
    ) -> Result<Observation, EngineError> {
        let verdict = self.detect(metric, value, sensitivity)?;
        self.ingest(metric, value, None)?;
        let record = self.record(metric, value, &verdict)?;
        Ok(Observation { verdict, record })
    }

    pub fn list_anomalies(&self, filter: &AnomalyFilter) -> Vec<AnomalyRecord> {
        self.records.list(filter)
    }

    pub fn get_anomaly(&self, id: &str) -> Option<AnomalyRecord> {
        self.records.get(id)
    }

    pub fn acknowledge(&self, id: &str) -> bool {
        let found = self.records.acknowledge(id);
        let logger = &self.instrumentation.logger;
        if found {
            logger.log_acknowledged(id);
        } else {
            logger.log_lifecycle_miss("acknowledge", id);
        }
        found
    }

    pub fn resolve(&self, id: &str, note: &str) -> bool {
        let found = self.records.resolve(id, note);
        let logger = &self.instrumentation.logger;
        if found {
            logger.log_resolved(id, note);
            self.instrumentation
                .metrics
                .set_open_anomalies(self.records.unresolved_count());
        } else {
            logger.log_lifecycle_miss("resolve", id);
        }
        found
    }

    pub fn insights(&self) -> InsightsReport {
        self.insights.generate()
    }

    pub fn statistics(&self) -> AnomalyStatistics {
        self.statistics.report()
    }

    /// Rolling window snapshot; `None` for metrics that are not reserved
    pub fn rolling_window(&self, metric: &str) -> Option<Vec<f64>> {
        self.cache.window(metric)
    }

    /// Stored history values for `metric`, oldest first
    pub fn history(&self, metric: &str) -> Vec<f64> {
        self.history.query(metric)
    }

    /// Stored samples for `metric` with their timestamps, oldest first
    pub fn samples(&self, metric: &str) -> Vec<MetricSample> {
        self.history.samples(metric)
    }

    /// Names of every metric with stored history, sorted
    pub fn metric_names(&self) -> Vec<String> {
        self.history.metrics()
    }

    pub fn default_sensitivity(&self) -> Sensitivity {
        self.config.default_sensitivity
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn health(&self) -> &HealthRegistry {
        &self.instrumentation.health
    }

    pub fn metrics(&self) -> &SentinelMetrics {
        &self.instrumentation.metrics
    }

    pub fn logger(&self) -> &StructuredLogger {
        &self.instrumentation.logger
    }

    pub fn backend_description(&self) -> String {
        self.backend.describe()
    }
}
