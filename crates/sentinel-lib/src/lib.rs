//! Anomaly detection engine for scalar metrics
//!
//! This crate provides the core functionality for:
//! - Durable metric history with optional rolling windows
//! - Ensemble anomaly detection over six statistical tests
//! - Anomaly lifecycle (severity, acknowledgment, resolution)
//! - Insights and statistics over recorded anomalies
//! - Health checks and observability

pub mod anomaly;
pub mod clock;
pub mod config;
pub mod detector;
pub mod engine;
pub mod health;
pub mod history;
pub mod models;
pub mod observability;
pub mod storage;

pub use anomaly::{AnomalyStatistics, Insight, InsightsReport};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::EngineConfig;
pub use detector::{DetectionVerdict, Sensitivity};
pub use engine::{EngineError, Observation, SentinelEngine};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{SentinelMetrics, StructuredLogger};
