//! Anomaly lifecycle and reporting
//!
//! This module provides:
//! - The durable, most-recent-first anomaly record store
//! - Acknowledgment and resolution of stored anomalies
//! - 24-hour insights and all-time statistics over the store

mod insights;
mod statistics;
mod store;

pub use insights::{Insight, InsightEngine, InsightKind, InsightPriority, InsightsReport};
pub use statistics::{AnomalyStatistics, StatisticsReporter};
pub use store::{AnomalyRecordStore, DEFAULT_ANOMALY_CAPACITY};
