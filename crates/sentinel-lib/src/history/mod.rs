//! Metric history storage
//!
//! - Durable, globally capped sample history read by the detector
//! - Low-latency rolling windows for a configurable set of reserved metrics

mod rolling_cache;
mod store;

pub use rolling_cache::{RollingWindowCache, DEFAULT_CACHED_METRICS, DEFAULT_WINDOW_CAPACITY};
pub use store::{MetricHistoryStore, DEFAULT_HISTORY_CAPACITY};
