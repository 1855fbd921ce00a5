//! In-memory rolling windows for reserved metrics
//!
//! Only metrics on the reserved list are cached; everything else bypasses
//! the cache. The detector never reads from here.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;

/// Metrics cached when no explicit list is configured
pub const DEFAULT_CACHED_METRICS: [&str; 4] =
    ["health_score", "error_count", "context_usage", "response_time"];

/// Default per-metric window length
pub const DEFAULT_WINDOW_CAPACITY: usize = 100;

/// Fixed-capacity FIFO windows keyed by metric name
#[derive(Debug)]
pub struct RollingWindowCache {
    capacity: usize,
    tracked: HashSet<String>,
    windows: Mutex<HashMap<String, VecDeque<f64>>>,
}

impl Default for RollingWindowCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHED_METRICS, DEFAULT_WINDOW_CAPACITY)
    }
}

impl RollingWindowCache {
    pub fn new<I, S>(tracked: I, capacity: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            capacity,
            tracked: tracked.into_iter().map(Into::into).collect(),
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub fn is_tracked(&self, metric: &str) -> bool {
        self.tracked.contains(metric)
    }

    /// Push a value; returns false when the metric is not reserved
    pub fn push(&self, metric: &str, value: f64) -> bool {
        if !self.is_tracked(metric) || self.capacity == 0 {
            return false;
        }

        let mut windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());
        let window = windows
            .entry(metric.to_string())
            .or_insert_with(|| VecDeque::with_capacity(self.capacity));
        while window.len() >= self.capacity {
            window.pop_front();
        }
        window.push_back(value);
        true
    }

    /// Snapshot of a reserved metric's window, oldest first
    pub fn window(&self, metric: &str) -> Option<Vec<f64>> {
        if !self.is_tracked(metric) {
            return None;
        }
        let windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());
        Some(
            windows
                .get(metric)
                .map(|w| w.iter().copied().collect())
                .unwrap_or_default(),
        )
    }

    pub fn latest(&self, metric: &str) -> Option<f64> {
        let windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());
        windows.get(metric).and_then(|w| w.back().copied())
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
