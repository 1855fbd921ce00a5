//! Durable append-only metric history
//!
//! All metrics share a single sample list. The cap applies to the list as a
//! whole, so a chatty metric can push a quiet metric's samples out.

use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::clock::Clock;
use crate::models::MetricSample;
use crate::storage::DocumentHandle;

/// Default global sample cap across all metrics
pub const DEFAULT_HISTORY_CAPACITY: usize = 10_000;

/// Global time series of metric samples, oldest first
pub struct MetricHistoryStore {
    samples: Mutex<VecDeque<MetricSample>>,
    capacity: usize,
    document: DocumentHandle,
    clock: Arc<dyn Clock>,
}

impl MetricHistoryStore {
    /// Open the store, loading any persisted samples
    pub fn open(document: DocumentHandle, capacity: usize, clock: Arc<dyn Clock>) -> Self {
        let mut samples: VecDeque<MetricSample> = document.load().unwrap_or_default();
        trim_front(&mut samples, capacity);

        Self {
            samples: Mutex::new(samples),
            capacity,
            document,
            clock,
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<MetricSample>> {
        self.samples.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Append a sample, stamping it with the clock when no timestamp is given
    ///
    /// The append, trim and save happen under one lock.
    pub fn append(
        &self,
        metric: &str,
        value: f64,
        timestamp: Option<DateTime<Utc>>,
    ) -> MetricSample {
        let sample = MetricSample {
            metric_name: metric.to_string(),
            value,
            timestamp: timestamp.unwrap_or_else(|| self.clock.now()),
        };

        let mut samples = self.lock();
        samples.push_back(sample.clone());
        trim_front(&mut samples, self.capacity);
        self.document.save(&*samples);

        sample
    }

    /// All values recorded for `metric`, oldest to newest
    pub fn query(&self, metric: &str) -> Vec<f64> {
        self.lock()
            .iter()
            .filter(|s| s.metric_name == metric)
            .map(|s| s.value)
            .collect()
    }

    /// Full samples recorded for `metric`, oldest to newest
    pub fn samples(&self, metric: &str) -> Vec<MetricSample> {
        self.lock()
            .iter()
            .filter(|s| s.metric_name == metric)
            .cloned()
            .collect()
    }

    /// Distinct metric names present in the history, sorted
    pub fn metrics(&self) -> Vec<String> {
        self.lock()
            .iter()
            .map(|s| s.metric_name.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

fn trim_front(samples: &mut VecDeque<MetricSample>, capacity: usize) {
    while samples.len() > capacity {
        samples.pop_front();
    }
}
