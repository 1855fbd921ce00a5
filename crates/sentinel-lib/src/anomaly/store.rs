//! Durable anomaly record store
//!
//! Records are kept most-recent-first and capped; the oldest records beyond
//! the cap are dropped without notice. Every mutation is a single locked
//! modify/truncate/save cycle.

use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::clock::Clock;
use crate::detector::DetectionVerdict;
use crate::models::{AnomalyFilter, AnomalyRecord, Severity};
use crate::storage::DocumentHandle;

/// Default number of anomaly records retained
pub const DEFAULT_ANOMALY_CAPACITY: usize = 1000;

/// Most-recent-first list of anomalies with lifecycle state
pub struct AnomalyRecordStore {
    records: Mutex<VecDeque<AnomalyRecord>>,
    capacity: usize,
    document: DocumentHandle,
    clock: Arc<dyn Clock>,
}

impl AnomalyRecordStore {
    /// Open the store, loading any persisted records
    pub fn open(document: DocumentHandle, capacity: usize, clock: Arc<dyn Clock>) -> Self {
        let mut records: VecDeque<AnomalyRecord> = document.load().unwrap_or_default();
        records.truncate(capacity);

        Self {
            records: Mutex::new(records),
            capacity,
            document,
            clock,
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<AnomalyRecord>> {
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Store an anomaly for a verdict whose votes flag one
    ///
    /// Anomaly status, confidence and severity are recomputed from the
    /// per-method votes; the verdict's own summary fields are ignored.
    /// Returns `None` without touching the store when the votes are not
    /// anomalous, the verdict carries no per-method results, or a number
    /// could not be written as JSON.
    pub fn record(
        &self,
        metric: &str,
        value: f64,
        verdict: &DetectionVerdict,
    ) -> Option<AnomalyRecord> {
        let derived = DetectionVerdict::from_methods(verdict.methods.clone()?);
        if !derived.is_anomaly || !value.is_finite() {
            return None;
        }
        let methods = derived.methods?;
        if !methods.is_finite() {
            return None;
        }
        let now = self.clock.now();

        let mut records = self.lock();
        let record = AnomalyRecord {
            id: unique_id(&records, now),
            metric: metric.to_string(),
            value,
            confidence: derived.confidence,
            methods,
            severity: Severity::from_confidence(derived.confidence),
            timestamp: now,
            acknowledged: false,
            acknowledged_at: None,
            resolved: false,
            resolved_at: None,
            resolution_note: None,
        };

        records.push_front(record.clone());
        records.truncate(self.capacity);
        self.document.save(&*records);

        Some(record)
    }

    /// Mark an anomaly acknowledged; repeated calls re-stamp `acknowledged_at`
    pub fn acknowledge(&self, id: &str) -> bool {
        let now = self.clock.now();
        self.update(id, |record| {
            record.acknowledged = true;
            record.acknowledged_at = Some(now);
        })
    }

    /// Mark an anomaly resolved, whether or not it was acknowledged
    pub fn resolve(&self, id: &str, note: &str) -> bool {
        let now = self.clock.now();
        self.update(id, |record| {
            record.resolved = true;
            record.resolved_at = Some(now);
            record.resolution_note = Some(note.to_string());
        })
    }

    fn update(&self, id: &str, apply: impl FnOnce(&mut AnomalyRecord)) -> bool {
        let mut records = self.lock();
        match records.iter_mut().find(|r| r.id == id) {
            Some(record) => {
                apply(record);
                self.document.save(&*records);
                true
            }
            None => false,
        }
    }

    /// Filter most-recent-first, then truncate to the limit
    pub fn list(&self, filter: &AnomalyFilter) -> Vec<AnomalyRecord> {
        self.lock()
            .iter()
            .filter(|r| filter.matches(r))
            .take(filter.limit)
            .cloned()
            .collect()
    }

    pub fn get(&self, id: &str) -> Option<AnomalyRecord> {
        self.lock().iter().find(|r| r.id == id).cloned()
    }

    /// Copy of every stored record, most recent first
    pub fn all(&self) -> Vec<AnomalyRecord> {
        self.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn unresolved_count(&self) -> usize {
        self.lock().iter().filter(|r| !r.resolved).count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// `anomaly_<YYYYMMDD_HHMMSS_micros>`, suffixed when that id is already taken
fn unique_id(records: &VecDeque<AnomalyRecord>, now: DateTime<Utc>) -> String {
    let base = format!("anomaly_{}", now.format("%Y%m%d_%H%M%S_%6f"));
    if !records.iter().any(|r| r.id == base) {
        return base;
    }
    let mut n = 1;
    loop {
        let candidate = format!("{}_{}", base, n);
        if !records.iter().any(|r| r.id == candidate) {
            return candidate;
        }
        n += 1;
    }
}
