//! All-time counts over the anomaly record store

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use super::AnomalyRecordStore;
use crate::models::{AnomalyRecord, Severity};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AnomalyStatistics {
    pub total: usize,
    pub by_severity: BTreeMap<Severity, usize>,
    pub by_metric: BTreeMap<String, usize>,
    pub resolved_count: usize,
    pub unresolved_count: usize,
    pub acknowledged_count: usize,
}

impl AnomalyStatistics {
    pub fn from_records(records: &[AnomalyRecord]) -> Self {
        let mut stats = Self {
            total: records.len(),
            ..Self::default()
        };

        for record in records {
            *stats.by_severity.entry(record.severity).or_insert(0) += 1;
            *stats.by_metric.entry(record.metric.clone()).or_insert(0) += 1;
            if record.resolved {
                stats.resolved_count += 1;
            } else {
                stats.unresolved_count += 1;
            }
            if record.acknowledged {
                stats.acknowledged_count += 1;
            }
        }

        stats
    }
}

pub struct StatisticsReporter {
    records: Arc<AnomalyRecordStore>,
}

impl StatisticsReporter {
    pub fn new(records: Arc<AnomalyRecordStore>) -> Self {
        Self { records }
    }

    pub fn report(&self) -> AnomalyStatistics {
        AnomalyStatistics::from_records(&self.records.all())
    }
}
