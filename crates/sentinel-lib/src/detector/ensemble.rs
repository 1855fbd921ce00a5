//! Vote aggregation across the six tests

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::methods::{
    self, IqrDetail, MethodVote, MovingAverageDetail, SmoothingDetail, SpikeDetail, TrendDetail,
    ZScoreDetail,
};
use super::Sensitivity;
use crate::history::MetricHistoryStore;

/// Minimum history length before any test runs
pub const MIN_HISTORY_FOR_DETECTION: usize = 10;

/// Number of tests in the ensemble
pub const TOTAL_METHODS: usize = 6;

/// Number of flagging tests required to call a value anomalous
pub const ANOMALY_VOTE_THRESHOLD: usize = 2;

/// Message carried by the insufficient-history verdict
pub const INSUFFICIENT_DATA_MESSAGE: &str = "insufficient data";

/// Per-test votes for one detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodResults {
    pub zscore: MethodVote<ZScoreDetail>,
    pub iqr: MethodVote<IqrDetail>,
    pub moving_average: MethodVote<MovingAverageDetail>,
    pub exponential_smoothing: MethodVote<SmoothingDetail>,
    pub trend: MethodVote<TrendDetail>,
    pub spike: MethodVote<SpikeDetail>,
}

impl MethodResults {
    /// Method names paired with their votes, in ensemble order
    pub fn votes(&self) -> [(&'static str, bool); TOTAL_METHODS] {
        [
            ("zscore", self.zscore.flagged),
            ("iqr", self.iqr.flagged),
            ("moving_average", self.moving_average.flagged),
            ("exponential_smoothing", self.exponential_smoothing.flagged),
            ("trend", self.trend.flagged),
            ("spike", self.spike.flagged),
        ]
    }

    pub fn flagged_count(&self) -> usize {
        self.votes().iter().filter(|(_, flagged)| *flagged).count()
    }

    /// False when any detail payload carries NaN or an infinity
    pub fn is_finite(&self) -> bool {
        self.zscore.is_finite()
            && self.iqr.is_finite()
            && self.moving_average.is_finite()
            && self.exponential_smoothing.is_finite()
            && self.trend.is_finite()
            && self.spike.is_finite()
    }

    pub fn flagged_names(&self) -> Vec<&'static str> {
        self.votes()
            .iter()
            .filter(|(_, flagged)| *flagged)
            .map(|(name, _)| *name)
            .collect()
    }
}

/// Outcome of one detection call; never persisted on its own
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionVerdict {
    pub is_anomaly: bool,
    /// Share of flagging tests, in percent
    pub confidence: f64,
    pub anomaly_count: usize,
    pub total_methods: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub methods: Option<MethodResults>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl DetectionVerdict {
    /// Verdict for a metric with too little history to judge
    pub fn insufficient_data() -> Self {
        Self {
            is_anomaly: false,
            confidence: 0.0,
            anomaly_count: 0,
            total_methods: TOTAL_METHODS,
            methods: None,
            message: Some(INSUFFICIENT_DATA_MESSAGE.to_string()),
        }
    }

    /// Aggregate the six votes
    pub fn from_methods(methods: MethodResults) -> Self {
        let anomaly_count = methods.flagged_count();
        Self {
            is_anomaly: anomaly_count >= ANOMALY_VOTE_THRESHOLD,
            confidence: anomaly_count as f64 / TOTAL_METHODS as f64 * 100.0,
            anomaly_count,
            total_methods: TOTAL_METHODS,
            methods: Some(methods),
            message: None,
        }
    }

    pub fn is_insufficient(&self) -> bool {
        self.methods.is_none()
    }

    pub fn flagged_methods(&self) -> Vec<&'static str> {
        self.methods
            .as_ref()
            .map(MethodResults::flagged_names)
            .unwrap_or_default()
    }
}

/// Runs the six tests against a metric's stored history
pub struct EnsembleDetector {
    history: Arc<MetricHistoryStore>,
}

impl EnsembleDetector {
    pub fn new(history: Arc<MetricHistoryStore>) -> Self {
        Self { history }
    }

    /// Judge `current` against everything stored for `metric`
    ///
    /// The value under test must not already be in the history.
    pub fn detect(&self, metric: &str, current: f64, sensitivity: Sensitivity) -> DetectionVerdict {
        let history = self.history.query(metric);
        Self::evaluate(&history, current, sensitivity)
    }

    /// Judge `current` against an explicit history, oldest first
    pub fn evaluate(history: &[f64], current: f64, sensitivity: Sensitivity) -> DetectionVerdict {
        if history.len() < MIN_HISTORY_FOR_DETECTION {
            return DetectionVerdict::insufficient_data();
        }

        let profile = sensitivity.profile();
        DetectionVerdict::from_methods(MethodResults {
            zscore: methods::zscore(history, current, profile.zscore_threshold),
            iqr: methods::iqr(history, current, profile.iqr_multiplier),
            moving_average: methods::moving_average(history, current, profile.deviation_threshold),
            exponential_smoothing: methods::exponential_smoothing(
                history,
                current,
                profile.deviation_threshold,
            ),
            trend: methods::trend_shift(history),
            spike: methods::spike(history, current),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Deterministic values spread over [95, 105]
    fn latency_history(n: usize) -> Vec<f64> {
        (0..n).map(|i| 95.0 + ((i * 7) % 11) as f64).collect()
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 0.01
    }

    #[test]
    fn test_insufficient_history_short_circuits() {
        for n in 0..MIN_HISTORY_FOR_DETECTION {
            let history = latency_history(n);
            for current in [0.0, 100.0, 1e9] {
                let verdict = EnsembleDetector::evaluate(&history, current, Sensitivity::High);
                assert!(!verdict.is_anomaly);
                assert_eq!(verdict.confidence, 0.0);
                assert!(verdict.methods.is_none());
                assert_eq!(verdict.message.as_deref(), Some(INSUFFICIENT_DATA_MESSAGE));
            }
        }
    }

    #[test]
    fn test_clear_outlier_flags_most_methods() {
        let history = latency_history(30);
        let verdict = EnsembleDetector::evaluate(&history, 500.0, Sensitivity::Medium);

        assert!(verdict.is_anomaly);
        assert!(verdict.anomaly_count >= 4);
        assert!(verdict.confidence >= 66.6);
        let methods = verdict.methods.as_ref().unwrap();
        assert!(methods.zscore.flagged);
        assert!(methods.iqr.flagged);
        assert!(methods.moving_average.flagged);
        assert!(methods.exponential_smoothing.flagged);
        assert!(methods.spike.flagged);
        assert!(!methods.trend.flagged);
        assert!(!methods.trend.ran());
    }

    #[test]
    fn test_normal_value_is_not_anomalous() {
        let history = latency_history(30);
        let verdict = EnsembleDetector::evaluate(&history, 100.0, Sensitivity::Medium);
        assert!(!verdict.is_anomaly);
        assert_eq!(verdict.anomaly_count, 0);
    }

    #[test]
    fn test_single_flag_never_makes_an_anomaly() {
        let quiet = EnsembleDetector::evaluate(&[10.0; 12], 10.0, Sensitivity::Low);
        assert_eq!(quiet.anomaly_count, 0);

        let methods = MethodResults {
            spike: methods::spike(&[10.0; 5], 25.0),
            ..quiet.methods.unwrap()
        };
        let verdict = DetectionVerdict::from_methods(methods);
        assert_eq!(verdict.anomaly_count, 1);
        assert!(!verdict.is_anomaly);
        assert!(approx(verdict.confidence, 16.67));
    }

    #[test]
    fn test_confidence_is_a_sixth_multiple() {
        let allowed = [0.0, 16.67, 33.33, 50.0, 66.67, 83.33, 100.0];
        let history = latency_history(45);
        for sensitivity in [Sensitivity::Low, Sensitivity::Medium, Sensitivity::High] {
            for current in [-50.0, 0.0, 50.0, 90.0, 100.0, 110.0, 130.0, 210.0, 1000.0] {
                let verdict = EnsembleDetector::evaluate(&history, current, sensitivity);
                assert!(allowed.iter().any(|a| approx(*a, verdict.confidence)));
                assert_eq!(verdict.is_anomaly, verdict.anomaly_count >= 2);
                assert_eq!(verdict.total_methods, TOTAL_METHODS);
            }
        }
    }

    #[test]
    fn test_sensitivity_changes_outcome() {
        let history = latency_history(30);
        // ~25% above the mean: high sensitivity (20%) flags the deviation tests,
        // low sensitivity (50%) does not.
        let high = EnsembleDetector::evaluate(&history, 125.0, Sensitivity::High);
        let low = EnsembleDetector::evaluate(&history, 125.0, Sensitivity::Low);
        assert!(high.anomaly_count > low.anomaly_count);
    }

    #[test]
    fn test_verdict_serialization_shape() {
        let verdict = EnsembleDetector::evaluate(&latency_history(30), 500.0, Sensitivity::Medium);
        let json = serde_json::to_value(&verdict).unwrap();
        assert_eq!(json["total_methods"], 6);
        assert_eq!(json["methods"]["spike"]["flagged"], true);
        assert!(json["methods"]["trend"].get("detail").is_none());
        assert!(json.get("message").is_none());

        let insufficient = serde_json::to_value(DetectionVerdict::insufficient_data()).unwrap();
        assert_eq!(insufficient["message"], "insufficient data");
        assert!(insufficient.get("methods").is_none());
    }

    #[test]
    fn test_verdict_deserializes_without_detail() {
        let verdict = EnsembleDetector::evaluate(&latency_history(30), 500.0, Sensitivity::Medium);
        let json = serde_json::to_string(&verdict).unwrap();
        let parsed: DetectionVerdict = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.anomaly_count, verdict.anomaly_count);
        assert_eq!(parsed.flagged_methods(), verdict.flagged_methods());
        assert!(!parsed.methods.unwrap().trend.ran());
    }

    #[test]
    fn test_huge_history_keeps_details_finite() {
        let verdict = EnsembleDetector::evaluate(&[1e308; 12], 1.0, Sensitivity::Medium);
        assert!(verdict.is_anomaly);
        assert!(verdict.methods.unwrap().is_finite());
    }

    #[test]
    fn test_flagged_method_names() {
        let verdict = EnsembleDetector::evaluate(&latency_history(30), 500.0, Sensitivity::Medium);
        let names = verdict.flagged_methods();
        assert!(names.contains(&"zscore"));
        assert!(names.contains(&"spike"));
        assert!(!names.contains(&"trend"));
        assert!(DetectionVerdict::insufficient_data().flagged_methods().is_empty());
    }
}
