//! Ensemble anomaly detection
//!
//! Six independent statistical tests vote on whether the latest value of a
//! metric is anomalous:
//! - Z-score and interquartile range (sensitivity-scaled)
//! - Moving-average and exponential-smoothing deviation (sensitivity-scaled)
//! - Trend shift between the two most recent 20-point windows
//! - Spike ratio against the last five points

mod ensemble;
pub mod methods;
mod sensitivity;

pub use ensemble::{
    DetectionVerdict, EnsembleDetector, MethodResults, ANOMALY_VOTE_THRESHOLD,
    INSUFFICIENT_DATA_MESSAGE, MIN_HISTORY_FOR_DETECTION, TOTAL_METHODS,
};
pub use methods::{
    FiniteDetail, IqrDetail, MethodVote, MovingAverageDetail, SmoothingDetail, SpikeDetail,
    TrendDetail, TrendDirection, ZScoreDetail,
};
pub use sensitivity::{ParseSensitivityError, Sensitivity, SensitivityProfile};
