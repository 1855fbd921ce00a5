//! The six statistical tests of the ensemble
//!
//! Every test takes the prior history (oldest first) and votes on the value
//! under test. A test whose minimum sample count is unmet votes "not flagged"
//! without a detail payload; a degenerate denominator also votes "not
//! flagged" but still reports the numbers it computed. A test whose numbers
//! leave the finite range votes "not flagged" without a detail payload.

use serde::{Deserialize, Serialize};

/// Minimum samples for the z-score test
pub const ZSCORE_MIN_SAMPLES: usize = 3;

/// Minimum samples for the interquartile range test
pub const IQR_MIN_SAMPLES: usize = 4;

/// Window length of the moving-average test
pub const MOVING_AVERAGE_WINDOW: usize = 10;

/// Minimum samples for exponential smoothing
pub const SMOOTHING_MIN_SAMPLES: usize = 2;

/// Smoothing factor for exponential smoothing
pub const SMOOTHING_ALPHA: f64 = 0.3;

/// Length of each of the two windows compared by the trend test
pub const TREND_WINDOW: usize = 20;

/// Absolute slope change above which the trend test flags
pub const TREND_CHANGE_THRESHOLD: f64 = 2.0;

/// Number of recent points averaged by the spike test
pub const SPIKE_WINDOW: usize = 5;

/// Ratio above which the spike test flags
pub const SPIKE_UPPER_RATIO: f64 = 2.0;

/// Ratio below which the spike test flags
pub const SPIKE_LOWER_RATIO: f64 = 0.5;

/// One test's vote plus the numbers behind it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodVote<T> {
    pub flagged: bool,
    /// Absent when the test did not have enough samples to run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<T>,
}

impl<T> MethodVote<T> {
    fn insufficient() -> Self {
        Self {
            flagged: false,
            detail: None,
        }
    }

    /// Whether the test had enough samples to run
    pub fn ran(&self) -> bool {
        self.detail.is_some()
    }
}

impl<T: FiniteDetail> MethodVote<T> {
    fn with_detail(flagged: bool, detail: T) -> Self {
        if !detail.is_finite() {
            return Self::insufficient();
        }
        Self {
            flagged,
            detail: Some(detail),
        }
    }

    /// False when the detail carries NaN or an infinity
    pub fn is_finite(&self) -> bool {
        self.detail.as_ref().map_or(true, FiniteDetail::is_finite)
    }
}

/// Detail payloads whose numbers must stay finite to be stored as JSON
pub trait FiniteDetail {
    fn is_finite(&self) -> bool;
}

fn all_finite(values: &[f64]) -> bool {
    values.iter().all(|v| v.is_finite())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZScoreDetail {
    pub mean: f64,
    pub std_dev: f64,
    pub z_score: f64,
    pub threshold: f64,
}

impl FiniteDetail for ZScoreDetail {
    fn is_finite(&self) -> bool {
        all_finite(&[self.mean, self.std_dev, self.z_score, self.threshold])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IqrDetail {
    pub q1: f64,
    pub q3: f64,
    pub iqr: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
}

impl FiniteDetail for IqrDetail {
    fn is_finite(&self) -> bool {
        all_finite(&[self.q1, self.q3, self.iqr, self.lower_bound, self.upper_bound])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovingAverageDetail {
    pub moving_avg: f64,
    pub deviation: f64,
    pub threshold: f64,
    pub window: usize,
}

impl FiniteDetail for MovingAverageDetail {
    fn is_finite(&self) -> bool {
        all_finite(&[self.moving_avg, self.deviation, self.threshold])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmoothingDetail {
    pub smoothed: f64,
    pub deviation: f64,
    pub threshold: f64,
    pub alpha: f64,
}

impl FiniteDetail for SmoothingDetail {
    fn is_finite(&self) -> bool {
        all_finite(&[self.smoothed, self.deviation, self.threshold, self.alpha])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    SuddenIncrease,
    SuddenDecrease,
    Stable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendDetail {
    pub slope_earlier: f64,
    pub slope_later: f64,
    pub trend_change: f64,
    pub trend: TrendDirection,
}

impl FiniteDetail for TrendDetail {
    fn is_finite(&self) -> bool {
        all_finite(&[self.slope_earlier, self.slope_later, self.trend_change])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpikeDetail {
    pub recent_avg: f64,
    pub ratio: f64,
}

impl FiniteDetail for SpikeDetail {
    fn is_finite(&self) -> bool {
        all_finite(&[self.recent_avg, self.ratio])
    }
}

/// Z-score of `current` against the population mean/std of `history`
pub fn zscore(history: &[f64], current: f64, threshold: f64) -> MethodVote<ZScoreDetail> {
    if history.len() < ZSCORE_MIN_SAMPLES {
        return MethodVote::insufficient();
    }

    let mean = mean(history);
    let std_dev = population_std_dev(history, mean);

    // Constant history: nothing to scale against
    if std_dev == 0.0 {
        return MethodVote::with_detail(
            false,
            ZScoreDetail {
                mean,
                std_dev,
                z_score: 0.0,
                threshold,
            },
        );
    }

    let z_score = (current - mean).abs() / std_dev;
    MethodVote::with_detail(
        z_score > threshold,
        ZScoreDetail {
            mean,
            std_dev,
            z_score,
            threshold,
        },
    )
}

/// Tukey fences around the 25th/75th percentiles of `history`
pub fn iqr(history: &[f64], current: f64, multiplier: f64) -> MethodVote<IqrDetail> {
    if history.len() < IQR_MIN_SAMPLES {
        return MethodVote::insufficient();
    }

    let mut sorted = history.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let q1 = percentile(&sorted, 25.0);
    let q3 = percentile(&sorted, 75.0);
    let iqr = q3 - q1;
    let lower_bound = q1 - multiplier * iqr;
    let upper_bound = q3 + multiplier * iqr;

    MethodVote::with_detail(
        current < lower_bound || current > upper_bound,
        IqrDetail {
            q1,
            q3,
            iqr,
            lower_bound,
            upper_bound,
        },
    )
}

/// Relative deviation of `current` from the mean of the last ten points
pub fn moving_average(
    history: &[f64],
    current: f64,
    threshold: f64,
) -> MethodVote<MovingAverageDetail> {
    if history.len() < MOVING_AVERAGE_WINDOW {
        return MethodVote::insufficient();
    }

    let moving_avg = mean(&history[history.len() - MOVING_AVERAGE_WINDOW..]);
    let deviation = relative_deviation(current, moving_avg);

    MethodVote::with_detail(
        deviation > threshold,
        MovingAverageDetail {
            moving_avg,
            deviation,
            threshold,
            window: MOVING_AVERAGE_WINDOW,
        },
    )
}

/// Relative deviation of `current` from the exponentially smoothed history
pub fn exponential_smoothing(
    history: &[f64],
    current: f64,
    threshold: f64,
) -> MethodVote<SmoothingDetail> {
    if history.len() < SMOOTHING_MIN_SAMPLES {
        return MethodVote::insufficient();
    }

    let smoothed = history[1..].iter().fold(history[0], |smoothed, v| {
        SMOOTHING_ALPHA * v + (1.0 - SMOOTHING_ALPHA) * smoothed
    });
    let deviation = relative_deviation(current, smoothed);

    MethodVote::with_detail(
        deviation > threshold,
        SmoothingDetail {
            smoothed,
            deviation,
            threshold,
            alpha: SMOOTHING_ALPHA,
        },
    )
}

/// Change in average slope between the two most recent 20-point windows
///
/// Looks only at history; the value under test does not take part.
pub fn trend_shift(history: &[f64]) -> MethodVote<TrendDetail> {
    if history.len() < 2 * TREND_WINDOW {
        return MethodVote::insufficient();
    }

    let recent = &history[history.len() - 2 * TREND_WINDOW..];
    let (earlier, later) = recent.split_at(TREND_WINDOW);
    let slope_earlier = average_step(earlier);
    let slope_later = average_step(later);
    let trend_change = (slope_later - slope_earlier).abs();

    let flagged = trend_change > TREND_CHANGE_THRESHOLD;
    let trend = if !flagged {
        TrendDirection::Stable
    } else if slope_later > 0.0 {
        TrendDirection::SuddenIncrease
    } else {
        TrendDirection::SuddenDecrease
    };

    MethodVote::with_detail(
        flagged,
        TrendDetail {
            slope_earlier,
            slope_later,
            trend_change,
            trend,
        },
    )
}

/// Ratio of `current` to the mean of the last five points
pub fn spike(history: &[f64], current: f64) -> MethodVote<SpikeDetail> {
    if history.len() < SPIKE_WINDOW {
        return MethodVote::insufficient();
    }

    let recent_avg = mean(&history[history.len() - SPIKE_WINDOW..]);
    if recent_avg == 0.0 {
        return MethodVote::with_detail(
            false,
            SpikeDetail {
                recent_avg,
                ratio: 0.0,
            },
        );
    }

    let ratio = current / recent_avg;
    MethodVote::with_detail(
        ratio > SPIKE_UPPER_RATIO || ratio < SPIKE_LOWER_RATIO,
        SpikeDetail { recent_avg, ratio },
    )
}

/// Percentile of pre-sorted values using linear interpolation between closest ranks
///
/// `p` is in percent. Rank is `p/100 * (n - 1)`, matching the common
/// "linear" convention rather than nearest-rank.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let rank = (p / 100.0).clamp(0.0, 1.0) * (n - 1) as f64;
            let lower = rank.floor() as usize;
            let upper = rank.ceil() as usize;
            let fraction = rank - lower as f64;
            sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
        }
    }
}

/// Arithmetic mean, scaling each term first so values near `f64::MAX` do not overflow
fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    values.iter().map(|v| v / n).sum()
}

fn population_std_dev(values: &[f64], mean: f64) -> f64 {
    let first = values[0];
    if values.iter().all(|v| *v == first) {
        return 0.0;
    }
    let n = values.len() as f64;
    let variance: f64 = values.iter().map(|v| (v - mean).powi(2) / n).sum();
    variance.sqrt()
}

/// `|current - baseline| / baseline`, or 0 when the baseline is 0
fn relative_deviation(current: f64, baseline: f64) -> f64 {
    if baseline == 0.0 {
        return 0.0;
    }
    (current - baseline).abs() / baseline
}

/// Mean of consecutive differences
fn average_step(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let steps: Vec<f64> = values.windows(2).map(|w| w[1] - w[0]).collect();
    mean(&steps)
}
