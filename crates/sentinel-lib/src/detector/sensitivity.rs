//! Sensitivity profiles for the threshold-scaled tests

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Named strictness level for detection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sensitivity {
    Low,
    #[default]
    Medium,
    High,
}

/// Thresholds used by the z-score, IQR and deviation tests
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensitivityProfile {
    /// Absolute z-score above which a value is flagged
    pub zscore_threshold: f64,
    /// Multiple of the IQR added beyond the quartiles
    pub iqr_multiplier: f64,
    /// Relative deviation (fraction, not percent) for the moving-average and smoothing tests
    pub deviation_threshold: f64,
}

impl Sensitivity {
    pub fn profile(&self) -> SensitivityProfile {
        match self {
            Sensitivity::Low => SensitivityProfile {
                zscore_threshold: 4.0,
                iqr_multiplier: 2.0,
                deviation_threshold: 0.50,
            },
            Sensitivity::Medium => SensitivityProfile {
                zscore_threshold: 3.0,
                iqr_multiplier: 1.5,
                deviation_threshold: 0.30,
            },
            Sensitivity::High => SensitivityProfile {
                zscore_threshold: 2.0,
                iqr_multiplier: 1.0,
                deviation_threshold: 0.20,
            },
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Sensitivity::Low => "low",
            Sensitivity::Medium => "medium",
            Sensitivity::High => "high",
        }
    }
}

impl std::fmt::Display for Sensitivity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid sensitivity '{0}', expected one of: low, medium, high")]
pub struct ParseSensitivityError(pub String);

impl std::str::FromStr for Sensitivity {
    type Err = ParseSensitivityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Sensitivity::Low),
            "medium" => Ok(Sensitivity::Medium),
            "high" => Ok(Sensitivity::High),
            _ => Err(ParseSensitivityError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profiles_tighten_with_sensitivity() {
        let low = Sensitivity::Low.profile();
        let medium = Sensitivity::Medium.profile();
        let high = Sensitivity::High.profile();

        assert_eq!(medium.zscore_threshold, 3.0);
        assert_eq!(medium.iqr_multiplier, 1.5);
        assert_eq!(medium.deviation_threshold, 0.30);

        assert!(low.zscore_threshold > medium.zscore_threshold);
        assert!(medium.zscore_threshold > high.zscore_threshold);
        assert!(low.iqr_multiplier > high.iqr_multiplier);
        assert!(low.deviation_threshold > high.deviation_threshold);
    }

    #[test]
    fn test_parse_and_default() {
        assert_eq!(Sensitivity::default(), Sensitivity::Medium);
        assert_eq!(" HIGH ".parse::<Sensitivity>().unwrap(), Sensitivity::High);
        assert_eq!(
            "extreme".parse::<Sensitivity>(),
            Err(ParseSensitivityError("extreme".to_string()))
        );
    }
}
