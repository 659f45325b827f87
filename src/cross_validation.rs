//! Cross-validation of the regression CdA against an independent reference
//!
//! The reference is normally the mean of an aero sensor's per-sample
//! readings. Without one, an auxiliary channel whose values look like a drag
//! area can stand in, flagged as suspected.

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

use crate::error::AnalysisError;
use crate::models::ActivityPoint;
use crate::regression::RegressionResult;

/// Grade boundaries on absolute CdA error (m²), half-open: `error < bound`
pub const EXCELLENT_MAX_ERROR_M2: f64 = 0.01;
pub const VERY_GOOD_MAX_ERROR_M2: f64 = 0.02;
pub const GOOD_MAX_ERROR_M2: f64 = 0.03;

/// Agreement grade between estimated and reference CdA
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CdaAssessment {
    Excellent,
    VeryGood,
    Good,
    NeedsImprovement,
}

impl CdaAssessment {
    pub fn from_absolute_error(absolute_error_m2: f64) -> Self {
        if absolute_error_m2 < EXCELLENT_MAX_ERROR_M2 {
            CdaAssessment::Excellent
        } else if absolute_error_m2 < VERY_GOOD_MAX_ERROR_M2 {
            CdaAssessment::VeryGood
        } else if absolute_error_m2 < GOOD_MAX_ERROR_M2 {
            CdaAssessment::Good
        } else {
            CdaAssessment::NeedsImprovement
        }
    }
}

impl fmt::Display for CdaAssessment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CdaAssessment::Excellent => "EXCELLENT",
            CdaAssessment::VeryGood => "VERY_GOOD",
            CdaAssessment::Good => "GOOD",
            CdaAssessment::NeedsImprovement => "NEEDS_IMPROVEMENT",
        };
        write!(f, "{}", label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CrossValidationResult {
    pub estimated_cda_m2: f64,
    pub reference_cda_m2: f64,
    pub absolute_error_m2: f64,
    pub relative_error_pct: f64,
    pub assessment: CdaAssessment,
}

/// How sure we are that a suspected channel carries CdA
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Confidence {
    High,
    Medium,
}

/// Where a reference CdA came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ReferenceSource {
    /// Per-sample aero sensor readings
    Measured,
    /// Auxiliary channel whose value range matches a drag area
    Suspected { channel: String, confidence: Confidence },
    /// Given directly by the caller
    Supplied,
}

/// Reference drag area for cross-validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceCda {
    pub cda_m2: f64,
    /// Population standard deviation of the readings; 0 when supplied
    pub std_dev_m2: f64,
    pub sample_count: usize,
    pub source: ReferenceSource,
}

impl ReferenceCda {
    pub fn supplied(cda_m2: f64) -> Self {
        Self {
            cda_m2,
            std_dev_m2: 0.0,
            sample_count: 1,
            source: ReferenceSource::Supplied,
        }
    }

    /// Mean of every positive sensor CdA in the activity
    pub fn from_points(points: &[ActivityPoint]) -> Option<Self> {
        let readings: Vec<f64> = points.iter().filter_map(ActivityPoint::sensor_cda).collect();
        if readings.is_empty() {
            return None;
        }

        Some(Self {
            cda_m2: readings.iter().mean(),
            std_dev_m2: readings.iter().population_std_dev(),
            sample_count: readings.len(),
            source: ReferenceSource::Measured,
        })
    }

    /// Screen one auxiliary channel.
    ///
    /// Needs more than 10 values; the non-zero ones must span a CdA-like
    /// range (min in [0.10, 0.70], max in [0.15, 0.80]) with moderate spread
    /// (0.001 < σ < 0.1).
    pub fn from_channel(name: &str, values: &[f64]) -> Option<Self> {
        if values.len() <= 10 {
            return None;
        }

        let clean: Vec<f64> = values
            .iter()
            .copied()
            .filter(|v| v.is_finite() && *v != 0.0)
            .collect();
        if clean.is_empty() {
            return None;
        }

        let min = clean.iter().copied().fold(f64::INFINITY, f64::min);
        let max = clean.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean = clean.iter().mean();
        let std_dev = clean.iter().population_std_dev();

        let plausible = (0.10..=0.70).contains(&min)
            && (0.15..=0.80).contains(&max)
            && std_dev > 0.001
            && std_dev < 0.1;
        if !plausible {
            return None;
        }

        let confidence = if (0.20..=0.50).contains(&mean) {
            Confidence::High
        } else {
            Confidence::Medium
        };

        debug!(channel = name, mean, std_dev, ?confidence, "Channel looks like CdA");

        Some(Self {
            cda_m2: mean,
            std_dev_m2: std_dev,
            sample_count: clean.len(),
            source: ReferenceSource::Suspected {
                channel: name.to_string(),
                confidence,
            },
        })
    }

    /// The passing channel with the most readings
    pub fn best_suspected(channels: &BTreeMap<String, Vec<f64>>) -> Option<Self> {
        channels
            .iter()
            .filter_map(|(name, values)| Self::from_channel(name, values))
            .max_by_key(|reference| reference.sample_count)
    }
}

pub struct CrossValidator;

impl CrossValidator {
    /// Compare a fitted CdA with a reference value.
    ///
    /// Thresholds are fixed so grades stay comparable across reports.
    pub fn classify(
        regression: &RegressionResult,
        sensor_cda: f64,
    ) -> Result<CrossValidationResult, AnalysisError> {
        if !sensor_cda.is_finite() || sensor_cda <= 0.0 {
            return Err(AnalysisError::InvalidReference { value: sensor_cda });
        }

        let absolute_error_m2 = (regression.cda_estimate_m2 - sensor_cda).abs();

        Ok(CrossValidationResult {
            estimated_cda_m2: regression.cda_estimate_m2,
            reference_cda_m2: sensor_cda,
            absolute_error_m2,
            relative_error_pct: absolute_error_m2 / sensor_cda * 100.0,
            assessment: CdaAssessment::from_absolute_error(absolute_error_m2),
        })
    }
}
