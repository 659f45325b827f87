//! Agreement statistics between a modeled and a measured power series

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::fmt;

use crate::error::AnalysisError;

/// Error bands (W) reported as coverage percentages
pub const COVERAGE_THRESHOLDS_W: [f64; 3] = [5.0, 10.0, 20.0];

/// Error statistics of modeled vs measured power
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub mean_absolute_error_w: f64,
    pub rmse_w: f64,
    pub max_error_w: f64,

    /// Percent of samples with error below 5 W
    pub coverage_within_5w: f64,
    /// Percent of samples with error below 10 W
    pub coverage_within_10w: f64,
    /// Percent of samples with error below 20 W
    pub coverage_within_20w: f64,

    /// Pearson r; None when either series has zero variance
    pub correlation: Option<f64>,

    pub sample_count: usize,
}

/// Overall grade of how well the physical model explains measured power
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccuracyLevel {
    Excellent,
    Good,
    Acceptable,
}

impl AccuracyLevel {
    /// Grade a validation result.
    ///
    /// EXCELLENT needs MAE < 15 W, > 70 % within 10 W and r > 0.85; GOOD needs
    /// MAE < 25 W, > 60 % within 10 W and r > 0.75. An undefined correlation
    /// fails both.
    pub fn from_validation(result: &ValidationResult) -> Self {
        let correlation = result.correlation.unwrap_or(f64::NEG_INFINITY);
        let mae = result.mean_absolute_error_w;
        let within_10w = result.coverage_within_10w;

        if mae < 15.0 && within_10w > 70.0 && correlation > 0.85 {
            AccuracyLevel::Excellent
        } else if mae < 25.0 && within_10w > 60.0 && correlation > 0.75 {
            AccuracyLevel::Good
        } else {
            AccuracyLevel::Acceptable
        }
    }
}

impl fmt::Display for AccuracyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AccuracyLevel::Excellent => "EXCELLENT",
            AccuracyLevel::Good => "GOOD",
            AccuracyLevel::Acceptable => "ACCEPTABLE",
        };
        write!(f, "{}", label)
    }
}

pub struct ValidationMetrics;

impl ValidationMetrics {
    /// Compare two point-aligned series.
    ///
    /// Every statistic except the labels is symmetric in its arguments.
    pub fn compare(modeled: &[f64], measured: &[f64]) -> Result<ValidationResult, AnalysisError> {
        if modeled.len() != measured.len() {
            return Err(AnalysisError::LengthMismatch {
                modeled: modeled.len(),
                measured: measured.len(),
            });
        }
        if modeled.is_empty() {
            return Err(AnalysisError::InsufficientData {
                calculation: "power validation".to_string(),
                required: 1,
                available: 0,
            });
        }

        let errors: Vec<f64> = modeled
            .iter()
            .zip(measured)
            .map(|(m, y)| (m - y).abs())
            .collect();

        let coverage = |threshold: f64| {
            let within = errors.iter().filter(|e| **e < threshold).count();
            within as f64 / errors.len() as f64 * 100.0
        };

        Ok(ValidationResult {
            mean_absolute_error_w: errors.iter().mean(),
            rmse_w: errors.iter().quadratic_mean(),
            max_error_w: errors.iter().cloned().fold(0.0, f64::max),
            coverage_within_5w: coverage(COVERAGE_THRESHOLDS_W[0]),
            coverage_within_10w: coverage(COVERAGE_THRESHOLDS_W[1]),
            coverage_within_20w: coverage(COVERAGE_THRESHOLDS_W[2]),
            correlation: Self::pearson(modeled, measured),
            sample_count: errors.len(),
        })
    }

    /// Two-pass Pearson correlation; None if either side is constant
    pub fn pearson(a: &[f64], b: &[f64]) -> Option<f64> {
        if a.len() != b.len() || a.len() < 2 {
            return None;
        }

        let mean_a = a.iter().mean();
        let mean_b = b.iter().mean();

        let mut covariance = 0.0;
        let mut var_a = 0.0;
        let mut var_b = 0.0;
        for (x, y) in a.iter().zip(b) {
            let dx = x - mean_a;
            let dy = y - mean_b;
            covariance += dx * dy;
            var_a += dx * dx;
            var_b += dy * dy;
        }

        if var_a == 0.0 || var_b == 0.0 {
            return None;
        }

        Some((covariance / (var_a.sqrt() * var_b.sqrt())).clamp(-1.0, 1.0))
    }
}
