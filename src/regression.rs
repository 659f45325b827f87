//! Least-squares drag-area estimation
//!
//! Fits `power_available = coef · v³` through the origin, where
//! `power_available` is measured power minus a flat-road rolling-resistance
//! estimate, and converts the slope to CdA via `coef / (½ρ)`.
//!
//! Grade is ignored here even though [`crate::physics`] models it. Climbing
//! segments therefore bias the estimate upwards; callers wanting a clean fit
//! should feed flat sections.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::AnalysisError;
use crate::models::{ActivityPoint, PhysicalConstants};
use crate::physics::{normalize_speed, rolling_power};

/// Regression tuning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegressionConfig {
    /// Samples must exceed this power (W) to be used
    pub threshold_power_w: f64,

    /// Samples must exceed this speed (m/s, after unit normalization)
    pub threshold_speed_mps: f64,

    /// Minimum retained samples for a fit
    pub min_samples: usize,

    /// Lower bound of the plausible CdA band (m²)
    pub min_cda_m2: f64,

    /// Upper bound of the plausible CdA band (m²)
    pub max_cda_m2: f64,
}

impl Default for RegressionConfig {
    fn default() -> Self {
        Self {
            threshold_power_w: 50.0,
            threshold_speed_mps: 5.0,
            min_samples: 50,
            min_cda_m2: 0.15,
            max_cda_m2: 0.60,
        }
    }
}

impl RegressionConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.threshold_power_w >= 0.0) {
            return Err(format!(
                "threshold_power_w must be non-negative, got {}",
                self.threshold_power_w
            ));
        }
        if !(self.threshold_speed_mps >= 0.0) {
            return Err(format!(
                "threshold_speed_mps must be non-negative, got {}",
                self.threshold_speed_mps
            ));
        }
        if !(self.min_cda_m2 > 0.0 && self.min_cda_m2 < self.max_cda_m2) {
            return Err(format!(
                "CdA band [{}, {}] must be positive and non-empty",
                self.min_cda_m2, self.max_cda_m2
            ));
        }
        Ok(())
    }
}

/// Outcome of a CdA fit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionResult {
    /// CdA clamped to the plausible band (m²)
    pub cda_estimate_m2: f64,

    /// CdA straight from the fit, before clamping (m²)
    pub unclamped_cda_m2: f64,

    /// Coefficient of determination in [0, 1]
    pub r_squared: f64,

    /// Samples that entered the fit
    pub sample_count: usize,

    /// True when the fitted value fell outside the band
    pub clamped: bool,
}

/// CdA estimator
#[derive(Debug, Clone, Default)]
pub struct CdaRegressionEstimator {
    pub config: RegressionConfig,
}

impl CdaRegressionEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: RegressionConfig) -> Self {
        Self { config }
    }

    /// Fit CdA from a sample sequence.
    ///
    /// Samples at or below the power/speed thresholds, and samples left with
    /// no power for aerodynamics, are skipped silently. The filter runs before
    /// the fit, so a series that never exceeds the speed threshold fails with
    /// `InsufficientData`; `DegenerateRegression` is only reachable when the
    /// minimum sample count admits an empty or zero-energy set.
    pub fn estimate(
        &self,
        points: &[ActivityPoint],
        constants: &PhysicalConstants,
    ) -> Result<RegressionResult, AnalysisError> {
        self.config
            .validate()
            .map_err(|reason| AnalysisError::InvalidConfiguration { reason })?;

        // (v³, power available for aero)
        let samples: Vec<(f64, f64)> = points
            .iter()
            .filter_map(|point| {
                let v = normalize_speed(point.speed_mps, constants.speed_unit);
                if point.power_w <= self.config.threshold_power_w
                    || v <= self.config.threshold_speed_mps
                {
                    return None;
                }

                let rolling = rolling_power(
                    constants.crr,
                    constants.total_mass_kg,
                    constants.gravity,
                    v,
                    0.0,
                );
                let available = point.power_w - rolling;
                (available > 0.0).then(|| (v.powi(3), available))
            })
            .collect();

        if samples.len() < self.config.min_samples {
            return Err(AnalysisError::InsufficientData {
                calculation: "CdA regression".to_string(),
                required: self.config.min_samples,
                available: samples.len(),
            });
        }

        let sum_v6: f64 = samples.iter().map(|(v3, _)| v3 * v3).sum();
        if sum_v6 == 0.0 || !sum_v6.is_finite() {
            return Err(AnalysisError::DegenerateRegression {
                reason: format!("sum of v⁶ over {} samples is {}", samples.len(), sum_v6),
            });
        }

        let sum_pv3: f64 = samples.iter().map(|(v3, p)| p * v3).sum();
        let coef = sum_pv3 / sum_v6;
        let unclamped_cda_m2 = coef / (0.5 * constants.air_density);

        let r_squared = Self::r_squared(&samples, coef);

        let cda_estimate_m2 = unclamped_cda_m2.clamp(self.config.min_cda_m2, self.config.max_cda_m2);
        let clamped = cda_estimate_m2 != unclamped_cda_m2;
        if clamped {
            warn!(
                fitted = unclamped_cda_m2,
                clamped_to = cda_estimate_m2,
                "Fitted CdA outside plausible band"
            );
        }

        debug!(
            samples = samples.len(),
            cda = cda_estimate_m2,
            r_squared,
            "CdA regression complete"
        );

        Ok(RegressionResult {
            cda_estimate_m2,
            unclamped_cda_m2,
            r_squared,
            sample_count: samples.len(),
            clamped,
        })
    }

    /// 1 − SS_res/SS_tot, 0 for a constant series, bounded to [0, 1]
    fn r_squared(samples: &[(f64, f64)], coef: f64) -> f64 {
        let n = samples.len() as f64;
        let mean = samples.iter().map(|(_, p)| p).sum::<f64>() / n;

        let ss_res: f64 = samples
            .iter()
            .map(|(v3, p)| (p - coef * v3).powi(2))
            .sum();
        let ss_tot: f64 = samples.iter().map(|(_, p)| (p - mean).powi(2)).sum();

        if ss_tot > 0.0 {
            (1.0 - ss_res / ss_tot).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}
