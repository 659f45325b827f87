//! End-to-end aerodynamic analysis of one activity
//!
//! Data flow: samples → per-sample power split → breakdown → CdA fit →
//! cross-validation against a reference (when one resolves) → modeled vs
//! measured validation. Normalized Power runs independently over the power
//! series.
//!
//! An analyzer holds only configuration, so one instance can serve any number
//! of activities concurrently.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::cross_validation::{CrossValidationResult, CrossValidator, ReferenceCda};
use crate::error::AnalysisError;
use crate::models::{Activity, PhysicalConstants};
use crate::physics::{normalize_speed, PowerComponentModel, PowerComponents};
use crate::power::{NormalizedPowerCalculator, NormalizedPowerConfig, PowerSummary};
use crate::regression::{CdaRegressionEstimator, RegressionConfig, RegressionResult};
use crate::validation::{AccuracyLevel, ValidationMetrics, ValidationResult};

/// Pipeline switches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    /// Fall back to a suspected CdA channel when no sensor readings exist
    pub allow_suspected_reference: bool,
}

/// Which drag area the power split was computed with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CdaSource {
    Sensor,
    Default,
}

/// Mean power split over the moving samples (power > 0 and speed > 0)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComponentBreakdown {
    pub avg_aero_w: f64,
    pub avg_rolling_w: f64,
    pub avg_gravity_w: f64,
    pub avg_measured_w: f64,

    /// Component shares of mean measured power, in percent
    pub aero_pct: f64,
    pub rolling_pct: f64,
    pub gravity_pct: f64,

    pub moving_samples: usize,
    pub sensor_cda_samples: usize,
    pub cda_source: CdaSource,
}

/// Everything one analysis run produces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AeroAnalysis {
    pub activity_id: String,
    /// One entry per input sample, same order
    pub components: Vec<PowerComponents>,
    pub breakdown: ComponentBreakdown,
    /// None for an activity without samples
    pub power_summary: Option<PowerSummary>,
    pub regression: RegressionResult,
    pub validation: ValidationResult,
    pub accuracy: AccuracyLevel,
    pub reference: Option<ReferenceCda>,
    pub cross_validation: Option<CrossValidationResult>,
}

#[derive(Debug, Clone, Default)]
pub struct AeroAnalyzer {
    pub constants: PhysicalConstants,
    pub regression: RegressionConfig,
    pub normalized_power: NormalizedPowerConfig,
    pub settings: AnalysisSettings,
}

impl AeroAnalyzer {
    pub fn new(constants: PhysicalConstants) -> Self {
        Self {
            constants,
            ..Self::default()
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            constants: config.constants,
            regression: config.regression,
            normalized_power: config.normalized_power,
            settings: config.analysis,
        }
    }

    /// Analyze with the reference resolved from the activity itself
    pub fn analyze(&self, activity: &Activity) -> Result<AeroAnalysis, AnalysisError> {
        let reference = ReferenceCda::from_points(&activity.points).or_else(|| {
            if self.settings.allow_suspected_reference {
                ReferenceCda::best_suspected(&activity.channels)
            } else {
                None
            }
        });
        self.analyze_with_reference(activity, reference)
    }

    /// Analyze against an explicit reference (or none)
    pub fn analyze_with_reference(
        &self,
        activity: &Activity,
        reference: Option<ReferenceCda>,
    ) -> Result<AeroAnalysis, AnalysisError> {
        let span = tracing::info_span!("analyze", activity = %activity.id);
        let _guard = span.enter();

        let components = PowerComponentModel::compute_series(&activity.points, &self.constants);

        let moving: Vec<usize> = activity
            .points
            .iter()
            .enumerate()
            .filter(|(_, p)| {
                p.power_w > 0.0 && normalize_speed(p.speed_mps, self.constants.speed_unit) > 0.0
            })
            .map(|(i, _)| i)
            .collect();
        debug!(
            samples = activity.points.len(),
            moving = moving.len(),
            "Power split computed"
        );

        let modeled: Vec<f64> = moving.iter().map(|&i| components[i].total_modeled_w).collect();
        let measured: Vec<f64> = moving.iter().map(|&i| activity.points[i].power_w).collect();
        let breakdown = Self::breakdown(&components, &moving, &measured);

        let power_summary =
            NormalizedPowerCalculator::summarize(&activity.power_series(), &self.normalized_power);

        let regression = CdaRegressionEstimator::with_config(self.regression)
            .estimate(&activity.points, &self.constants)?;

        let cross_validation = match &reference {
            Some(reference) => Some(CrossValidator::classify(&regression, reference.cda_m2)?),
            None => None,
        };
        if reference.is_none() {
            debug!("No reference CdA, skipping cross-validation");
        }

        let validation = ValidationMetrics::compare(&modeled, &measured)?;
        let accuracy = AccuracyLevel::from_validation(&validation);
        if validation.correlation.is_none() {
            warn!("Modeled or measured power is constant, correlation undefined");
        }

        info!(
            cda = regression.cda_estimate_m2,
            r_squared = regression.r_squared,
            mae = validation.mean_absolute_error_w,
            %accuracy,
            "Analysis complete"
        );

        Ok(AeroAnalysis {
            activity_id: activity.id.clone(),
            components,
            breakdown,
            power_summary,
            regression,
            validation,
            accuracy,
            reference,
            cross_validation,
        })
    }

    /// Analyze independent activities in parallel, one result per input
    pub fn analyze_batch(&self, activities: &[Activity]) -> Vec<Result<AeroAnalysis, AnalysisError>> {
        activities
            .par_iter()
            .map(|activity| self.analyze(activity))
            .collect()
    }

    fn breakdown(
        components: &[PowerComponents],
        moving: &[usize],
        measured: &[f64],
    ) -> ComponentBreakdown {
        let n = moving.len();
        let mean_of = |f: fn(&PowerComponents) -> f64| {
            if n == 0 {
                0.0
            } else {
                moving.iter().map(|&i| f(&components[i])).sum::<f64>() / n as f64
            }
        };

        let avg_aero_w = mean_of(|c| c.aero_w);
        let avg_rolling_w = mean_of(|c| c.rolling_w);
        let avg_gravity_w = mean_of(|c| c.gravity_w);
        let avg_measured_w = if n == 0 {
            0.0
        } else {
            measured.iter().sum::<f64>() / n as f64
        };

        let share = |value: f64| {
            if avg_measured_w > 0.0 {
                value / avg_measured_w * 100.0
            } else {
                0.0
            }
        };

        let sensor_cda_samples = moving.iter().filter(|&&i| components[i].sensor_cda).count();

        ComponentBreakdown {
            avg_aero_w,
            avg_rolling_w,
            avg_gravity_w,
            avg_measured_w,
            aero_pct: share(avg_aero_w),
            rolling_pct: share(avg_rolling_w),
            gravity_pct: share(avg_gravity_w),
            moving_samples: n,
            sensor_cda_samples,
            cda_source: if sensor_cda_samples > 0 {
                CdaSource::Sensor
            } else {
                CdaSource::Default
            },
        }
    }
}
