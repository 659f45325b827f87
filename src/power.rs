//! Power-series metrics: Normalized Power and variability index

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use tracing::warn;

/// Rolling window used by Normalized Power, in samples (1 Hz ⇒ 30 seconds)
pub const DEFAULT_NP_WINDOW: usize = 30;

/// Normalized Power calculation configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizedPowerConfig {
    /// Rolling-average window length in samples
    pub window: usize,
}

impl Default for NormalizedPowerConfig {
    fn default() -> Self {
        Self {
            window: DEFAULT_NP_WINDOW,
        }
    }
}

impl NormalizedPowerConfig {
    pub fn with_window(window: usize) -> Self {
        Self { window }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.window == 0 {
            return Err("Normalized power window must be at least 1 sample".to_string());
        }
        Ok(())
    }
}

/// Summary of a power series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerSummary {
    /// Arithmetic mean power in watts
    pub average_power_w: f64,
    /// Normalized Power in watts
    pub normalized_power_w: f64,
    /// NP / average power; None when average power is zero
    pub variability_index: Option<f64>,
    /// Samples in the series
    pub sample_count: usize,
}

/// Normalized Power engine
pub struct NormalizedPowerCalculator;

impl NormalizedPowerCalculator {
    /// Normalized Power of `power_series`.
    ///
    /// Series shorter than `window` fall back to the arithmetic mean. Otherwise
    /// every contiguous window (stride 1) is averaged, the averages are raised
    /// to the 4th power, averaged again and the 4th root is taken.
    ///
    /// An empty series has no mean and yields NaN. A `window` of 0 is treated
    /// as 1.
    pub fn normalized_power(power_series: &[f64], window: usize) -> f64 {
        let window = window.max(1);

        if power_series.len() < window {
            warn!(
                samples = power_series.len(),
                window, "Series shorter than NP window, using arithmetic mean"
            );
            return power_series.iter().mean();
        }

        let mean_fourth_power = power_series
            .windows(window)
            .map(|w| (w.iter().sum::<f64>() / window as f64).powi(4))
            .mean();

        mean_fourth_power.sqrt().sqrt()
    }

    /// Average power, NP and variability index; None for an empty series
    pub fn summarize(power_series: &[f64], config: &NormalizedPowerConfig) -> Option<PowerSummary> {
        if power_series.is_empty() {
            return None;
        }

        let average_power_w = power_series.iter().mean();
        let normalized_power_w = Self::normalized_power(power_series, config.window);
        let variability_index = if average_power_w > 0.0 {
            Some(normalized_power_w / average_power_w)
        } else {
            None
        };

        Some(PowerSummary {
            average_power_w,
            normalized_power_w,
            variability_index,
            sample_count: power_series.len(),
        })
    }
}
