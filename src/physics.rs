//! Physical power model for road cycling
//!
//! Splits the power needed to hold a given speed into aerodynamic drag,
//! rolling resistance and gravity. Formulas:
//!
//! - aero    = ½ · ρ · CdA · v³
//! - rolling = Crr · m · g · v · cos(atan(grade))
//! - gravity = m · g · v · sin(atan(grade))
//!
//! Gravity is signed: on descents it is negative (power gravity supplies).

use serde::{Deserialize, Serialize};

use crate::models::{ActivityPoint, PhysicalConstants, SpeedUnit};

/// Raw speeds at or above this value are read as km/h under [`SpeedUnit::Auto`]
pub const AUTO_KMH_THRESHOLD: f64 = 50.0;

const KMH_PER_MPS: f64 = 3.6;

/// Modeled power split for one sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerComponents {
    /// Aerodynamic drag power in watts
    pub aero_w: f64,

    /// Rolling resistance power in watts
    pub rolling_w: f64,

    /// Gravitational power in watts (negative downhill)
    pub gravity_w: f64,

    /// aero + rolling + gravity
    pub total_modeled_w: f64,

    /// Drag area used for this sample
    pub cda_m2: f64,

    /// True when `cda_m2` came from the sample's sensor reading
    pub sensor_cda: bool,
}

impl PowerComponents {
    fn zero(cda_m2: f64, sensor_cda: bool) -> Self {
        Self {
            aero_w: 0.0,
            rolling_w: 0.0,
            gravity_w: 0.0,
            total_modeled_w: 0.0,
            cda_m2,
            sensor_cda,
        }
    }
}

/// Convert a raw speed reading to m/s
pub fn normalize_speed(raw: f64, unit: SpeedUnit) -> f64 {
    match unit {
        SpeedUnit::MetersPerSecond => raw,
        SpeedUnit::KilometersPerHour => raw / KMH_PER_MPS,
        SpeedUnit::Auto => {
            if raw >= AUTO_KMH_THRESHOLD {
                raw / KMH_PER_MPS
            } else {
                raw
            }
        }
    }
}

/// ½ · ρ · CdA · v³
#[inline]
pub fn aero_power(air_density: f64, cda_m2: f64, speed_mps: f64) -> f64 {
    0.5 * air_density * cda_m2 * speed_mps.powi(3)
}

/// Crr · m · g · v · cos(atan(grade))
#[inline]
pub fn rolling_power(crr: f64, mass_kg: f64, gravity: f64, speed_mps: f64, grade: f64) -> f64 {
    crr * mass_kg * gravity * speed_mps * grade.atan().cos()
}

/// m · g · v · sin(atan(grade))
#[inline]
pub fn gravity_power(mass_kg: f64, gravity: f64, speed_mps: f64, grade: f64) -> f64 {
    mass_kg * gravity * speed_mps * grade.atan().sin()
}

/// Stateless per-sample power decomposition
pub struct PowerComponentModel;

impl PowerComponentModel {
    /// Decompose one sample.
    ///
    /// Uses the sample's sensor CdA when present and positive, otherwise
    /// `constants.default_cda_m2`. Never fails: a zero speed yields all-zero
    /// components.
    pub fn compute(point: &ActivityPoint, constants: &PhysicalConstants) -> PowerComponents {
        let (cda_m2, sensor_cda) = match point.sensor_cda() {
            Some(cda) => (cda, true),
            None => (constants.default_cda_m2, false),
        };

        let v = normalize_speed(point.speed_mps, constants.speed_unit);
        if v == 0.0 {
            return PowerComponents::zero(cda_m2, sensor_cda);
        }

        let aero_w = aero_power(constants.air_density, cda_m2, v);
        let rolling_w = rolling_power(
            constants.crr,
            constants.total_mass_kg,
            constants.gravity,
            v,
            point.grade,
        );
        let gravity_w = gravity_power(constants.total_mass_kg, constants.gravity, v, point.grade);

        PowerComponents {
            aero_w,
            rolling_w,
            gravity_w,
            total_modeled_w: aero_w + rolling_w + gravity_w,
            cda_m2,
            sensor_cda,
        }
    }

    /// Decompose every sample, preserving length and order
    pub fn compute_series(
        points: &[ActivityPoint],
        constants: &PhysicalConstants,
    ) -> Vec<PowerComponents> {
        points
            .iter()
            .map(|point| Self::compute(point, constants))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64, tolerance: f64) {
        assert!(
            (actual - expected).abs() <= tolerance,
            "expected {} ± {}, got {}",
            expected,
            tolerance,
            actual
        );
    }

    #[test]
    fn test_flat_road_30kmh() {
        let constants = PhysicalConstants {
            speed_unit: SpeedUnit::MetersPerSecond,
            ..PhysicalConstants::default()
        };
        let point = ActivityPoint::new(0, 150.0, 30.0 / 3.6, 0.0);
        let components = PowerComponentModel::compute(&point, &constants);

        // ½ · 1.225 · 0.30 · 8.333³
        assert_close(components.aero_w, 106.34, 0.1);
        assert_close(components.rolling_w, 33.92, 0.05);
        assert_eq!(components.gravity_w, 0.0);
        assert_close(components.total_modeled_w, 140.26, 0.15);
        assert_eq!(components.cda_m2, 0.30);
        assert!(!components.sensor_cda);
    }

    #[test]
    fn test_five_percent_climb_20kmh() {
        let constants = PhysicalConstants {
            speed_unit: SpeedUnit::MetersPerSecond,
            ..PhysicalConstants::default()
        };
        let point = ActivityPoint::new(0, 300.0, 20.0 / 3.6, 0.05);
        let components = PowerComponentModel::compute(&point, &constants);

        assert_close(components.gravity_w, 225.7, 0.5);
        assert!(components.rolling_w < 0.005 * 83.0 * 9.81 * 20.0 / 3.6);
    }

    #[test]
    fn test_descent_gravity_negative() {
        let constants = PhysicalConstants::default();
        let point = ActivityPoint::new(0, 0.0, 12.0, -0.06);
        let components = PowerComponentModel::compute(&point, &constants);

        assert!(components.gravity_w < 0.0);
        assert!(components.aero_w > 0.0);
        assert!(components.rolling_w > 0.0);
    }

    #[test]
    fn test_zero_speed_is_exactly_zero() {
        let constants = PhysicalConstants::default();
        for grade in [-0.1, 0.0, 0.12] {
            let point = ActivityPoint::new(0, 0.0, 0.0, grade);
            let components = PowerComponentModel::compute(&point, &constants);
            assert_eq!(components.aero_w, 0.0);
            assert_eq!(components.rolling_w, 0.0);
            assert_eq!(components.gravity_w, 0.0);
            assert_eq!(components.total_modeled_w, 0.0);
        }
    }

    #[test]
    fn test_sensor_cda_overrides_default() {
        let constants = PhysicalConstants::default();
        let point = ActivityPoint::new(0, 200.0, 10.0, 0.0).with_measured_cda(0.24);
        let components = PowerComponentModel::compute(&point, &constants);

        assert!(components.sensor_cda);
        assert_eq!(components.cda_m2, 0.24);
        assert_close(components.aero_w, 0.5 * 1.225 * 0.24 * 1000.0, 1e-9);

        let invalid = ActivityPoint::new(0, 200.0, 10.0, 0.0).with_measured_cda(0.0);
        let components = PowerComponentModel::compute(&invalid, &constants);
        assert!(!components.sensor_cda);
        assert_eq!(components.cda_m2, constants.default_cda_m2);
    }

    #[test]
    fn test_normalize_speed() {
        assert_eq!(normalize_speed(36.0, SpeedUnit::KilometersPerHour), 10.0);
        assert_eq!(normalize_speed(36.0, SpeedUnit::MetersPerSecond), 36.0);
        assert_eq!(normalize_speed(54.0, SpeedUnit::Auto), 15.0);
        assert_eq!(normalize_speed(49.9, SpeedUnit::Auto), 49.9);
        // Known hazard of the heuristic: 30 km/h is read as 30 m/s
        assert_eq!(normalize_speed(30.0, SpeedUnit::Auto), 30.0);
    }

    #[test]
    fn test_compute_series_preserves_order() {
        let constants = PhysicalConstants::default();
        let points = vec![
            ActivityPoint::new(0, 100.0, 5.0, 0.0),
            ActivityPoint::new(1, 0.0, 0.0, 0.0),
            ActivityPoint::new(2, 300.0, 9.0, 0.03),
        ];
        let series = PowerComponentModel::compute_series(&points, &constants);

        assert_eq!(series.len(), 3);
        assert_eq!(series[1].total_modeled_w, 0.0);
        assert!(series[2].total_modeled_w > series[0].total_modeled_w);
    }

    use proptest::prelude::*;

    proptest! {
        #[test]
        fn test_zero_speed_invariant(grade in -0.3f64..0.3f64, mass in 40.0f64..140.0f64) {
            let constants = PhysicalConstants { total_mass_kg: mass, ..PhysicalConstants::default() };
            let point = ActivityPoint::new(0, 0.0, 0.0, grade);
            let components = PowerComponentModel::compute(&point, &constants);
            prop_assert_eq!(components.total_modeled_w, 0.0);
            prop_assert_eq!(components.gravity_w, 0.0);
        }

        #[test]
        fn test_aero_strictly_increasing(v in 0.1f64..25.0f64, dv in 0.01f64..5.0f64) {
            let constants = PhysicalConstants {
                speed_unit: SpeedUnit::MetersPerSecond,
                ..PhysicalConstants::default()
            };
            let slow = PowerComponentModel::compute(&ActivityPoint::new(0, 0.0, v, 0.0), &constants);
            let fast = PowerComponentModel::compute(&ActivityPoint::new(0, 0.0, v + dv, 0.0), &constants);
            prop_assert!(fast.aero_w > slow.aero_w);
        }

        #[test]
        fn test_aero_and_rolling_non_negative(v in 0.0f64..25.0f64, grade in -0.3f64..0.3f64) {
            let constants = PhysicalConstants {
                speed_unit: SpeedUnit::MetersPerSecond,
                ..PhysicalConstants::default()
            };
            let components = PowerComponentModel::compute(&ActivityPoint::new(0, 0.0, v, grade), &constants);
            prop_assert!(components.aero_w >= 0.0);
            prop_assert!(components.rolling_w >= 0.0);
        }
    }
}
