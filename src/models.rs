use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default sea-level air density in kg/m³
pub const DEFAULT_AIR_DENSITY: f64 = 1.225;

/// Gravitational acceleration in m/s²
pub const DEFAULT_GRAVITY: f64 = 9.81;

/// Rolling-resistance coefficient of a good road tyre
pub const DEFAULT_CRR: f64 = 0.005;

/// Drag area of a typical road position in m²
pub const DEFAULT_CDA_M2: f64 = 0.30;

/// Default rider mass in kg
pub const DEFAULT_RIDER_MASS_KG: f64 = 75.0;

/// Default bike + equipment mass in kg
pub const DEFAULT_EQUIPMENT_MASS_KG: f64 = 8.0;

/// How the speed field of an [`ActivityPoint`] should be interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeedUnit {
    /// Speeds are already in meters per second
    MetersPerSecond,
    /// Speeds are in kilometers per hour
    KilometersPerHour,
    /// Unit unknown: values >= 50 are taken as km/h, anything lower as m/s.
    ///
    /// This guess is wrong for genuine m/s values above 50 and for km/h
    /// values below 50 (a 30 km/h ride would be read as 30 m/s).
    #[default]
    Auto,
}

/// One telemetry sample as delivered by the ingestion layer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActivityPoint {
    /// Seconds from activity start
    pub timestamp: u32,

    /// Measured power output in watts
    pub power_w: f64,

    /// Speed, nominally in m/s (see [`SpeedUnit`])
    pub speed_mps: f64,

    /// Road slope as a signed fraction (0.05 = 5% climb)
    pub grade: f64,

    /// Drag area reported by an external aero sensor at this instant
    pub measured_cda_m2: Option<f64>,
}

impl ActivityPoint {
    pub fn new(timestamp: u32, power_w: f64, speed_mps: f64, grade: f64) -> Self {
        Self {
            timestamp,
            power_w,
            speed_mps,
            grade,
            measured_cda_m2: None,
        }
    }

    pub fn with_measured_cda(mut self, cda_m2: f64) -> Self {
        self.measured_cda_m2 = Some(cda_m2);
        self
    }

    /// Sensor CdA usable for this point (present and strictly positive)
    pub fn sensor_cda(&self) -> Option<f64> {
        self.measured_cda_m2.filter(|cda| cda.is_finite() && *cda > 0.0)
    }
}

/// A decoded activity: the ordered sample sequence plus any auxiliary
/// numeric channels the ingestion layer could not map to a known field.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Activity {
    /// Unique identifier for the activity
    pub id: String,

    /// Original file name or source identifier
    pub source: Option<String>,

    /// Time-ordered samples
    pub points: Vec<ActivityPoint>,

    /// Unmapped numeric channels, keyed by their raw name
    pub channels: BTreeMap<String, Vec<f64>>,
}

impl Activity {
    pub fn new(id: impl Into<String>, points: Vec<ActivityPoint>) -> Self {
        Self {
            id: id.into(),
            source: None,
            points,
            channels: BTreeMap::new(),
        }
    }

    /// Measured power as a plain series
    pub fn power_series(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.power_w).collect()
    }
}

/// Physical parameters for one analysis run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicalConstants {
    /// Air density ρ in kg/m³
    pub air_density: f64,

    /// Gravitational acceleration g in m/s²
    pub gravity: f64,

    /// Rolling-resistance coefficient
    pub crr: f64,

    /// Rider + equipment mass in kg
    pub total_mass_kg: f64,

    /// CdA used for points without a sensor reading
    pub default_cda_m2: f64,

    /// Interpretation of the speed field
    pub speed_unit: SpeedUnit,
}

impl Default for PhysicalConstants {
    fn default() -> Self {
        Self {
            air_density: DEFAULT_AIR_DENSITY,
            gravity: DEFAULT_GRAVITY,
            crr: DEFAULT_CRR,
            total_mass_kg: DEFAULT_RIDER_MASS_KG + DEFAULT_EQUIPMENT_MASS_KG,
            default_cda_m2: DEFAULT_CDA_M2,
            speed_unit: SpeedUnit::Auto,
        }
    }
}

impl PhysicalConstants {
    /// Defaults with the system mass built from its two parts
    pub fn with_masses(rider_kg: f64, equipment_kg: f64) -> Self {
        Self {
            total_mass_kg: rider_kg + equipment_kg,
            ..Self::default()
        }
    }

    /// Check the configuration contract (all physical parameters > 0)
    pub fn validate(&self) -> Result<(), String> {
        let checks = [
            ("air_density", self.air_density),
            ("gravity", self.gravity),
            ("crr", self.crr),
            ("total_mass_kg", self.total_mass_kg),
            ("default_cda_m2", self.default_cda_m2),
        ];
        for (name, value) in checks {
            if !value.is_finite() || value <= 0.0 {
                return Err(format!("{} must be positive, got {}", name, value));
            }
        }
        Ok(())
    }
}
