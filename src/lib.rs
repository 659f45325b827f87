// Library interface for aerors modules
// Integration tests and benchmarks link against this crate

pub mod analysis;
pub mod config;
pub mod cross_validation;
pub mod error;
pub mod import;
pub mod logging;
pub mod models;
pub mod physics;
pub mod power;
pub mod regression;
pub mod validation;

// Re-export commonly used types for convenience
pub use models::*;
pub use analysis::{AeroAnalysis, AeroAnalyzer, AnalysisSettings, CdaSource, ComponentBreakdown};
pub use config::AppConfig;
pub use cross_validation::{
    CdaAssessment, Confidence, CrossValidationResult, CrossValidator, ReferenceCda, ReferenceSource,
};
pub use error::{AeroRsError, AnalysisError, ImportError, Result};
pub use logging::{LogConfig, LogFormat, LogLevel};
pub use physics::{PowerComponentModel, PowerComponents};
pub use power::{NormalizedPowerCalculator, NormalizedPowerConfig, PowerSummary};
pub use regression::{CdaRegressionEstimator, RegressionConfig, RegressionResult};
pub use validation::{AccuracyLevel, ValidationMetrics, ValidationResult};
