//! Unified error hierarchy for aerors
//!
//! The analysis core reports data-quality preconditions through
//! [`AnalysisError`]; everything that can go wrong around it (ingestion,
//! configuration, IO) is folded into [`AeroRsError`].

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for all aerors operations
#[derive(Debug, Error)]
pub enum AeroRsError {
    /// Analysis precondition failures
    #[error("Analysis error: {0}")]
    Analysis(#[from] AnalysisError),

    /// Telemetry ingestion errors
    #[error("Import error: {0}")]
    Import(#[from] ImportError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Input validation errors
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Errors raised by the analysis core.
///
/// All of them are terminal for the current run: they describe the input,
/// not a transient fault, so retrying with the same data cannot succeed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    /// Fewer usable samples than the calculation needs
    #[error("Insufficient data for {calculation}: {available} usable samples, {required} required")]
    InsufficientData {
        calculation: String,
        required: usize,
        available: usize,
    },

    /// Closed-form fit is undefined (zero design-matrix energy)
    #[error("Degenerate regression: {reason}")]
    DegenerateRegression { reason: String },

    /// Two series that must be point-aligned have different lengths
    #[error("Length mismatch: modeled series has {modeled} points, measured series has {measured}")]
    LengthMismatch { modeled: usize, measured: usize },

    /// Reference drag area is not a positive finite number
    #[error("Invalid reference CdA: {value}")]
    InvalidReference { value: f64 },

    /// Tuning built in code that never went through config validation
    #[error("Invalid analysis configuration: {reason}")]
    InvalidConfiguration { reason: String },
}

/// Ingestion errors
#[derive(Debug, Error)]
pub enum ImportError {
    /// No importer handles this file
    #[error("Unsupported format: {path}")]
    UnsupportedFormat { path: PathBuf },

    /// Format-specific parsing error
    #[error("Parse error in {format}: {reason}")]
    ParseError { format: String, reason: String },

    /// A required column is absent
    #[error("Missing required column: {column}")]
    MissingColumn { column: String },

    /// File parsed but contained no samples
    #[error("No samples found in {path}")]
    Empty { path: PathBuf },

    /// Directory scan or file access failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for aerors operations
pub type Result<T> = std::result::Result<T, AeroRsError>;

impl AeroRsError {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AeroRsError::Io(_) | AeroRsError::Import(ImportError::Io(_))
        )
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            AeroRsError::Analysis(AnalysisError::InvalidConfiguration { .. }) => {
                ErrorSeverity::Error
            }
            AeroRsError::Analysis(_) => ErrorSeverity::Warning,
            AeroRsError::Validation(_) => ErrorSeverity::Warning,
            AeroRsError::Import(ImportError::Empty { .. }) => ErrorSeverity::Warning,
            _ => ErrorSeverity::Error,
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            AeroRsError::Analysis(AnalysisError::InsufficientData {
                calculation,
                required,
                ..
            }) => {
                format!(
                    "Not enough riding data to compute {} (need at least {} usable samples).",
                    calculation, required
                )
            }
            AeroRsError::Analysis(AnalysisError::InvalidReference { value }) => {
                format!("The reference CdA {} is not a positive drag area.", value)
            }
            AeroRsError::Import(ImportError::UnsupportedFormat { path }) => {
                format!("Cannot read activity file: {}", path.display())
            }
            _ => self.to_string(),
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Error that prevents operation but system can continue
    Error,
    /// Warning that doesn't prevent operation
    Warning,
}

impl ErrorSeverity {
    /// Convert to tracing level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            ErrorSeverity::Error => tracing::Level::ERROR,
            ErrorSeverity::Warning => tracing::Level::WARN,
        }
    }
}
