//! Error types for calibration.

use energy_common::EnergyError;
use energy_conversion::ConversionError;
use thiserror::Error;

/// Errors that can occur while calibrating series or handling coefficients.
#[derive(Error, Debug)]
pub enum CalibrationError {
    /// A reference, capacity or coefficient table is malformed.
    #[error("invalid table {path}: {reason}")]
    InvalidTable { path: String, reason: String },

    /// No coefficients exist for the country nor for any other country.
    #[error("no calibration coefficients available for {0}")]
    MissingCoefficients(String),

    /// Coefficient fitting could not start or did not converge.
    #[error("fit failed: {0}")]
    Fit(String),

    #[error(transparent)]
    Energy(#[from] EnergyError),

    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl CalibrationError {
    pub fn invalid_table(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidTable {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for calibration operations.
pub type CalibrationResult<T> = Result<T, CalibrationError>;
