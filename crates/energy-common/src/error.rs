//! Error types shared by the energy time series crates.

use thiserror::Error;

/// Result type alias using EnergyError.
pub type EnergyResult<T> = Result<T, EnergyError>;

/// Primary error type for domain lookups, identifiers and series I/O.
#[derive(Debug, Error)]
pub enum EnergyError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Unknown country: {0}")]
    UnknownCountry(String),

    #[error("Invalid {kind}: '{value}'")]
    InvalidIdentifier { kind: &'static str, value: String },

    #[error("Invalid time specification: {0}")]
    InvalidTime(String),

    #[error("Invalid time series: {0}")]
    InvalidSeries(String),
}

impl EnergyError {
    /// Create an InvalidIdentifier error.
    pub fn invalid(kind: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidIdentifier {
            kind,
            value: value.into(),
        }
    }
}
