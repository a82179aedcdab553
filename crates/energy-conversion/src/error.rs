//! Error types for the conversion stage.

use climate_grid::GridError;
use energy_common::EnergyError;
use thiserror::Error;

/// Errors that can occur while turning climate grids into energy series.
#[derive(Error, Debug)]
pub enum ConversionError {
    /// A turbine power curve is malformed.
    #[error("invalid power curve: {0}")]
    InvalidPowerCurve(String),

    /// An intraday demand profile is malformed.
    #[error("invalid demand profile: {0}")]
    InvalidProfile(String),

    /// A climate input needed by the carrier is not available.
    #[error("missing input: {0}")]
    MissingInput(String),

    /// The reference year has no degree days to compare against.
    #[error("reference {what} of {year} is zero")]
    ZeroReference { what: &'static str, year: i32 },

    /// The carrier cannot be produced from this climate source.
    #[error("unsupported conversion: {0}")]
    Unsupported(String),

    #[error(transparent)]
    Grid(#[from] GridError),

    #[error(transparent)]
    Energy(#[from] EnergyError),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl ConversionError {
    pub fn missing_input(msg: impl Into<String>) -> Self {
        Self::MissingInput(msg.into())
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }
}

/// Result type for conversion operations.
pub type ConversionResult<T> = Result<T, ConversionError>;
