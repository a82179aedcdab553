//! Error types for grid handling.

use energy_common::EnergyError;
use thiserror::Error;

/// Errors that can occur while loading, transforming or reducing grids.
#[derive(Error, Debug)]
pub enum GridError {
    /// Failed to open the grid data source.
    #[error("failed to open grid: {0}")]
    OpenFailed(String),

    /// Failed to read data from the grid.
    #[error("failed to read grid data: {0}")]
    ReadFailed(String),

    /// Failed to write a grid to disk.
    #[error("failed to write grid: {0}")]
    WriteFailed(String),

    /// Invalid metadata in the grid file (missing coordinates, bad time units).
    #[error("invalid grid metadata: {0}")]
    InvalidMetadata(String),

    /// Data length does not match the grid dimensions.
    #[error("shape mismatch: expected {expected} values, found {actual}")]
    Shape { expected: usize, actual: usize },

    /// Two grids that must share coordinates do not.
    #[error("grids are not aligned: {0}")]
    NotAligned(String),

    /// The mask does not sit on the grid's coordinates.
    #[error("mask for {country} does not align with the grid: {reason}")]
    MaskAlignment { country: String, reason: String },

    /// The mask carries no weight for any valid cell.
    #[error("mask for {0} has zero total weight")]
    ZeroWeight(String),

    /// The requested region or period selects nothing.
    #[error("empty selection: {0}")]
    EmptySelection(String),

    /// Interpolation error.
    #[error("interpolation error: {0}")]
    InterpolationError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Energy(#[from] EnergyError),
}

impl GridError {
    /// Create an OpenFailed error.
    pub fn open_failed(msg: impl Into<String>) -> Self {
        Self::OpenFailed(msg.into())
    }

    /// Create a ReadFailed error.
    pub fn read_failed(msg: impl Into<String>) -> Self {
        Self::ReadFailed(msg.into())
    }

    /// Create an InvalidMetadata error.
    pub fn invalid_metadata(msg: impl Into<String>) -> Self {
        Self::InvalidMetadata(msg.into())
    }

    /// Create a MaskAlignment error.
    pub fn mask_alignment(country: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MaskAlignment {
            country: country.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for grid operations.
pub type GridResult<T> = Result<T, GridError>;
