//! Error types for resource adequacy analysis.

use energy_common::EnergyError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AdequacyError {
    /// Hourly inputs of different lengths.
    #[error("{what} has {found} values, expected {expected}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    /// A series whose mean is needed for scaling has none.
    #[error("{0} has no positive mean")]
    ZeroMean(&'static str),

    /// No reservoir filling level was reported.
    #[error("no reservoir filling level reported")]
    MissingFillingLevel,

    #[error("invalid {what}: {reason}")]
    InvalidParameter { what: &'static str, reason: String },

    #[error("invalid power system table {path}: {reason}")]
    InvalidTable { path: String, reason: String },

    #[error(transparent)]
    Energy(#[from] EnergyError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl AdequacyError {
    pub fn invalid(what: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            what,
            reason: reason.into(),
        }
    }
}

pub type AdequacyResult<T> = Result<T, AdequacyError>;
