//! Error types for climate data retrieval.

use energy_common::EnergyError;
use thiserror::Error;

/// Errors that can occur while retrieving an archive.
#[derive(Error, Debug)]
pub enum RetrievalError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Data store returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Job {job_id} failed: {reason}")]
    JobFailed { job_id: String, reason: String },

    #[error("Unexpected response from data store: {0}")]
    Protocol(String),

    #[error("Missing credentials: {0}")]
    Credentials(String),

    #[error("Retrieval failed after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Energy(#[from] EnergyError),
}

impl RetrievalError {
    /// Whether another attempt may succeed.
    ///
    /// Network errors, server errors and rate limiting are retried; rejected
    /// requests and failed jobs are not.
    pub fn is_transient(&self) -> bool {
        match self {
            RetrievalError::Http(_) | RetrievalError::Io(_) => true,
            RetrievalError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Result type for retrieval operations.
pub type RetrievalResult<T> = Result<T, RetrievalError>;
