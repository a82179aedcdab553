//! Error types for archive extraction.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while extracting an archive.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Unsupported archive format: {0}")]
    UnsupportedFormat(PathBuf),

    #[error("Archive {0} contains no regular file")]
    EmptyArchive(PathBuf),

    #[error("Archive {archive} contains {} files, expected one: {}", entries.len(), entries.join(", "))]
    MultipleEntries { archive: PathBuf, entries: Vec<String> },

    #[error("Archive {archive} has unsafe entry path '{entry}'")]
    UnsafePath { archive: PathBuf, entry: String },

    #[error("Destination already exists: {0}")]
    DestinationExists(PathBuf),

    #[error("{failed} of {total} archives failed to extract")]
    BatchFailed { failed: usize, total: usize },

    #[error("Failed to read archive: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read zip archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Failed to walk directory: {0}")]
    Walk(#[from] walkdir::Error),
}

impl ExtractError {
    pub fn unsafe_path(archive: impl Into<PathBuf>, entry: impl Into<String>) -> Self {
        Self::UnsafePath {
            archive: archive.into(),
            entry: entry.into(),
        }
    }
}

/// Result type for extraction operations.
pub type ExtractResult<T> = Result<T, ExtractError>;
