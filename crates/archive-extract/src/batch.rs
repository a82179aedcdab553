//! Extraction of every archive below a directory.

use std::path::{Path, PathBuf};

use energy_common::ArchiveFormat;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::error::{ExtractError, ExtractResult};
use crate::extract::{extract_archive, extracted_path};

/// Outcome of a batch extraction.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub extracted: Vec<PathBuf>,
    /// Archives whose extracted file already existed.
    pub skipped: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, ExtractError)>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.extracted.len() + self.skipped.len() + self.failed.len()
    }

    /// Turn recorded per-archive failures into an error.
    pub fn into_result(self) -> ExtractResult<Self> {
        if self.failed.is_empty() {
            Ok(self)
        } else {
            Err(ExtractError::BatchFailed {
                failed: self.failed.len(),
                total: self.total(),
            })
        }
    }
}

/// Extract every archive found below `root` next to itself.
///
/// Archives whose extracted file already exists are skipped unless
/// `overwrite` is set. A failing archive is logged and recorded; the walk
/// continues with the next one.
pub fn extract_all(root: &Path, overwrite: bool) -> ExtractResult<BatchReport> {
    let mut report = BatchReport::default();

    let mut archives = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_file() && ArchiveFormat::detect(entry.path()).is_some() {
            archives.push(entry.into_path());
        }
    }
    info!(root = %root.display(), archives = archives.len(), "Extracting archives");

    for archive in archives {
        let destination = extracted_path(&archive)?;
        if destination.exists() && !overwrite {
            info!(archive = %archive.display(), "Already extracted, skipping");
            report.skipped.push(archive);
            continue;
        }
        match extract_archive(&archive, &destination, overwrite) {
            Ok(path) => report.extracted.push(path),
            Err(e) => {
                warn!(archive = %archive.display(), error = %e, "Extraction failed");
                report.failed.push((archive, e));
            }
        }
    }

    info!(
        extracted = report.extracted.len(),
        skipped = report.skipped.len(),
        failed = report.failed.len(),
        "Batch extraction finished"
    );
    Ok(report)
}
