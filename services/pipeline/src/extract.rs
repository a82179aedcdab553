//! Extraction of downloaded archives.

use anyhow::{Context, Result};
use archive_extract::{extract_all, BatchReport};
use tracing::info;

use crate::settings::Settings;

/// Extract every archive below the climate data directory.
///
/// Fails when any archive could not be extracted; the others are still
/// processed first.
pub fn run(settings: &Settings, overwrite: bool) -> Result<BatchReport> {
    let root = &settings.directories.climate_data;
    let report = extract_all(root, overwrite)
        .with_context(|| format!("Failed to scan {} for archives", root.display()))?;
    info!(
        extracted = report.extracted.len(),
        skipped = report.skipped.len(),
        failed = report.failed.len(),
        "Extraction finished"
    );
    report.into_result().context("Some archives could not be extracted")
}
