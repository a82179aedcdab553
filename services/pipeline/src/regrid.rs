//! Regridding of extracted projection files onto the reanalysis grid.
//!
//! Extracted files keep their native grid and are named
//! `<stem>__original.nc`. Each one is resampled onto the grid of the
//! reanalysis temperature file of the reference year and written as
//! `<stem>.nc`. Yearly files (`<year>__...`) are also cut to that calendar
//! year, since projection archives overlap at their ends.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use archive_extract::EXTRACTED_SUFFIX;
use climate_grid::{regrid, GridStore, InterpolationMethod};
use energy_common::{ClimateSource, DataPaths, TimeResolution};
use tracing::{debug, info, instrument, warn};

use crate::settings::Settings;

/// Reanalysis variable whose grid every projection is resampled onto.
pub const TEMPLATE_VARIABLE: &str = "2m_temperature";

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RegridSummary {
    pub regridded: Vec<PathBuf>,
    /// Originals whose regridded file already existed.
    pub skipped: Vec<PathBuf>,
}

/// Reanalysis file providing the target grid.
pub fn template_path(paths: &DataPaths, reference_year: i32) -> PathBuf {
    paths.climate_file(
        &ClimateSource::Reanalysis,
        TEMPLATE_VARIABLE,
        reference_year,
        TimeResolution::Hourly,
    )
}

/// Regridded file name for an extracted original, if it is one.
pub fn regridded_path(original: &Path) -> Option<PathBuf> {
    let name = original.file_name()?.to_str()?;
    let stem = name.strip_suffix(EXTRACTED_SUFFIX)?;
    Some(original.with_file_name(format!("{stem}.nc")))
}

/// Year of a yearly file (`<year>__...`); `None` for multi-year spans.
fn file_year(path: &Path) -> Option<i32> {
    let name = path.file_name()?.to_str()?;
    let (year, _) = name.split_once("__")?;
    if year.len() == 4 {
        year.parse().ok()
    } else {
        None
    }
}

/// Extracted originals in the folders of `source`, sorted by path.
fn find_originals(paths: &DataPaths, source: &ClimateSource) -> Result<Vec<PathBuf>> {
    let prefix = format!("{}__{}", paths.region, source.name_prefix());
    let root = &paths.climate_root;
    let mut originals = Vec::new();

    let entries = fs::read_dir(root).with_context(|| format!("Failed to list {}", root.display()))?;
    for folder in entries {
        let folder = folder?.path();
        let matches = folder
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with(&prefix));
        if !folder.is_dir() || !matches {
            continue;
        }
        for entry in fs::read_dir(&folder)? {
            let path = entry?.path();
            if regridded_path(&path).is_some() {
                originals.push(path);
            }
        }
    }

    originals.sort();
    Ok(originals)
}

/// Regrid every extracted file of the configured projection.
#[instrument(skip_all, fields(source = %settings.climate_source))]
pub fn run(
    store: &dyn GridStore,
    settings: &Settings,
    method: InterpolationMethod,
    overwrite: bool,
) -> Result<RegridSummary> {
    let source = &settings.climate_source;
    let mut summary = RegridSummary::default();
    if !source.is_projection() {
        info!("Reanalysis data is already on the target grid");
        return Ok(summary);
    }

    let paths = settings.paths();
    let originals = find_originals(&paths, source)?;
    if originals.is_empty() {
        warn!(root = %paths.climate_root.display(), "No extracted files to regrid");
        return Ok(summary);
    }

    let template_file = template_path(&paths, settings.reference_year);
    let template = store
        .read(&template_file)
        .with_context(|| format!("Failed to read target grid {}", template_file.display()))?;
    debug!(rows = template.ny(), cols = template.nx(), "Loaded target grid");

    for original in originals {
        let Some(output) = regridded_path(&original) else {
            continue;
        };
        if !overwrite && store.exists(&output) {
            debug!(path = %output.display(), "Already regridded");
            summary.skipped.push(original);
            continue;
        }

        let grid = store
            .read(&original)
            .with_context(|| format!("Failed to read {}", original.display()))?;
        let mut resampled = regrid(&grid, template.lats(), template.lons(), method)
            .with_context(|| format!("Failed to regrid {}", original.display()))?;
        if let Some(year) = file_year(&original) {
            resampled = resampled
                .select_year(year)
                .with_context(|| format!("{} holds no data for {year}", original.display()))?;
        }

        store
            .write(&output, &resampled)
            .with_context(|| format!("Failed to write {}", output.display()))?;
        info!(path = %output.display(), steps = resampled.nt(), "Regridded");
        summary.regridded.push(output);
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regridded_path() {
        assert_eq!(
            regridded_path(Path::new("/c/v/2030__3hourly_x__original.nc")),
            Some(PathBuf::from("/c/v/2030__3hourly_x.nc"))
        );
        assert_eq!(regridded_path(Path::new("/c/v/2030__3hourly_x.nc")), None);
    }

    #[test]
    fn test_file_year() {
        assert_eq!(file_year(Path::new("2030__3hourly_x__original.nc")), Some(2030));
        assert_eq!(file_year(Path::new("2015_2100__monthly_x__original.nc")), None);
    }
}
