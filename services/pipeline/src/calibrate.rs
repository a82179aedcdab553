//! Calibration of written result series against historical totals.

use anyhow::{Context, Result};
use calibration::{calibrate, CalibrationReport, ReferenceTotals};
use energy_common::{Carrier, Country, TimeSeries};
use tracing::{info, instrument, warn};

use crate::convert::series_names;
use crate::settings::Settings;

/// Scale the result series of `carrier` so that their period totals match
/// the reference totals, rewriting each file in place.
///
/// Returns the report of every calibrated series, keyed by file name.
#[instrument(skip_all, fields(carrier = %carrier))]
pub fn run(settings: &Settings, carrier: Carrier, countries: &[&Country]) -> Result<Vec<(String, CalibrationReport)>> {
    anyhow::ensure!(
        carrier != Carrier::Temperature,
        "Temperature series have no reference totals to calibrate against"
    );

    let paths = settings.paths();
    let granularity = settings.granularity(carrier);
    let mut reports = Vec::new();

    for &country in countries {
        if !carrier.applies_to(country) {
            continue;
        }
        for name in series_names(carrier) {
            let path = paths.result_file(country, &settings.climate_source, &name);
            if !path.exists() {
                warn!(country = country.iso_alpha2, series = %name, "No result series to calibrate");
                continue;
            }

            let reference_path = settings.reference_path(&name);
            let reference = ReferenceTotals::load_csv(&reference_path, country.iso_alpha2)
                .with_context(|| format!("Failed to read reference totals {}", reference_path.display()))?;
            if reference.is_empty() {
                warn!(country = country.iso_alpha2, series = %name, "No reference totals for country");
                continue;
            }

            let mut series = TimeSeries::read_csv(&path, name.as_str(), carrier.units())
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let report = calibrate(&mut series, &reference, granularity);
            series
                .write_csv(&path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(
                country = country.iso_alpha2,
                path = %path.display(),
                granularity = ?granularity,
                complete = report.is_complete(),
                "Calibrated result series"
            );

            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            reports.push((file_name, report));
        }
    }

    Ok(reports)
}
