//! Conversion of climate grids into per-country result series.

use std::path::PathBuf;

use anyhow::{Context, Result};
use calibration::{CalibrationError, CoefficientStore, RetainFactors};
use climate_grid::{CountryMask, GridStore};
use energy_common::{Carrier, Country, TimeSeries};
use energy_conversion::{ClimateInputs, ConversionSettings, ConversionTarget, Converter, HeatingSector, LinearCorrection};
use tracing::{debug, info, instrument, warn};

use crate::installed_capacity;
use crate::settings::Settings;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConvertSummary {
    pub written: Vec<PathBuf>,
    /// Result files that already existed.
    pub skipped: Vec<PathBuf>,
}

/// Names of the result series produced for `carrier`.
pub fn series_names(carrier: Carrier) -> Vec<String> {
    match carrier {
        Carrier::Heating => HeatingSector::ALL.iter().map(|s| s.series_name()).collect(),
        _ => vec![carrier.series_name().to_string()],
    }
}

/// Stored calibration applied while converting one country.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredCalibration {
    pub correction: LinearCorrection,
    pub retain: Option<RetainFactors>,
}

impl Default for StoredCalibration {
    fn default() -> Self {
        Self {
            correction: LinearCorrection::IDENTITY,
            retain: None,
        }
    }
}

/// Read the coefficients of `country`, falling back to the identity when
/// none exist for any country.
pub fn stored_calibration(
    coefficients: &CoefficientStore<'_>,
    country: &Country,
    carrier: Carrier,
) -> Result<StoredCalibration> {
    let uses_correction = matches!(carrier, Carrier::WindOnshore | Carrier::WindOffshore | Carrier::Solar);
    let uses_retain = matches!(carrier, Carrier::HydroReservoir | Carrier::HydroRunOfRiver);
    if !uses_correction && !uses_retain {
        return Ok(StoredCalibration::default());
    }

    let stored = match coefficients.read(country, carrier) {
        Ok(stored) => stored,
        Err(CalibrationError::MissingCoefficients(what)) => {
            warn!(country = country.iso_alpha2, carrier = %carrier, reason = %what, "No calibration coefficients, converting uncorrected");
            return Ok(StoredCalibration::default());
        }
        Err(e) => return Err(e.into()),
    };

    let mut calibration = StoredCalibration::default();
    if uses_correction {
        calibration.correction = LinearCorrection::from_coefficients(&stored.values)
            .with_context(|| format!("Unexpected {carrier} coefficients {:?}", stored.names))?;
    } else {
        calibration.retain = Some(
            RetainFactors::from_coefficients(&stored.values)
                .with_context(|| format!("Expected 12 retain factors for {carrier}, found {}", stored.values.len()))?,
        );
    }
    Ok(calibration)
}

/// Convert `carrier` for every country over the configured years and write
/// one CSV per result series.
#[instrument(skip_all, fields(carrier = %carrier, source = %settings.climate_source))]
pub fn run(
    store: &dyn GridStore,
    settings: &Settings,
    conversion: &ConversionSettings,
    carrier: Carrier,
    countries: &[&Country],
    overwrite: bool,
) -> Result<ConvertSummary> {
    let paths = settings.paths();
    let source = &settings.climate_source;
    let capacity = installed_capacity(settings)?;
    let coefficients = CoefficientStore::new(&paths, source, &capacity);
    let converter = Converter::new(ClimateInputs::new(store, &paths, source), conversion);
    let mut summary = ConvertSummary::default();

    for &country in countries {
        if !carrier.applies_to(country) {
            debug!(country = country.iso_alpha2, "Carrier not produced for country");
            continue;
        }

        let outputs: Vec<(String, PathBuf)> = series_names(carrier)
            .into_iter()
            .map(|name| {
                let path = paths.result_file(country, source, &name);
                (name, path)
            })
            .collect();
        if !overwrite && outputs.iter().all(|(_, path)| path.exists()) {
            info!(country = country.iso_alpha2, "Results already exist");
            summary.skipped.extend(outputs.into_iter().map(|(_, path)| path));
            continue;
        }

        let mask_path = paths.mask_file(country, carrier);
        let mask = CountryMask::load_csv(&mask_path, country.iso_alpha2)
            .with_context(|| format!("Failed to load mask {}", mask_path.display()))?;
        let calibration = if settings.read_calibration_coefficients {
            stored_calibration(&coefficients, country, carrier)?
        } else {
            StoredCalibration::default()
        };

        let mut pieces: Vec<Vec<TimeSeries>> = vec![Vec::new(); outputs.len()];
        for year in settings.years.iter() {
            let target = ConversionTarget {
                mask: &mask,
                hour_shift: country.hour_shift(),
                time_zone: country.time_zone,
                year,
                correction: calibration.correction,
            };
            let series = converter
                .convert(carrier, &target)
                .with_context(|| format!("Failed to convert {carrier} for {} in {year}", country.name))?;
            for (slot, s) in pieces.iter_mut().zip(series) {
                slot.push(s);
            }
        }

        for ((name, path), parts) in outputs.into_iter().zip(pieces) {
            let mut series = TimeSeries::concat(parts).with_context(|| format!("Failed to join {name}"))?;
            if let Some(retain) = &calibration.retain {
                retain.apply(&mut series);
            }
            series
                .write_csv(&path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(country = country.iso_alpha2, path = %path.display(), values = series.len(), "Wrote result series");
            summary.written.push(path);
        }
    }

    Ok(summary)
}
