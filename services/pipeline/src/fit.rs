//! Fitting calibration coefficients from measured data.
//!
//! Wind and solar get a linear correction matching the measured mean
//! capacity factor of the calibration year; hydropower gets monthly retain
//! factors matching the reference generation of that year. Coefficients are
//! appended to the per-country files read by the conversion stage.

use anyhow::{Context, Result};
use calibration::{
    fit_solar_correction, fit_wind_correction, CalibrationResult, CoefficientStore, ReferenceTotals, RetainFactors,
};
use climate_grid::{CountryMask, GridStore};
use energy_common::{Carrier, Country, Period, TimeSeries};
use energy_conversion::{ClimateInputs, ConversionSettings, ConversionTarget, Converter, LinearCorrection};
use tracing::{info, instrument, warn};

use crate::installed_capacity;
use crate::settings::Settings;

/// Coefficients fitted for one country.
#[derive(Debug, Clone, PartialEq)]
pub struct FittedCoefficients {
    pub country: &'static str,
    pub names: Vec<String>,
    pub values: Vec<f64>,
    /// Whether the values were added to the coefficient file.
    pub saved: bool,
}

/// Mean of the finite values of a series.
pub fn finite_mean(series: &TimeSeries) -> f64 {
    let (sum, count) = series
        .values()
        .iter()
        .filter(|v| v.is_finite())
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

/// Fit and store coefficients of `carrier` for each country.
///
/// Countries without measurements are skipped with a warning.
#[instrument(skip_all, fields(carrier = %carrier, year = settings.calibration.year))]
pub fn run(
    store: &dyn GridStore,
    settings: &Settings,
    conversion: &ConversionSettings,
    carrier: Carrier,
    countries: &[&Country],
) -> Result<Vec<FittedCoefficients>> {
    let is_hydro = matches!(carrier, Carrier::HydroReservoir | Carrier::HydroRunOfRiver);
    anyhow::ensure!(
        is_hydro || matches!(carrier, Carrier::WindOnshore | Carrier::WindOffshore | Carrier::Solar),
        "No calibration coefficients are fitted for {carrier}"
    );

    let paths = settings.paths();
    let source = &settings.climate_source;
    let year = settings.calibration.year;
    let capacity = installed_capacity(settings)?;
    let coefficients = CoefficientStore::new(&paths, source, &capacity);
    let converter = Converter::new(ClimateInputs::new(store, &paths, source), conversion);
    let measurements = if is_hydro {
        settings.reference_path(carrier.series_name())
    } else {
        settings.capacity_factor_path(carrier)
    };

    let mut fitted = Vec::new();
    for &country in countries {
        if !carrier.applies_to(country) {
            continue;
        }

        let measured = ReferenceTotals::load_csv(&measurements, country.iso_alpha2)
            .with_context(|| format!("Failed to read measurements {}", measurements.display()))?;
        if measured.is_empty() {
            warn!(country = country.iso_alpha2, path = %measurements.display(), "No measurements for country");
            continue;
        }

        let mask_path = paths.mask_file(country, carrier);
        let mask = CountryMask::load_csv(&mask_path, country.iso_alpha2)
            .with_context(|| format!("Failed to load mask {}", mask_path.display()))?;
        let target = |correction: LinearCorrection| ConversionTarget {
            mask: &mask,
            hour_shift: country.hour_shift(),
            time_zone: country.time_zone,
            year,
            correction,
        };

        let (names, values) = if is_hydro {
            let simulated = converter
                .convert(carrier, &target(LinearCorrection::IDENTITY))
                .with_context(|| format!("Failed to convert {carrier} for {}", country.name))?
                .into_iter()
                .next()
                .context("Conversion returned no series")?;
            let factors = RetainFactors::fit(&simulated, &measured, year);
            (RetainFactors::coefficient_names(), factors.coefficients().to_vec())
        } else {
            let Some(actual_mean) = measured.get(&Period::Year(year)) else {
                warn!(country = country.iso_alpha2, year, "No measured capacity factor for year");
                continue;
            };
            let mean_for = |correction: LinearCorrection| -> CalibrationResult<f64> {
                let series = converter.convert(carrier, &target(correction))?;
                Ok(series.first().map(finite_mean).unwrap_or(f64::NAN))
            };
            let fit = if carrier == Carrier::Solar {
                fit_solar_correction(actual_mean, mean_for)
            } else {
                fit_wind_correction(actual_mean, mean_for)
            }
            .with_context(|| format!("Failed to fit {carrier} correction for {}", country.name))?;
            info!(
                country = country.iso_alpha2,
                alpha = fit.correction.alpha,
                beta = fit.correction.beta,
                bias = fit.bias,
                "Fitted correction"
            );
            (
                vec!["alpha".to_string(), "beta".to_string()],
                fit.correction.coefficients().to_vec(),
            )
        };

        let saved = coefficients
            .save(country, carrier, year, &names, &values)
            .with_context(|| format!("Failed to save coefficients for {}", country.name))?;
        fitted.push(FittedCoefficients {
            country: country.iso_alpha2,
            names,
            values,
            saved,
        });
    }

    Ok(fitted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::hourly_series;

    #[test]
    fn test_finite_mean_ignores_gaps() {
        let series = hourly_series("wind", 2015, |h| if h == 0 { f64::NAN } else { 0.5 });
        assert_eq!(finite_mean(&series), 0.5);

        let empty = hourly_series("wind", 2015, |_| f64::NAN);
        assert!(finite_mean(&empty).is_nan());
    }
}
