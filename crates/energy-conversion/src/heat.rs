//! Heating and cooling demand from air temperature.
//!
//! Both demands are expressed per unit of annual demand: the hourly series of
//! a year sums to the ratio of that year's degree days to those of a
//! reference year.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use climate_grid::harmonize::{daily_mean, forward_fill};
use climate_grid::{weighted_mean, ClimateGrid, CountryMask};
use energy_common::time::hourly_index;
use energy_common::{Carrier, EnergyError, TimeSeries, Tz};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ConversionError, ConversionResult};
use crate::profiles::HeatProfiles;

pub const DEFAULT_HEATING_THRESHOLD: f64 = 15.0;
pub const DEFAULT_COOLING_DAILY_THRESHOLD: f64 = 24.0;
pub const DEFAULT_COOLING_HOURLY_THRESHOLD: f64 = 28.0;
pub const DEFAULT_REFERENCE_YEAR: i32 = 2015;

/// Centred window (hours) smoothing the hourly cooling demand.
pub const COOLING_SMOOTHING_WINDOW: usize = 3;

const ZERO_CELSIUS: f64 = 273.15;

/// Degree-day thresholds in degrees Celsius.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DegreeDayThresholds {
    #[serde(default = "default_heating")]
    pub heating: f64,
    #[serde(default = "default_cooling_daily")]
    pub cooling_daily: f64,
    #[serde(default = "default_cooling_hourly")]
    pub cooling_hourly: f64,
}

fn default_heating() -> f64 {
    DEFAULT_HEATING_THRESHOLD
}

fn default_cooling_daily() -> f64 {
    DEFAULT_COOLING_DAILY_THRESHOLD
}

fn default_cooling_hourly() -> f64 {
    DEFAULT_COOLING_HOURLY_THRESHOLD
}

impl Default for DegreeDayThresholds {
    fn default() -> Self {
        Self {
            heating: DEFAULT_HEATING_THRESHOLD,
            cooling_daily: DEFAULT_COOLING_DAILY_THRESHOLD,
            cooling_hourly: DEFAULT_COOLING_HOURLY_THRESHOLD,
        }
    }
}

/// `max(threshold - T, 0)` per cell, with `T` in K and the threshold in C.
pub fn heating_degrees(temperature: &ClimateGrid, threshold: f64) -> ClimateGrid {
    temperature
        .map(|t| (threshold - (t as f64 - ZERO_CELSIUS)).max(0.0) as f32)
        .renamed("heating_degree_days", "K")
}

/// `max(T - threshold, 0)` per cell, with `T` in K and the threshold in C.
pub fn cooling_degrees(temperature: &ClimateGrid, threshold: f64) -> ClimateGrid {
    temperature
        .map(|t| (t as f64 - ZERO_CELSIUS - threshold).max(0.0) as f32)
        .renamed("cooling_degree_days", "K")
}

/// Daily mean temperature in local time, restricted to `year`.
pub fn local_daily_temperature(temperature: &ClimateGrid, hour_shift: f64, year: i32) -> ConversionResult<ClimateGrid> {
    Ok(daily_mean(temperature, hour_shift)?.select_year(year)?)
}

/// Heating demand sectors with their own intraday profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeatingSector {
    Residential,
    Services,
}

impl HeatingSector {
    pub const ALL: [HeatingSector; 2] = [HeatingSector::Residential, HeatingSector::Services];

    pub fn as_str(&self) -> &'static str {
        match self {
            HeatingSector::Residential => "residential",
            HeatingSector::Services => "services",
        }
    }

    /// Suffix of the result series, e.g. `residential_space`.
    pub fn series_suffix(&self) -> String {
        format!("{}_space", self.as_str())
    }

    pub fn series_name(&self) -> String {
        format!("{}__{}", Carrier::Heating.series_name(), self.series_suffix())
    }
}

impl fmt::Display for HeatingSector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HeatingSector {
    type Err = EnergyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HeatingSector::ALL
            .iter()
            .copied()
            .find(|sector| sector.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| EnergyError::invalid("heating sector", s))
    }
}

/// Ratio of the degree days of a year to those of the reference year.
fn interannual_change(total: f64, reference_total: f64, what: &'static str, reference_year: i32) -> ConversionResult<f64> {
    if !(reference_total > 0.0) || !reference_total.is_finite() {
        return Err(ConversionError::ZeroReference {
            what,
            year: reference_year,
        });
    }
    Ok(total / reference_total)
}

/// Rescale `series` so that its values sum to `target`. An all-zero series
/// stays zero.
fn normalise_to(series: &mut TimeSeries, target: f64) {
    let sum: f64 = series.values().iter().filter(|v| v.is_finite()).sum();
    if sum > 0.0 {
        series.scale(target / sum);
    } else {
        warn!(series = %series.name, "Demand is zero over the whole year, leaving it unscaled");
    }
}

/// Carry each daily value over the hours of that day.
fn daily_to_hourly(daily: &TimeSeries, targets: &[DateTime<Utc>]) -> ConversionResult<TimeSeries> {
    let mut values = Vec::with_capacity(targets.len());
    let mut seen = 0usize;
    for target in targets {
        while seen < daily.len() && daily.timestamps()[seen] <= *target {
            seen += 1;
        }
        values.push(if seen == 0 { f64::NAN } else { daily.values()[seen - 1] });
    }
    Ok(TimeSeries::new(daily.name.clone(), daily.units.clone(), targets.to_vec(), values)?)
}

/// Aggregated daily heating degree days of a year.
pub fn daily_heating_degree_days(
    temperature: &ClimateGrid,
    mask: &CountryMask,
    hour_shift: f64,
    threshold: f64,
    year: i32,
) -> ConversionResult<TimeSeries> {
    let daily = local_daily_temperature(temperature, hour_shift, year)?;
    Ok(weighted_mean(&heating_degrees(&daily, threshold), mask)?)
}

/// Hourly heating demand per sector for `year`.
///
/// `temperature` covers `year`; `reference_temperature` covers the reference
/// year. Daily degree days are spread over the hours of each day by the
/// intraday profile at the local civil time of `time_zone`. Each returned
/// series sums to `HDD(year) / HDD(reference)`.
#[allow(clippy::too_many_arguments)]
pub fn heating_demand(
    temperature: &ClimateGrid,
    reference_temperature: &ClimateGrid,
    mask: &CountryMask,
    hour_shift: f64,
    time_zone: Tz,
    threshold: f64,
    year: i32,
    reference_year: i32,
    profiles: &HeatProfiles,
) -> ConversionResult<Vec<TimeSeries>> {
    let daily_temperature = local_daily_temperature(temperature, hour_shift, year)?;
    let daily = weighted_mean(&heating_degrees(&daily_temperature, threshold), mask)?;
    let reference = daily_heating_degree_days(reference_temperature, mask, hour_shift, threshold, reference_year)?;
    let change = interannual_change(daily.sum(), reference.sum(), "heating degree days", reference_year)?;
    debug!(country = %mask.country, year, change, method = ?profiles.method(), "Heating interannual change");

    let hourly = daily_to_hourly(&daily, &hourly_index(year)?)?;
    let hourly_celsius: Vec<f64> = match profiles {
        HeatProfiles::TemperatureClass(_) => {
            let daily_mean = weighted_mean(&daily_temperature, mask)?;
            daily_to_hourly(&daily_mean, hourly.timestamps())?
                .values()
                .iter()
                .map(|t| t - ZERO_CELSIUS)
                .collect()
        }
        HeatProfiles::Weekly(_) => vec![f64::NAN; hourly.len()],
    };

    let mut result = Vec::new();
    for sector in HeatingSector::ALL {
        let values = hourly
            .iter()
            .zip(&hourly_celsius)
            .map(|((time, hdd), celsius)| hdd * profiles.factor(sector, &time.with_timezone(&time_zone), *celsius))
            .collect();
        let mut series = TimeSeries::new(
            sector.series_name(),
            Carrier::Heating.units(),
            hourly.timestamps().to_vec(),
            values,
        )?;
        normalise_to(&mut series, change);
        result.push(series);
    }
    Ok(result)
}

/// Hourly cooling demand for `year`.
///
/// Days without cooling degree days switch cooling off for the whole day;
/// on the other days the hourly excess over the hourly threshold drives
/// demand. The series sums to `CDD(year) / CDD(reference)`.
#[allow(clippy::too_many_arguments)]
pub fn cooling_demand(
    temperature: &ClimateGrid,
    reference_temperature: &ClimateGrid,
    mask: &CountryMask,
    hour_shift: f64,
    thresholds: &DegreeDayThresholds,
    year: i32,
    reference_year: i32,
) -> ConversionResult<TimeSeries> {
    let daily_cdd = cooling_degrees(
        &local_daily_temperature(temperature, hour_shift, year)?,
        thresholds.cooling_daily,
    );
    let reference_cdd = cooling_degrees(
        &local_daily_temperature(reference_temperature, hour_shift, reference_year)?,
        thresholds.cooling_daily,
    );
    let change = interannual_change(
        weighted_mean(&daily_cdd, mask)?.sum(),
        weighted_mean(&reference_cdd, mask)?.sum(),
        "cooling degree days",
        reference_year,
    )?;
    debug!(country = %mask.country, year, change, "Cooling interannual change");

    // 0 stays off, anything else (NaN included) switches on
    let switch = daily_cdd.map(|v| if v == 0.0 { 0.0 } else { 1.0 });
    let hourly_temperature = temperature.select_year(year)?;
    let switch = forward_fill(&switch, hourly_temperature.times())?;

    let hourly_cdd = cooling_degrees(&hourly_temperature, thresholds.cooling_hourly);
    let switched = hourly_cdd.zip_map(&switch, |cdd, on| cdd * on)?;

    let aggregated = weighted_mean(&switched, mask)?;
    let mut series = aggregated.rolling_mean_centered(COOLING_SMOOTHING_WINDOW);
    series.name = Carrier::Cooling.series_name().to_string();
    series.units = Carrier::Cooling.units().to_string();
    normalise_to(&mut series, change);
    Ok(series)
}

/// Mean air temperature over the country, every cell weighted equally.
pub fn mean_temperature(temperature: &ClimateGrid, mask: &CountryMask) -> ConversionResult<TimeSeries> {
    let mut series = weighted_mean(temperature, &mask.with_unit_weights())?;
    series.name = Carrier::Temperature.series_name().to_string();
    series.units = Carrier::Temperature.units().to_string();
    Ok(series)
}
