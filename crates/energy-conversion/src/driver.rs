//! Per-country conversion: locating the climate inputs of a source, bringing
//! them onto an hourly axis and running the carrier's conversion.

use std::path::PathBuf;

use climate_grid::harmonize::{accumulated_to_power, shift_to_mid_step, upsample_to_hourly};
use climate_grid::{reduce, ClimateGrid, CountryMask, GridStore};
use energy_common::{BoundingBox, Carrier, ClimateSource, DataPaths, TimeResolution, TimeSeries, Tz};
use tracing::{debug, info};

use crate::correction::LinearCorrection;
use crate::error::{ConversionError, ConversionResult};
use crate::heat::{cooling_demand, heating_demand, mean_temperature, DegreeDayThresholds};
use crate::profiles::HeatProfiles;
use crate::hydro::{hydro_inflow, PlantKind, RunoffUnits};
use crate::solar::{convert_solar, SolarPanel};
use crate::wind::{convert_wind, wind_speed_from_components, WindTurbine};

/// Seconds in the hourly accumulation period of the reanalysis.
const ACCUMULATION_SECONDS: f64 = 3600.0;

/// Margin (degrees) kept around a mask when clipping inputs, so that cell
/// spacing can still be read off single-row masks.
const CLIP_MARGIN_DEG: f64 = 1.0;

/// Physical quantities read from the climate archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantity {
    Temperature,
    WindU,
    WindV,
    WindSpeed,
    Roughness,
    SolarRadiation,
    Runoff,
}

/// Name of a quantity in a source's archive and the resolution it is stored at.
pub fn archive_variable(source: &ClimateSource, quantity: Quantity) -> ConversionResult<(&'static str, TimeResolution)> {
    use Quantity::*;
    let found = match source {
        ClimateSource::Reanalysis => match quantity {
            Temperature => Some("2m_temperature"),
            WindU => Some("100m_u_component_of_wind"),
            WindV => Some("100m_v_component_of_wind"),
            Roughness => Some("forecast_surface_roughness"),
            SolarRadiation => Some("surface_solar_radiation_downwards"),
            Runoff => Some("runoff"),
            WindSpeed => None,
        }
        .map(|name| (name, TimeResolution::Hourly)),
        ClimateSource::Cordex { .. } => match quantity {
            Temperature => Some(("2m_air_temperature", TimeResolution::ThreeHourly)),
            WindSpeed => Some(("10m_wind_speed", TimeResolution::ThreeHourly)),
            SolarRadiation => Some(("surface_solar_radiation_downwards", TimeResolution::ThreeHourly)),
            Runoff => Some(("total_run_off_flux", TimeResolution::SixHourly)),
            WindU | WindV | Roughness => None,
        },
        ClimateSource::Cmip6 { .. } => {
            return Err(ConversionError::unsupported(
                "CMIP6 data is daily or monthly and cannot drive hourly conversion",
            ))
        }
    };
    found.ok_or_else(|| ConversionError::missing_input(format!("{quantity:?} is not available from {source}")))
}

/// Height (m) at which a source reports wind.
pub fn wind_data_height(source: &ClimateSource) -> f64 {
    if source.is_projection() {
        10.0
    } else {
        100.0
    }
}

/// Where a source's climate files live and how to read them.
pub struct ClimateInputs<'a> {
    store: &'a dyn GridStore,
    paths: &'a DataPaths,
    source: &'a ClimateSource,
}

impl<'a> ClimateInputs<'a> {
    pub fn new(store: &'a dyn GridStore, paths: &'a DataPaths, source: &'a ClimateSource) -> Self {
        Self { store, paths, source }
    }

    pub fn source(&self) -> &ClimateSource {
        self.source
    }

    pub fn path(&self, quantity: Quantity, year: i32) -> ConversionResult<PathBuf> {
        let (variable, resolution) = archive_variable(self.source, quantity)?;
        Ok(self.paths.climate_file(self.source, variable, year, resolution))
    }

    /// Read `quantity` for `year` on an hourly axis, clipped to `bbox`.
    ///
    /// Projection data is interpolated to hourly; reanalysis radiation is
    /// turned from hourly accumulations into mid-step mean power.
    pub fn load(&self, quantity: Quantity, year: i32, bbox: Option<&BoundingBox>) -> ConversionResult<ClimateGrid> {
        let (_, resolution) = archive_variable(self.source, quantity)?;
        let path = self.path(quantity, year)?;
        if !self.store.exists(&path) {
            return Err(ConversionError::missing_input(format!("{}", path.display())));
        }

        let mut grid = self.store.read(&path)?;
        if let Some(bbox) = bbox {
            grid = grid.clip(bbox)?;
        }

        if self.source.is_projection() {
            if let Some(step) = resolution.step_hours().filter(|&h| h > 1) {
                grid = upsample_to_hourly(&grid, year, step)?;
            }
        } else if quantity == Quantity::SolarRadiation {
            grid = shift_to_mid_step(&accumulated_to_power(&grid, ACCUMULATION_SECONDS))?;
        }

        debug!(path = %path.display(), quantity = ?quantity, steps = grid.nt(), rows = grid.ny(), cols = grid.nx(), "Loaded climate input");
        Ok(grid)
    }
}

/// Parameters shared by every conversion of a run.
#[derive(Debug, Clone)]
pub struct ConversionSettings {
    pub onshore_turbine: WindTurbine,
    pub offshore_turbine: WindTurbine,
    pub solar_panel: SolarPanel,
    pub heat_profiles: HeatProfiles,
    pub thresholds: DegreeDayThresholds,
    pub reference_year: i32,
    /// Static roughness field for sources without one.
    pub roughness_file: Option<PathBuf>,
}

/// One country-year conversion request.
#[derive(Debug, Clone)]
pub struct ConversionTarget<'m> {
    pub mask: &'m CountryMask,
    /// Hours from UTC to local standard time.
    pub hour_shift: f64,
    /// Civil time zone of the country.
    pub time_zone: Tz,
    pub year: i32,
    pub correction: LinearCorrection,
}

/// Runs carrier conversions against one climate source.
pub struct Converter<'a> {
    inputs: ClimateInputs<'a>,
    settings: &'a ConversionSettings,
}

impl<'a> Converter<'a> {
    pub fn new(inputs: ClimateInputs<'a>, settings: &'a ConversionSettings) -> Self {
        Self { inputs, settings }
    }

    /// Convert `carrier` for one country and year.
    ///
    /// Returns one series per result file (heating yields one per sector).
    pub fn convert(&self, carrier: Carrier, target: &ConversionTarget<'_>) -> ConversionResult<Vec<TimeSeries>> {
        let bbox = target.mask.bbox().expand(CLIP_MARGIN_DEG);
        info!(carrier = %carrier, country = %target.mask.country, year = target.year, source = %self.inputs.source(), "Converting");

        let series = match carrier {
            Carrier::WindOnshore => vec![self.wind(carrier, &self.settings.onshore_turbine, target, &bbox)?],
            Carrier::WindOffshore => vec![self.wind(carrier, &self.settings.offshore_turbine, target, &bbox)?],
            Carrier::Solar => vec![self.solar(target, &bbox)?],
            Carrier::HydroReservoir | Carrier::HydroRunOfRiver => vec![self.hydro(carrier, target, &bbox)?],
            Carrier::Heating => {
                let (temperature, reference) = self.temperature_pair(target, &bbox)?;
                heating_demand(
                    &temperature,
                    &reference,
                    target.mask,
                    target.hour_shift,
                    target.time_zone,
                    self.settings.thresholds.heating,
                    target.year,
                    self.settings.reference_year,
                    &self.settings.heat_profiles,
                )?
            }
            Carrier::Cooling => {
                let (temperature, reference) = self.temperature_pair(target, &bbox)?;
                vec![cooling_demand(
                    &temperature,
                    &reference,
                    target.mask,
                    target.hour_shift,
                    &self.settings.thresholds,
                    target.year,
                    self.settings.reference_year,
                )?]
            }
            Carrier::Temperature => {
                let temperature = self.inputs.load(Quantity::Temperature, target.year, Some(&bbox))?;
                vec![mean_temperature(&temperature, target.mask)?]
            }
        };
        Ok(series)
    }

    fn temperature_pair(&self, target: &ConversionTarget<'_>, bbox: &BoundingBox) -> ConversionResult<(ClimateGrid, ClimateGrid)> {
        let temperature = self.inputs.load(Quantity::Temperature, target.year, Some(bbox))?;
        let reference = if self.settings.reference_year == target.year {
            temperature.clone()
        } else {
            self.inputs.load(Quantity::Temperature, self.settings.reference_year, Some(bbox))?
        };
        Ok((temperature, reference))
    }

    fn wind_speed(&self, year: i32, bbox: &BoundingBox) -> ConversionResult<ClimateGrid> {
        match self.inputs.source() {
            ClimateSource::Reanalysis => {
                let u = self.inputs.load(Quantity::WindU, year, Some(bbox))?;
                let v = self.inputs.load(Quantity::WindV, year, Some(bbox))?;
                wind_speed_from_components(&u, &v)
            }
            _ => self.inputs.load(Quantity::WindSpeed, year, Some(bbox)),
        }
    }

    fn roughness(&self, year: i32, bbox: &BoundingBox) -> ConversionResult<Option<ClimateGrid>> {
        if !self.inputs.source().is_projection() {
            return Ok(Some(self.inputs.load(Quantity::Roughness, year, Some(bbox))?));
        }
        match &self.settings.roughness_file {
            Some(path) => Ok(Some(self.inputs.store.read(path)?.clip(bbox)?)),
            None => Ok(None),
        }
    }

    fn wind(
        &self,
        carrier: Carrier,
        turbine: &WindTurbine,
        target: &ConversionTarget<'_>,
        bbox: &BoundingBox,
    ) -> ConversionResult<TimeSeries> {
        let speed = self.wind_speed(target.year, bbox)?;
        let roughness = self.roughness(target.year, bbox)?;
        let height = wind_data_height(self.inputs.source());
        let cf = convert_wind(&speed, height, roughness.as_ref(), turbine, target.correction)?;
        self.reduce(carrier, &cf, target.mask)
    }

    fn solar(&self, target: &ConversionTarget<'_>, bbox: &BoundingBox) -> ConversionResult<TimeSeries> {
        let irradiance = self.inputs.load(Quantity::SolarRadiation, target.year, Some(bbox))?;
        let temperature = self.inputs.load(Quantity::Temperature, target.year, Some(bbox))?;
        let cf = convert_solar(&irradiance, &temperature, &self.settings.solar_panel, target.correction)?;
        self.reduce(Carrier::Solar, &cf, target.mask)
    }

    fn hydro(&self, carrier: Carrier, target: &ConversionTarget<'_>, bbox: &BoundingBox) -> ConversionResult<TimeSeries> {
        let kind = PlantKind::from_carrier(carrier)
            .ok_or_else(|| ConversionError::unsupported(format!("{carrier} is not a hydropower carrier")))?;
        let runoff = self.inputs.load(Quantity::Runoff, target.year, Some(bbox))?;
        hydro_inflow(&runoff, target.mask, RunoffUnits::for_source(self.inputs.source()), kind)
    }

    fn reduce(&self, carrier: Carrier, grid: &ClimateGrid, mask: &CountryMask) -> ConversionResult<TimeSeries> {
        let mut series = reduce(grid, mask, carrier.reduction())?;
        series.name = carrier.series_name().to_string();
        series.units = carrier.units().to_string();
        Ok(series)
    }
}
