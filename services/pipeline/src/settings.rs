//! Pipeline settings loaded from `config/settings.yaml`.
//!
//! Values may reference environment variables as `${VAR}` or
//! `${VAR:-default}`; they are expanded before the YAML is parsed.

use std::collections::HashMap;
use std::fs;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use energy_common::{Carrier, ClimateSource, Country, DataPaths, Granularity};
use energy_conversion::{
    ConversionSettings, DegreeDayThresholds, HeatProfileMethod, HeatProfiles, SolarPanel, TemperatureClassProfiles,
    WindTurbine,
};
use resource_adequacy::{fraction_steps, Hydropower, StorageOptions};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub directories: Directories,

    /// Region name used in climate data folder names.
    #[serde(default = "default_region")]
    pub region: String,

    #[serde(default = "default_source")]
    pub climate_source: ClimateSource,

    pub years: YearRange,

    #[serde(default)]
    pub thresholds: DegreeDayThresholds,

    /// Year against which heating and cooling demand changes are measured.
    #[serde(default = "default_reference_year")]
    pub reference_year: i32,

    pub turbines: TurbineFiles,

    #[serde(default)]
    pub solar_panel: SolarPanel,

    #[serde(default)]
    pub heat_profile_method: HeatProfileMethod,

    /// BDEW weekly heat load profiles.
    #[serde(default = "default_heat_profile_file")]
    pub heat_profile_file: PathBuf,

    /// Temperature class profiles, relative to the energy data directory.
    #[serde(default)]
    pub temperature_profile_files: TemperatureProfileFiles,

    /// Static surface roughness for projections (none: power law).
    #[serde(default)]
    pub roughness_file: Option<PathBuf>,

    /// Apply stored calibration coefficients when converting.
    #[serde(default = "default_true")]
    pub read_calibration_coefficients: bool,

    #[serde(default)]
    pub calibration: CalibrationSettings,

    #[serde(default)]
    pub resource_adequacy: AdequacySettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Directories {
    pub climate_data: PathBuf,
    pub energy_data: PathBuf,
    pub results: PathBuf,
    pub calibration: PathBuf,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct YearRange {
    pub start: i32,
    pub end: i32,
}

impl YearRange {
    pub fn iter(&self) -> RangeInclusive<i32> {
        self.start..=self.end
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurbineFiles {
    pub onshore: PathBuf,
    pub offshore: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemperatureProfileFiles {
    pub single_family: PathBuf,
    pub multi_family: PathBuf,
    pub services: PathBuf,
}

impl Default for TemperatureProfileFiles {
    fn default() -> Self {
        Self {
            single_family: PathBuf::from("hourly_factors_SFH.csv"),
            multi_family: PathBuf::from("hourly_factors_MFH.csv"),
            services: PathBuf::from("hourly_factors_COM.csv"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationSettings {
    /// Year whose measurements the coefficients are fitted on.
    #[serde(default = "default_reference_year")]
    pub year: i32,

    /// Installed capacity table, relative to the energy data directory.
    #[serde(default = "default_capacity_file")]
    pub installed_capacity_file: PathBuf,

    /// Calibration period per carrier, overriding the carrier default.
    #[serde(default)]
    pub granularity: HashMap<Carrier, Granularity>,
}

impl Default for CalibrationSettings {
    fn default() -> Self {
        Self {
            year: default_reference_year(),
            installed_capacity_file: default_capacity_file(),
            granularity: HashMap::new(),
        }
    }
}

/// Evenly spaced fractions, both ends included.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FractionRange {
    pub start: f64,
    pub end: f64,
    pub step: f64,
}

impl FractionRange {
    pub fn steps(&self) -> Result<Vec<f64>> {
        Ok(fraction_steps(self.start, self.end, self.step)?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdequacySettings {
    /// Year of the measured power system data.
    #[serde(default = "default_adequacy_year")]
    pub year: i32,

    /// Shares of the demand not met by hydropower given to wind and solar.
    #[serde(default = "default_wind_and_solar_fractions")]
    pub wind_and_solar_fractions: FractionRange,

    /// Wind part of the wind and solar generation.
    #[serde(default = "default_wind_fractions")]
    pub wind_fractions: FractionRange,

    #[serde(default = "default_scenarios")]
    pub scenarios: Vec<Hydropower>,
}

impl Default for AdequacySettings {
    fn default() -> Self {
        Self {
            year: default_adequacy_year(),
            wind_and_solar_fractions: default_wind_and_solar_fractions(),
            wind_fractions: default_wind_fractions(),
            scenarios: default_scenarios(),
        }
    }
}

fn default_adequacy_year() -> i32 {
    2019
}

fn default_wind_and_solar_fractions() -> FractionRange {
    FractionRange {
        start: 1.0,
        end: 3.0,
        step: 0.1,
    }
}

fn default_wind_fractions() -> FractionRange {
    FractionRange {
        start: 0.0,
        end: 1.0,
        step: 0.05,
    }
}

fn default_scenarios() -> Vec<Hydropower> {
    let dispatched = |pumped_storage_fraction| {
        Hydropower::Dispatched(StorageOptions {
            pumped_storage_fraction,
            ..StorageOptions::default()
        })
    };
    vec![Hydropower::Actual, dispatched(0.0), dispatched(1.0), dispatched(2.0)]
}

fn default_region() -> String {
    "Europe".to_string()
}

fn default_source() -> ClimateSource {
    ClimateSource::Reanalysis
}

fn default_reference_year() -> i32 {
    energy_conversion::heat::DEFAULT_REFERENCE_YEAR
}

fn default_heat_profile_file() -> PathBuf {
    PathBuf::from("config/heat_load_profile_BDEW.csv")
}

fn default_capacity_file() -> PathBuf {
    PathBuf::from("installed_capacity.csv")
}

fn default_true() -> bool {
    true
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).with_context(|| format!("Failed to read settings from {}", path.display()))?;
        let settings = Self::from_yaml_str(&content)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?;
        debug!(path = %path.display(), source = %settings.climate_source, "Loaded settings");
        Ok(settings)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let expanded = expand_env_vars(content)?;
        let settings: Settings = serde_yaml::from_str(&expanded).context("Failed to parse settings YAML")?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.years.start <= self.years.end,
            "Year range {}..{} is empty",
            self.years.start,
            self.years.end
        );
        anyhow::ensure!(!self.region.trim().is_empty(), "Region cannot be empty");

        // identifiers are checked the same way as on the command line
        match &self.climate_source {
            ClimateSource::Reanalysis => {}
            ClimateSource::Cordex { experiment, models } => {
                ClimateSource::cordex(
                    *experiment,
                    &models.global_climate_model,
                    &models.regional_climate_model,
                )?;
            }
            ClimateSource::Cmip6 { experiment, model } => {
                ClimateSource::cmip6(*experiment, model)?;
            }
        }

        let t = &self.thresholds;
        anyhow::ensure!(
            t.cooling_daily <= t.cooling_hourly,
            "Daily cooling threshold {} exceeds the hourly one {}",
            t.cooling_daily,
            t.cooling_hourly
        );
        anyhow::ensure!(self.solar_panel.tilt_gain > 0.0, "Solar tilt gain must be positive");

        let adequacy = &self.resource_adequacy;
        adequacy.wind_and_solar_fractions.steps()?;
        adequacy.wind_fractions.steps()?;
        anyhow::ensure!(!adequacy.scenarios.is_empty(), "No resource adequacy scenarios");
        Ok(())
    }

    pub fn paths(&self) -> DataPaths {
        DataPaths::new(
            &self.directories.climate_data,
            &self.directories.results,
            &self.directories.calibration,
            self.region.as_str(),
        )
    }

    pub fn granularity(&self, carrier: Carrier) -> Granularity {
        self.calibration
            .granularity
            .get(&carrier)
            .copied()
            .unwrap_or_else(|| carrier.default_granularity())
    }

    pub fn installed_capacity_path(&self) -> PathBuf {
        self.directories.energy_data.join(&self.calibration.installed_capacity_file)
    }

    /// `country,period,total` reference totals of a result series.
    pub fn reference_path(&self, series_name: &str) -> PathBuf {
        self.directories
            .energy_data
            .join(format!("{series_name}__reference_totals.csv"))
    }

    /// `country,period,total` measured mean capacity factors of a carrier.
    pub fn capacity_factor_path(&self, carrier: Carrier) -> PathBuf {
        self.directories
            .energy_data
            .join(format!("{}__measured_capacity_factor.csv", carrier.as_str()))
    }

    /// Hourly measured demand and hydropower operation of a country.
    pub fn power_system_path(&self, country: &Country, year: i32) -> PathBuf {
        self.directories
            .energy_data
            .join(format!("{}__{year}__power_system.csv", country.iso_alpha2))
    }

    /// Turbines, panel and heat profiles read from their files.
    pub fn conversion_settings(&self) -> Result<ConversionSettings> {
        let onshore_turbine = WindTurbine::load(&self.turbines.onshore)
            .with_context(|| format!("Failed to load turbine {}", self.turbines.onshore.display()))?;
        let offshore_turbine = WindTurbine::load(&self.turbines.offshore)
            .with_context(|| format!("Failed to load turbine {}", self.turbines.offshore.display()))?;
        let heat_profiles = self.heat_profiles()?;

        Ok(ConversionSettings {
            onshore_turbine,
            offshore_turbine,
            solar_panel: self.solar_panel.clone(),
            heat_profiles,
            thresholds: self.thresholds,
            reference_year: self.reference_year,
            roughness_file: self.roughness_file.clone(),
        })
    }

    fn heat_profiles(&self) -> Result<HeatProfiles> {
        match self.heat_profile_method {
            HeatProfileMethod::HourlyDependent => HeatProfiles::load_csv(&self.heat_profile_file)
                .with_context(|| format!("Failed to load heat profiles {}", self.heat_profile_file.display())),
            HeatProfileMethod::HourlyAndTemperatureDependent => {
                let files = &self.temperature_profile_files;
                let dir = &self.directories.energy_data;
                let profiles = TemperatureClassProfiles::load(
                    &dir.join(&files.single_family),
                    &dir.join(&files.multi_family),
                    &dir.join(&files.services),
                )
                .with_context(|| format!("Failed to load temperature class heat profiles from {}", dir.display()))?;
                Ok(HeatProfiles::TemperatureClass(profiles))
            }
        }
    }
}

/// Replace `${VAR}` and `${VAR:-default}` with environment values.
fn expand_env_vars(content: &str) -> Result<String> {
    let mut result = String::with_capacity(content.len());
    let mut rest = content;
    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after
            .find('}')
            .with_context(|| format!("Unclosed variable substitution: ${{{after}"))?;
        result.push_str(&resolve_var(&after[..end])?);
        rest = &after[end + 1..];
    }
    result.push_str(rest);
    Ok(result)
}

fn resolve_var(expr: &str) -> Result<String> {
    match expr.split_once(":-") {
        Some((name, default)) => match std::env::var(name.trim()) {
            Ok(value) if !value.is_empty() => Ok(value),
            _ => Ok(default.to_string()),
        },
        None => std::env::var(expr.trim()).with_context(|| format!("Environment variable {expr} not set")),
    }
}
