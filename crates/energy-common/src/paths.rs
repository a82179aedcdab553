//! Canonical on-disk layout of climate data, results and calibration files.
//!
//! All pipeline state lives in files keyed by these names, so every stage can
//! find the outputs of the previous one and skip work that is already done.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::carrier::Carrier;
use crate::country::Country;
use crate::error::{EnergyError, EnergyResult};
use crate::source::{ClimateSource, Rcp};

/// Time step of a climate data file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeResolution {
    Hourly,
    ThreeHourly,
    SixHourly,
    Daily,
    Monthly,
}

impl TimeResolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeResolution::Hourly => "hourly",
            TimeResolution::ThreeHourly => "3hourly",
            TimeResolution::SixHourly => "6hourly",
            TimeResolution::Daily => "daily",
            TimeResolution::Monthly => "monthly",
        }
    }

    /// Step length in hours, for the fixed-step resolutions.
    pub fn step_hours(&self) -> Option<i64> {
        match self {
            TimeResolution::Hourly => Some(1),
            TimeResolution::ThreeHourly => Some(3),
            TimeResolution::SixHourly => Some(6),
            TimeResolution::Daily => Some(24),
            TimeResolution::Monthly => None,
        }
    }
}

impl fmt::Display for TimeResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeResolution {
    type Err = EnergyError;

    fn from_str(s: &str) -> EnergyResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "hourly" | "1hourly" => Ok(TimeResolution::Hourly),
            "3hourly" => Ok(TimeResolution::ThreeHourly),
            "6hourly" => Ok(TimeResolution::SixHourly),
            "daily" => Ok(TimeResolution::Daily),
            "monthly" => Ok(TimeResolution::Monthly),
            _ => Err(EnergyError::invalid("time resolution", s)),
        }
    }
}

/// Compression format of a downloaded archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    TarGz,
    Zip,
}

impl ArchiveFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ArchiveFormat::TarGz => "tar.gz",
            ArchiveFormat::Zip => "zip",
        }
    }

    /// Detect the format from a file name (`.tar.gz`, `.tgz` or `.zip`).
    pub fn detect(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?.to_lowercase();
        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Some(ArchiveFormat::TarGz)
        } else if name.ends_with(".zip") {
            Some(ArchiveFormat::Zip)
        } else {
            None
        }
    }

    /// File name with the archive extension removed.
    pub fn strip_extension<'a>(&self, file_name: &'a str) -> &'a str {
        let lower = file_name.to_ascii_lowercase();
        for ext in [".tar.gz", ".tgz", ".zip"] {
            if lower.ends_with(ext) {
                return &file_name[..file_name.len() - ext.len()];
            }
        }
        file_name
    }
}

/// Root directories and focus region from which every canonical path derives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataPaths {
    pub climate_root: PathBuf,
    pub results_root: PathBuf,
    pub calibration_root: PathBuf,
    pub region: String,
}

impl DataPaths {
    pub fn new(
        climate_root: impl Into<PathBuf>,
        results_root: impl Into<PathBuf>,
        calibration_root: impl Into<PathBuf>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            climate_root: climate_root.into(),
            results_root: results_root.into(),
            calibration_root: calibration_root.into(),
            region: region.into(),
        }
    }

    /// `<root>/<Region>__<Product>__[tags__]<variable>/`
    pub fn climate_folder(&self, source: &ClimateSource, variable: &str) -> PathBuf {
        self.climate_root
            .join(format!("{}__{}{}", self.region, source.name_prefix(), variable))
    }

    fn climate_stem(&self, year: i32, resolution: TimeResolution, variable: &str) -> String {
        format!("{year}__{resolution}_{variable}")
    }

    /// `<folder>/<year>__<resolution>_<variable>.nc`
    pub fn climate_file(
        &self,
        source: &ClimateSource,
        variable: &str,
        year: i32,
        resolution: TimeResolution,
    ) -> PathBuf {
        self.climate_folder(source, variable)
            .join(format!("{}.nc", self.climate_stem(year, resolution, variable)))
    }

    /// Downloaded archive for the same data, before extraction.
    pub fn archive_file(
        &self,
        source: &ClimateSource,
        variable: &str,
        year: i32,
        resolution: TimeResolution,
        format: ArchiveFormat,
    ) -> PathBuf {
        self.climate_folder(source, variable).join(format!(
            "{}.{}",
            self.climate_stem(year, resolution, variable),
            format.extension()
        ))
    }

    /// Extracted file on its native grid, awaiting regridding.
    pub fn original_file(
        &self,
        source: &ClimateSource,
        variable: &str,
        year: i32,
        resolution: TimeResolution,
    ) -> PathBuf {
        self.climate_folder(source, variable)
            .join(format!("{}__original.nc", self.climate_stem(year, resolution, variable)))
    }

    /// `<results>/<ISO>__<Product>__[tags__]<series>.csv`
    pub fn result_file(&self, country: &Country, source: &ClimateSource, series: &str) -> PathBuf {
        self.results_root.join(format!(
            "{}__{}{}.csv",
            country.iso_alpha2,
            source.name_prefix(),
            series
        ))
    }

    /// Calibration coefficients for a country and carrier.
    ///
    /// Projection coefficients are always derived from the RCP 2.6 run of the
    /// same model chain, whatever scenario is being converted.
    pub fn coefficients_file(
        &self,
        country: &Country,
        source: &ClimateSource,
        carrier: Carrier,
    ) -> EnergyResult<PathBuf> {
        let prefix = match source {
            ClimateSource::Reanalysis => source.name_prefix(),
            ClimateSource::Cordex { models, .. } => ClimateSource::Cordex {
                experiment: Rcp::Rcp26,
                models: models.clone(),
            }
            .name_prefix(),
            ClimateSource::Cmip6 { .. } => {
                return Err(EnergyError::invalid(
                    "calibration source",
                    source.to_string(),
                ))
            }
        };

        Ok(self.calibration_root.join(format!(
            "{}__{}{}__calibration_coefficients{}.csv",
            country.iso_alpha2,
            prefix,
            carrier.resource_type(),
            carrier.coefficient_suffix()
        )))
    }

    /// Country mask file `<calibration>/masks/<ISO>__<kind>.csv`.
    pub fn mask_file(&self, country: &Country, carrier: Carrier) -> PathBuf {
        self.calibration_root
            .join("masks")
            .join(format!("{}__{}.csv", country.iso_alpha2, carrier.mask_kind()))
    }
}
