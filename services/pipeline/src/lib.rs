//! Processing stages of the energy time series pipeline.
//!
//! Each stage reads the canonical file layout under the configured
//! directories and skips outputs that already exist:
//!
//! - [`extract`]: unpack downloaded projection archives
//! - [`regrid`]: resample projections onto the reanalysis grid
//! - [`convert`]: climate grids into per-country energy series
//! - [`fit`]: calibration coefficients from measured data
//! - [`calibrate`]: scale result series to historical totals
//! - [`adequacy`]: share of measured demand met by wind, solar and hydropower

pub mod adequacy;
pub mod calibrate;
pub mod convert;
pub mod extract;
pub mod fit;
pub mod regrid;
pub mod settings;

use anyhow::Result;
use calibration::InstalledCapacity;
use climate_grid::GridStore;
use tracing::warn;

pub use settings::Settings;

/// Store used to read and write climate grids.
#[cfg(feature = "netcdf")]
pub fn grid_store() -> Result<Box<dyn GridStore>> {
    Ok(Box::new(climate_grid::NetcdfStore::new()))
}

/// Store used to read and write climate grids.
#[cfg(not(feature = "netcdf"))]
pub fn grid_store() -> Result<Box<dyn GridStore>> {
    anyhow::bail!("Built without the `netcdf` feature, climate files cannot be read")
}

/// Installed capacity table, empty when the file is absent.
pub fn installed_capacity(settings: &Settings) -> Result<InstalledCapacity> {
    let path = settings.installed_capacity_path();
    if !path.exists() {
        warn!(path = %path.display(), "No installed capacity table, coefficients are averaged unweighted");
        return Ok(InstalledCapacity::default());
    }
    Ok(InstalledCapacity::load_csv(&path)?)
}
