//! Gridded climate data for the energy conversion pipeline.
//!
//! A [`ClimateGrid`] holds one variable on a regular latitude/longitude grid
//! over time. [`CountryMask`]es reduce grids to per-country series, the
//! [`harmonize`] functions bring every source onto an hourly UTC axis, and
//! [`regrid`] resamples projections, rotated-pole ones included, onto the
//! reanalysis grid.
//!
//! Reading NetCDF files requires the `netcdf` feature (and the system netCDF
//! and HDF5 libraries).

pub mod aggregate;
pub mod cf_time;
pub mod error;
pub mod grid;
pub mod harmonize;
pub mod mask;
pub mod regrid;
pub mod rotated;
pub mod store;

#[cfg(feature = "netcdf")]
pub mod netcdf_store;

pub use aggregate::{reduce, weighted_mean, weighted_sum};
pub use error::{GridError, GridResult};
pub use grid::{ClimateGrid, COORD_TOLERANCE};
pub use mask::{CountryMask, MaskAlignment};
pub use regrid::{regrid, regrid_like, InterpolationMethod};
pub use rotated::RotatedPole;
pub use store::{GridStore, MemoryStore};

#[cfg(feature = "netcdf")]
pub use netcdf_store::NetcdfStore;
