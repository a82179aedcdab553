//! Common types and utilities shared across the energy time series crates.

pub mod bbox;
pub mod carrier;
pub mod country;
pub mod error;
pub mod paths;
pub mod series;
pub mod source;
pub mod time;

pub use bbox::BoundingBox;
pub use chrono_tz::Tz;
pub use carrier::{Carrier, Reduction};
pub use country::{european_countries, find_country, select_countries, Country};
pub use error::{EnergyError, EnergyResult};
pub use paths::{ArchiveFormat, DataPaths, TimeResolution};
pub use series::TimeSeries;
pub use source::{ClimateSource, CordexModels, Rcp, Ssp};
pub use time::{Granularity, Period};
