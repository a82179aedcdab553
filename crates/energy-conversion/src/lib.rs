//! Conversion of gridded climate variables into country energy series.
//!
//! Each carrier is a per-cell function of one or more climate grids followed
//! by a reduction over a country mask:
//!
//! - [`wind`]: speed at hub height through a turbine power curve
//! - [`solar`]: irradiance and temperature through the Huld PV model
//! - [`heat`]: heating and cooling degree days shaped into hourly demand by
//!   the intraday [`profiles`]
//! - [`hydro`]: runoff mass into potential energy at the plant head
//!
//! [`driver::Converter`] ties these to the canonical climate file layout.

pub mod correction;
pub mod driver;
pub mod error;
pub mod heat;
pub mod hydro;
pub mod profiles;
pub mod solar;
pub mod wind;

pub use correction::LinearCorrection;
pub use driver::{archive_variable, ClimateInputs, ConversionSettings, ConversionTarget, Converter, Quantity};
pub use error::{ConversionError, ConversionResult};
pub use heat::{DegreeDayThresholds, HeatingSector};
pub use hydro::{PlantKind, RunoffUnits};
pub use profiles::{HeatProfileMethod, HeatProfiles, TemperatureClassProfiles, WeeklyProfile};
pub use solar::{HuldModel, SolarPanel};
pub use wind::{PowerCurve, WindTurbine};
