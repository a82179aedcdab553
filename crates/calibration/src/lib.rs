//! Calibration of converted energy series.
//!
//! Two families of calibration are supported:
//!
//! - [`scaling`]: multiply each year or month of a converted series so that
//!   its total matches a historical reference
//! - coefficients fitted once on historical data and stored per country
//!   ([`fit`] for wind and solar corrections, [`retain`] for monthly hydro
//!   retain factors), then read back through [`store::CoefficientStore`]
//!   when converting projections

pub mod error;
pub mod fit;
pub mod reference;
pub mod retain;
pub mod scaling;
pub mod store;

pub use error::{CalibrationError, CalibrationResult};
pub use fit::{fit_solar_correction, fit_wind_correction, CorrectionFit};
pub use reference::{InstalledCapacity, ReferenceTotals};
pub use retain::RetainFactors;
pub use scaling::{calibrate, CalibrationReport, SkipReason};
pub use store::{CoefficientStore, CoefficientTable, Coefficients};
