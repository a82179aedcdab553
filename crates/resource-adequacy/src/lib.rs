//! Resource adequacy of a power system supplied by wind, solar and hydropower.
//!
//! - [`system`]: measured demand, hydropower operation and reservoir levels
//! - [`dispatch`]: hour-by-hour reservoir and pumped-storage operation within
//!   capacity and filling level bounds
//! - [`adequacy`]: residual demand, share of demand met, and the search for
//!   the wind/solar split that meets the most
//! - [`table`]: CSV result tables

pub mod adequacy;
pub mod dispatch;
pub mod error;
pub mod system;
pub mod table;

pub use adequacy::{best_wind_fraction, fraction_steps, AdequacyGrid, AdequacyInputs, Hydropower, Mix, ResidualDemand};
pub use dispatch::{dispatch_pumped_storage, dispatch_reservoir, hydropower_generation, Bounds, Dispatch, StorageOptions};
pub use error::{AdequacyError, AdequacyResult};
pub use system::{FillingLevel, HydropowerCapacity, PowerSystem};
pub use table::{read_table, write_table, AdequacyRow, BestMixRow};
