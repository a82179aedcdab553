//! Measured hourly operation of a national power system.

use std::fs::File;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AdequacyError, AdequacyResult};

/// Pumping capacity of pumped-storage plants relative to their generation capacity.
pub const PUMPING_TO_GENERATION: f64 = 0.8;

/// Installed hydropower capacity (MW).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HydropowerCapacity {
    /// Conventional reservoir plants.
    pub conventional: f64,
    /// Generation capacity of pumped-storage plants.
    pub pumped_storage: f64,
}

impl HydropowerCapacity {
    pub fn generation(&self) -> f64 {
        self.conventional + self.pumped_storage
    }

    pub fn pumping(&self) -> f64 {
        PUMPING_TO_GENERATION * self.pumped_storage
    }
}

#[derive(Debug, Deserialize)]
struct SystemRow {
    time: DateTime<Utc>,
    demand: Option<f64>,
    conventional_hydropower_generation: Option<f64>,
    pumped_storage_generation: Option<f64>,
    pumped_storage_consumption: Option<f64>,
    run_of_river_generation: Option<f64>,
    reservoir_filling_level: Option<f64>,
}

/// Hourly demand, hydropower operation and reservoir filling level (MW, MWh).
///
/// Missing demand and filling levels are NaN; missing generation is zero.
#[derive(Debug, Clone, PartialEq)]
pub struct PowerSystem {
    pub timestamps: Vec<DateTime<Utc>>,
    pub demand: Vec<f64>,
    pub conventional_generation: Vec<f64>,
    pub pumped_storage_generation: Vec<f64>,
    pub pumped_storage_consumption: Vec<f64>,
    pub run_of_river_generation: Vec<f64>,
    pub reservoir_filling_level: Vec<f64>,
    pub capacity: HydropowerCapacity,
}

/// Initial value and range of the reported reservoir filling level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FillingLevel {
    pub initial: f64,
    pub min: f64,
    pub max: f64,
}

pub(crate) fn finite_mean(values: &[f64]) -> f64 {
    let (sum, n) = values
        .iter()
        .filter(|v| v.is_finite())
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        f64::NAN
    } else {
        sum / n as f64
    }
}

pub(crate) fn finite_sum(values: &[f64]) -> f64 {
    values.iter().filter(|v| v.is_finite()).sum()
}

impl PowerSystem {
    /// Read a `time,demand,conventional_hydropower_generation,
    /// pumped_storage_generation,pumped_storage_consumption,
    /// run_of_river_generation,reservoir_filling_level` table.
    pub fn read_csv(path: &Path, capacity: HydropowerCapacity) -> AdequacyResult<Self> {
        let mut reader = csv::Reader::from_reader(File::open(path)?);
        let mut system = Self {
            timestamps: Vec::new(),
            demand: Vec::new(),
            conventional_generation: Vec::new(),
            pumped_storage_generation: Vec::new(),
            pumped_storage_consumption: Vec::new(),
            run_of_river_generation: Vec::new(),
            reservoir_filling_level: Vec::new(),
            capacity,
        };
        for row in reader.deserialize::<SystemRow>() {
            let row = row?;
            system.timestamps.push(row.time);
            system.demand.push(row.demand.unwrap_or(f64::NAN));
            system.conventional_generation.push(row.conventional_hydropower_generation.unwrap_or(0.0));
            system.pumped_storage_generation.push(row.pumped_storage_generation.unwrap_or(0.0));
            system.pumped_storage_consumption.push(row.pumped_storage_consumption.unwrap_or(0.0));
            system.run_of_river_generation.push(row.run_of_river_generation.unwrap_or(0.0));
            system.reservoir_filling_level.push(row.reservoir_filling_level.unwrap_or(f64::NAN));
        }

        if system.timestamps.windows(2).any(|w| w[0] >= w[1]) {
            return Err(AdequacyError::InvalidTable {
                path: path.display().to_string(),
                reason: "timestamps must be strictly increasing".to_string(),
            });
        }
        system.validate()?;
        debug!(path = %path.display(), hours = system.len(), "Loaded power system");
        Ok(system)
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Every hourly column has one value per timestamp.
    pub fn validate(&self) -> AdequacyResult<()> {
        let expected = self.len();
        for (what, column) in [
            ("demand", &self.demand),
            ("conventional generation", &self.conventional_generation),
            ("pumped-storage generation", &self.pumped_storage_generation),
            ("pumped-storage consumption", &self.pumped_storage_consumption),
            ("run-of-river generation", &self.run_of_river_generation),
            ("reservoir filling level", &self.reservoir_filling_level),
        ] {
            check_length(what, expected, column.len())?;
        }
        if !(finite_mean(&self.demand) > 0.0) {
            return Err(AdequacyError::ZeroMean("electricity demand"));
        }
        Ok(())
    }

    /// Net hydropower generation of every plant type.
    pub fn actual_hydropower(&self) -> Vec<f64> {
        (0..self.len())
            .map(|i| self.storage_hydropower_at(i) + self.run_of_river_generation[i])
            .collect()
    }

    /// Mean net generation of reservoir and pumped-storage plants.
    pub fn mean_storage_hydropower(&self) -> f64 {
        let storage: Vec<f64> = (0..self.len()).map(|i| self.storage_hydropower_at(i)).collect();
        finite_mean(&storage)
    }

    fn storage_hydropower_at(&self, i: usize) -> f64 {
        self.conventional_generation[i] + self.pumped_storage_generation[i] - self.pumped_storage_consumption[i]
    }

    /// First reported filling level and the reported range.
    pub fn filling_level(&self) -> AdequacyResult<FillingLevel> {
        let mut reported = self.reservoir_filling_level.iter().copied().filter(|v| v.is_finite());
        let initial = reported.next().ok_or(AdequacyError::MissingFillingLevel)?;
        let (min, max) = reported.fold((initial, initial), |(lo, hi), v| (lo.min(v), hi.max(v)));
        Ok(FillingLevel { initial, min, max })
    }
}

pub(crate) fn check_length(what: &'static str, expected: usize, found: usize) -> AdequacyResult<()> {
    if expected != found {
        return Err(AdequacyError::LengthMismatch { what, expected, found });
    }
    Ok(())
}
