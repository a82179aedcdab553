//! Historical reference data: period totals and installed capacity.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

use energy_common::Period;
use serde::Deserialize;
use tracing::debug;

use crate::error::{CalibrationError, CalibrationResult};

#[derive(Debug, Deserialize)]
struct ReferenceRow {
    country: String,
    period: String,
    total: f64,
}

/// Historical totals of one country per calibration period.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceTotals {
    totals: BTreeMap<Period, f64>,
}

impl ReferenceTotals {
    pub fn new(totals: BTreeMap<Period, f64>) -> Self {
        Self { totals }
    }

    /// Load the rows of `country` from a `country,period,total` CSV.
    ///
    /// Countries are matched case-insensitively; periods are `YYYY` or `YYYY-MM`.
    pub fn load_csv(path: &Path, country: &str) -> CalibrationResult<Self> {
        let mut reader = csv::Reader::from_reader(File::open(path)?);
        let mut totals = BTreeMap::new();
        for row in reader.deserialize::<ReferenceRow>() {
            let row = row?;
            if !row.country.trim().eq_ignore_ascii_case(country) {
                continue;
            }
            let period: Period = row
                .period
                .parse()
                .map_err(|e| CalibrationError::invalid_table(path.display().to_string(), format!("{e}")))?;
            if totals.insert(period, row.total).is_some() {
                return Err(CalibrationError::invalid_table(
                    path.display().to_string(),
                    format!("duplicate period {period} for {country}"),
                ));
            }
        }
        debug!(path = %path.display(), country, periods = totals.len(), "Loaded reference totals");
        Ok(Self { totals })
    }

    pub fn get(&self, period: &Period) -> Option<f64> {
        self.totals.get(period).copied()
    }

    pub fn len(&self) -> usize {
        self.totals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Period, &f64)> {
        self.totals.iter()
    }
}

#[derive(Debug, Deserialize)]
struct CapacityRow {
    country: String,
    year: i32,
    resource: String,
    capacity: f64,
}

/// Installed capacity per country, year and resource type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstalledCapacity {
    // (country, resource) -> year -> capacity
    entries: BTreeMap<(String, String), BTreeMap<i32, f64>>,
}

impl InstalledCapacity {
    pub fn load_csv(path: &Path) -> CalibrationResult<Self> {
        let mut reader = csv::Reader::from_reader(File::open(path)?);
        let mut capacity = Self::default();
        for row in reader.deserialize::<CapacityRow>() {
            let row = row?;
            capacity.insert(&row.country, &row.resource, row.year, row.capacity);
        }
        debug!(path = %path.display(), series = capacity.entries.len(), "Loaded installed capacity");
        Ok(capacity)
    }

    pub fn insert(&mut self, country: &str, resource: &str, year: i32, capacity: f64) {
        self.entries
            .entry(key(country, resource))
            .or_default()
            .insert(year, capacity);
    }

    pub fn get(&self, country: &str, resource: &str, year: i32) -> Option<f64> {
        self.entries
            .get(&key(country, resource))
            .and_then(|years| years.get(&year).copied())
    }
}

fn key(country: &str, resource: &str) -> (String, String) {
    (country.trim().to_ascii_uppercase(), resource.trim().to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::{write_capacity_csv, write_reference_csv};

    #[test]
    fn test_reference_totals_for_one_country() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reference.csv");
        write_reference_csv(
            &path,
            &[("DE", "2015", 100.0), ("de", "2016-02", 7.5), ("FR", "2015", 50.0)],
        );

        let totals = ReferenceTotals::load_csv(&path, "DE").unwrap();
        assert_eq!(totals.len(), 2);
        assert_eq!(totals.get(&Period::Year(2015)), Some(100.0));
        assert_eq!(totals.get(&Period::Month(2016, 2)), Some(7.5));
        assert!(ReferenceTotals::load_csv(&path, "IT").unwrap().is_empty());
    }

    #[test]
    fn test_reference_rejects_bad_periods() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reference.csv");
        write_reference_csv(&path, &[("DE", "last year", 1.0)]);
        assert!(matches!(
            ReferenceTotals::load_csv(&path, "DE"),
            Err(CalibrationError::InvalidTable { .. })
        ));

        write_reference_csv(&path, &[("DE", "2015", 1.0), ("DE", "2015", 2.0)]);
        assert!(ReferenceTotals::load_csv(&path, "DE").is_err());
    }

    #[test]
    fn test_installed_capacity() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capacity.csv");
        write_capacity_csv(&path, &[("DE", 2015, "wind", 40.0), ("DE", 2016, "Wind", 45.0)]);

        let capacity = InstalledCapacity::load_csv(&path).unwrap();
        assert_eq!(capacity.get("de", "wind", 2016), Some(45.0));
        assert_eq!(capacity.get("DE", "solar", 2016), None);
    }
}
