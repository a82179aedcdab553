//! Result tables of the adequacy analysis.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::adequacy::AdequacyGrid;
use crate::error::AdequacyResult;

/// One cell of an adequacy grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdequacyRow {
    pub scenario: String,
    pub wind_and_solar_fraction: f64,
    pub wind_fraction: f64,
    pub adequacy: f64,
}

/// Wind fraction with the highest adequacy for one wind-and-solar fraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestMixRow {
    pub scenario: String,
    pub wind_and_solar_fraction: f64,
    pub best_wind_fraction: Option<f64>,
}

impl AdequacyGrid {
    pub fn rows(&self, scenario: &str) -> Vec<AdequacyRow> {
        self.wind_and_solar_fractions
            .iter()
            .zip(&self.values)
            .flat_map(|(&wind_and_solar_fraction, row)| {
                self.wind_fractions.iter().zip(row).map(move |(&wind_fraction, &adequacy)| AdequacyRow {
                    scenario: scenario.to_string(),
                    wind_and_solar_fraction,
                    wind_fraction,
                    adequacy,
                })
            })
            .collect()
    }

    pub fn best_mix_rows(&self, scenario: &str) -> Vec<BestMixRow> {
        self.wind_and_solar_fractions
            .iter()
            .zip(self.best_wind_fractions())
            .map(|(&wind_and_solar_fraction, best_wind_fraction)| BestMixRow {
                scenario: scenario.to_string(),
                wind_and_solar_fraction,
                best_wind_fraction,
            })
            .collect()
    }
}

/// Write `rows` as CSV through `<path>.partial`, replacing `path` once complete.
pub fn write_table<T: Serialize>(path: &Path, rows: &[T]) -> AdequacyResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut partial = path.as_os_str().to_owned();
    partial.push(".partial");
    let partial = Path::new(&partial);

    let written = (|| -> AdequacyResult<()> {
        let mut writer = csv::Writer::from_path(partial)?;
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        Ok(())
    })();
    if let Err(e) = written {
        let _ = std::fs::remove_file(partial);
        return Err(e);
    }
    std::fs::rename(partial, path)?;
    debug!(path = %path.display(), rows = rows.len(), "Wrote adequacy table");
    Ok(())
}

pub fn read_table<T: for<'de> Deserialize<'de>>(path: &Path) -> AdequacyResult<Vec<T>> {
    let mut reader = csv::Reader::from_path(path)?;
    Ok(reader.deserialize().collect::<Result<Vec<T>, _>>()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> AdequacyGrid {
        AdequacyGrid {
            wind_and_solar_fractions: vec![1.0, 2.0],
            wind_fractions: vec![0.0, 0.5, 1.0],
            values: vec![vec![0.6, 0.9, 0.6], vec![0.7, f64::NAN, 0.7]],
        }
    }

    #[test]
    fn test_grid_rows_and_best_mix() {
        let rows = grid().rows("actual_hydropower");
        assert_eq!(rows.len(), 6);
        assert_eq!(rows[1].wind_fraction, 0.5);
        assert_eq!(rows[3].wind_and_solar_fraction, 2.0);

        let best = grid().best_mix_rows("actual_hydropower");
        assert!((best[0].best_wind_fraction.unwrap() - 0.5).abs() < 1e-9);
        assert_eq!(best[1].best_wind_fraction, None);
    }

    #[test]
    fn test_write_table_replaces_file_when_complete() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("DE__resource_adequacy.csv");
        write_table(&path, &grid().best_mix_rows("x")).unwrap();

        let back: Vec<BestMixRow> = read_table(&path).unwrap();
        assert_eq!(back.len(), 2);
        assert_eq!(back[1].best_wind_fraction, None);
        assert!(!dir.path().join("nested").join("DE__resource_adequacy.csv.partial").exists());

        // a directory in the way of the partial file fails the write, keeping the old table
        std::fs::create_dir(dir.path().join("nested").join("DE__resource_adequacy.csv.partial")).unwrap();
        assert!(write_table(&path, &grid().rows("y")).is_err());
        let kept: Vec<BestMixRow> = read_table(&path).unwrap();
        assert_eq!(kept, back);
    }
}
