//! Per-country energy time series and their CSV representation.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{EnergyError, EnergyResult};
use crate::time::{Granularity, Period};

/// One `time,value` row of a result file.
#[derive(Debug, Serialize, Deserialize)]
struct SeriesRow {
    time: DateTime<Utc>,
    value: f64,
}

/// Sibling `<name>.partial` file a series is written to before the rename.
fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".partial");
    PathBuf::from(name)
}

/// A country-level series of power or demand values.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    pub name: String,
    pub units: String,
    timestamps: Vec<DateTime<Utc>>,
    values: Vec<f64>,
}

impl TimeSeries {
    /// Build a series, checking that timestamps and values line up and
    /// timestamps strictly increase.
    pub fn new(
        name: impl Into<String>,
        units: impl Into<String>,
        timestamps: Vec<DateTime<Utc>>,
        values: Vec<f64>,
    ) -> EnergyResult<Self> {
        if timestamps.len() != values.len() {
            return Err(EnergyError::InvalidSeries(format!(
                "{} timestamps but {} values",
                timestamps.len(),
                values.len()
            )));
        }
        if let Some(w) = timestamps.windows(2).find(|w| w[0] >= w[1]) {
            return Err(EnergyError::InvalidSeries(format!(
                "timestamps not strictly increasing at {}",
                w[1].to_rfc3339()
            )));
        }

        Ok(Self {
            name: name.into(),
            units: units.into(),
            timestamps,
            values,
        })
    }

    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut [f64] {
        &mut self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&DateTime<Utc>, f64)> + '_ {
        self.timestamps.iter().zip(self.values.iter().copied())
    }

    pub fn sum(&self) -> f64 {
        self.values.iter().sum()
    }

    /// Sum of values per period, in chronological order.
    pub fn totals_by(&self, granularity: Granularity) -> BTreeMap<Period, f64> {
        let mut totals = BTreeMap::new();
        for (time, value) in self.iter() {
            *totals.entry(granularity.period_of(time)).or_insert(0.0) += value;
        }
        totals
    }

    /// Multiply every value by `factor`.
    pub fn scale(&mut self, factor: f64) {
        for v in &mut self.values {
            *v *= factor;
        }
    }

    /// Multiply the values inside `period` by `factor`.
    pub fn scale_period(&mut self, period: Period, factor: f64) {
        for (time, v) in self.timestamps.iter().zip(self.values.iter_mut()) {
            if period.contains(time) {
                *v *= factor;
            }
        }
    }

    /// Centred moving average over `window` samples, averaging whatever
    /// samples fall inside the series at the edges.
    pub fn rolling_mean_centered(&self, window: usize) -> Self {
        let n = self.values.len();
        let before = window.saturating_sub(1) / 2;
        let after = window.saturating_sub(1) - before;

        let values = (0..n)
            .map(|i| {
                let lo = i.saturating_sub(before);
                let hi = (i + after).min(n.saturating_sub(1));
                let slice = &self.values[lo..=hi];
                let finite: Vec<f64> = slice.iter().copied().filter(|v| v.is_finite()).collect();
                if finite.is_empty() {
                    f64::NAN
                } else {
                    finite.iter().sum::<f64>() / finite.len() as f64
                }
            })
            .collect();

        Self {
            name: self.name.clone(),
            units: self.units.clone(),
            timestamps: self.timestamps.clone(),
            values,
        }
    }

    /// Join consecutive pieces (typically one per year) into one series.
    ///
    /// The pieces must follow each other in time; name and units come from
    /// the first piece.
    pub fn concat(pieces: Vec<TimeSeries>) -> EnergyResult<Self> {
        let mut pieces = pieces.into_iter();
        let Some(mut joined) = pieces.next() else {
            return Err(EnergyError::InvalidSeries("nothing to concatenate".to_string()));
        };
        for piece in pieces {
            if let (Some(last), Some(first)) = (joined.timestamps.last(), piece.timestamps.first()) {
                if first <= last {
                    return Err(EnergyError::InvalidSeries(format!(
                        "piece starting {} overlaps the previous one",
                        first.to_rfc3339()
                    )));
                }
            }
            joined.timestamps.extend(piece.timestamps);
            joined.values.extend(piece.values);
        }
        Ok(joined)
    }

    /// Write the series as `time,value` CSV with RFC3339 timestamps.
    ///
    /// Rows go to `<path>.partial` first, which replaces `path` only once
    /// complete. An existing file is left intact when writing fails.
    pub fn write_csv(&self, path: &Path) -> EnergyResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let partial = partial_path(path);
        if let Err(e) = self.write_rows(&partial) {
            let _ = std::fs::remove_file(&partial);
            return Err(e);
        }
        std::fs::rename(&partial, path)?;

        debug!(path = %path.display(), rows = self.len(), series = %self.name, "Wrote time series");
        Ok(())
    }

    fn write_rows(&self, path: &Path) -> EnergyResult<()> {
        let mut writer = csv::Writer::from_path(path)?;
        for (time, value) in self.iter() {
            writer.serialize(SeriesRow { time: *time, value })?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Read a series written by [`TimeSeries::write_csv`].
    pub fn read_csv(
        path: &Path,
        name: impl Into<String>,
        units: impl Into<String>,
    ) -> EnergyResult<Self> {
        let mut reader = csv::Reader::from_reader(File::open(path)?);
        let mut timestamps = Vec::new();
        let mut values = Vec::new();
        for row in reader.deserialize::<SeriesRow>() {
            let row = row?;
            timestamps.push(row.time);
            values.push(row.value);
        }
        Self::new(name, units, timestamps, values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn hourly(values: Vec<f64>) -> TimeSeries {
        let start = Utc.with_ymd_and_hms(2015, 12, 31, 22, 0, 0).unwrap();
        let times = (0..values.len() as i64)
            .map(|h| start + Duration::hours(h))
            .collect();
        TimeSeries::new("test", "kW/kW", times, values).unwrap()
    }

    #[test]
    fn test_new_rejects_mismatch_and_unordered() {
        let t = Utc.with_ymd_and_hms(2015, 1, 1, 0, 0, 0).unwrap();
        assert!(TimeSeries::new("x", "u", vec![t], vec![]).is_err());
        assert!(TimeSeries::new("x", "u", vec![t, t], vec![1.0, 2.0]).is_err());
    }

    #[test]
    fn test_totals_by_year() {
        let series = hourly(vec![1.0, 2.0, 3.0, 4.0]);
        let totals = series.totals_by(Granularity::Yearly);
        assert_eq!(totals[&Period::Year(2015)], 3.0);
        assert_eq!(totals[&Period::Year(2016)], 7.0);
    }

    #[test]
    fn test_scale_period_only_touches_period() {
        let mut series = hourly(vec![1.0, 1.0, 1.0, 1.0]);
        series.scale_period(Period::Year(2016), 3.0);
        assert_eq!(series.values(), &[1.0, 1.0, 3.0, 3.0]);
    }

    #[test]
    fn test_rolling_mean_min_periods_one() {
        let series = hourly(vec![0.0, 3.0, 6.0, 3.0]).rolling_mean_centered(3);
        assert_eq!(series.values(), &[1.5, 3.0, 4.0, 4.5]);
    }

    #[test]
    fn test_concat_rejects_overlap() {
        let whole = hourly(vec![1.0, 2.0, 3.0, 4.0]);
        let head = TimeSeries::new("test", "kW/kW", whole.timestamps()[..2].to_vec(), vec![1.0, 2.0]).unwrap();
        let tail = TimeSeries::new("other", "kW/kW", whole.timestamps()[2..].to_vec(), vec![3.0, 4.0]).unwrap();

        let joined = TimeSeries::concat(vec![head.clone(), tail]).unwrap();
        assert_eq!(joined, whole);
        assert!(TimeSeries::concat(vec![head.clone(), head]).is_err());
        assert!(TimeSeries::concat(Vec::new()).is_err());
    }

    #[test]
    fn test_csv_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("DE__ERA5__solar.csv");
        let series = hourly(vec![0.25, 0.5, 0.0]);
        series.write_csv(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("time,value\n2015-12-31T22:00:00Z,0.25"));

        let back = TimeSeries::read_csv(&path, "test", "kW/kW").unwrap();
        assert_eq!(back, series);
    }

    #[test]
    fn test_write_replaces_file_only_when_complete() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("DE__ERA5__solar.csv");
        let first = hourly(vec![0.25, 0.5, 0.0]);
        first.write_csv(&path).unwrap();
        assert!(!partial_path(&path).exists());

        // a directory in the way of the partial file makes the write fail
        std::fs::create_dir(partial_path(&path)).unwrap();
        assert!(hourly(vec![1.0, 1.0, 1.0]).write_csv(&path).is_err());
        assert_eq!(TimeSeries::read_csv(&path, "test", "kW/kW").unwrap(), first);

        std::fs::remove_dir(partial_path(&path)).unwrap();
        let second = hourly(vec![1.0, 1.0, 1.0]);
        second.write_csv(&path).unwrap();
        assert_eq!(TimeSeries::read_csv(&path, "test", "kW/kW").unwrap(), second);
        assert!(!partial_path(&path).exists());
    }
}
