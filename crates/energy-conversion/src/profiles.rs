//! Intraday shapes of the heating demand.
//!
//! Two methods are available. The BDEW profiles depend on the local hour and
//! on whether the day is a weekday. The temperature-class profiles also
//! depend on the daily mean temperature, rounded to the nearest of the
//! classes -15, -10, ..., 30 degrees Celsius.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{DateTime, Datelike, TimeZone, Timelike};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ConversionError, ConversionResult};
use crate::heat::HeatingSector;

/// Daily mean temperature classes (degrees Celsius).
pub const TEMPERATURE_CLASSES: [i32; 10] = [-15, -10, -5, 0, 5, 10, 15, 20, 25, 30];

const HOURS_PER_WEEK: usize = 7 * 24;

/// How the hourly heating demand is shaped within a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeatProfileMethod {
    /// Weekday and weekend profiles per sector.
    #[default]
    HourlyDependent,
    /// Profiles per daily mean temperature class.
    HourlyAndTemperatureDependent,
}

/// Hour of the week, Monday 00:00 being 0.
fn hour_of_week<T: Datelike + Timelike>(local: &T) -> usize {
    24 * local.weekday().num_days_from_monday() as usize + local.hour() as usize
}

/// Relative heat use over the 168 hours of a week.
#[derive(Debug, Clone, PartialEq)]
pub struct WeeklyProfile {
    weekday: [f64; 24],
    weekend: [f64; 24],
}

impl WeeklyProfile {
    pub fn new(weekday: [f64; 24], weekend: [f64; 24]) -> Self {
        Self { weekday, weekend }
    }

    pub fn flat() -> Self {
        Self::new([1.0; 24], [1.0; 24])
    }

    /// Value for hour-of-week `24 * weekday + hour`, Monday first.
    pub fn at_hour_of_week(&self, hour_of_week: usize) -> f64 {
        let hour = hour_of_week % 24;
        if hour_of_week % HOURS_PER_WEEK < 5 * 24 {
            self.weekday[hour]
        } else {
            self.weekend[hour]
        }
    }

    /// Profile value at `time` seen from the local civil time of `zone`.
    pub fn at<Z: TimeZone>(&self, time: &DateTime<Z>, zone: &Z) -> f64 {
        self.at_hour_of_week(hour_of_week(&time.with_timezone(zone)))
    }
}

/// Hourly factors per temperature class, each class scaled to mean 1.
///
/// Residential factors depend on the hour of the day (average of single- and
/// multi-family houses); services factors on the hour of the week.
#[derive(Debug, Clone, PartialEq)]
pub struct TemperatureClassProfiles {
    residential: BTreeMap<i32, Vec<f64>>,
    services: BTreeMap<i32, Vec<f64>>,
}

impl TemperatureClassProfiles {
    /// Class of a daily mean temperature; ties round to the even multiple of 5.
    pub fn temperature_class(celsius: f64) -> Option<i32> {
        if !celsius.is_finite() {
            return None;
        }
        Some(((celsius.clamp(-15.0, 30.0) / 5.0).round_ties_even() * 5.0) as i32)
    }

    pub fn load(single_family: &Path, multi_family: &Path, services: &Path) -> ConversionResult<Self> {
        let profiles = Self::from_readers(
            File::open(single_family)?,
            File::open(multi_family)?,
            File::open(services)?,
        )?;
        debug!(
            single_family = %single_family.display(),
            multi_family = %multi_family.display(),
            services = %services.display(),
            "Loaded temperature class heat profiles"
        );
        Ok(profiles)
    }

    /// Read `;`-separated tables with decimal commas: 24 rows per class
    /// column for houses, 168 rows (Monday 00:00 first) for services.
    pub fn from_readers<R: Read>(single_family: R, multi_family: R, services: R) -> ConversionResult<Self> {
        let single_family = read_class_table(single_family, 24, "single-family houses")?;
        let multi_family = read_class_table(multi_family, 24, "multi-family houses")?;
        let services = read_class_table(services, HOURS_PER_WEEK, "services")?;

        // both tables hold every class, in the same order
        let residential = single_family
            .into_iter()
            .zip(multi_family.into_values())
            .map(|((class, sfh), mfh)| (class, sfh.iter().zip(&mfh).map(|(a, b)| 0.5 * (a + b)).collect()))
            .collect();
        Ok(Self {
            residential: normalise_columns(residential, "residential")?,
            services: normalise_columns(services, "services")?,
        })
    }

    /// Factor of `sector` at local time `local` on a day of class `class`.
    pub fn factor<T: Datelike + Timelike>(&self, sector: HeatingSector, class: i32, local: &T) -> f64 {
        let (table, index) = match sector {
            HeatingSector::Residential => (&self.residential, local.hour() as usize),
            HeatingSector::Services => (&self.services, hour_of_week(local)),
        };
        table
            .get(&class)
            .and_then(|column| column.get(index))
            .copied()
            .unwrap_or(f64::NAN)
    }
}

fn parse_decimal(field: &str) -> Option<f64> {
    field.trim().replace(',', ".").parse().ok()
}

/// Every temperature class column of a table, as read.
fn read_class_table<R: Read>(reader: R, rows: usize, what: &str) -> ConversionResult<BTreeMap<i32, Vec<f64>>> {
    let mut reader = csv::ReaderBuilder::new().delimiter(b';').from_reader(reader);
    let headers = reader.headers()?.clone();
    let records: Vec<csv::StringRecord> = reader.records().collect::<Result<_, _>>()?;
    if records.len() != rows {
        return Err(ConversionError::InvalidProfile(format!(
            "{what}: expected {rows} rows, found {}",
            records.len()
        )));
    }

    let mut table = BTreeMap::new();
    for class in TEMPERATURE_CLASSES {
        let index = headers
            .iter()
            .position(|h| h.trim().parse::<i32>().ok() == Some(class))
            .ok_or_else(|| ConversionError::InvalidProfile(format!("{what}: missing class column {class}")))?;
        let column = records
            .iter()
            .enumerate()
            .map(|(row, record)| {
                let field = record.get(index).unwrap_or_default();
                parse_decimal(field).ok_or_else(|| {
                    ConversionError::InvalidProfile(format!("{what} class {class} row {row}: '{field}' is not a number"))
                })
            })
            .collect::<ConversionResult<Vec<f64>>>()?;
        table.insert(class, column);
    }
    Ok(table)
}

fn normalise_columns(table: BTreeMap<i32, Vec<f64>>, what: &str) -> ConversionResult<BTreeMap<i32, Vec<f64>>> {
    table
        .into_iter()
        .map(|(class, column)| {
            let mean = column.iter().sum::<f64>() / column.len() as f64;
            if !(mean > 0.0) {
                return Err(ConversionError::InvalidProfile(format!("{what} class {class} has no positive mean")));
            }
            Ok((class, column.iter().map(|v| v / mean).collect()))
        })
        .collect()
}

/// Intraday heat load profiles for every sector.
#[derive(Debug, Clone, PartialEq)]
pub enum HeatProfiles {
    /// BDEW weekday and weekend profiles.
    Weekly(BTreeMap<HeatingSector, WeeklyProfile>),
    TemperatureClass(TemperatureClassProfiles),
}

impl HeatProfiles {
    /// Every sector with a flat weekly profile.
    pub fn flat() -> Self {
        Self::Weekly(HeatingSector::ALL.iter().map(|&s| (s, WeeklyProfile::flat())).collect())
    }

    pub fn method(&self) -> HeatProfileMethod {
        match self {
            HeatProfiles::Weekly(_) => HeatProfileMethod::HourlyDependent,
            HeatProfiles::TemperatureClass(_) => HeatProfileMethod::HourlyAndTemperatureDependent,
        }
    }

    /// Load BDEW weekly profiles.
    pub fn load_csv(path: &Path) -> ConversionResult<Self> {
        let profiles = Self::from_reader(File::open(path)?)?;
        debug!(path = %path.display(), "Loaded weekly heat load profiles");
        Ok(profiles)
    }

    /// Read BDEW profiles from a CSV with an hour column (0-23) followed by
    /// columns named `"<sector> space weekday"` and `"<sector> space weekend"`.
    pub fn from_reader<R: Read>(reader: R) -> ConversionResult<Self> {
        let mut reader = csv::Reader::from_reader(reader);
        let headers = reader.headers()?.clone();
        let rows: Vec<csv::StringRecord> = reader.records().collect::<Result<_, _>>()?;
        if rows.len() != 24 {
            return Err(ConversionError::InvalidProfile(format!(
                "expected 24 hourly rows, found {}",
                rows.len()
            )));
        }

        let column = |name: String| -> ConversionResult<[f64; 24]> {
            let index = headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| ConversionError::InvalidProfile(format!("missing column '{name}'")))?;
            let mut values = [0.0; 24];
            for (hour, row) in rows.iter().enumerate() {
                let field = row.get(index).unwrap_or_default().trim();
                values[hour] = field.parse().map_err(|_| {
                    ConversionError::InvalidProfile(format!("'{name}' hour {hour}: '{field}' is not a number"))
                })?;
            }
            Ok(values)
        };

        let mut sectors = BTreeMap::new();
        for sector in HeatingSector::ALL {
            let weekday = column(format!("{} space weekday", sector.as_str()))?;
            let weekend = column(format!("{} space weekend", sector.as_str()))?;
            sectors.insert(sector, WeeklyProfile::new(weekday, weekend));
        }
        Ok(Self::Weekly(sectors))
    }

    /// Weekly profile of `sector`, if these are weekly profiles.
    pub fn weekly(&self, sector: HeatingSector) -> Option<&WeeklyProfile> {
        match self {
            HeatProfiles::Weekly(sectors) => sectors.get(&sector),
            HeatProfiles::TemperatureClass(_) => None,
        }
    }

    /// Factor of `sector` at local time `local`.
    ///
    /// `daily_celsius` is the country's mean temperature of the local day;
    /// only the temperature-class method uses it. NaN when it is needed but
    /// not finite.
    pub fn factor<T: Datelike + Timelike>(&self, sector: HeatingSector, local: &T, daily_celsius: f64) -> f64 {
        match self {
            HeatProfiles::Weekly(sectors) => sectors
                .get(&sector)
                .map_or(f64::NAN, |p| p.at_hour_of_week(hour_of_week(local))),
            HeatProfiles::TemperatureClass(profiles) => match TemperatureClassProfiles::temperature_class(daily_celsius) {
                Some(class) => profiles.factor(sector, class, local),
                None => f64::NAN,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use energy_common::Tz;
    use test_utils::temperature_class_csv;

    const PROFILE_CSV: &str = "\
hour,residential space weekday,residential space weekend,services space weekday,services space weekend
0,1,1,0.5,0.5
1,1,1,0.5,0.5
2,1,1,0.5,0.5
3,1,1,0.5,0.5
4,1,1,0.5,0.5
5,1,1,0.5,0.5
6,2,1,2,0.5
7,2,1,2,0.5
8,2,2,2,0.5
9,1,2,2,0.5
10,1,1,2,0.5
11,1,1,2,0.5
12,1,1,2,0.5
13,1,1,2,0.5
14,1,1,2,0.5
15,1,1,2,0.5
16,1,1,2,0.5
17,2,2,1,0.5
18,2,2,1,0.5
19,2,2,0.5,0.5
20,1,1,0.5,0.5
21,1,1,0.5,0.5
22,1,1,0.5,0.5
23,1,1,0.5,0.5
";

    fn temperature_class_profiles() -> TemperatureClassProfiles {
        let sfh = temperature_class_csv(24, |h| h as f64);
        let mfh = temperature_class_csv(24, |h| 2.0 * h as f64);
        let com = temperature_class_csv(HOURS_PER_WEEK, |h| if h < 5 * 24 { 10.0 } else { 0.0 });
        TemperatureClassProfiles::from_readers(sfh.as_bytes(), mfh.as_bytes(), com.as_bytes()).unwrap()
    }

    #[test]
    fn test_profile_csv() {
        let profiles = HeatProfiles::from_reader(PROFILE_CSV.as_bytes()).unwrap();
        assert_eq!(profiles.method(), HeatProfileMethod::HourlyDependent);
        let residential = profiles.weekly(HeatingSector::Residential).unwrap();
        // Monday 06:00 vs Saturday 06:00
        assert_eq!(residential.at_hour_of_week(6), 2.0);
        assert_eq!(residential.at_hour_of_week(5 * 24 + 6), 1.0);
        assert_eq!(residential.at_hour_of_week(6 * 24 + 8), 2.0);
    }

    #[test]
    fn test_profile_csv_requires_sector_columns() {
        let broken = PROFILE_CSV.replace("services space weekend", "other");
        assert!(matches!(
            HeatProfiles::from_reader(broken.as_bytes()),
            Err(ConversionError::InvalidProfile(_))
        ));
    }

    #[test]
    fn test_profile_follows_daylight_saving() {
        let profiles = HeatProfiles::from_reader(PROFILE_CSV.as_bytes()).unwrap();
        let residential = profiles.weekly(HeatingSector::Residential).unwrap();
        // 2015-01-05 and 2015-07-06 were Mondays
        let winter = Utc.with_ymd_and_hms(2015, 1, 5, 5, 0, 0).unwrap();
        assert_eq!(residential.at(&winter, &Utc), 1.0);
        assert_eq!(residential.at(&winter.with_timezone(&Tz::Europe__Berlin), &Tz::Europe__Berlin), 2.0);

        // 04:00 UTC is 06:00 in Berlin summer time, 05:00 in standard time
        let summer = Utc.with_ymd_and_hms(2015, 7, 6, 4, 0, 0).unwrap();
        assert_eq!(residential.at(&summer.with_timezone(&Tz::Europe__Berlin), &Tz::Europe__Berlin), 2.0);
        assert_eq!(residential.at(&summer.with_timezone(&Tz::Etc__GMTMinus1), &Tz::Etc__GMTMinus1), 1.0);
    }

    #[test]
    fn test_temperature_class() {
        assert_eq!(TemperatureClassProfiles::temperature_class(-40.0), Some(-15));
        assert_eq!(TemperatureClassProfiles::temperature_class(3.0), Some(5));
        assert_eq!(TemperatureClassProfiles::temperature_class(2.5), Some(0));
        assert_eq!(TemperatureClassProfiles::temperature_class(7.5), Some(10));
        assert_eq!(TemperatureClassProfiles::temperature_class(36.0), Some(30));
        assert_eq!(TemperatureClassProfiles::temperature_class(f64::NAN), None);
    }

    #[test]
    fn test_temperature_class_profiles_are_normalised() {
        let profiles = temperature_class_profiles();
        for class in TEMPERATURE_CLASSES {
            let mean: f64 = (0..24)
                .map(|h| profiles.residential[&class][h])
                .sum::<f64>()
                / 24.0;
            assert!((mean - 1.0).abs() < 1e-12);
        }

        // residential: mean of 1.5 h + c + 20 over the day is 17.25 + c + 20
        let monday_noon = Utc.with_ymd_and_hms(2015, 1, 5, 12, 0, 0).unwrap();
        let expected = (18.0 + 0.0 + 20.0) / (17.25 + 20.0);
        assert!((profiles.factor(HeatingSector::Residential, 0, &monday_noon) - expected).abs() < 1e-12);

        // services: weekdays above weekends
        let saturday_noon = Utc.with_ymd_and_hms(2015, 1, 10, 12, 0, 0).unwrap();
        assert!(
            profiles.factor(HeatingSector::Services, 5, &monday_noon)
                > profiles.factor(HeatingSector::Services, 5, &saturday_noon)
        );

        let heat = HeatProfiles::TemperatureClass(profiles);
        assert_eq!(heat.method(), HeatProfileMethod::HourlyAndTemperatureDependent);
        assert!(heat.weekly(HeatingSector::Residential).is_none());
        assert!(heat.factor(HeatingSector::Residential, &monday_noon, f64::NAN).is_nan());
    }

    #[test]
    fn test_temperature_class_tables_need_every_class() {
        let sfh = temperature_class_csv(24, |h| h as f64).replace(";30", ";35");
        let mfh = temperature_class_csv(24, |h| h as f64);
        let com = temperature_class_csv(HOURS_PER_WEEK, |_| 1.0);
        assert!(TemperatureClassProfiles::from_readers(sfh.as_bytes(), mfh.as_bytes(), com.as_bytes()).is_err());

        let short = temperature_class_csv(100, |_| 1.0);
        assert!(TemperatureClassProfiles::from_readers(mfh.as_bytes(), mfh.as_bytes(), short.as_bytes()).is_err());
    }
}
