//! Calendar helpers: calibration periods and hourly indices.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EnergyError, EnergyResult};

/// Length of a calibration period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Yearly,
    Monthly,
}

impl Granularity {
    /// The period of this granularity that contains `time`.
    pub fn period_of(&self, time: &DateTime<Utc>) -> Period {
        match self {
            Granularity::Yearly => Period::Year(time.year()),
            Granularity::Monthly => Period::Month(time.year(), time.month()),
        }
    }
}

impl FromStr for Granularity {
    type Err = EnergyError;

    fn from_str(s: &str) -> EnergyResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "yearly" | "annual" | "year" => Ok(Granularity::Yearly),
            "monthly" | "month" => Ok(Granularity::Monthly),
            _ => Err(EnergyError::invalid("granularity", s)),
        }
    }
}

/// A calibration period: a calendar year or a calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Period {
    Year(i32),
    Month(i32, u32),
}

impl Period {
    pub fn year(&self) -> i32 {
        match self {
            Period::Year(y) | Period::Month(y, _) => *y,
        }
    }

    pub fn granularity(&self) -> Granularity {
        match self {
            Period::Year(_) => Granularity::Yearly,
            Period::Month(..) => Granularity::Monthly,
        }
    }

    /// Position of the period within its year: 0 for a year, 0..=11 for a month.
    pub fn index_in_year(&self) -> usize {
        match self {
            Period::Year(_) => 0,
            Period::Month(_, m) => (*m as usize).saturating_sub(1),
        }
    }

    pub fn contains(&self, time: &DateTime<Utc>) -> bool {
        self.granularity().period_of(time) == *self
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Year(y) => write!(f, "{y:04}"),
            Period::Month(y, m) => write!(f, "{y:04}-{m:02}"),
        }
    }
}

impl FromStr for Period {
    type Err = EnergyError;

    /// Parse `YYYY` or `YYYY-MM`.
    fn from_str(s: &str) -> EnergyResult<Self> {
        let s = s.trim();
        let bad = || EnergyError::InvalidTime(format!("expected YYYY or YYYY-MM, got '{s}'"));

        match s.split_once('-') {
            None => {
                let year: i32 = s.parse().map_err(|_| bad())?;
                Ok(Period::Year(year))
            }
            Some((y, m)) => {
                let year: i32 = y.parse().map_err(|_| bad())?;
                let month: u32 = m.parse().map_err(|_| bad())?;
                if !(1..=12).contains(&month) {
                    return Err(bad());
                }
                Ok(Period::Month(year, month))
            }
        }
    }
}

pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

pub fn days_in_year(year: i32) -> u32 {
    if is_leap_year(year) {
        366
    } else {
        365
    }
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        2 if is_leap_year(year) => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

/// Midnight UTC on 1 January of `year`.
pub fn year_start(year: i32) -> EnergyResult<DateTime<Utc>> {
    Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0)
        .single()
        .ok_or_else(|| EnergyError::InvalidTime(format!("year {year} out of range")))
}

/// Every hour of `year` in UTC, starting at 00:00 on 1 January.
pub fn hourly_index(year: i32) -> EnergyResult<Vec<DateTime<Utc>>> {
    let start = year_start(year)?;
    let hours = days_in_year(year) as i64 * 24;
    Ok((0..hours).map(|h| start + Duration::hours(h)).collect())
}

/// Every day of `year` at midnight UTC.
pub fn daily_index(year: i32) -> EnergyResult<Vec<DateTime<Utc>>> {
    let start = year_start(year)?;
    Ok((0..days_in_year(year) as i64)
        .map(|d| start + Duration::days(d))
        .collect())
}

/// Calendar date of a timestamp after shifting it by `hour_shift` hours.
pub fn shifted_date(time: &DateTime<Utc>, hour_shift: f64) -> NaiveDate {
    let shifted = *time + Duration::seconds((hour_shift * 3600.0).round() as i64);
    shifted.date_naive()
}
