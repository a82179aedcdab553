//! CF-convention time axes (`<unit> since <reference>`).

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};

use crate::error::{GridError, GridResult};

/// A decoded `units` attribute of a time coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeAxis {
    pub seconds_per_unit: f64,
    pub reference: DateTime<Utc>,
}

impl TimeAxis {
    /// Parse e.g. `hours since 1900-01-01 00:00:00.0` or `days since 1949-12-01`.
    ///
    /// Non-standard calendars are read as the proleptic Gregorian calendar.
    pub fn parse(units: &str) -> GridResult<Self> {
        let bad = || GridError::invalid_metadata(format!("unsupported time units '{units}'"));

        let (unit, reference) = units.split_once(" since ").ok_or_else(bad)?;
        let seconds_per_unit = match unit.trim().to_lowercase().as_str() {
            "seconds" | "second" | "s" => 1.0,
            "minutes" | "minute" | "min" => 60.0,
            "hours" | "hour" | "h" => 3600.0,
            "days" | "day" | "d" => 86400.0,
            _ => return Err(bad()),
        };

        let reference = parse_reference(reference.trim()).ok_or_else(bad)?;
        Ok(Self {
            seconds_per_unit,
            reference,
        })
    }

    /// Timestamp of an offset along the axis, rounded to the nearest second.
    pub fn decode(&self, offset: f64) -> DateTime<Utc> {
        self.reference + Duration::seconds((offset * self.seconds_per_unit).round() as i64)
    }

    pub fn encode(&self, time: &DateTime<Utc>) -> f64 {
        (*time - self.reference).num_seconds() as f64 / self.seconds_per_unit
    }

    pub fn units(&self) -> String {
        let unit = match self.seconds_per_unit as i64 {
            1 => "seconds",
            60 => "minutes",
            86400 => "days",
            _ => "hours",
        };
        format!("{unit} since {}", self.reference.format("%Y-%m-%d %H:%M:%S"))
    }
}

fn parse_reference(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim_end_matches(" UTC").trim_end_matches('Z').replace('T', " ");

    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(&s, fmt) {
            return Some(dt.and_utc());
        }
    }
    NaiveDate::parse_from_str(&s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}
