//! Temporal harmonisation: bringing every source onto an hourly UTC axis.

use chrono::{DateTime, Duration, Utc};
use energy_common::time::{hourly_index, shifted_date};

use crate::error::{GridError, GridResult};
use crate::grid::ClimateGrid;

/// Upsample a 3- or 6-hourly projection grid to every hour of `year`.
///
/// The series is treated as periodic over the year: the last step is placed
/// one step before the first timestamp and the first step one step after the
/// last, then values are linearly interpolated. Hours outside the extended
/// range come out as NaN.
pub fn upsample_to_hourly(grid: &ClimateGrid, year: i32, step_hours: i64) -> GridResult<ClimateGrid> {
    if grid.nt() == 0 {
        return Err(GridError::EmptySelection(format!("'{}' has no time steps", grid.name)));
    }

    let step = Duration::hours(step_hours);
    let last = grid.nt() - 1;

    // (time, source frame) pairs of the wrapped series
    let mut knots: Vec<(DateTime<Utc>, usize)> = Vec::with_capacity(grid.nt() + 2);
    knots.push((grid.times()[0] - step, last));
    knots.extend(grid.times().iter().copied().zip(0..));
    knots.push((grid.times()[last] + step, 0));

    let targets = hourly_index(year)?;
    let n = grid.cells();
    let mut data = Vec::with_capacity(targets.len() * n);
    let mut k = 0;

    for target in &targets {
        while k + 1 < knots.len() && knots[k + 1].0 < *target {
            k += 1;
        }
        let (t0, f0) = knots[k];
        let in_range = k + 1 < knots.len() && t0 <= *target && *target <= knots[k + 1].0;
        if !in_range {
            data.extend(std::iter::repeat(f32::NAN).take(n));
            continue;
        }

        let (t1, f1) = knots[k + 1];
        let span = (t1 - t0).num_seconds() as f64;
        let frac = if span > 0.0 {
            ((*target - t0).num_seconds() as f64 / span) as f32
        } else {
            0.0
        };
        let a = grid.frame(f0);
        let b = grid.frame(f1);
        data.extend(a.iter().zip(b).map(|(&x, &y)| x + (y - x) * frac));
    }

    ClimateGrid::new(
        grid.name.clone(),
        grid.units.clone(),
        targets,
        grid.lats().to_vec(),
        grid.lons().to_vec(),
        data,
    )
}

/// Convert accumulated energy per step (J m-2) to mean power (W m-2).
pub fn accumulated_to_power(grid: &ClimateGrid, step_seconds: f64) -> ClimateGrid {
    let scale = (1.0 / step_seconds) as f32;
    grid.map(|v| v * scale).renamed(grid.name.clone(), "W m**-2")
}

/// Move end-of-step accumulations to the middle of the step.
///
/// Each value becomes the mean of its step and the following one; the last
/// step pairs with the first.
pub fn shift_to_mid_step(grid: &ClimateGrid) -> GridResult<ClimateGrid> {
    let nt = grid.nt();
    let mut data = Vec::with_capacity(grid.data().len());
    for t in 0..nt {
        let next = grid.frame((t + 1) % nt);
        data.extend(grid.frame(t).iter().zip(next).map(|(&a, &b)| 0.5 * (a + b)));
    }

    ClimateGrid::new(
        grid.name.clone(),
        grid.units.clone(),
        grid.times().to_vec(),
        grid.lats().to_vec(),
        grid.lons().to_vec(),
        data,
    )
}

/// Daily means per cell after shifting timestamps by `hour_shift` hours.
///
/// Each day is stamped at midnight UTC of its (shifted) calendar date.
/// NaN values are ignored; a day with no finite value is NaN.
pub fn daily_mean(grid: &ClimateGrid, hour_shift: f64) -> GridResult<ClimateGrid> {
    let n = grid.cells();
    let mut times: Vec<DateTime<Utc>> = Vec::new();
    let mut sums: Vec<Vec<f64>> = Vec::new();
    let mut counts: Vec<Vec<u32>> = Vec::new();

    for (t, time) in grid.times().iter().enumerate() {
        let day = shifted_date(time, hour_shift).and_hms_opt(0, 0, 0).map(|d| d.and_utc());
        let Some(day) = day else {
            return Err(GridError::invalid_metadata(format!("cannot shift {time}")));
        };

        if times.last() != Some(&day) {
            times.push(day);
            sums.push(vec![0.0; n]);
            counts.push(vec![0; n]);
        }
        let day_index = times.len() - 1;
        let (sum, count) = (&mut sums[day_index], &mut counts[day_index]);
        for (c, &v) in grid.frame(t).iter().enumerate() {
            if v.is_finite() {
                sum[c] += v as f64;
                count[c] += 1;
            }
        }
    }

    let data = sums
        .iter()
        .zip(&counts)
        .flat_map(|(s, c)| {
            s.iter().zip(c).map(|(&sum, &count)| {
                if count == 0 {
                    f32::NAN
                } else {
                    (sum / count as f64) as f32
                }
            })
        })
        .collect();

    ClimateGrid::new(
        grid.name.clone(),
        grid.units.clone(),
        times,
        grid.lats().to_vec(),
        grid.lons().to_vec(),
        data,
    )
}

/// Resample onto `targets` by carrying the most recent value forward.
///
/// Targets before the first timestamp are NaN.
pub fn forward_fill(grid: &ClimateGrid, targets: &[DateTime<Utc>]) -> GridResult<ClimateGrid> {
    let n = grid.cells();
    let mut data = Vec::with_capacity(targets.len() * n);
    // number of source steps at or before the current target
    let mut seen = 0usize;

    for target in targets {
        while seen < grid.nt() && grid.times()[seen] <= *target {
            seen += 1;
        }
        if seen == 0 {
            data.extend(std::iter::repeat(f32::NAN).take(n));
        } else {
            data.extend_from_slice(grid.frame(seen - 1));
        }
    }

    ClimateGrid::new(
        grid.name.clone(),
        grid.units.clone(),
        targets.to_vec(),
        grid.lats().to_vec(),
        grid.lons().to_vec(),
        data,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn series(start: DateTime<Utc>, step_hours: i64, values: &[f32]) -> ClimateGrid {
        let times = (0..values.len() as i64)
            .map(|k| start + Duration::hours(k * step_hours))
            .collect();
        ClimateGrid::new("v", "u", times, vec![0.0], vec![0.0], values.to_vec()).unwrap()
    }

    #[test]
    fn test_upsample_wraps_both_ends() {
        let start = Utc.with_ymd_and_hms(2015, 1, 1, 0, 0, 0).unwrap();
        let n = 365 * 8;
        let mut values = vec![0.0f32; n];
        values[0] = 3.0;
        values[n - 1] = 6.0;
        let grid = series(start, 3, &values);

        let hourly = upsample_to_hourly(&grid, 2015, 3).unwrap();
        assert_eq!(hourly.nt(), 8760);
        assert_eq!(hourly.data()[0], 3.0);
        assert_eq!(hourly.data()[1], 2.0);
        assert_eq!(hourly.data()[2], 1.0);
        // Dec 31 21:00 = 6, then wrap towards the first value 3 at 24:00.
        assert_eq!(hourly.data()[8757], 6.0);
        assert_eq!(hourly.data()[8758], 5.0);
        assert_eq!(hourly.data()[8759], 4.0);
    }

    #[test]
    fn test_mid_step_shift_wraps() {
        let start = Utc.with_ymd_and_hms(2015, 1, 1, 0, 0, 0).unwrap();
        let grid = series(start, 1, &[2.0, 4.0, 6.0]);
        let shifted = shift_to_mid_step(&grid).unwrap();
        assert_eq!(shifted.data(), &[3.0, 5.0, 4.0]);
    }

    #[test]
    fn test_accumulated_to_power() {
        let start = Utc.with_ymd_and_hms(2015, 1, 1, 0, 0, 0).unwrap();
        let grid = series(start, 1, &[3600.0, 7200.0]);
        let power = accumulated_to_power(&grid, 3600.0);
        assert_eq!(power.data(), &[1.0, 2.0]);
        assert_eq!(power.units, "W m**-2");
    }

    #[test]
    fn test_daily_mean_with_shift() {
        let start = Utc.with_ymd_and_hms(2014, 12, 31, 22, 0, 0).unwrap();
        let grid = series(start, 1, &[1.0, 3.0, 10.0, 20.0]);

        let utc = daily_mean(&grid, 0.0).unwrap();
        assert_eq!(utc.nt(), 2);
        assert_eq!(utc.data(), &[2.0, 15.0]);

        let shifted = daily_mean(&grid, 2.0).unwrap();
        assert_eq!(shifted.nt(), 1);
        assert_eq!(shifted.times()[0], Utc.with_ymd_and_hms(2015, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(shifted.data(), &[8.5]);
    }

    #[test]
    fn test_forward_fill() {
        let start = Utc.with_ymd_and_hms(2015, 1, 1, 0, 0, 0).unwrap();
        let daily = series(start, 24, &[1.0, 2.0]);
        let targets: Vec<_> = (-1..48).map(|h| start + Duration::hours(h)).collect();
        let hourly = forward_fill(&daily, &targets).unwrap();
        assert!(hourly.data()[0].is_nan());
        assert_eq!(hourly.data()[1], 1.0);
        assert_eq!(hourly.data()[24], 1.0);
        assert_eq!(hourly.data()[25], 2.0);
        assert_eq!(hourly.data()[48], 2.0);
    }
}
