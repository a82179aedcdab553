//! Synthetic climate grids and series with predictable values.

use chrono::{DateTime, Duration, TimeZone, Utc};
use climate_grid::{ClimateGrid, CountryMask};
use energy_common::TimeSeries;

/// `n` hourly timestamps starting at 00:00 UTC on 1 January of `year`.
pub fn hourly_times(year: i32, n: usize) -> Vec<DateTime<Utc>> {
    let start = Utc
        .with_ymd_and_hms(year, 1, 1, 0, 0, 0)
        .single()
        .expect("valid year");
    (0..n as i64).map(|h| start + Duration::hours(h)).collect()
}

/// Cell centres of a `height` x `width` grid with 0.25 degree spacing,
/// latitudes running north to south from 50N and longitudes east from 10E.
pub fn test_coords(width: usize, height: usize) -> (Vec<f64>, Vec<f64>) {
    let lats = (0..height).map(|j| 50.0 - 0.25 * j as f64).collect();
    let lons = (0..width).map(|i| 10.0 + 0.25 * i as f64).collect();
    (lats, lons)
}

/// A grid holding `value` everywhere, on hourly steps of `year`.
pub fn constant_grid(
    name: &str,
    units: &str,
    year: i32,
    steps: usize,
    width: usize,
    height: usize,
    value: f32,
) -> ClimateGrid {
    let (lats, lons) = test_coords(width, height);
    ClimateGrid::new(
        name,
        units,
        hourly_times(year, steps),
        lats,
        lons,
        vec![value; steps * width * height],
    )
    .expect("consistent shape")
}

/// A grid whose value depends only on the time step: `values[t]` in every cell.
pub fn time_varying_grid(
    name: &str,
    units: &str,
    year: i32,
    values: &[f32],
    width: usize,
    height: usize,
) -> ClimateGrid {
    let (lats, lons) = test_coords(width, height);
    let cells = width * height;
    let data = values
        .iter()
        .flat_map(|&v| std::iter::repeat(v).take(cells))
        .collect();
    ClimateGrid::new(name, units, hourly_times(year, values.len()), lats, lons, data)
        .expect("consistent shape")
}

/// Hourly 2 m temperature (K) for a whole year following a seasonal cycle
/// (coldest in January) plus a daily cycle (warmest mid-afternoon UTC).
pub fn seasonal_temperature_grid(year: i32, width: usize, height: usize, mean_celsius: f32) -> ClimateGrid {
    let steps = energy_common::time::days_in_year(year) as usize * 24;
    let values: Vec<f32> = (0..steps)
        .map(|h| {
            let day = h as f32 / 24.0;
            let hour = (h % 24) as f32;
            let seasonal = -12.0 * (2.0 * std::f32::consts::PI * (day + 10.0) / 365.0).cos();
            let daily = -4.0 * (2.0 * std::f32::consts::PI * (hour - 3.0) / 24.0).cos();
            273.15 + mean_celsius + seasonal + daily
        })
        .collect();
    time_varying_grid("t2m", "K", year, &values, width, height)
}

/// A mask covering the whole test grid with equal weights.
pub fn uniform_mask(country: &str, width: usize, height: usize, weight: f64) -> CountryMask {
    let (lats, lons) = test_coords(width, height);
    CountryMask::new(country, lats, lons, vec![weight; width * height]).expect("consistent shape")
}

/// An hourly series of `year` built from `f(hour_index)`.
pub fn hourly_series<F>(name: &str, year: i32, f: F) -> TimeSeries
where
    F: Fn(usize) -> f64,
{
    let n = energy_common::time::days_in_year(year) as usize * 24;
    TimeSeries::new(name, "kW/kW", hourly_times(year, n), (0..n).map(f).collect())
        .expect("valid series")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_grid_shape() {
        let grid = constant_grid("ws", "m s**-1", 2015, 3, 2, 2, 10.0);
        assert_eq!(grid.nt(), 3);
        assert_eq!(grid.lats(), &[50.0, 49.75]);
        assert_eq!(grid.lons(), &[10.0, 10.25]);
        assert!(grid.data().iter().all(|&v| v == 10.0));
    }

    #[test]
    fn test_seasonal_temperature_is_cold_in_winter() {
        let grid = seasonal_temperature_grid(2015, 1, 1, 10.0);
        assert_eq!(grid.nt(), 8760);
        let january = grid.data()[..24 * 31].iter().sum::<f32>() / (24.0 * 31.0);
        let july = grid.data()[24 * 181..24 * 212].iter().sum::<f32>() / (24.0 * 31.0);
        assert!(january < july);
    }

    #[test]
    fn test_hourly_series_covers_year() {
        let series = hourly_series("x", 2016, |_| 1.0);
        assert_eq!(series.len(), 8784);
        assert_eq!(series.sum(), 8784.0);
    }
}
