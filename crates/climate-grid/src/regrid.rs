//! Resampling projection grids onto the reanalysis grid.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{GridError, GridResult};
use crate::grid::ClimateGrid;

/// Interpolation method used when regridding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterpolationMethod {
    Nearest,
    #[default]
    Bilinear,
}

/// Nearest neighbour interpolation at fractional index `(x, y)`.
pub fn nearest_interpolate(data: &[f32], width: usize, height: usize, x: f64, y: f64) -> f32 {
    let col = x.round() as usize;
    let row = y.round() as usize;

    if col >= width || row >= height {
        return f32::NAN;
    }

    data[row * width + col]
}

/// Bilinear interpolation at fractional index `(x, y)`.
///
/// If any of the four surrounding values is NaN the result is NaN.
pub fn bilinear_interpolate(data: &[f32], width: usize, height: usize, x: f64, y: f64) -> f32 {
    let x0 = x.floor() as usize;
    let y0 = y.floor() as usize;

    if x0 >= width || y0 >= height {
        return f32::NAN;
    }

    let x1 = (x0 + 1).min(width - 1);
    let y1 = (y0 + 1).min(height - 1);

    let xf = (x - x0 as f64) as f32;
    let yf = (y - y0 as f64) as f32;

    let v00 = data[y0 * width + x0];
    let v10 = data[y0 * width + x1];
    let v01 = data[y1 * width + x0];
    let v11 = data[y1 * width + x1];

    if v00.is_nan() || v10.is_nan() || v01.is_nan() || v11.is_nan() {
        return f32::NAN;
    }

    let top = v00 * (1.0 - xf) + v10 * xf;
    let bottom = v01 * (1.0 - xf) + v11 * xf;
    top * (1.0 - yf) + bottom * yf
}

/// Fractional position of `value` along a monotonic coordinate axis.
///
/// Returns `None` outside the axis extent.
pub fn fractional_index(coords: &[f64], value: f64) -> Option<f64> {
    match coords.len() {
        0 => return None,
        1 => return ((coords[0] - value).abs() < 1e-9).then_some(0.0),
        _ => {}
    }

    let ascending = coords[1] > coords[0];
    let inside = |lo: f64, hi: f64| {
        let (a, b) = if lo <= hi { (lo, hi) } else { (hi, lo) };
        value >= a && value <= b
    };

    for k in 0..coords.len() - 1 {
        let (c0, c1) = (coords[k], coords[k + 1]);
        if inside(c0, c1) {
            let span = c1 - c0;
            let frac = if span == 0.0 { 0.0 } else { (value - c0) / span };
            return Some(k as f64 + frac);
        }
        if (ascending && value < c0) || (!ascending && value > c0) {
            break;
        }
    }
    None
}

/// Resample every time step of `grid` onto the cell centres `lats` x `lons`.
///
/// Target cells are geographic. A rotated-pole source is sampled at the
/// rotated position of each target cell. Target cells outside the source
/// extent are NaN.
pub fn regrid(
    grid: &ClimateGrid,
    lats: &[f64],
    lons: &[f64],
    method: InterpolationMethod,
) -> GridResult<ClimateGrid> {
    if lats.is_empty() || lons.is_empty() {
        return Err(GridError::InterpolationError("empty target grid".to_string()));
    }

    // fractional (x, y) source position of each target cell, row-major
    let positions: Vec<Option<(f64, f64)>> = match grid.rotated_pole() {
        None => {
            let ys: Vec<Option<f64>> = lats.iter().map(|&lat| fractional_index(grid.lats(), lat)).collect();
            let xs: Vec<Option<f64>> = lons.iter().map(|&lon| fractional_index(grid.lons(), lon)).collect();
            ys.iter()
                .flat_map(|y| xs.iter().map(move |x| x.zip(*y)))
                .collect()
        }
        Some(pole) => lats
            .iter()
            .flat_map(|&lat| {
                lons.iter().map(move |&lon| {
                    let (rlat, rlon) = pole.to_rotated(lat, lon);
                    fractional_index(grid.lons(), rlon).zip(fractional_index(grid.lats(), rlat))
                })
            })
            .collect(),
    };

    let (width, height) = (grid.nx(), grid.ny());
    let mut data = Vec::with_capacity(grid.nt() * positions.len());
    for frame in grid.frames() {
        for position in &positions {
            let value = match position {
                Some((x, y)) => match method {
                    InterpolationMethod::Nearest => nearest_interpolate(frame, width, height, *x, *y),
                    InterpolationMethod::Bilinear => bilinear_interpolate(frame, width, height, *x, *y),
                },
                None => f32::NAN,
            };
            data.push(value);
        }
    }

    debug!(
        variable = %grid.name,
        from = %format!("{height}x{width}"),
        to = %format!("{}x{}", lats.len(), lons.len()),
        rotated = grid.rotated_pole().is_some(),
        method = ?method,
        "Regridded"
    );

    ClimateGrid::new(
        grid.name.clone(),
        grid.units.clone(),
        grid.times().to_vec(),
        lats.to_vec(),
        lons.to_vec(),
        data,
    )
}

/// Regrid onto the coordinates of `target`, which must be geographic.
pub fn regrid_like(grid: &ClimateGrid, target: &ClimateGrid, method: InterpolationMethod) -> GridResult<ClimateGrid> {
    if target.rotated_pole().is_some() {
        return Err(GridError::InterpolationError(format!(
            "target '{}' is not on a geographic grid",
            target.name
        )));
    }
    regrid(grid, target.lats(), target.lons(), method)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rotated::RotatedPole;

    #[test]
    fn test_nearest_interpolate() {
        let data: Vec<f32> = vec![
            1.0, 2.0, 3.0,
            4.0, 5.0, 6.0,
            7.0, 8.0, 9.0,
        ];

        assert_eq!(nearest_interpolate(&data, 3, 3, 0.0, 0.0), 1.0);
        assert_eq!(nearest_interpolate(&data, 3, 3, 0.4, 0.4), 1.0);
        assert_eq!(nearest_interpolate(&data, 3, 3, 0.6, 0.6), 5.0);
        assert!(nearest_interpolate(&data, 3, 3, 3.0, 0.0).is_nan());
    }

    #[test]
    fn test_bilinear_interpolate() {
        let data: Vec<f32> = vec![
            1.0, 2.0,
            3.0, 4.0,
        ];

        assert_eq!(bilinear_interpolate(&data, 2, 2, 0.0, 0.0), 1.0);
        assert_eq!(bilinear_interpolate(&data, 2, 2, 1.0, 1.0), 4.0);
        assert_eq!(bilinear_interpolate(&data, 2, 2, 0.5, 0.5), 2.5);

        let with_nan = vec![1.0, f32::NAN, 3.0, 4.0];
        assert!(bilinear_interpolate(&with_nan, 2, 2, 0.5, 0.5).is_nan());
    }

    #[test]
    fn test_fractional_index_both_directions() {
        assert_eq!(fractional_index(&[0.0, 1.0, 2.0], 1.5), Some(1.5));
        assert_eq!(fractional_index(&[50.0, 49.0, 48.0], 49.25), Some(0.75));
        assert_eq!(fractional_index(&[0.0, 1.0], 1.5), None);
        assert_eq!(fractional_index(&[50.0, 49.0], 50.5), None);
    }

    #[test]
    fn test_regrid_onto_finer_grid() {
        let grid = ClimateGrid::static_field(
            "v",
            "u",
            vec![1.0, 0.0],
            vec![0.0, 1.0],
            vec![0.0, 2.0, 4.0, 6.0],
        )
        .unwrap();

        let fine = regrid(&grid, &[1.0, 0.5], &[0.0, 0.5, 2.0], InterpolationMethod::Bilinear).unwrap();
        assert_eq!(fine.ny(), 2);
        assert_eq!(fine.nx(), 3);
        assert_eq!(fine.frame(0)[0], 0.0);
        assert_eq!(fine.frame(0)[4], 3.0);
        assert!(fine.frame(0)[2].is_nan());
    }

    #[test]
    fn test_regrid_rotated_pole_grid() {
        let pole = RotatedPole::new(39.25, -162.0);
        // 3x3 rotated cells of 0.5 degrees around the rotated origin
        let rlats = vec![-0.5, 0.0, 0.5];
        let rlons = vec![-0.5, 0.0, 0.5];
        let mut values = Vec::new();
        for &rlat in &rlats {
            for &rlon in &rlons {
                // a field linear in rotated coordinates is reproduced by bilinear
                values.push((10.0 + 2.0 * rlat + rlon) as f32);
            }
        }
        let grid = ClimateGrid::static_field("sfcWind", "m s-1", rlats, rlons, values)
            .unwrap()
            .with_rotated_pole(pole);
        assert!(grid.clip(&grid.bbox()).is_err());

        let (lat, lon) = pole.to_geographic(0.2, -0.1);
        let far = (30.0, -40.0);
        let out = regrid(&grid, &[lat, far.0], &[lon, far.1], InterpolationMethod::Bilinear).unwrap();
        assert!(out.rotated_pole().is_none());
        assert!((out.frame(0)[0] - 10.3).abs() < 1e-4);
        // geographic cells far outside the rotated domain
        assert!(out.frame(0)[1].is_nan());
        assert!(out.frame(0)[2].is_nan());
        assert!(out.frame(0)[3].is_nan());

        let target = ClimateGrid::static_field("t2m", "K", vec![lat], vec![lon], vec![0.0]).unwrap();
        assert!(regrid_like(&target, &grid, InterpolationMethod::Nearest).is_err());
        let nearest = regrid_like(&grid, &target, InterpolationMethod::Nearest).unwrap();
        assert_eq!(nearest.frame(0)[0], 10.0);
    }
}
