//! Spatial reduction of a grid to a per-country time series.

use energy_common::{Reduction, TimeSeries};

use crate::error::{GridError, GridResult};
use crate::grid::ClimateGrid;
use crate::mask::CountryMask;

/// Reduce `grid` over the cells of `mask`.
///
/// NaN cells are skipped; for the weighted mean their weights are left out of
/// the denominator as well. The returned series has one value per grid time
/// step.
pub fn reduce(grid: &ClimateGrid, mask: &CountryMask, reduction: Reduction) -> GridResult<TimeSeries> {
    let alignment = mask.align(grid)?;
    if mask.total_weight() <= 0.0 {
        return Err(GridError::ZeroWeight(mask.country.clone()));
    }

    let mut values = Vec::with_capacity(grid.nt());
    for t in 0..grid.nt() {
        let mut weighted = 0.0f64;
        let mut weight_sum = 0.0f64;
        for (mj, &j) in alignment.rows.iter().enumerate() {
            for (mi, &i) in alignment.cols.iter().enumerate() {
                let w = mask.weight(mj, mi);
                let v = grid.value(t, j, i);
                if w == 0.0 || !w.is_finite() || !v.is_finite() {
                    continue;
                }
                weighted += v as f64 * w;
                weight_sum += w;
            }
        }

        values.push(match reduction {
            Reduction::WeightedSum => weighted,
            Reduction::WeightedMean if weight_sum > 0.0 => weighted / weight_sum,
            Reduction::WeightedMean => f64::NAN,
        });
    }

    Ok(TimeSeries::new(
        grid.name.clone(),
        grid.units.clone(),
        grid.times().to_vec(),
        values,
    )?)
}

pub fn weighted_mean(grid: &ClimateGrid, mask: &CountryMask) -> GridResult<TimeSeries> {
    reduce(grid, mask, Reduction::WeightedMean)
}

pub fn weighted_sum(grid: &ClimateGrid, mask: &CountryMask) -> GridResult<TimeSeries> {
    reduce(grid, mask, Reduction::WeightedSum)
}
