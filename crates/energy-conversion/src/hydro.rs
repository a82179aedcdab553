//! Hydropower inflow from surface runoff.

use climate_grid::{weighted_sum, ClimateGrid, CountryMask, GridError};
use energy_common::{Carrier, ClimateSource, TimeSeries};
use tracing::debug;

use crate::error::{ConversionError, ConversionResult};

pub const EARTH_RADIUS_M: f64 = 6_371_000.0;
pub const GRAVITY: f64 = 9.81;
const WATER_DENSITY: f64 = 1000.0;
/// Joules in one GWh.
const JOULES_PER_GWH: f64 = 3.6e12;

/// Units in which a source reports runoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunoffUnits {
    /// Depth of water per hourly step (m), as in the reanalysis.
    MetresPerStep,
    /// Mass flux (kg m-2 s-1), as in the projections; steps are hourly after
    /// harmonisation.
    MassFlux,
}

impl RunoffUnits {
    pub fn for_source(source: &ClimateSource) -> Self {
        if source.is_projection() {
            RunoffUnits::MassFlux
        } else {
            RunoffUnits::MetresPerStep
        }
    }

    /// Factor turning one value times the cell area (m2) into kg per hour.
    fn mass_factor(&self) -> f64 {
        match self {
            RunoffUnits::MetresPerStep => WATER_DENSITY,
            RunoffUnits::MassFlux => 3600.0,
        }
    }
}

/// Plant types, which differ in the assumed hydraulic head.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlantKind {
    ReservoirAndPumpedStorage,
    RunOfRiver,
}

impl PlantKind {
    pub fn head_m(&self) -> f64 {
        match self {
            PlantKind::ReservoirAndPumpedStorage => 50.0,
            PlantKind::RunOfRiver => 10.0,
        }
    }

    pub fn carrier(&self) -> Carrier {
        match self {
            PlantKind::ReservoirAndPumpedStorage => Carrier::HydroReservoir,
            PlantKind::RunOfRiver => Carrier::HydroRunOfRiver,
        }
    }

    pub fn from_carrier(carrier: Carrier) -> Option<Self> {
        match carrier {
            Carrier::HydroReservoir => Some(PlantKind::ReservoirAndPumpedStorage),
            Carrier::HydroRunOfRiver => Some(PlantKind::RunOfRiver),
            _ => None,
        }
    }
}

fn spacing(coords: &[f64], axis: &str) -> ConversionResult<f64> {
    match coords {
        [a, b, ..] => Ok((b - a).abs()),
        _ => Err(GridError::invalid_metadata(format!("cannot infer {axis} spacing from {} coordinate(s)", coords.len())).into()),
    }
}

/// Area (m2) of a grid cell centred on `lat` with the given spacings in degrees.
pub fn cell_area(lat: f64, dlat: f64, dlon: f64) -> f64 {
    let south = (lat - dlat / 2.0).max(-90.0).to_radians();
    let north = (lat + dlat / 2.0).min(90.0).to_radians();
    EARTH_RADIUS_M * EARTH_RADIUS_M * dlon.to_radians() * (north.sin() - south.sin()).abs()
}

/// Area (m2) of the cells of each grid row.
pub fn row_areas(grid: &ClimateGrid) -> ConversionResult<Vec<f64>> {
    let dlat = spacing(grid.lats(), "latitude")?;
    let dlon = spacing(grid.lons(), "longitude")?;
    Ok(grid.lats().iter().map(|&lat| cell_area(lat, dlat, dlon)).collect())
}

/// Multiply each mask weight by the area of its cell in `grid`.
fn area_weighted(mask: &CountryMask, grid: &ClimateGrid) -> ConversionResult<CountryMask> {
    let alignment = mask.align(grid)?;
    let areas = row_areas(grid)?;
    let nx = mask.lons().len();
    let weights = mask
        .weights()
        .iter()
        .enumerate()
        .map(|(k, w)| w * areas[alignment.rows[k / nx]])
        .collect();
    Ok(CountryMask::new(
        mask.country.clone(),
        mask.lats().to_vec(),
        mask.lons().to_vec(),
        weights,
    )?)
}

/// Water mass (kg) flowing into the basins of `mask` per step.
pub fn runoff_mass(runoff: &ClimateGrid, mask: &CountryMask, units: RunoffUnits) -> ConversionResult<TimeSeries> {
    let mut mass = weighted_sum(runoff, &area_weighted(mask, runoff)?)?;
    mass.scale(units.mass_factor());
    mass.units = "kg".to_string();
    Ok(mass)
}

/// Potential energy (GWh) of `mass` falling through the plant head.
pub fn inflow_energy(mass: &TimeSeries, kind: PlantKind) -> ConversionResult<TimeSeries> {
    let factor = GRAVITY * kind.head_m() / JOULES_PER_GWH;
    let values = mass.values().iter().map(|m| m * factor).collect();
    Ok(TimeSeries::new(
        kind.carrier().series_name(),
        kind.carrier().units(),
        mass.timestamps().to_vec(),
        values,
    )?)
}

/// Hydropower inflow of one plant type.
pub fn hydro_inflow(
    runoff: &ClimateGrid,
    mask: &CountryMask,
    units: RunoffUnits,
    kind: PlantKind,
) -> ConversionResult<TimeSeries> {
    if mask.total_weight() <= 0.0 {
        return Err(ConversionError::Grid(GridError::ZeroWeight(mask.country.clone())));
    }
    let mass = runoff_mass(runoff, mask, units)?;
    debug!(country = %mask.country, plant = ?kind, total_kg = mass.sum(), "Runoff mass");
    inflow_energy(&mass, kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::{assert_approx_eq, constant_grid, uniform_mask};

    #[test]
    fn test_whole_sphere_area() {
        // one band covering the globe
        let area = cell_area(0.0, 180.0, 360.0);
        assert_approx_eq!(area, 4.0 * std::f64::consts::PI * EARTH_RADIUS_M * EARTH_RADIUS_M, 1e3);
    }

    #[test]
    fn test_cells_shrink_towards_the_pole() {
        assert!(cell_area(60.0, 0.25, 0.25) < cell_area(45.0, 0.25, 0.25));
        assert!(cell_area(45.0, 0.25, 0.25) > 0.0);
    }

    #[test]
    fn test_inflow_from_reanalysis_runoff() {
        // 1 mm per hour everywhere
        let runoff = constant_grid("ro", "m", 2015, 3, 2, 2, 0.001);
        let mask = uniform_mask("TestCountry", 2, 2, 0.5);
        let series = hydro_inflow(&runoff, &mask, RunoffUnits::MetresPerStep, PlantKind::RunOfRiver).unwrap();

        let areas = row_areas(&runoff).unwrap();
        let mass = 0.001 * 1000.0 * 0.5 * 2.0 * (areas[0] + areas[1]);
        let expected = mass * 9.81 * 10.0 / 3.6e12;
        assert_eq!(series.len(), 3);
        assert_eq!(series.name, "hydropower__inflow_time_series__run_of_river");
        assert_eq!(series.units, "GWh");
        assert_approx_eq!(series.values()[0], expected, expected * 1e-5);
    }

    #[test]
    fn test_projection_flux_and_head() {
        let runoff = constant_grid("mrro", "kg m-2 s-1", 2015, 1, 2, 2, 1e-5);
        let mask = uniform_mask("TestCountry", 2, 2, 1.0);
        let reservoir = hydro_inflow(&runoff, &mask, RunoffUnits::MassFlux, PlantKind::ReservoirAndPumpedStorage).unwrap();
        let river = hydro_inflow(&runoff, &mask, RunoffUnits::MassFlux, PlantKind::RunOfRiver).unwrap();
        assert_approx_eq!(reservoir.values()[0] / river.values()[0], 5.0, 1e-9);
    }

    #[test]
    fn test_single_cell_grid_has_no_spacing() {
        let runoff = constant_grid("ro", "m", 2015, 1, 1, 1, 0.001);
        let mask = uniform_mask("TestCountry", 1, 1, 1.0);
        assert!(hydro_inflow(&runoff, &mask, RunoffUnits::MetresPerStep, PlantKind::RunOfRiver).is_err());
    }
}
