//! NetCDF files on local disk, read and written with the native netcdf library.
//!
//! Packed variables are unpacked with `scale_factor`/`add_offset`, and
//! `_FillValue`/`missing_value` cells become NaN. Rotated-pole files keep
//! their 1-D `rlat`/`rlon` axes and the pole from the `grid_mapping`
//! variable; 2-D auxiliary `lat`/`lon` fields are ignored.

use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::cf_time::TimeAxis;
use crate::error::{GridError, GridResult};
use crate::grid::ClimateGrid;
use crate::rotated::RotatedPole;
use crate::store::GridStore;

const TIME_NAMES: [&str; 2] = ["time", "valid_time"];
const LAT_NAMES: [&str; 4] = ["latitude", "lat", "rlat", "y"];
const LON_NAMES: [&str; 4] = ["longitude", "lon", "rlon", "x"];
const ROTATED_POLE: &str = "rotated_pole";

/// Grid store backed by NetCDF files.
#[derive(Debug, Clone, Copy, Default)]
pub struct NetcdfStore;

impl NetcdfStore {
    pub fn new() -> Self {
        Self
    }
}

impl GridStore for NetcdfStore {
    fn read(&self, path: &Path) -> GridResult<ClimateGrid> {
        let file = netcdf::open(path)
            .map_err(|e| GridError::open_failed(format!("{}: {}", path.display(), e)))?;

        let var = file
            .variables()
            .find(|v| is_data_variable(v))
            .ok_or_else(|| GridError::invalid_metadata("no (time, lat, lon) variable found"))?;
        let dims: Vec<String> = var.dimensions().iter().map(|d| d.name()).collect();

        // coordinates are the 1-D variables named after the data dimensions
        let time_var = find_variable(&file, &[dims[0].as_str()])?;
        let lat_var = find_variable(&file, &[dims[1].as_str()])?;
        let lon_var = find_variable(&file, &[dims[2].as_str()])?;

        let lats: Vec<f64> = lat_var
            .get_values(..)
            .map_err(|e| GridError::read_failed(format!("{}: {}", dims[1], e)))?;
        let lons: Vec<f64> = lon_var
            .get_values(..)
            .map_err(|e| GridError::read_failed(format!("{}: {}", dims[2], e)))?;
        let rotated_pole = read_rotated_pole(&file, &var)?;

        let time_units = get_string_attr(&time_var, "units")
            .ok_or_else(|| GridError::invalid_metadata("time coordinate has no units"))?;
        let axis = TimeAxis::parse(&time_units)?;
        let offsets: Vec<f64> = time_var
            .get_values(..)
            .map_err(|e| GridError::read_failed(format!("time: {}", e)))?;
        let times: Vec<DateTime<Utc>> = offsets.iter().map(|&o| axis.decode(o)).collect();

        let raw: Vec<f32> = var
            .get_values(..)
            .map_err(|e| GridError::read_failed(format!("{}: {}", var.name(), e)))?;

        let scale_factor = get_f32_attr(&var, "scale_factor").unwrap_or(1.0);
        let add_offset = get_f32_attr(&var, "add_offset").unwrap_or(0.0);
        let fill_value = get_f32_attr(&var, "_FillValue");
        let missing_value = get_f32_attr(&var, "missing_value");

        let data: Vec<f32> = raw
            .iter()
            .map(|&val| {
                if Some(val) == fill_value || Some(val) == missing_value {
                    f32::NAN
                } else {
                    val * scale_factor + add_offset
                }
            })
            .collect();

        let units = get_string_attr(&var, "units").unwrap_or_default();
        debug!(
            path = %path.display(),
            variable = %var.name(),
            nt = times.len(),
            ny = lats.len(),
            nx = lons.len(),
            rotated = rotated_pole.is_some(),
            "Read NetCDF grid"
        );

        let grid = ClimateGrid::new(var.name(), units, times, lats, lons, data)?;
        Ok(match rotated_pole {
            Some(pole) => grid.with_rotated_pole(pole),
            None => grid,
        })
    }

    fn write(&self, path: &Path, grid: &ClimateGrid) -> GridResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let partial = path.with_extension("nc.partial");
        let write_err = |e: netcdf::Error| GridError::WriteFailed(format!("{}: {}", path.display(), e));

        {
            let (lat_name, lon_name) = match grid.rotated_pole() {
                Some(_) => ("rlat", "rlon"),
                None => ("latitude", "longitude"),
            };
            let mut file = netcdf::create(&partial).map_err(write_err)?;
            file.add_dimension("time", grid.nt()).map_err(write_err)?;
            file.add_dimension(lat_name, grid.ny()).map_err(write_err)?;
            file.add_dimension(lon_name, grid.nx()).map_err(write_err)?;

            let reference = grid.times().first().copied().unwrap_or_default();
            let axis = TimeAxis {
                seconds_per_unit: 3600.0,
                reference,
            };
            let offsets: Vec<f64> = grid.times().iter().map(|t| axis.encode(t)).collect();

            let mut time_var = file.add_variable::<f64>("time", &["time"]).map_err(write_err)?;
            time_var.put_attribute("units", axis.units()).map_err(write_err)?;
            time_var.put_values(&offsets, ..).map_err(write_err)?;

            let mut lat_var = file.add_variable::<f64>(lat_name, &[lat_name]).map_err(write_err)?;
            lat_var.put_attribute("units", "degrees_north").map_err(write_err)?;
            lat_var.put_values(grid.lats(), ..).map_err(write_err)?;

            let mut lon_var = file.add_variable::<f64>(lon_name, &[lon_name]).map_err(write_err)?;
            lon_var.put_attribute("units", "degrees_east").map_err(write_err)?;
            lon_var.put_values(grid.lons(), ..).map_err(write_err)?;

            if let Some(pole) = grid.rotated_pole() {
                let mut mapping = file.add_variable::<i32>(ROTATED_POLE, &[]).map_err(write_err)?;
                mapping
                    .put_attribute("grid_mapping_name", "rotated_latitude_longitude")
                    .map_err(write_err)?;
                mapping
                    .put_attribute("grid_north_pole_latitude", pole.north_pole_latitude)
                    .map_err(write_err)?;
                mapping
                    .put_attribute("grid_north_pole_longitude", pole.north_pole_longitude)
                    .map_err(write_err)?;
            }

            let mut var = file
                .add_variable::<f32>(&grid.name, &["time", lat_name, lon_name])
                .map_err(write_err)?;
            var.put_attribute("units", grid.units.as_str()).map_err(write_err)?;
            if grid.rotated_pole().is_some() {
                var.put_attribute("grid_mapping", ROTATED_POLE).map_err(write_err)?;
            }
            var.put_values(grid.data(), ..).map_err(write_err)?;
        }

        std::fs::rename(&partial, path)?;
        debug!(path = %path.display(), variable = %grid.name, "Wrote NetCDF grid");
        Ok(())
    }
}

fn find_variable<'f>(file: &'f netcdf::File, names: &[&str]) -> GridResult<netcdf::Variable<'f>> {
    names
        .iter()
        .find_map(|name| file.variable(name))
        .ok_or_else(|| GridError::invalid_metadata(format!("missing coordinate, tried {:?}", names)))
}

fn is_data_variable(var: &netcdf::Variable) -> bool {
    let dims: Vec<String> = var.dimensions().iter().map(|d| d.name()).collect();
    dims.len() == 3
        && TIME_NAMES.contains(&dims[0].as_str())
        && LAT_NAMES.contains(&dims[1].as_str())
        && LON_NAMES.contains(&dims[2].as_str())
}

/// Pole of a rotated-pole grid, from the variable named by the data
/// variable's `grid_mapping` attribute (or `rotated_pole`).
fn read_rotated_pole(file: &netcdf::File, data: &netcdf::Variable) -> GridResult<Option<RotatedPole>> {
    let name = get_string_attr(data, "grid_mapping").unwrap_or_else(|| ROTATED_POLE.to_string());
    let Some(mapping) = file.variable(&name) else {
        return Ok(None);
    };
    if get_string_attr(&mapping, "grid_mapping_name").as_deref() != Some("rotated_latitude_longitude") {
        return Ok(None);
    }
    match (
        get_f64_attr(&mapping, "grid_north_pole_latitude"),
        get_f64_attr(&mapping, "grid_north_pole_longitude"),
    ) {
        (Some(lat), Some(lon)) => Ok(Some(RotatedPole::new(lat, lon))),
        _ => Err(GridError::invalid_metadata(format!("{name} has no grid north pole"))),
    }
}

/// Check if a variable has an attribute with the given name.
/// This avoids HDF5 error spam when checking for optional attributes.
fn has_attr(var: &netcdf::Variable, name: &str) -> bool {
    var.attributes().any(|attr| attr.name() == name)
}

fn get_f32_attr(var: &netcdf::Variable, name: &str) -> Option<f32> {
    if !has_attr(var, name) {
        return None;
    }
    let attr_value = var.attribute_value(name)?.ok()?;
    f32::try_from(attr_value).ok()
}

fn get_f64_attr(var: &netcdf::Variable, name: &str) -> Option<f64> {
    if !has_attr(var, name) {
        return None;
    }
    let attr_value = var.attribute_value(name)?.ok()?;
    f64::try_from(attr_value).ok()
}

fn get_string_attr(var: &netcdf::Variable, name: &str) -> Option<String> {
    if !has_attr(var, name) {
        return None;
    }
    match var.attribute_value(name)?.ok()? {
        netcdf::AttributeValue::Str(s) => Some(s),
        _ => None,
    }
}
