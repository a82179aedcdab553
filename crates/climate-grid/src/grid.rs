//! The gridded climate variable type.

use chrono::{DateTime, Datelike, Utc};
use energy_common::BoundingBox;

use crate::error::{GridError, GridResult};
use crate::rotated::RotatedPole;

/// Coordinates closer than this (degrees) are treated as the same cell centre.
pub const COORD_TOLERANCE: f64 = 1e-5;

/// A climate variable on a regular latitude/longitude grid.
///
/// Values are stored row-major as `[time][lat][lon]`. Grids are never mutated
/// in place; every transformation returns a new grid. With a rotated pole the
/// axes hold rotated latitude and longitude.
#[derive(Debug, Clone, PartialEq)]
pub struct ClimateGrid {
    pub name: String,
    pub units: String,
    times: Vec<DateTime<Utc>>,
    lats: Vec<f64>,
    lons: Vec<f64>,
    data: Vec<f32>,
    rotated_pole: Option<RotatedPole>,
}

impl ClimateGrid {
    pub fn new(
        name: impl Into<String>,
        units: impl Into<String>,
        times: Vec<DateTime<Utc>>,
        lats: Vec<f64>,
        lons: Vec<f64>,
        data: Vec<f32>,
    ) -> GridResult<Self> {
        let expected = times.len() * lats.len() * lons.len();
        if data.len() != expected {
            return Err(GridError::Shape {
                expected,
                actual: data.len(),
            });
        }
        if times.windows(2).any(|w| w[0] >= w[1]) {
            return Err(GridError::invalid_metadata("time axis is not strictly increasing"));
        }

        Ok(Self {
            name: name.into(),
            units: units.into(),
            times,
            lats,
            lons,
            data,
            rotated_pole: None,
        })
    }

    /// Interpret the axes as rotated coordinates around `pole`.
    pub fn with_rotated_pole(mut self, pole: RotatedPole) -> Self {
        self.rotated_pole = Some(pole);
        self
    }

    pub fn rotated_pole(&self) -> Option<RotatedPole> {
        self.rotated_pole
    }

    /// A grid with a single time step holding a static per-cell field.
    pub fn static_field(
        name: impl Into<String>,
        units: impl Into<String>,
        lats: Vec<f64>,
        lons: Vec<f64>,
        data: Vec<f32>,
    ) -> GridResult<Self> {
        Self::new(name, units, vec![DateTime::<Utc>::default()], lats, lons, data)
    }

    pub fn times(&self) -> &[DateTime<Utc>] {
        &self.times
    }

    pub fn lats(&self) -> &[f64] {
        &self.lats
    }

    pub fn lons(&self) -> &[f64] {
        &self.lons
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn nt(&self) -> usize {
        self.times.len()
    }

    pub fn ny(&self) -> usize {
        self.lats.len()
    }

    pub fn nx(&self) -> usize {
        self.lons.len()
    }

    /// Number of cells in one time slice.
    pub fn cells(&self) -> usize {
        self.ny() * self.nx()
    }

    #[inline]
    pub fn index(&self, t: usize, j: usize, i: usize) -> usize {
        t * self.cells() + j * self.nx() + i
    }

    pub fn value(&self, t: usize, j: usize, i: usize) -> f32 {
        self.data[self.index(t, j, i)]
    }

    /// The 2-D slice at time step `t`.
    pub fn frame(&self, t: usize) -> &[f32] {
        let n = self.cells();
        &self.data[t * n..(t + 1) * n]
    }

    pub fn frames(&self) -> impl Iterator<Item = &[f32]> + '_ {
        self.data.chunks(self.cells().max(1)).take(self.nt())
    }

    /// Extent of the cell centres, in rotated coordinates for rotated grids.
    pub fn bbox(&self) -> BoundingBox {
        let (min_lat, max_lat) = min_max(&self.lats);
        let (min_lon, max_lon) = min_max(&self.lons);
        BoundingBox::new(min_lon, min_lat, max_lon, max_lat)
    }

    /// Replace name and units, keeping the values.
    pub fn renamed(mut self, name: impl Into<String>, units: impl Into<String>) -> Self {
        self.name = name.into();
        self.units = units.into();
        self
    }

    /// Apply `f` to every value.
    pub fn map<F>(&self, f: F) -> Self
    where
        F: Fn(f32) -> f32,
    {
        Self {
            name: self.name.clone(),
            units: self.units.clone(),
            times: self.times.clone(),
            lats: self.lats.clone(),
            lons: self.lons.clone(),
            data: self.data.iter().map(|&v| f(v)).collect(),
            rotated_pole: self.rotated_pole,
        }
    }

    /// Combine with another grid value by value.
    ///
    /// `other` must share the spatial coordinates. It either has the same time
    /// axis or a single time step, which is then applied to every step.
    pub fn zip_map<F>(&self, other: &ClimateGrid, f: F) -> GridResult<Self>
    where
        F: Fn(f32, f32) -> f32,
    {
        if !self.same_coords(other) {
            return Err(GridError::NotAligned(format!(
                "'{}' ({}x{}) and '{}' ({}x{}) have different coordinates",
                self.name,
                self.ny(),
                self.nx(),
                other.name,
                other.ny(),
                other.nx()
            )));
        }

        let n = self.cells();
        let data = if other.nt() == self.nt() && other.times == self.times {
            self.data
                .iter()
                .zip(&other.data)
                .map(|(&a, &b)| f(a, b))
                .collect()
        } else if other.nt() == 1 {
            self.data
                .iter()
                .enumerate()
                .map(|(k, &a)| f(a, other.data[k % n]))
                .collect()
        } else {
            return Err(GridError::NotAligned(format!(
                "'{}' and '{}' have different time axes",
                self.name, other.name
            )));
        };

        Ok(Self {
            name: self.name.clone(),
            units: self.units.clone(),
            times: self.times.clone(),
            lats: self.lats.clone(),
            lons: self.lons.clone(),
            data,
            rotated_pole: self.rotated_pole,
        })
    }

    /// Whether both grids have the same cell centres.
    pub fn same_coords(&self, other: &ClimateGrid) -> bool {
        self.rotated_pole == other.rotated_pole
            && coords_match(&self.lats, &other.lats) && coords_match(&self.lons, &other.lons)
    }

    /// Keep the time steps for which `keep` returns true.
    pub fn select_times<F>(&self, keep: F) -> GridResult<Self>
    where
        F: Fn(&DateTime<Utc>) -> bool,
    {
        let n = self.cells();
        let mut times = Vec::new();
        let mut data = Vec::new();
        for (t, time) in self.times.iter().enumerate() {
            if keep(time) {
                times.push(*time);
                data.extend_from_slice(&self.data[t * n..(t + 1) * n]);
            }
        }

        if times.is_empty() {
            return Err(GridError::EmptySelection(format!(
                "no time steps of '{}' selected",
                self.name
            )));
        }

        Ok(Self {
            name: self.name.clone(),
            units: self.units.clone(),
            times,
            lats: self.lats.clone(),
            lons: self.lons.clone(),
            data,
            rotated_pole: self.rotated_pole,
        })
    }

    /// Keep the time steps that fall in calendar year `year` (UTC).
    pub fn select_year(&self, year: i32) -> GridResult<Self> {
        self.select_times(|t| t.year() == year)
    }

    /// Cut the grid down to the cells whose centres lie within `bbox`.
    pub fn clip(&self, bbox: &BoundingBox) -> GridResult<Self> {
        if self.rotated_pole.is_some() {
            return Err(GridError::invalid_metadata(format!(
                "'{}' is on a rotated grid and must be regridded before clipping",
                self.name
            )));
        }
        let rows: Vec<usize> = (0..self.ny())
            .filter(|&j| self.lats[j] >= bbox.min_lat && self.lats[j] <= bbox.max_lat)
            .collect();
        let cols: Vec<usize> = (0..self.nx())
            .filter(|&i| self.lons[i] >= bbox.min_lon && self.lons[i] <= bbox.max_lon)
            .collect();

        if rows.is_empty() || cols.is_empty() {
            return Err(GridError::EmptySelection(format!(
                "'{}' has no cells inside {:?}",
                self.name, bbox
            )));
        }

        let mut data = Vec::with_capacity(self.nt() * rows.len() * cols.len());
        for t in 0..self.nt() {
            for &j in &rows {
                for &i in &cols {
                    data.push(self.value(t, j, i));
                }
            }
        }

        Ok(Self {
            name: self.name.clone(),
            units: self.units.clone(),
            times: self.times.clone(),
            lats: rows.iter().map(|&j| self.lats[j]).collect(),
            lons: cols.iter().map(|&i| self.lons[i]).collect(),
            data,
            rotated_pole: None,
        })
    }

    /// Same values on a new time axis of equal length.
    pub fn with_times(&self, times: Vec<DateTime<Utc>>) -> GridResult<Self> {
        if times.len() != self.nt() {
            return Err(GridError::Shape {
                expected: self.nt(),
                actual: times.len(),
            });
        }
        Self::new(
            self.name.clone(),
            self.units.clone(),
            times,
            self.lats.clone(),
            self.lons.clone(),
            self.data.clone(),
        )
        .map(|grid| Self {
            rotated_pole: self.rotated_pole,
            ..grid
        })
    }
}

fn coords_match(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() < COORD_TOLERANCE)
}

fn min_max(values: &[f64]) -> (f64, f64) {
    values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
}
