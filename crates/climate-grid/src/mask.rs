//! Country masks: per-cell weights used to reduce a grid to a country value.

use std::fs::File;
use std::path::Path;

use energy_common::BoundingBox;
use serde::Deserialize;
use tracing::debug;

use crate::error::{GridError, GridResult};
use crate::grid::{ClimateGrid, COORD_TOLERANCE};

#[derive(Debug, Deserialize)]
struct MaskRow {
    lat: f64,
    lon: f64,
    weight: f64,
}

/// Weights of the cells belonging to one country.
///
/// Weights are capacity shares, population densities or basin fractions
/// depending on the carrier being aggregated.
#[derive(Debug, Clone, PartialEq)]
pub struct CountryMask {
    pub country: String,
    lats: Vec<f64>,
    lons: Vec<f64>,
    weights: Vec<f64>,
}

/// Position of each mask row and column in a grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskAlignment {
    pub rows: Vec<usize>,
    pub cols: Vec<usize>,
}

impl CountryMask {
    pub fn new(
        country: impl Into<String>,
        lats: Vec<f64>,
        lons: Vec<f64>,
        weights: Vec<f64>,
    ) -> GridResult<Self> {
        let expected = lats.len() * lons.len();
        if weights.len() != expected {
            return Err(GridError::Shape {
                expected,
                actual: weights.len(),
            });
        }
        Ok(Self {
            country: country.into(),
            lats,
            lons,
            weights,
        })
    }

    /// A mask giving every cell of the given coordinates weight one.
    pub fn uniform(country: impl Into<String>, lats: Vec<f64>, lons: Vec<f64>) -> Self {
        let weights = vec![1.0; lats.len() * lons.len()];
        Self {
            country: country.into(),
            lats,
            lons,
            weights,
        }
    }

    /// Load a mask from `lat,lon,weight` rows.
    ///
    /// Cells missing from the file get weight zero.
    pub fn load_csv(path: &Path, country: impl Into<String>) -> GridResult<Self> {
        let country = country.into();
        let mut reader = csv::Reader::from_reader(File::open(path)?);
        let rows = reader
            .deserialize::<MaskRow>()
            .collect::<Result<Vec<_>, _>>()?;

        if rows.is_empty() {
            return Err(GridError::EmptySelection(format!(
                "mask file {} has no rows",
                path.display()
            )));
        }

        let mut lats = unique_sorted(rows.iter().map(|r| r.lat));
        lats.reverse();
        let lons = unique_sorted(rows.iter().map(|r| r.lon));

        let mut weights = vec![0.0; lats.len() * lons.len()];
        for row in &rows {
            let j = position(&lats, row.lat).ok_or_else(|| GridError::read_failed("mask latitude"))?;
            let i = position(&lons, row.lon).ok_or_else(|| GridError::read_failed("mask longitude"))?;
            weights[j * lons.len() + i] += row.weight;
        }

        debug!(
            country = %country,
            path = %path.display(),
            rows = lats.len(),
            cols = lons.len(),
            "Loaded country mask"
        );

        Self::new(country, lats, lons, weights)
    }

    pub fn lats(&self) -> &[f64] {
        &self.lats
    }

    pub fn lons(&self) -> &[f64] {
        &self.lons
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn weight(&self, j: usize, i: usize) -> f64 {
        self.weights[j * self.lons.len() + i]
    }

    pub fn total_weight(&self) -> f64 {
        self.weights.iter().filter(|w| w.is_finite()).sum()
    }

    /// Extent of the mask's cell centres.
    pub fn bbox(&self) -> BoundingBox {
        let fold = |values: &[f64]| {
            values
                .iter()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
        };
        let (min_lat, max_lat) = fold(&self.lats);
        let (min_lon, max_lon) = fold(&self.lons);
        BoundingBox::new(min_lon, min_lat, max_lon, max_lat)
    }

    /// Same cells with every weight forced to one.
    pub fn with_unit_weights(&self) -> Self {
        Self::uniform(self.country.clone(), self.lats.clone(), self.lons.clone())
    }

    /// Locate the mask's cells in `grid`.
    ///
    /// Every mask coordinate must match a grid coordinate within
    /// [`COORD_TOLERANCE`] degrees.
    pub fn align(&self, grid: &ClimateGrid) -> GridResult<MaskAlignment> {
        let rows = self
            .lats
            .iter()
            .map(|&lat| {
                position(grid.lats(), lat).ok_or_else(|| {
                    GridError::mask_alignment(&self.country, format!("latitude {lat} is not on the grid"))
                })
            })
            .collect::<GridResult<Vec<_>>>()?;

        let cols = self
            .lons
            .iter()
            .map(|&lon| {
                position(grid.lons(), lon).ok_or_else(|| {
                    GridError::mask_alignment(&self.country, format!("longitude {lon} is not on the grid"))
                })
            })
            .collect::<GridResult<Vec<_>>>()?;

        Ok(MaskAlignment { rows, cols })
    }
}

fn position(coords: &[f64], value: f64) -> Option<usize> {
    coords.iter().position(|c| (c - value).abs() < COORD_TOLERANCE)
}

fn unique_sorted(values: impl Iterator<Item = f64>) -> Vec<f64> {
    let mut out: Vec<f64> = values.collect();
    out.sort_by(f64::total_cmp);
    out.dedup_by(|a, b| (*a - *b).abs() < COORD_TOLERANCE);
    out
}
