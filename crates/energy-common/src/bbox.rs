//! Geographic bounding boxes used to clip grids and to request archive areas.

use serde::{Deserialize, Serialize};

use crate::error::{EnergyError, EnergyResult};

/// A geographic bounding box in WGS84 degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    /// Create a new bounding box from corner coordinates.
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Self {
        Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        }
    }

    /// The European domain requested from the reanalysis archive.
    pub fn europe() -> Self {
        Self::new(-22.0, 27.0, 45.0, 72.0)
    }

    /// Parse a "min_lon,min_lat,max_lon,max_lat" string.
    pub fn parse(s: &str) -> EnergyResult<Self> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(EnergyError::invalid("bounding box", s));
        }

        let mut values = [0.0f64; 4];
        for (slot, part) in values.iter_mut().zip(&parts) {
            *slot = part
                .parse()
                .map_err(|_| EnergyError::invalid("bounding box", s))?;
        }

        let bbox = Self::new(values[0], values[1], values[2], values[3]);
        if !bbox.is_valid() {
            return Err(EnergyError::invalid("bounding box", s));
        }
        Ok(bbox)
    }

    /// Area in the archive's `[north, west, south, east]` order.
    pub fn to_archive_area(&self) -> [f64; 4] {
        [self.max_lat, self.min_lon, self.min_lat, self.max_lon]
    }

    pub fn width(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    pub fn height(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    /// Check if a point is contained within this bounding box (edges inclusive).
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        lon >= self.min_lon && lon <= self.max_lon && lat >= self.min_lat && lat <= self.max_lat
    }

    /// Check if this bbox intersects another.
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        !(self.max_lon < other.min_lon
            || self.min_lon > other.max_lon
            || self.max_lat < other.min_lat
            || self.min_lat > other.max_lat)
    }

    /// Expand the bounding box by a buffer (degrees) on every side.
    pub fn expand(&self, buffer: f64) -> Self {
        Self {
            min_lon: self.min_lon - buffer,
            min_lat: self.min_lat - buffer,
            max_lon: self.max_lon + buffer,
            max_lat: self.max_lat + buffer,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.min_lon <= self.max_lon
            && self.min_lat <= self.max_lat
            && self.min_lat >= -90.0
            && self.max_lat <= 90.0
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::europe()
    }
}
