//! Rotated-pole latitude/longitude grids.
//!
//! Regional projections are usually delivered on a regular grid in a
//! coordinate system whose north pole has been moved, so that the domain sits
//! around the rotated equator. The 1-D `rlat`/`rlon` axes are regular in that
//! system only.

use serde::{Deserialize, Serialize};

/// Position of the rotated north pole in geographic coordinates (degrees).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RotatedPole {
    pub north_pole_latitude: f64,
    pub north_pole_longitude: f64,
}

impl RotatedPole {
    pub fn new(north_pole_latitude: f64, north_pole_longitude: f64) -> Self {
        Self {
            north_pole_latitude,
            north_pole_longitude,
        }
    }

    /// Rotated `(rlat, rlon)` of a geographic point.
    pub fn to_rotated(&self, lat: f64, lon: f64) -> (f64, f64) {
        let (sin_pole, cos_pole) = self.north_pole_latitude.to_radians().sin_cos();
        let (sin_lat, cos_lat) = lat.to_radians().sin_cos();
        let dlon = (lon - self.north_pole_longitude).to_radians();

        let rlat = (sin_lat * sin_pole + cos_lat * cos_pole * dlon.cos()).clamp(-1.0, 1.0).asin();
        let y = -dlon.sin() * cos_lat;
        let x = -sin_pole * cos_lat * dlon.cos() + cos_pole * sin_lat;
        let rlon = y.atan2(if x == 0.0 { 1e-20 } else { x });
        (rlat.to_degrees(), rlon.to_degrees())
    }

    /// Geographic `(lat, lon)` of a rotated point, longitude in (-180, 180].
    pub fn to_geographic(&self, rlat: f64, rlon: f64) -> (f64, f64) {
        let (sin_pole, cos_pole) = self.north_pole_latitude.to_radians().sin_cos();
        let (sin_plon, cos_plon) = self.north_pole_longitude.to_radians().sin_cos();
        let (sin_rlat, cos_rlat) = rlat.to_radians().sin_cos();
        let (sin_rlon, cos_rlon) = rlon.to_radians().sin_cos();

        let lat = (sin_pole * sin_rlat + cos_pole * cos_rlat * cos_rlon).clamp(-1.0, 1.0).asin();
        let meridional = -sin_pole * cos_rlon * cos_rlat + cos_pole * sin_rlat;
        let y = sin_plon * meridional - cos_plon * sin_rlon * cos_rlat;
        let x = cos_plon * meridional + sin_plon * sin_rlon * cos_rlat;
        let lon = y.atan2(if x == 0.0 { 1e-20 } else { x });
        (lat.to_degrees(), lon.to_degrees())
    }
}
