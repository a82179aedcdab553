//! Wind power: hub-height extrapolation and turbine power curves.

use std::path::Path;

use climate_grid::ClimateGrid;
use serde::Deserialize;
use tracing::debug;

use crate::correction::LinearCorrection;
use crate::error::{ConversionError, ConversionResult};

/// Roughness length (m) used where the roughness field is missing or not positive.
pub const DEFAULT_ROUGHNESS: f64 = 0.0002;

/// Exponent of the power law used when no roughness field is available.
pub const POWER_LAW_EXPONENT: f64 = 1.0 / 7.0;

/// Turbine definition as stored in `config/turbines/*.yaml`.
#[derive(Debug, Clone, Deserialize)]
pub struct WindTurbine {
    pub name: String,
    #[serde(default)]
    pub manufacturer: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    /// Hub height in metres.
    pub hub_height: f64,
    /// Wind speeds (m/s) of the power curve.
    #[serde(rename = "V")]
    pub speeds: Vec<f64>,
    /// Power output (kW or MW) at each speed.
    #[serde(rename = "P")]
    pub power: Vec<f64>,
}

impl WindTurbine {
    pub fn from_yaml_str(yaml: &str) -> ConversionResult<Self> {
        let turbine: WindTurbine = serde_yaml::from_str(yaml)?;
        if !(turbine.hub_height > 0.0) {
            return Err(ConversionError::InvalidPowerCurve(format!(
                "{}: hub height must be positive",
                turbine.name
            )));
        }
        turbine.power_curve()?;
        Ok(turbine)
    }

    pub fn load(path: &Path) -> ConversionResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let turbine = Self::from_yaml_str(&text)?;
        debug!(path = %path.display(), turbine = %turbine.name, hub_height = turbine.hub_height, "Loaded turbine");
        Ok(turbine)
    }

    pub fn power_curve(&self) -> ConversionResult<PowerCurve> {
        PowerCurve::new(self.speeds.clone(), self.power.clone())
    }
}

/// A power curve normalised to rated power.
#[derive(Debug, Clone, PartialEq)]
pub struct PowerCurve {
    speeds: Vec<f64>,
    factors: Vec<f64>,
}

impl PowerCurve {
    /// Speeds must be finite and strictly increasing, power non-negative with
    /// a positive maximum.
    pub fn new(speeds: Vec<f64>, power: Vec<f64>) -> ConversionResult<Self> {
        if speeds.len() != power.len() || speeds.len() < 2 {
            return Err(ConversionError::InvalidPowerCurve(format!(
                "need at least two matching points, got {} speeds and {} powers",
                speeds.len(),
                power.len()
            )));
        }
        if speeds.iter().any(|v| !v.is_finite()) || speeds.windows(2).any(|w| w[0] >= w[1]) {
            return Err(ConversionError::InvalidPowerCurve(
                "speeds must be finite and strictly increasing".to_string(),
            ));
        }
        if power.iter().any(|p| !p.is_finite() || *p < 0.0) {
            return Err(ConversionError::InvalidPowerCurve(
                "power must be finite and non-negative".to_string(),
            ));
        }

        let rated = power.iter().copied().fold(0.0, f64::max);
        if rated <= 0.0 {
            return Err(ConversionError::InvalidPowerCurve("rated power is zero".to_string()));
        }

        Ok(Self {
            speeds,
            factors: power.iter().map(|p| p / rated).collect(),
        })
    }

    /// Capacity factor at `speed`, linearly interpolated and clamped to the
    /// end points of the curve. NaN stays NaN.
    pub fn capacity_factor(&self, speed: f64) -> f64 {
        if speed.is_nan() {
            return f64::NAN;
        }
        let last = self.speeds.len() - 1;
        if speed <= self.speeds[0] {
            return self.factors[0];
        }
        if speed >= self.speeds[last] {
            return self.factors[last];
        }

        // first point strictly above `speed`; 1..=last by the checks above
        let upper = self.speeds.partition_point(|&v| v <= speed);
        let lower = upper - 1;
        let frac = (speed - self.speeds[lower]) / (self.speeds[upper] - self.speeds[lower]);
        self.factors[lower] + frac * (self.factors[upper] - self.factors[lower])
    }
}

/// Logarithmic wind profile: `v * ln(to / z0) / ln(from / z0)`.
pub fn log_law(speed: f64, from_height: f64, to_height: f64, roughness: f64) -> f64 {
    let z0 = if roughness.is_finite() && roughness > 0.0 {
        roughness
    } else {
        DEFAULT_ROUGHNESS
    };
    speed * (to_height / z0).ln() / (from_height / z0).ln()
}

/// Power-law wind profile with exponent 1/7.
pub fn power_law(speed: f64, from_height: f64, to_height: f64) -> f64 {
    speed * (to_height / from_height).powf(POWER_LAW_EXPONENT)
}

/// Horizontal wind speed from its eastward and northward components.
pub fn wind_speed_from_components(u: &ClimateGrid, v: &ClimateGrid) -> ConversionResult<ClimateGrid> {
    let speed = u.zip_map(v, |a, b| (a * a + b * b).sqrt())?;
    Ok(speed.renamed("wind_speed", "m s**-1"))
}

/// Bring wind speed from `from_height` to `to_height`.
///
/// Uses the log law when a roughness field is given (a single time step is
/// applied to every step), the power law otherwise.
pub fn extrapolate_to_height(
    speed: &ClimateGrid,
    from_height: f64,
    to_height: f64,
    roughness: Option<&ClimateGrid>,
) -> ConversionResult<ClimateGrid> {
    if (from_height - to_height).abs() < f64::EPSILON {
        return Ok(speed.clone());
    }
    let grid = match roughness {
        Some(z0) => speed.zip_map(z0, |v, z| log_law(v as f64, from_height, to_height, z as f64) as f32)?,
        None => speed.map(|v| power_law(v as f64, from_height, to_height) as f32),
    };
    Ok(grid)
}

/// Wind capacity factor per cell.
///
/// The speed correction is applied at data height, before extrapolating to
/// the turbine hub.
pub fn convert_wind(
    speed: &ClimateGrid,
    data_height: f64,
    roughness: Option<&ClimateGrid>,
    turbine: &WindTurbine,
    correction: LinearCorrection,
) -> ConversionResult<ClimateGrid> {
    let curve = turbine.power_curve()?;
    let corrected = if correction.is_identity() {
        speed.clone()
    } else {
        speed.map(|v| correction.apply(v as f64).max(0.0) as f32)
    };
    let at_hub = extrapolate_to_height(&corrected, data_height, turbine.hub_height, roughness)?;
    debug!(
        turbine = %turbine.name,
        data_height,
        hub_height = turbine.hub_height,
        alpha = correction.alpha,
        beta = correction.beta,
        "Converting wind speed"
    );
    Ok(at_hub
        .map(|v| curve.capacity_factor(v as f64) as f32)
        .renamed("capacity_factor", "kW/kW"))
}
