//! Solar PV capacity factors from irradiance and air temperature.

use climate_grid::ClimateGrid;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::correction::LinearCorrection;
use crate::error::ConversionResult;

/// Capacity factors below this are left untouched by the linear correction.
pub const CORRECTION_FLOOR: f64 = 1e-4;

const ZERO_CELSIUS: f64 = 273.15;

/// Huld et al. (2010) crystalline-silicon module model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HuldModel {
    pub k: [f64; 6],
    /// Weight of ambient temperature in the module temperature.
    pub c_amb: f64,
    /// Heating of the module per W m-2 of irradiance.
    pub c_irr: f64,
    pub reference_temperature: f64,
    pub reference_irradiance: f64,
    pub inverter_efficiency: f64,
}

impl Default for HuldModel {
    fn default() -> Self {
        Self {
            k: [-0.017162, -0.040289, -0.004681, 0.000148, 0.000169, 0.000005],
            c_amb: 1.0,
            c_irr: 0.035,
            reference_temperature: 25.0,
            reference_irradiance: 1000.0,
            inverter_efficiency: 0.9,
        }
    }
}

impl HuldModel {
    /// Output per unit of installed capacity for irradiance `g` (W m-2) and
    /// ambient temperature `t_kelvin`.
    pub fn capacity_factor(&self, g: f64, t_kelvin: f64) -> f64 {
        if g.is_nan() || t_kelvin.is_nan() {
            return f64::NAN;
        }
        if g <= 0.0 {
            return 0.0;
        }

        let module_temperature = self.c_amb * (t_kelvin - ZERO_CELSIUS) + self.c_irr * g;
        let g_rel = g / self.reference_irradiance;
        let t_rel = module_temperature - self.reference_temperature;
        let ln_g = g_rel.ln();
        let [k1, k2, k3, k4, k5, k6] = self.k;

        let efficiency = 1.0
            + k1 * ln_g
            + k2 * ln_g * ln_g
            + t_rel * (k3 + k4 * ln_g + k5 * ln_g * ln_g)
            + k6 * t_rel * t_rel;

        (g_rel * efficiency * self.inverter_efficiency).max(0.0)
    }
}

/// Panel configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolarPanel {
    #[serde(default)]
    pub model: HuldModel,
    /// Ratio of plane-of-array to horizontal irradiance for tilted panels.
    #[serde(default = "default_tilt_gain")]
    pub tilt_gain: f64,
}

fn default_tilt_gain() -> f64 {
    1.0
}

impl Default for SolarPanel {
    fn default() -> Self {
        Self {
            model: HuldModel::default(),
            tilt_gain: default_tilt_gain(),
        }
    }
}

/// Apply `alpha * cf + beta` where the panel produces, then clamp at zero.
pub fn correct_capacity_factor(cf: f64, correction: LinearCorrection) -> f64 {
    if cf >= CORRECTION_FLOOR {
        correction.apply(cf).max(0.0)
    } else {
        cf
    }
}

/// Solar capacity factor per cell.
///
/// `irradiance` is surface downward radiation in W m-2 (already converted
/// from accumulations and centred on the step), `temperature` is 2 m air
/// temperature in K on the same grid.
pub fn convert_solar(
    irradiance: &ClimateGrid,
    temperature: &ClimateGrid,
    panel: &SolarPanel,
    correction: LinearCorrection,
) -> ConversionResult<ClimateGrid> {
    let gain = panel.tilt_gain;
    debug!(tilt_gain = gain, alpha = correction.alpha, beta = correction.beta, "Converting irradiance");

    let cf = irradiance.zip_map(temperature, |g, t| {
        let cf = panel.model.capacity_factor(g as f64 * gain, t as f64);
        correct_capacity_factor(cf, correction) as f32
    })?;
    Ok(cf.renamed("capacity_factor", "kW/kW"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::{assert_approx_eq, constant_grid};

    #[test]
    fn test_standard_conditions_give_inverter_efficiency() {
        // 1000 W m-2 with the module at exactly 25 C
        let model = HuldModel::default();
        let ambient = 25.0 - 0.035 * 1000.0 + ZERO_CELSIUS;
        assert_approx_eq!(model.capacity_factor(1000.0, ambient), 0.9, 1e-12);
    }

    #[test]
    fn test_no_light_no_power() {
        let model = HuldModel::default();
        assert_eq!(model.capacity_factor(0.0, 290.0), 0.0);
        assert_eq!(model.capacity_factor(-5.0, 290.0), 0.0);
        assert!(model.capacity_factor(f64::NAN, 290.0).is_nan());
    }

    #[test]
    fn test_heat_lowers_output() {
        let model = HuldModel::default();
        assert!(model.capacity_factor(800.0, 310.0) < model.capacity_factor(800.0, 280.0));
    }

    #[test]
    fn test_correction_skips_night_and_clamps() {
        let correction = LinearCorrection::new(1.0, -0.2);
        assert_eq!(correct_capacity_factor(0.0, correction), 0.0);
        assert_eq!(correct_capacity_factor(5e-5, correction), 5e-5);
        assert_eq!(correct_capacity_factor(0.1, correction), 0.0);
        assert_approx_eq!(correct_capacity_factor(0.5, correction), 0.3, 1e-12);
    }

    #[test]
    fn test_convert_solar_grid() {
        let g = constant_grid("ssrd", "W m**-2", 2015, 3, 2, 2, 500.0);
        let t = constant_grid("t2m", "K", 2015, 3, 2, 2, 288.15);
        let panel = SolarPanel::default();
        let cf = convert_solar(&g, &t, &panel, LinearCorrection::IDENTITY).unwrap();
        let expected = panel.model.capacity_factor(500.0, 288.15);
        assert!(expected > 0.3 && expected < 0.5);
        assert!(cf.data().iter().all(|&v| (v as f64 - expected).abs() < 1e-5));
        assert_eq!(cf.units, "kW/kW");
    }
}
