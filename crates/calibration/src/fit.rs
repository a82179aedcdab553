//! Fitting linear correction coefficients against measured capacity factors.
//!
//! The fits only match the mean capacity factor of a calibration year. The
//! caller supplies a closure that reruns the conversion with a candidate
//! correction and returns the mean of the aggregated series.

use energy_conversion::LinearCorrection;
use tracing::{debug, warn};

use crate::error::{CalibrationError, CalibrationResult};

/// Upper bound searched for the wind speed offset (m/s).
pub const WIND_BETA_MAX: f64 = 10.0;
/// Bounds of the solar capacity factor gain.
pub const SOLAR_ALPHA_BOUNDS: (f64, f64) = (0.0, 2.0);

const TOLERANCE: f64 = 1e-4;
const MAX_ITERATIONS: usize = 60;

/// A fitted correction and the remaining difference in mean capacity factor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CorrectionFit {
    pub correction: LinearCorrection,
    /// `simulated_mean - actual_mean` with the fitted correction.
    pub bias: f64,
}

/// Smallest `x` in `[lo, hi]` where the increasing function `f` reaches zero.
///
/// Returns the bound itself when the root lies outside the interval.
fn bisect<F>(mut f: F, lo: f64, hi: f64) -> CalibrationResult<(f64, f64)>
where
    F: FnMut(f64) -> CalibrationResult<f64>,
{
    let (mut lo, mut hi) = (lo, hi);
    let f_lo = f(lo)?;
    if f_lo >= 0.0 {
        return Ok((lo, f_lo));
    }
    let f_hi = f(hi)?;
    if f_hi <= 0.0 {
        warn!(bound = hi, residual = f_hi, "Fit reached its upper bound");
        return Ok((hi, f_hi));
    }

    let (mut x, mut residual) = (hi, f_hi);
    for _ in 0..MAX_ITERATIONS {
        x = 0.5 * (lo + hi);
        residual = f(x)?;
        if residual.abs() < TOLERANCE {
            break;
        }
        if residual < 0.0 {
            lo = x;
        } else {
            hi = x;
        }
    }
    Ok((x, residual))
}

fn check_mean(value: f64, what: &str) -> CalibrationResult<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(CalibrationError::Fit(format!("{what} mean capacity factor is {value}")))
    }
}

/// Wind speed correction.
///
/// The gain follows the ratio of measured to simulated mean capacity factor,
/// `alpha = 0.6 * epsilon + 0.2`; the non-negative offset is then chosen so
/// that the corrected mean matches the measurement.
pub fn fit_wind_correction<F>(actual_mean: f64, mut simulated_mean: F) -> CalibrationResult<CorrectionFit>
where
    F: FnMut(LinearCorrection) -> CalibrationResult<f64>,
{
    let actual_mean = check_mean(actual_mean, "measured")?;
    let uncorrected = check_mean(simulated_mean(LinearCorrection::IDENTITY)?, "simulated")?;
    let epsilon = actual_mean / uncorrected;
    let alpha = 0.6 * epsilon + 0.2;

    let (beta, bias) = bisect(
        |beta| Ok(simulated_mean(LinearCorrection::new(alpha, beta))? - actual_mean),
        0.0,
        WIND_BETA_MAX,
    )?;

    debug!(epsilon, alpha, beta, bias, "Fitted wind correction");
    Ok(CorrectionFit {
        correction: LinearCorrection::new(alpha, beta),
        bias,
    })
}

/// Solar capacity factor correction: a gain within [`SOLAR_ALPHA_BOUNDS`]
/// with no offset, chosen so that the corrected mean matches the measurement.
pub fn fit_solar_correction<F>(actual_mean: f64, mut simulated_mean: F) -> CalibrationResult<CorrectionFit>
where
    F: FnMut(LinearCorrection) -> CalibrationResult<f64>,
{
    let actual_mean = check_mean(actual_mean, "measured")?;
    let (lo, hi) = SOLAR_ALPHA_BOUNDS;
    let (alpha, bias) = bisect(
        |alpha| Ok(simulated_mean(LinearCorrection::new(alpha, 0.0))? - actual_mean),
        lo,
        hi,
    )?;

    debug!(alpha, bias, "Fitted solar correction");
    Ok(CorrectionFit {
        correction: LinearCorrection::new(alpha, 0.0),
        bias,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use energy_conversion::wind::convert_wind;
    use energy_conversion::WindTurbine;
    use test_utils::{assert_approx_eq, time_varying_grid, TEST_TURBINE_YAML};

    #[test]
    fn test_wind_fit_matches_measured_mean() {
        let turbine = WindTurbine::from_yaml_str(TEST_TURBINE_YAML).unwrap();
        let speeds: Vec<f32> = (0..48).map(|h| 4.0 + (h % 8) as f32).collect();
        let grid = time_varying_grid("ws", "m s**-1", 2015, &speeds, 1, 1);

        let mean_cf = |correction: LinearCorrection| -> CalibrationResult<f64> {
            let cf = convert_wind(&grid, 100.0, None, &turbine, correction)?;
            Ok(cf.data().iter().map(|&v| v as f64).sum::<f64>() / cf.data().len() as f64)
        };

        let uncorrected = mean_cf(LinearCorrection::IDENTITY).unwrap();
        let actual = uncorrected * 1.2;
        let fit = fit_wind_correction(actual, mean_cf).unwrap();

        assert_approx_eq!(fit.correction.alpha, 0.6 * 1.2 + 0.2, 1e-12);
        assert!(fit.correction.beta >= 0.0);
        assert!(fit.bias.abs() < 1e-3);
    }

    #[test]
    fn test_wind_offset_is_never_negative() {
        // simulated mean linear in beta and already above the measurement
        let fit = fit_wind_correction(0.2, |c| Ok(0.3 + 0.01 * c.beta)).unwrap();
        assert_eq!(fit.correction.beta, 0.0);
        assert!(fit.bias > 0.0);
    }

    #[test]
    fn test_solar_gain() {
        let fit = fit_solar_correction(0.15, |c| Ok(0.12 * c.alpha)).unwrap();
        assert_approx_eq!(fit.correction.alpha, 1.25, 1e-3);
        assert_eq!(fit.correction.beta, 0.0);
    }

    #[test]
    fn test_fit_rejects_empty_measurements() {
        assert!(matches!(
            fit_solar_correction(0.0, |_| Ok(0.1)),
            Err(CalibrationError::Fit(_))
        ));
        assert!(fit_wind_correction(0.2, |_| Ok(f64::NAN)).is_err());
    }
}
