//! Per-period multiplicative calibration against reference totals.

use std::collections::BTreeMap;
use std::fmt;

use energy_common::{Granularity, Period, TimeSeries};
use tracing::{info, warn};

use crate::reference::ReferenceTotals;

/// Why a period was left unscaled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SkipReason {
    /// No reference total exists for the period.
    MissingReference,
    /// The reference total is NaN or infinite.
    InvalidReference(f64),
    /// The reference total is zero.
    ZeroReference,
    /// The converted total is zero, so no factor can reproduce the reference.
    ZeroTotal,
    /// The converted total is NaN or infinite.
    NonFiniteTotal(f64),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingReference => f.write_str("no reference total"),
            SkipReason::InvalidReference(v) => write!(f, "reference total is {v}"),
            SkipReason::ZeroReference => f.write_str("reference total is zero"),
            SkipReason::ZeroTotal => f.write_str("converted total is zero"),
            SkipReason::NonFiniteTotal(v) => write!(f, "converted total is {v}"),
        }
    }
}

/// Outcome of calibrating one series.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalibrationReport {
    /// Factor applied to each calibrated period.
    pub factors: BTreeMap<Period, f64>,
    /// Periods left as converted.
    pub uncalibrated: Vec<(Period, SkipReason)>,
}

impl CalibrationReport {
    pub fn is_complete(&self) -> bool {
        self.uncalibrated.is_empty()
    }
}

/// Scale each period of `series` so that its total matches the reference.
///
/// Every value inside a period is multiplied by the same factor
/// `reference / converted_total`, so the shape within the period is kept.
/// Periods that cannot be calibrated are reported and left untouched.
pub fn calibrate(series: &mut TimeSeries, reference: &ReferenceTotals, granularity: Granularity) -> CalibrationReport {
    let mut report = CalibrationReport::default();

    for (period, total) in series.totals_by(granularity) {
        let target = match reference.get(&period) {
            None => Err(SkipReason::MissingReference),
            Some(r) if !r.is_finite() => Err(SkipReason::InvalidReference(r)),
            Some(r) if r == 0.0 => Err(SkipReason::ZeroReference),
            Some(_) if !total.is_finite() => Err(SkipReason::NonFiniteTotal(total)),
            Some(_) if total == 0.0 => Err(SkipReason::ZeroTotal),
            Some(r) => Ok(r),
        };

        let target = match target {
            Ok(target) => target,
            Err(reason) => {
                warn!(series = %series.name, period = %period, reason = %reason, "Period left uncalibrated");
                report.uncalibrated.push((period, reason));
                continue;
            }
        };

        let factor = target / total;
        series.scale_period(period, factor);
        report.factors.insert(period, factor);
    }

    info!(
        series = %series.name,
        calibrated = report.factors.len(),
        uncalibrated = report.uncalibrated.len(),
        "Calibrated series"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::{assert_approx_eq, hourly_series};

    fn monthly_reference(year: i32, total: f64) -> ReferenceTotals {
        ReferenceTotals::new((1..=12).map(|m| (Period::Month(year, m), total)).collect())
    }

    #[test]
    fn test_yearly_totals_match_reference() {
        let mut series = hourly_series("solar", 2015, |h| ((h % 24) as f64 - 6.0).max(0.0));
        let before = series.clone();
        let reference = ReferenceTotals::new([(Period::Year(2015), 1234.5)].into_iter().collect());

        let report = calibrate(&mut series, &reference, Granularity::Yearly);
        assert!(report.is_complete());
        assert_approx_eq!(series.sum(), 1234.5, 1e-6);

        // shape kept: every value scaled by the same factor
        let factor = report.factors[&Period::Year(2015)];
        for (a, b) in before.values().iter().zip(series.values()) {
            assert_approx_eq!(a * factor, *b, 1e-9);
        }
    }

    #[test]
    fn test_monthly_calibration_is_idempotent() {
        let mut series = hourly_series("hydro", 2016, |h| 1.0 + (h % 7) as f64);
        let reference = monthly_reference(2016, 500.0);

        calibrate(&mut series, &reference, Granularity::Monthly);
        for (_, total) in series.totals_by(Granularity::Monthly) {
            assert_approx_eq!(total, 500.0, 1e-6);
        }

        let once = series.clone();
        let report = calibrate(&mut series, &reference, Granularity::Monthly);
        for factor in report.factors.values() {
            assert_approx_eq!(*factor, 1.0, 1e-12);
        }
        for (a, b) in once.values().iter().zip(series.values()) {
            assert_approx_eq!(*a, *b, 1e-9);
        }
    }

    #[test]
    fn test_zero_total_is_reported_not_divided() {
        let mut series = hourly_series("wind", 2015, |_| 0.0);
        let reference = ReferenceTotals::new([(Period::Year(2015), 10.0)].into_iter().collect());

        let report = calibrate(&mut series, &reference, Granularity::Yearly);
        assert_eq!(report.uncalibrated, vec![(Period::Year(2015), SkipReason::ZeroTotal)]);
        assert!(report.factors.is_empty());
        assert!(series.values().iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_zero_reference_is_reported_not_applied() {
        let mut series = hourly_series("wind", 2015, |h| 1.0 + (h % 5) as f64);
        let before = series.clone();
        let reference = ReferenceTotals::new([(Period::Year(2015), 0.0)].into_iter().collect());

        let report = calibrate(&mut series, &reference, Granularity::Yearly);
        assert_eq!(report.uncalibrated, vec![(Period::Year(2015), SkipReason::ZeroReference)]);
        assert!(report.factors.is_empty());
        assert_eq!(series, before);
    }

    #[test]
    fn test_missing_and_non_finite_periods() {
        let mut series = hourly_series("wind", 2015, |h| if h == 0 { f64::NAN } else { 1.0 });
        let report = calibrate(&mut series, &ReferenceTotals::default(), Granularity::Yearly);
        assert_eq!(report.uncalibrated, vec![(Period::Year(2015), SkipReason::MissingReference)]);

        let reference = ReferenceTotals::new([(Period::Year(2015), 10.0)].into_iter().collect());
        let report = calibrate(&mut series, &reference, Granularity::Yearly);
        assert!(matches!(report.uncalibrated[0].1, SkipReason::NonFiniteTotal(_)));
    }
}
