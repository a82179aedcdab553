//! Monthly retain factors for hydropower inflow.
//!
//! Runoff overstates the water turbined by hydro plants in some months and
//! understates it in others (storage, evaporation, other uses). The ratio of
//! actual to simulated generation per calendar month, fitted on one year, is
//! applied to every converted year.

use chrono::Datelike;
use energy_common::{Granularity, Period, TimeSeries};
use tracing::{debug, warn};

use crate::reference::ReferenceTotals;
use crate::scaling::SkipReason;

/// One factor per calendar month, January first.
#[derive(Debug, Clone, PartialEq)]
pub struct RetainFactors {
    factors: [f64; 12],
    /// Months (1-12) without a usable factor; their factor is 1.
    pub uncalibrated: Vec<(u32, SkipReason)>,
}

impl Default for RetainFactors {
    fn default() -> Self {
        Self {
            factors: [1.0; 12],
            uncalibrated: Vec::new(),
        }
    }
}

impl RetainFactors {
    pub fn new(factors: [f64; 12]) -> Self {
        Self {
            factors,
            uncalibrated: Vec::new(),
        }
    }

    /// Build from stored coefficients, one per month.
    pub fn from_coefficients(values: &[f64]) -> Option<Self> {
        let factors: [f64; 12] = values.try_into().ok()?;
        Some(Self::new(factors))
    }

    pub fn coefficients(&self) -> &[f64; 12] {
        &self.factors
    }

    /// Names under which the factors are stored: `1` to `12`.
    pub fn coefficient_names() -> Vec<String> {
        (1..=12).map(|m| m.to_string()).collect()
    }

    pub fn factor(&self, month: u32) -> f64 {
        self.factors[(month as usize).saturating_sub(1).min(11)]
    }

    /// Fit `actual / simulated` for each month of `year`.
    pub fn fit(simulated: &TimeSeries, actual: &ReferenceTotals, year: i32) -> Self {
        let totals = simulated.totals_by(Granularity::Monthly);
        let mut fitted = Self::default();

        for month in 1..=12u32 {
            let period = Period::Month(year, month);
            let simulated_total = totals.get(&period).copied().unwrap_or(0.0);
            let result = match actual.get(&period) {
                None => Err(SkipReason::MissingReference),
                Some(a) if !a.is_finite() => Err(SkipReason::InvalidReference(a)),
                Some(_) if !simulated_total.is_finite() => Err(SkipReason::NonFiniteTotal(simulated_total)),
                Some(_) if simulated_total == 0.0 => Err(SkipReason::ZeroTotal),
                Some(a) => Ok(a / simulated_total),
            };
            match result {
                Ok(factor) => fitted.factors[month as usize - 1] = factor,
                Err(reason) => {
                    warn!(series = %simulated.name, period = %period, reason = %reason, "No retain factor for month");
                    fitted.uncalibrated.push((month, reason));
                }
            }
        }

        debug!(series = %simulated.name, year, factors = ?fitted.factors, "Fitted retain factors");
        fitted
    }

    /// Multiply every value by the factor of its calendar month.
    pub fn apply(&self, series: &mut TimeSeries) {
        let months: Vec<u32> = series.timestamps().iter().map(|t| t.month()).collect();
        for (value, month) in series.values_mut().iter_mut().zip(months) {
            *value *= self.factor(month);
        }
    }
}
