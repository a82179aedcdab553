//! Residual demand and resource adequacy of a wind, solar and hydropower mix.
//!
//! Wind and solar generation are sized from the demand that hydropower does
//! not cover: `wind_and_solar` times the mean of `demand - actual hydropower`,
//! split between wind (`wind`) and solar (`1 - wind`). Adequacy is the share
//! of the annual demand met, `1 - sum(max(residual, 0)) / sum(demand)`.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::dispatch::{hydropower_generation, StorageOptions};
use crate::error::{AdequacyError, AdequacyResult};
use crate::system::{check_length, finite_mean, finite_sum, PowerSystem};

/// Points the adequacy curve is resampled on when searching the best mix.
pub const MIX_SEARCH_POINTS: usize = 1001;

/// How hydropower follows the residual demand.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "hydropower", rename_all = "snake_case")]
pub enum Hydropower {
    /// Measured generation, unchanged.
    Actual,
    /// Reservoirs and pumped storage dispatched against the residual demand;
    /// run-of-river keeps its measured generation.
    Dispatched(StorageOptions),
}

impl Hydropower {
    /// Short name used in result tables.
    pub fn label(&self) -> String {
        match self {
            Hydropower::Actual => "actual_hydropower".to_string(),
            Hydropower::Dispatched(options) => {
                format!("dispatched_hydropower__pumped_storage_{}", options.pumped_storage_fraction)
            }
        }
    }
}

/// Share of the demand left to wind and solar, and the wind part of it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mix {
    pub wind_and_solar: f64,
    pub wind: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResidualDemand {
    /// Demand left after wind, solar and hydropower (MW).
    pub values: Vec<f64>,
    pub mean_wind_generation: f64,
    pub mean_solar_generation: f64,
    pub hydropower: Vec<f64>,
}

impl ResidualDemand {
    /// Demand not met over the period (MWh).
    pub fn unmet(&self) -> f64 {
        self.values.iter().filter(|v| **v > 0.0).sum()
    }
}

/// Hourly inputs of one country and year, aligned on the power system hours.
#[derive(Debug, Clone)]
pub struct AdequacyInputs {
    system: PowerSystem,
    wind_capacity_factor: Vec<f64>,
    solar_capacity_factor: Vec<f64>,
    inflow: Vec<f64>,
}

impl AdequacyInputs {
    /// `inflow` is any series proportional to the water reaching reservoir and
    /// pumped-storage plants; it is rescaled so that its mean equals their
    /// measured mean net generation.
    pub fn new(
        system: PowerSystem,
        wind_capacity_factor: Vec<f64>,
        solar_capacity_factor: Vec<f64>,
        inflow: Vec<f64>,
    ) -> AdequacyResult<Self> {
        system.validate()?;
        check_length("wind capacity factor", system.len(), wind_capacity_factor.len())?;
        check_length("solar capacity factor", system.len(), solar_capacity_factor.len())?;
        check_length("hydropower inflow", system.len(), inflow.len())?;
        for (what, series) in [("wind capacity factor", &wind_capacity_factor), ("solar capacity factor", &solar_capacity_factor)] {
            if !(finite_mean(series) > 0.0) {
                return Err(AdequacyError::ZeroMean(what));
            }
        }

        let inflow_mean = finite_mean(&inflow);
        let target = system.mean_storage_hydropower();
        let inflow = if inflow_mean > 0.0 && target.is_finite() {
            inflow.iter().map(|v| v / inflow_mean * target).collect()
        } else {
            vec![0.0; inflow.len()]
        };
        Ok(Self {
            system,
            wind_capacity_factor,
            solar_capacity_factor,
            inflow,
        })
    }

    pub fn system(&self) -> &PowerSystem {
        &self.system
    }

    /// Reservoir inflow in MWh per hour.
    pub fn inflow(&self) -> &[f64] {
        &self.inflow
    }

    pub fn residual_demand(&self, mix: Mix, hydropower: &Hydropower) -> AdequacyResult<ResidualDemand> {
        let system = &self.system;
        let actual = system.actual_hydropower();
        let left_to_wind_and_solar = finite_mean(&system.demand) - finite_mean(&actual);
        let mean_wind_generation = mix.wind_and_solar * mix.wind * left_to_wind_and_solar;
        let mean_solar_generation = mix.wind_and_solar * (1.0 - mix.wind) * left_to_wind_and_solar;

        let wind_scale = mean_wind_generation / finite_mean(&self.wind_capacity_factor);
        let solar_scale = mean_solar_generation / finite_mean(&self.solar_capacity_factor);
        let before_hydropower: Vec<f64> = system
            .demand
            .iter()
            .zip(&self.wind_capacity_factor)
            .zip(&self.solar_capacity_factor)
            .map(|((d, w), s)| d - wind_scale * w - solar_scale * s)
            .collect();

        let hydropower = match hydropower {
            Hydropower::Actual => actual,
            Hydropower::Dispatched(options) => {
                let dispatch = hydropower_generation(&before_hydropower, &self.inflow, system, options)?;
                dispatch
                    .generation
                    .iter()
                    .zip(&system.run_of_river_generation)
                    .map(|(g, r)| g + r)
                    .collect()
            }
        };

        let values = before_hydropower.iter().zip(&hydropower).map(|(r, h)| r - h).collect();
        Ok(ResidualDemand {
            values,
            mean_wind_generation,
            mean_solar_generation,
            hydropower,
        })
    }

    /// Share of the demand met by `mix`.
    pub fn adequacy(&self, mix: Mix, hydropower: &Hydropower) -> AdequacyResult<f64> {
        let residual = self.residual_demand(mix, hydropower)?;
        Ok(1.0 - residual.unmet() / finite_sum(&self.system.demand))
    }

    /// Adequacy of every combination of the given fractions.
    #[instrument(skip_all, fields(scenario = %hydropower.label()))]
    pub fn adequacy_grid(
        &self,
        wind_and_solar_fractions: &[f64],
        wind_fractions: &[f64],
        hydropower: &Hydropower,
    ) -> AdequacyResult<AdequacyGrid> {
        let mut values = Vec::with_capacity(wind_and_solar_fractions.len());
        for &wind_and_solar in wind_and_solar_fractions {
            let row = wind_fractions
                .iter()
                .map(|&wind| self.adequacy(Mix { wind_and_solar, wind }, hydropower))
                .collect::<AdequacyResult<Vec<f64>>>()?;
            values.push(row);
        }
        debug!(
            rows = wind_and_solar_fractions.len(),
            columns = wind_fractions.len(),
            "Computed adequacy grid"
        );
        Ok(AdequacyGrid {
            wind_and_solar_fractions: wind_and_solar_fractions.to_vec(),
            wind_fractions: wind_fractions.to_vec(),
            values,
        })
    }
}

/// Adequacy per wind-and-solar fraction (rows) and wind fraction (columns).
#[derive(Debug, Clone, PartialEq)]
pub struct AdequacyGrid {
    pub wind_and_solar_fractions: Vec<f64>,
    pub wind_fractions: Vec<f64>,
    pub values: Vec<Vec<f64>>,
}

impl AdequacyGrid {
    /// Wind fraction with the highest adequacy for each row.
    pub fn best_wind_fractions(&self) -> Vec<Option<f64>> {
        self.values
            .iter()
            .map(|row| best_wind_fraction(&self.wind_fractions, row))
            .collect()
    }
}

/// Evenly spaced values from `start` to `end` inclusive.
pub fn fraction_steps(start: f64, end: f64, step: f64) -> AdequacyResult<Vec<f64>> {
    if !(step > 0.0) || !start.is_finite() || !(end >= start) {
        return Err(AdequacyError::invalid(
            "fraction range",
            format!("{start}..={end} by {step}"),
        ));
    }
    let n = ((end - start) / step + 1e-9).floor() as usize;
    Ok((0..=n).map(|i| start + i as f64 * step).collect())
}

/// Cubic through four evenly spaced points, between `p1` (t = 0) and `p2` (t = 1).
fn catmull_rom(p0: f64, p1: f64, p2: f64, p3: f64, t: f64) -> f64 {
    let t2 = t * t;
    let t3 = t2 * t;
    let a = -0.5 * p0 + 1.5 * p1 - 1.5 * p2 + 0.5 * p3;
    let b = p0 - 2.5 * p1 + 2.0 * p2 - 0.5 * p3;
    let c = -0.5 * p0 + 0.5 * p2;
    a * t3 + b * t2 + c * t + p1
}

/// Fraction maximising `adequacy`, searched on a cubic interpolation of the
/// evenly spaced samples. None when there is no finite sample.
pub fn best_wind_fraction(fractions: &[f64], adequacy: &[f64]) -> Option<f64> {
    if fractions.len() != adequacy.len() || adequacy.iter().any(|v| !v.is_finite()) {
        return None;
    }
    match fractions.len() {
        0 => return None,
        1 => return Some(fractions[0]),
        _ => {}
    }

    let last = fractions.len() - 1;
    let (first_fraction, last_fraction) = (fractions[0], fractions[last]);
    let at = |i: isize| adequacy[i.clamp(0, last as isize) as usize];

    let mut best = (f64::NEG_INFINITY, first_fraction);
    for k in 0..MIX_SEARCH_POINTS {
        let position = k as f64 / (MIX_SEARCH_POINTS - 1) as f64 * last as f64;
        let segment = (position.floor() as usize).min(last - 1);
        let t = position - segment as f64;
        let i = segment as isize;
        let value = catmull_rom(at(i - 1), at(i), at(i + 1), at(i + 2), t);
        if value > best.0 {
            let fraction = first_fraction + (last_fraction - first_fraction) * k as f64 / (MIX_SEARCH_POINTS - 1) as f64;
            best = (value, fraction);
        }
    }
    Some(best.1)
}
