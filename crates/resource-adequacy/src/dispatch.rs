//! Hourly dispatch of reservoir and pumped-storage hydropower.
//!
//! Reservoirs are stepped forward hour by hour. Inflow fills the upstream
//! reservoir up to its upper bound, generation draws it down no further than
//! its lower bound. Pumping moves water from the downstream reservoir back up
//! while both reservoirs stay within their bounds.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{AdequacyError, AdequacyResult};
use crate::system::{check_length, PowerSystem, PUMPING_TO_GENERATION};

/// Lowest downstream filling level relative to its capacity.
pub const DOWNSTREAM_MIN_FRACTION: f64 = 0.1;

/// Allowed filling level of one reservoir (MWh).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub lower: f64,
    pub upper: f64,
}

/// Generation and filling levels of each hour, after the hour's dispatch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dispatch {
    /// Generation (MW); negative while pumping.
    pub generation: Vec<f64>,
    pub upstream: Vec<f64>,
    pub downstream: Vec<f64>,
}

/// Size of the pumped-storage fleet used when dispatching.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StorageOptions {
    /// Pumping capacity relative to the installed one; 0 disables pumping.
    #[serde(default)]
    pub pumped_storage_fraction: f64,
    /// Hours the downstream reservoirs sustain pumping at full power.
    #[serde(default = "default_hours_at_full_pumping")]
    pub hours_at_full_pumping: f64,
}

fn default_hours_at_full_pumping() -> f64 {
    8.0
}

impl Default for StorageOptions {
    fn default() -> Self {
        Self {
            pumped_storage_fraction: 0.0,
            hours_at_full_pumping: default_hours_at_full_pumping(),
        }
    }
}

fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

/// Dispatch a single reservoir: `requested` generation is cut to the water
/// available above `bounds.lower`.
pub fn dispatch_reservoir(inflow: &[f64], requested: &[f64], initial: f64, bounds: Bounds) -> AdequacyResult<Dispatch> {
    check_length("requested generation", inflow.len(), requested.len())?;
    let mut dispatch = Dispatch::default();
    let mut level = initial;
    for (&inflow, &request) in inflow.iter().zip(requested) {
        level = (level + finite_or_zero(inflow)).min(bounds.upper);
        let generation = finite_or_zero(request).min(level - bounds.lower);
        level -= generation;
        dispatch.generation.push(generation);
        dispatch.upstream.push(level);
        dispatch.downstream.push(0.0);
    }
    Ok(dispatch)
}

/// Dispatch an upstream and a downstream reservoir connected by
/// pumped-storage plants. Negative requests pump water upstream.
pub fn dispatch_pumped_storage(
    inflow: &[f64],
    requested: &[f64],
    initial: (f64, f64),
    upstream: Bounds,
    downstream: Bounds,
) -> AdequacyResult<Dispatch> {
    check_length("requested generation", inflow.len(), requested.len())?;
    let mut dispatch = Dispatch::default();
    let (mut up, mut down) = initial;
    for (&inflow, &request) in inflow.iter().zip(requested) {
        up = (up + finite_or_zero(inflow)).min(upstream.upper);
        let request = finite_or_zero(request);
        let generation = if request > 0.0 {
            request.min(up - upstream.lower)
        } else {
            request.max(-(down - downstream.lower)).max(-(upstream.upper - up))
        };
        up -= generation;
        down = (down + generation).min(downstream.upper);
        dispatch.generation.push(generation);
        dispatch.upstream.push(up);
        dispatch.downstream.push(down);
    }
    Ok(dispatch)
}

/// Reservoir and pumped-storage generation meeting `residual_demand` as far
/// as capacity and water allow.
///
/// `inflow` (MWh per hour) reaches the reservoirs one hour late. The
/// upstream bounds and starting level come from the reported filling level.
pub fn hydropower_generation(
    residual_demand: &[f64],
    inflow: &[f64],
    system: &PowerSystem,
    options: &StorageOptions,
) -> AdequacyResult<Dispatch> {
    check_length("hydropower inflow", residual_demand.len(), inflow.len())?;
    let capacity = system.capacity;
    if !(capacity.conventional >= 0.0) || !(capacity.pumped_storage >= 0.0) {
        return Err(AdequacyError::invalid(
            "hydropower capacity",
            format!("{} and {} MW must be non-negative", capacity.conventional, capacity.pumped_storage),
        ));
    }
    if !(options.pumped_storage_fraction >= 0.0) || !(options.hours_at_full_pumping > 0.0) {
        return Err(AdequacyError::invalid(
            "pumped storage",
            format!(
                "fraction {} and hours {} must be non-negative and positive",
                options.pumped_storage_fraction, options.hours_at_full_pumping
            ),
        ));
    }

    let generation_capacity = capacity.generation();
    let mut pumping_capacity = options.pumped_storage_fraction * capacity.pumping();
    if pumping_capacity > PUMPING_TO_GENERATION * generation_capacity {
        pumping_capacity = PUMPING_TO_GENERATION * generation_capacity;
        warn!(pumping_capacity, "Pumping capacity limited to 80% of the generation capacity");
    }

    let requested: Vec<f64> = residual_demand
        .iter()
        .map(|&r| finite_or_zero(r).clamp(-pumping_capacity, generation_capacity))
        .collect();
    let delayed: Vec<f64> = std::iter::once(0.0)
        .chain(inflow.iter().copied())
        .take(inflow.len())
        .collect();

    let reservoir = system.filling_level()?;
    let upstream = Bounds {
        lower: reservoir.min,
        upper: reservoir.max,
    };
    debug!(
        generation_capacity,
        pumping_capacity,
        lower = upstream.lower,
        upper = upstream.upper,
        "Dispatching hydropower"
    );

    if options.pumped_storage_fraction > 0.0 {
        let downstream_max = pumping_capacity * options.hours_at_full_pumping;
        let downstream = Bounds {
            lower: DOWNSTREAM_MIN_FRACTION * downstream_max,
            upper: downstream_max,
        };
        dispatch_pumped_storage(
            &delayed,
            &requested,
            (reservoir.initial, 0.5 * downstream_max),
            upstream,
            downstream,
        )
    } else {
        dispatch_reservoir(&delayed, &requested, reservoir.initial, upstream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::HydropowerCapacity;
    use chrono::{Duration, TimeZone, Utc};

    fn system(filling_level: Vec<f64>, capacity: HydropowerCapacity) -> PowerSystem {
        let n = filling_level.len();
        let start = Utc.with_ymd_and_hms(2019, 1, 1, 0, 0, 0).unwrap();
        PowerSystem {
            timestamps: (0..n as i64).map(|h| start + Duration::hours(h)).collect(),
            demand: vec![100.0; n],
            conventional_generation: vec![0.0; n],
            pumped_storage_generation: vec![0.0; n],
            pumped_storage_consumption: vec![0.0; n],
            run_of_river_generation: vec![0.0; n],
            reservoir_filling_level: filling_level,
            capacity,
        }
    }

    #[test]
    fn test_reservoir_respects_bounds() {
        let bounds = Bounds { lower: 10.0, upper: 50.0 };
        let dispatch = dispatch_reservoir(&[5.0, 40.0, 0.0, 0.0], &[20.0, 0.0, 30.0, 30.0], 30.0, bounds).unwrap();
        // 35 - 20; 15 + 40 capped at 50; 50 - 30; only 10 left above the bound
        assert_eq!(dispatch.generation, vec![20.0, 0.0, 30.0, 10.0]);
        assert_eq!(dispatch.upstream, vec![15.0, 50.0, 20.0, 10.0]);
        assert!(dispatch.downstream.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_pumping_is_limited_by_both_reservoirs() {
        let upstream = Bounds { lower: 0.0, upper: 100.0 };
        let downstream = Bounds { lower: 2.0, upper: 20.0 };
        let dispatch =
            dispatch_pumped_storage(&[0.0; 4], &[-15.0, 30.0, -15.0, -5.0], (90.0, 20.0), upstream, downstream)
                .unwrap();
        // room for 10 upstream; generation refills downstream up to its cap;
        // only 3 left above the downstream bound
        assert_eq!(dispatch.generation, vec![-10.0, 30.0, -15.0, -3.0]);
        assert_eq!(dispatch.upstream, vec![100.0, 70.0, 85.0, 88.0]);
        assert_eq!(dispatch.downstream, vec![10.0, 20.0, 5.0, 2.0]);
    }

    #[test]
    fn test_hydropower_generation_clips_to_capacity() {
        let capacity = HydropowerCapacity {
            conventional: 20.0,
            pumped_storage: 10.0,
        };
        let mut levels = vec![f64::NAN; 4];
        levels[1] = 1000.0;
        levels[3] = 500.0;
        let system = system(levels, capacity);

        // no pumping: negative residual demand generates nothing
        let dispatch =
            hydropower_generation(&[50.0, -20.0, 10.0, f64::NAN], &[0.0; 4], &system, &StorageOptions::default()).unwrap();
        assert_eq!(dispatch.generation, vec![30.0, 0.0, 10.0, 0.0]);
        assert_eq!(dispatch.upstream[0], 970.0);

        // pumping at most 0.8 * 10 MW, downstream holds 8 h of it
        let options = StorageOptions {
            pumped_storage_fraction: 1.0,
            hours_at_full_pumping: 8.0,
        };
        let dispatch = hydropower_generation(&[-20.0, 20.0, -20.0, 0.0], &[0.0; 4], &system, &options).unwrap();
        // a full upper reservoir takes no pumped water
        assert_eq!(dispatch.generation, vec![0.0, 20.0, -8.0, 0.0]);
        assert_eq!(dispatch.downstream, vec![32.0, 52.0, 44.0, 44.0]);
    }

    #[test]
    fn test_inflow_arrives_one_hour_late() {
        let system = system(vec![0.0, 100.0, f64::NAN], HydropowerCapacity {
            conventional: 1000.0,
            pumped_storage: 0.0,
        });
        let dispatch = hydropower_generation(&[500.0; 3], &[40.0, 60.0, 0.0], &system, &StorageOptions::default()).unwrap();
        assert_eq!(dispatch.generation, vec![0.0, 40.0, 60.0]);
    }
}
