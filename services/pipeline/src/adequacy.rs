//! Resource adequacy of wind, solar and hydropower against measured demand.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use energy_common::{Carrier, Country, TimeSeries};
use resource_adequacy::{write_table, AdequacyInputs, HydropowerCapacity, PowerSystem};
use tracing::{info, instrument, warn};

use crate::installed_capacity;
use crate::settings::Settings;

/// Adequacy of every scenario and mix.
pub const ADEQUACY_TABLE: &str = "resource_adequacy";
/// Best wind fraction of every scenario and wind-and-solar fraction.
pub const BEST_MIX_TABLE: &str = "resource_adequacy__best_mix";

/// Installed capacity resources of reservoir and pumped-storage plants.
pub const CONVENTIONAL_HYDROPOWER: &str = "conventional_hydropower";
pub const PUMPED_STORAGE_HYDROPOWER: &str = "pumped_storage_hydropower";

#[derive(Debug, Default)]
pub struct AdequacySummary {
    pub written: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
}

/// Values of a result series at `timestamps`; None when the file is absent.
fn aligned_values(path: &Path, carrier: Carrier, timestamps: &[DateTime<Utc>]) -> Result<Option<Vec<f64>>> {
    if !path.exists() {
        return Ok(None);
    }
    let series = TimeSeries::read_csv(path, carrier.series_name(), carrier.units())
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let by_time: HashMap<DateTime<Utc>, f64> = series.iter().map(|(t, v)| (*t, v)).collect();
    let values = timestamps
        .iter()
        .map(|t| {
            by_time
                .get(t)
                .copied()
                .with_context(|| format!("{} has no value at {t}", path.display()))
        })
        .collect::<Result<Vec<f64>>>()?;
    Ok(Some(values))
}

/// Adequacy grids of every configured scenario for each country with
/// measured power system data, written next to the result series.
#[instrument(skip_all, fields(year = settings.resource_adequacy.year))]
pub fn run(settings: &Settings, countries: &[&Country], overwrite: bool) -> Result<AdequacySummary> {
    let options = &settings.resource_adequacy;
    let wind_and_solar_fractions = options.wind_and_solar_fractions.steps()?;
    let wind_fractions = options.wind_fractions.steps()?;
    let capacity_table = installed_capacity(settings)?;
    let paths = settings.paths();
    let source = &settings.climate_source;
    let mut summary = AdequacySummary::default();

    for &country in countries {
        let output = paths.result_file(country, source, ADEQUACY_TABLE);
        let best_output = paths.result_file(country, source, BEST_MIX_TABLE);
        if output.exists() && best_output.exists() && !overwrite {
            info!(country = country.iso_alpha2, path = %output.display(), "Adequacy table exists, skipping");
            summary.skipped.push(output);
            continue;
        }

        let system_path = settings.power_system_path(country, options.year);
        if !system_path.exists() {
            warn!(country = country.iso_alpha2, path = %system_path.display(), "No power system data");
            continue;
        }
        let capacity = HydropowerCapacity {
            conventional: capacity_table
                .get(country.iso_alpha2, CONVENTIONAL_HYDROPOWER, options.year)
                .unwrap_or(0.0),
            pumped_storage: capacity_table
                .get(country.iso_alpha2, PUMPED_STORAGE_HYDROPOWER, options.year)
                .unwrap_or(0.0),
        };
        let system = PowerSystem::read_csv(&system_path, capacity)
            .with_context(|| format!("Failed to read power system {}", system_path.display()))?;

        let series_path = |carrier: Carrier| paths.result_file(country, source, carrier.series_name());
        let wind = aligned_values(&series_path(Carrier::WindOnshore), Carrier::WindOnshore, &system.timestamps)?;
        let solar = aligned_values(&series_path(Carrier::Solar), Carrier::Solar, &system.timestamps)?;
        let (Some(wind), Some(solar)) = (wind, solar) else {
            warn!(country = country.iso_alpha2, "Missing onshore wind or solar series, skipping");
            continue;
        };
        let inflow = aligned_values(
            &series_path(Carrier::HydroReservoir),
            Carrier::HydroReservoir,
            &system.timestamps,
        )?
        .unwrap_or_else(|| {
            warn!(country = country.iso_alpha2, "No reservoir inflow series, assuming no inflow");
            vec![0.0; system.len()]
        });

        let inputs = AdequacyInputs::new(system, wind, solar, inflow)
            .with_context(|| format!("Invalid adequacy inputs for {}", country.name))?;
        let mut rows = Vec::new();
        let mut best = Vec::new();
        for scenario in &options.scenarios {
            let label = scenario.label();
            let grid = inputs
                .adequacy_grid(&wind_and_solar_fractions, &wind_fractions, scenario)
                .with_context(|| format!("Failed to compute {label} adequacy for {}", country.name))?;
            rows.extend(grid.rows(&label));
            best.extend(grid.best_mix_rows(&label));
        }

        write_table(&output, &rows).with_context(|| format!("Failed to write {}", output.display()))?;
        write_table(&best_output, &best).with_context(|| format!("Failed to write {}", best_output.display()))?;
        info!(
            country = country.iso_alpha2,
            path = %output.display(),
            scenarios = options.scenarios.len(),
            cells = rows.len(),
            "Wrote resource adequacy"
        );
        summary.written.push(output);
    }

    Ok(summary)
}
