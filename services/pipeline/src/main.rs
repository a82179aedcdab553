//! Energy time series pipeline.
//!
//! Runs one processing stage per invocation against the directories named in
//! the settings file: extract downloaded archives, regrid projections,
//! convert climate data into country energy series, fit calibration
//! coefficients, calibrate results against historical totals and assess
//! resource adequacy.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use climate_grid::InterpolationMethod;
use energy_common::{select_countries, Carrier};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use energy_pipeline::{adequacy, calibrate, convert, extract, fit, grid_store, regrid, Settings};

#[derive(Parser, Debug)]
#[command(name = "energy-pipeline")]
#[command(about = "Convert climate data into country energy time series")]
struct Args {
    /// Settings file
    #[arg(short, long, env = "ENERGY_CONFIG", default_value = "config/settings.yaml")]
    config: PathBuf,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract downloaded archives into NetCDF files
    Extract {
        /// Replace files that were already extracted
        #[arg(long)]
        overwrite: bool,
    },
    /// Regrid extracted projection files onto the reanalysis grid
    Regrid {
        /// Interpolation method (bilinear, nearest)
        #[arg(long, default_value = "bilinear", value_parser = parse_method)]
        method: InterpolationMethod,

        /// Replace files that were already regridded
        #[arg(long)]
        overwrite: bool,
    },
    /// Convert climate data into energy series
    Convert {
        /// Carrier to convert (wind_onshore, solar, heating, ...)
        carrier: Carrier,

        /// Country name or ISO code (defaults to every European country)
        country: Option<String>,

        /// Replace existing result files
        #[arg(long)]
        overwrite: bool,
    },
    /// Fit calibration coefficients from measured data
    Fit {
        carrier: Carrier,
        country: Option<String>,
    },
    /// Calibrate result series against historical totals
    Calibrate {
        carrier: Carrier,
        country: Option<String>,
    },
    /// Share of measured demand met by wind, solar and hydropower mixes
    Adequacy {
        country: Option<String>,

        /// Replace existing adequacy tables
        #[arg(long)]
        overwrite: bool,
    },
}

fn parse_method(s: &str) -> Result<InterpolationMethod, String> {
    match s.trim().to_lowercase().as_str() {
        "bilinear" => Ok(InterpolationMethod::Bilinear),
        "nearest" => Ok(InterpolationMethod::Nearest),
        other => Err(format!("unknown interpolation method '{other}'")),
    }
}

fn init_tracing(log_level: &str, json: bool) -> Result<()> {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true);
    if json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_tracing(&args.log_level, args.json_logs)?;

    let settings = Settings::load(&args.config)?;
    info!(
        config = %args.config.display(),
        source = %settings.climate_source,
        start_year = settings.years.start,
        end_year = settings.years.end,
        "Loaded settings"
    );

    match args.command {
        Command::Extract { overwrite } => {
            let report = extract::run(&settings, overwrite)?;
            info!(extracted = report.extracted.len(), skipped = report.skipped.len(), "Done");
        }
        Command::Regrid { method, overwrite } => {
            let store = grid_store()?;
            let summary = regrid::run(store.as_ref(), &settings, method, overwrite)?;
            info!(regridded = summary.regridded.len(), skipped = summary.skipped.len(), "Done");
        }
        Command::Convert {
            carrier,
            country,
            overwrite,
        } => {
            let countries = select_countries(country.as_deref()).context("Invalid country")?;
            let conversion = settings.conversion_settings()?;
            let store = grid_store()?;
            let summary = convert::run(store.as_ref(), &settings, &conversion, carrier, &countries, overwrite)?;
            info!(written = summary.written.len(), skipped = summary.skipped.len(), "Done");
        }
        Command::Fit { carrier, country } => {
            let countries = select_countries(country.as_deref()).context("Invalid country")?;
            let conversion = settings.conversion_settings()?;
            let store = grid_store()?;
            let fitted = fit::run(store.as_ref(), &settings, &conversion, carrier, &countries)?;
            info!(countries = fitted.len(), "Done");
        }
        Command::Calibrate { carrier, country } => {
            let countries = select_countries(country.as_deref()).context("Invalid country")?;
            let reports = calibrate::run(&settings, carrier, &countries)?;
            let incomplete = reports.iter().filter(|(_, r)| !r.is_complete()).count();
            info!(series = reports.len(), incomplete, "Done");
        }
        Command::Adequacy { country, overwrite } => {
            let countries = select_countries(country.as_deref()).context("Invalid country")?;
            let summary = adequacy::run(&settings, &countries, overwrite)?;
            info!(written = summary.written.len(), skipped = summary.skipped.len(), "Done");
        }
    }

    Ok(())
}
