//! Climate data retriever.
//!
//! Downloads reanalysis and projection data from the Climate Data Store into
//! the canonical climate data layout, one file per variable and year.
//! Files that are already present (downloaded, extracted or regridded) are
//! skipped.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use energy_common::{ArchiveFormat, BoundingBox, ClimateSource, CordexModels, DataPaths, Rcp, Ssp};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use retriever::request::{CMIP6_VARIABLES, CORDEX_VARIABLES, ERA5_VARIABLES};
use retriever::{CdsClient, Outcome, RetrievalRequest, RetryConfig, Retriever, DEFAULT_CDS_URL};

#[derive(Parser, Debug)]
#[command(name = "retriever")]
#[command(about = "Download climate data from the Copernicus Climate Data Store")]
struct Args {
    /// Root directory of the climate data
    #[arg(long, env = "CLIMATE_DATA_DIR", default_value = "data/climate")]
    climate_dir: PathBuf,

    /// Focus region used in folder names
    #[arg(long, default_value = "Europe")]
    region: String,

    /// Data store API URL
    #[arg(long, env = "CDSAPI_URL", default_value = DEFAULT_CDS_URL)]
    cds_url: String,

    /// Data store API key
    #[arg(long, env = "CDSAPI_KEY", hide_env_values = true)]
    cds_key: String,

    /// Maximum attempts per file
    #[arg(long, default_value = "5")]
    max_attempts: u32,

    /// Seconds between job status checks
    #[arg(long, default_value = "10")]
    poll_interval: u64,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(ClapArgs, Debug)]
struct Years {
    /// First year to download
    #[arg(long)]
    start_year: i32,

    /// Last year to download (defaults to the first)
    #[arg(long)]
    end_year: Option<i32>,

    /// Variables to download (comma separated, defaults to every variable the pipeline uses)
    #[arg(long, value_delimiter = ',')]
    variables: Vec<String>,
}

impl Years {
    fn range(&self) -> std::ops::RangeInclusive<i32> {
        self.start_year..=self.end_year.unwrap_or(self.start_year)
    }

    fn variables(&self, defaults: &[&str]) -> Vec<String> {
        if self.variables.is_empty() {
            defaults.iter().map(|v| v.to_string()).collect()
        } else {
            self.variables.clone()
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Hourly ERA5 reanalysis on single levels
    Era5 {
        #[command(flatten)]
        years: Years,

        /// Area as "min_lon,min_lat,max_lon,max_lat"
        #[arg(long, default_value = "-22,27,45,72")]
        area: String,
    },
    /// EURO-CORDEX regional projections
    Cordex {
        #[command(flatten)]
        years: Years,

        /// Emission scenario (rcp_2_6, rcp_4_5, rcp_8_5)
        #[arg(long)]
        experiment: Rcp,

        /// Global climate model
        #[arg(long)]
        gcm: String,

        /// Regional climate model
        #[arg(long)]
        rcm: String,
    },
    /// CMIP6 global projections, one file per variable for the whole span
    Cmip6 {
        #[command(flatten)]
        years: Years,

        /// Shared socioeconomic pathway (ssp1_2_6, ssp2_4_5, ssp5_8_5)
        #[arg(long)]
        experiment: Ssp,

        /// Climate model
        #[arg(long)]
        model: String,
    },
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

/// A request and the file it should end up in.
struct Job {
    request: RetrievalRequest,
    target: PathBuf,
    /// Files whose presence means the data was already retrieved.
    done_markers: Vec<PathBuf>,
}

fn plan(command: &Command, paths: &DataPaths) -> Result<Vec<Job>> {
    let mut jobs = Vec::new();
    match command {
        Command::Era5 { years, area } => {
            let source = ClimateSource::Reanalysis;
            let area = BoundingBox::parse(area).context("Invalid --area")?;
            for variable in years.variables(&ERA5_VARIABLES) {
                for year in years.range() {
                    let request = RetrievalRequest::era5(&variable, year, &area);
                    let target = paths.climate_file(&source, &variable, year, request.resolution);
                    jobs.push(Job {
                        request,
                        target,
                        done_markers: Vec::new(),
                    });
                }
            }
        }
        Command::Cordex {
            years,
            experiment,
            gcm,
            rcm,
        } => {
            let source = ClimateSource::cordex(*experiment, gcm, rcm).context("Invalid CORDEX model chain")?;
            let models = CordexModels::new(gcm, rcm)?;
            for variable in years.variables(&CORDEX_VARIABLES) {
                for year in years.range() {
                    let request = RetrievalRequest::cordex(&variable, *experiment, &models, year);
                    let resolution = request.resolution;
                    jobs.push(Job {
                        target: paths.archive_file(&source, &variable, year, resolution, ArchiveFormat::TarGz),
                        done_markers: vec![
                            paths.original_file(&source, &variable, year, resolution),
                            paths.climate_file(&source, &variable, year, resolution),
                        ],
                        request,
                    });
                }
            }
        }
        Command::Cmip6 {
            years,
            experiment,
            model,
        } => {
            let source = ClimateSource::cmip6(*experiment, model).context("Invalid CMIP6 model")?;
            let (start, end) = (*years.range().start(), *years.range().end());
            for variable in years.variables(&CMIP6_VARIABLES) {
                let request = RetrievalRequest::cmip6(&variable, *experiment, model, start, end);
                let stem = format!("{start}_{end}__{}_{variable}", request.resolution);
                let folder = paths.climate_folder(&source, &variable);
                jobs.push(Job {
                    target: folder.join(format!("{stem}.zip")),
                    done_markers: vec![folder.join(format!("{stem}__original.nc"))],
                    request,
                });
            }
        }
    }
    Ok(jobs)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_tracing(&args.log_level, args.json_logs)?;

    let paths = DataPaths::new(&args.climate_dir, PathBuf::new(), PathBuf::new(), args.region.as_str());
    let jobs = plan(&args.command, &paths)?;
    info!(files = jobs.len(), climate_dir = %args.climate_dir.display(), "Starting retrieval");

    let client = CdsClient::new(&args.cds_url, &args.cds_key, Duration::from_secs(600))
        .context("Failed to create data store client")?;
    let config = RetryConfig {
        max_attempts: args.max_attempts,
        poll_interval: Duration::from_secs(args.poll_interval),
        ..RetryConfig::default()
    };
    let retriever = Retriever::new(client, config);

    let (mut downloaded, mut skipped) = (0, 0);
    for job in jobs {
        if let Some(marker) = job.done_markers.iter().find(|m| m.exists()) {
            info!(path = %marker.display(), "Already extracted, skipping");
            skipped += 1;
            continue;
        }
        let outcome = retriever
            .retrieve(&job.request, &job.target)
            .await
            .with_context(|| format!("Failed to retrieve {}", job.target.display()))?;
        match outcome {
            Outcome::Skipped => skipped += 1,
            Outcome::Downloaded { .. } => downloaded += 1,
        }
    }

    info!(downloaded, skipped, "Retrieval finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn years(start: i32, end: i32, variables: &[&str]) -> Years {
        Years {
            start_year: start,
            end_year: Some(end),
            variables: variables.iter().map(|v| v.to_string()).collect(),
        }
    }

    #[test]
    fn test_cordex_plan_targets_archives() {
        let paths = DataPaths::new("/climate", "", "", "Europe");
        let command = Command::Cordex {
            years: years(2030, 2031, &["10m_wind_speed"]),
            experiment: Rcp::Rcp26,
            gcm: "cnrm_cerfacs_cm5".to_string(),
            rcm: "cnrm_aladin63".to_string(),
        };
        let jobs = plan(&command, &paths).unwrap();
        assert_eq!(jobs.len(), 2);
        assert_eq!(
            jobs[0].target,
            PathBuf::from(
                "/climate/Europe__CORDEX__RCP_2_6__CNRM_CERFACS_CM5__CNRM_ALADIN63__10m_wind_speed/2030__3hourly_10m_wind_speed.tar.gz"
            )
        );
        assert!(jobs[1].done_markers[0].ends_with("2031__3hourly_10m_wind_speed__original.nc"));
    }

    #[test]
    fn test_plan_rejects_unknown_chain() {
        let paths = DataPaths::new("/climate", "", "", "Europe");
        let command = Command::Cordex {
            years: years(2030, 2030, &[]),
            experiment: Rcp::Rcp45,
            gcm: "miroc_miroc5".to_string(),
            rcm: "clmcom_clm_cclm4_8_17".to_string(),
        };
        assert!(plan(&command, &paths).is_err());
    }

    #[test]
    fn test_era5_defaults_and_cmip6_span() {
        let paths = DataPaths::new("/climate", "", "", "World");
        let era5 = Command::Era5 {
            years: years(2015, 2015, &[]),
            area: "-22,27,45,72".to_string(),
        };
        let jobs = plan(&era5, &paths).unwrap();
        assert_eq!(jobs.len(), ERA5_VARIABLES.len());
        assert!(jobs[0].target.ends_with("2015__hourly_2m_temperature.nc"));

        let cmip6 = Command::Cmip6 {
            years: years(2015, 2100, &["total_runoff"]),
            experiment: Ssp::Ssp126,
            model: "cesm2".to_string(),
        };
        let jobs = plan(&cmip6, &paths).unwrap();
        assert!(jobs[0].target.ends_with("2015_2100__monthly_total_runoff.zip"));
    }
}
