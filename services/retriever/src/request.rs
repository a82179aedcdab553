//! Data store requests for each climate source.

use energy_common::{ArchiveFormat, BoundingBox, CordexModels, Rcp, Ssp, TimeResolution};
use serde_json::{json, Map, Value};

pub const ERA5_DATASET: &str = "reanalysis-era5-single-levels";
pub const CORDEX_DATASET: &str = "projections-cordex-domains-single-levels";
pub const CMIP6_DATASET: &str = "projections-cmip6";

/// Variables downloaded when none are given on the command line.
pub const ERA5_VARIABLES: [&str; 6] = [
    "2m_temperature",
    "100m_u_component_of_wind",
    "100m_v_component_of_wind",
    "forecast_surface_roughness",
    "surface_solar_radiation_downwards",
    "runoff",
];

pub const CORDEX_VARIABLES: [&str; 4] = [
    "2m_air_temperature",
    "10m_wind_speed",
    "surface_solar_radiation_downwards",
    "total_run_off_flux",
];

pub const CMIP6_VARIABLES: [&str; 4] = [
    "near_surface_air_temperature",
    "near_surface_wind_speed",
    "surface_downwelling_shortwave_radiation",
    "total_runoff",
];

/// One job to submit to the data store.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalRequest {
    pub dataset: &'static str,
    pub variable: String,
    pub inputs: Map<String, Value>,
    /// Archive format of the result; `None` for a plain NetCDF file.
    pub archive: Option<ArchiveFormat>,
    /// Time step of the requested data.
    pub resolution: TimeResolution,
}

fn numbers(range: std::ops::RangeInclusive<u32>) -> Vec<String> {
    range.map(|n| n.to_string()).collect()
}

fn into_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

impl RetrievalRequest {
    /// A full year of hourly reanalysis over `area`.
    pub fn era5(variable: &str, year: i32, area: &BoundingBox) -> Self {
        let hours: Vec<String> = (0..24).map(|h| format!("{h:02}:00")).collect();
        let inputs = json!({
            "product_type": "reanalysis",
            "variable": variable,
            "year": year.to_string(),
            "month": numbers(1..=12),
            "day": numbers(1..=31),
            "time": hours,
            "format": "netcdf",
            "area": area.to_archive_area(),
        });
        Self {
            dataset: ERA5_DATASET,
            variable: variable.to_string(),
            inputs: into_map(inputs),
            archive: None,
            resolution: TimeResolution::Hourly,
        }
    }

    /// One year of a EURO-CORDEX projection at 0.11 degrees.
    ///
    /// Runoff is only published 6-hourly, everything else is 3-hourly. For
    /// two driving models the archive files temperature and wind speed under
    /// a two-year span, so the end year is one past the requested year.
    pub fn cordex(variable: &str, experiment: Rcp, models: &CordexModels, year: i32) -> Self {
        let (temporal, resolution) = if variable == "total_run_off_flux" {
            ("6_hours", TimeResolution::SixHourly)
        } else {
            ("3_hours", TimeResolution::ThreeHourly)
        };
        let spans_two_years = matches!(
            models.global_climate_model.as_str(),
            "cnrm_cerfacs_cm5" | "mpi_m_mpi_esm_lr"
        ) && matches!(variable, "10m_wind_speed" | "2m_air_temperature");
        let end_year = if spans_two_years { year + 1 } else { year };

        let inputs = json!({
            "format": "tgz",
            "domain": "europe",
            "experiment": experiment.as_str(),
            "horizontal_resolution": "0_11_degree_x_0_11_degree",
            "temporal_resolution": temporal,
            "variable": variable,
            "gcm_model": models.global_climate_model,
            "rcm_model": models.regional_climate_model,
            "ensemble_member": "r1i1p1",
            "start_year": year.to_string(),
            "end_year": end_year.to_string(),
        });
        Self {
            dataset: CORDEX_DATASET,
            variable: variable.to_string(),
            inputs: into_map(inputs),
            archive: Some(ArchiveFormat::TarGz),
            resolution,
        }
    }

    /// A CMIP6 projection over a span of years: daily wind speed, monthly
    /// everything else.
    pub fn cmip6(variable: &str, experiment: Ssp, model: &str, start_year: i32, end_year: i32) -> Self {
        let daily = variable == "near_surface_wind_speed";
        let years: Vec<String> = (start_year..=end_year).map(|y| y.to_string()).collect();
        let mut inputs = json!({
            "format": "zip",
            "experiment": experiment.as_str(),
            "temporal_resolution": if daily { "daily" } else { "monthly" },
            "variable": variable,
            "model": model,
            "year": years,
            "month": numbers(1..=12),
        });
        if daily {
            inputs["day"] = json!(numbers(1..=31));
        }
        Self {
            dataset: CMIP6_DATASET,
            variable: variable.to_string(),
            inputs: into_map(inputs),
            archive: Some(ArchiveFormat::Zip),
            resolution: if daily { TimeResolution::Daily } else { TimeResolution::Monthly },
        }
    }

    pub fn input(&self, key: &str) -> Option<&Value> {
        self.inputs.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_era5_request() {
        let request = RetrievalRequest::era5("2m_temperature", 2015, &BoundingBox::europe());
        assert_eq!(request.dataset, "reanalysis-era5-single-levels");
        assert_eq!(request.input("year"), Some(&json!("2015")));
        assert_eq!(request.input("area"), Some(&json!([72.0, -22.0, 27.0, 45.0])));
        assert_eq!(request.input("month").and_then(Value::as_array).map(Vec::len), Some(12));
        assert_eq!(request.input("day").and_then(Value::as_array).map(Vec::len), Some(31));

        let times = request.input("time").and_then(Value::as_array).unwrap();
        assert_eq!(times.len(), 24);
        assert_eq!(times[0], json!("00:00"));
        assert_eq!(times[23], json!("23:00"));
        assert_eq!(request.archive, None);
    }

    #[test]
    fn test_cordex_end_year_quirk() {
        let cnrm = CordexModels::new("cnrm_cerfacs_cm5", "cnrm_aladin63").unwrap();
        let miroc = CordexModels::new("miroc_miroc5", "clmcom_clm_cclm4_8_17").unwrap();

        let wind = RetrievalRequest::cordex("10m_wind_speed", Rcp::Rcp26, &cnrm, 2030);
        assert_eq!(wind.input("end_year"), Some(&json!("2031")));
        assert_eq!(wind.input("temporal_resolution"), Some(&json!("3_hours")));
        assert_eq!(wind.archive, Some(ArchiveFormat::TarGz));

        let solar = RetrievalRequest::cordex("surface_solar_radiation_downwards", Rcp::Rcp26, &cnrm, 2030);
        assert_eq!(solar.input("end_year"), Some(&json!("2030")));

        let wind = RetrievalRequest::cordex("10m_wind_speed", Rcp::Rcp85, &miroc, 2030);
        assert_eq!(wind.input("end_year"), Some(&json!("2030")));

        let runoff = RetrievalRequest::cordex("total_run_off_flux", Rcp::Rcp85, &miroc, 2030);
        assert_eq!(runoff.input("temporal_resolution"), Some(&json!("6_hours")));
        assert_eq!(runoff.resolution, TimeResolution::SixHourly);
        assert_eq!(runoff.input("ensemble_member"), Some(&json!("r1i1p1")));
    }

    #[test]
    fn test_cmip6_resolution() {
        let wind = RetrievalRequest::cmip6("near_surface_wind_speed", Ssp::Ssp245, "cesm2", 2015, 2100);
        assert_eq!(wind.input("temporal_resolution"), Some(&json!("daily")));
        assert!(wind.input("day").is_some());
        assert_eq!(wind.input("year").and_then(Value::as_array).map(Vec::len), Some(86));

        let temperature = RetrievalRequest::cmip6("near_surface_air_temperature", Ssp::Ssp245, "cesm2", 2015, 2100);
        assert_eq!(temperature.input("temporal_resolution"), Some(&json!("monthly")));
        assert!(temperature.input("day").is_none());
        assert_eq!(temperature.archive, Some(ArchiveFormat::Zip));
    }
}
