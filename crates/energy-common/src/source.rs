//! Climate data sources, emission scenarios and climate model identifiers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{EnergyError, EnergyResult};

/// Representative concentration pathway of a CORDEX projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rcp {
    #[serde(rename = "rcp_2_6")]
    Rcp26,
    #[serde(rename = "rcp_4_5")]
    Rcp45,
    #[serde(rename = "rcp_8_5")]
    Rcp85,
}

impl Rcp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rcp::Rcp26 => "rcp_2_6",
            Rcp::Rcp45 => "rcp_4_5",
            Rcp::Rcp85 => "rcp_8_5",
        }
    }
}

impl FromStr for Rcp {
    type Err = EnergyError;

    fn from_str(s: &str) -> EnergyResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "rcp_2_6" => Ok(Rcp::Rcp26),
            "rcp_4_5" => Ok(Rcp::Rcp45),
            "rcp_8_5" => Ok(Rcp::Rcp85),
            _ => Err(EnergyError::invalid("RCP", s)),
        }
    }
}

impl fmt::Display for Rcp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared socioeconomic pathway of a CMIP6 projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Ssp {
    #[serde(rename = "ssp1_2_6")]
    Ssp126,
    #[serde(rename = "ssp2_4_5")]
    Ssp245,
    #[serde(rename = "ssp5_8_5")]
    Ssp585,
}

impl Ssp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Ssp::Ssp126 => "ssp1_2_6",
            Ssp::Ssp245 => "ssp2_4_5",
            Ssp::Ssp585 => "ssp5_8_5",
        }
    }
}

impl FromStr for Ssp {
    type Err = EnergyError;

    fn from_str(s: &str) -> EnergyResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "ssp1_2_6" => Ok(Ssp::Ssp126),
            "ssp2_4_5" => Ok(Ssp::Ssp245),
            "ssp5_8_5" => Ok(Ssp::Ssp585),
            _ => Err(EnergyError::invalid("SSP", s)),
        }
    }
}

impl fmt::Display for Ssp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const GLOBAL_CLIMATE_MODELS: [&str; 3] = ["cnrm_cerfacs_cm5", "mpi_m_mpi_esm_lr", "miroc_miroc5"];

pub const REGIONAL_CLIMATE_MODELS: [&str; 3] =
    ["cnrm_aladin63", "ictp_regcm4_6", "clmcom_clm_cclm4_8_17"];

pub const CMIP6_MODELS: [&str; 5] = [
    "mpi_esm1_2_lr",
    "cmcc_esm2",
    "cesm2",
    "hadgem3_gc31_ll",
    "bcc_csm2_mr",
];

/// Model chains available in the archive and the RCPs each one covers.
const CORDEX_MODEL_CHAINS: [(&str, &str, &[Rcp]); 3] = [
    ("cnrm_cerfacs_cm5", "cnrm_aladin63", &[Rcp::Rcp26, Rcp::Rcp45, Rcp::Rcp85]),
    ("mpi_m_mpi_esm_lr", "ictp_regcm4_6", &[Rcp::Rcp26, Rcp::Rcp85]),
    ("miroc_miroc5", "clmcom_clm_cclm4_8_17", &[Rcp::Rcp26, Rcp::Rcp85]),
];

/// A global/regional climate model pair driving a CORDEX projection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CordexModels {
    pub global_climate_model: String,
    pub regional_climate_model: String,
}

impl CordexModels {
    /// Validate both identifiers against the known model sets.
    pub fn new(gcm: &str, rcm: &str) -> EnergyResult<Self> {
        let gcm = gcm.trim().to_lowercase();
        let rcm = rcm.trim().to_lowercase();
        if !GLOBAL_CLIMATE_MODELS.contains(&gcm.as_str()) {
            return Err(EnergyError::invalid("global climate model", gcm));
        }
        if !REGIONAL_CLIMATE_MODELS.contains(&rcm.as_str()) {
            return Err(EnergyError::invalid("regional climate model", rcm));
        }
        Ok(Self {
            global_climate_model: gcm,
            regional_climate_model: rcm,
        })
    }

    /// Whether the archive holds this model chain for `experiment`.
    pub fn supports(&self, experiment: Rcp) -> bool {
        CORDEX_MODEL_CHAINS.iter().any(|(g, r, rcps)| {
            *g == self.global_climate_model && *r == self.regional_climate_model && rcps.contains(&experiment)
        })
    }
}

/// Where the gridded climate data comes from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClimateSource {
    /// ERA5 hourly reanalysis.
    Reanalysis,
    /// EURO-CORDEX regional projections.
    Cordex { experiment: Rcp, models: CordexModels },
    /// CMIP6 global projections.
    Cmip6 { experiment: Ssp, model: String },
}

impl ClimateSource {
    pub fn cordex(experiment: Rcp, gcm: &str, rcm: &str) -> EnergyResult<Self> {
        let models = CordexModels::new(gcm, rcm)?;
        if !models.supports(experiment) {
            return Err(EnergyError::invalid(
                "CORDEX experiment",
                format!("{experiment} for {gcm}/{rcm}"),
            ));
        }
        Ok(ClimateSource::Cordex { experiment, models })
    }

    pub fn cmip6(experiment: Ssp, model: &str) -> EnergyResult<Self> {
        let model = model.trim().to_lowercase();
        if !CMIP6_MODELS.contains(&model.as_str()) {
            return Err(EnergyError::invalid("CMIP6 model", model));
        }
        Ok(ClimateSource::Cmip6 { experiment, model })
    }

    /// Product label used in folder and file names.
    pub fn data_product(&self) -> &'static str {
        match self {
            ClimateSource::Reanalysis => "ERA5",
            ClimateSource::Cordex { .. } => "CORDEX",
            ClimateSource::Cmip6 { .. } => "CMIP6",
        }
    }

    /// Upper-cased scenario and model tags, e.g. `["RCP_2_6", "CNRM_CERFACS_CM5", "CNRM_ALADIN63"]`.
    pub fn scenario_tags(&self) -> Vec<String> {
        match self {
            ClimateSource::Reanalysis => Vec::new(),
            ClimateSource::Cordex { experiment, models } => vec![
                experiment.as_str().to_uppercase(),
                models.global_climate_model.to_uppercase(),
                models.regional_climate_model.to_uppercase(),
            ],
            ClimateSource::Cmip6 { experiment, model } => {
                vec![experiment.as_str().to_uppercase(), model.to_uppercase()]
            }
        }
    }

    /// `<Product>__[<tags>__]` prefix shared by climate folders and result files.
    pub fn name_prefix(&self) -> String {
        let mut prefix = format!("{}__", self.data_product());
        for tag in self.scenario_tags() {
            prefix.push_str(&tag);
            prefix.push_str("__");
        }
        prefix
    }

    pub fn is_projection(&self) -> bool {
        !matches!(self, ClimateSource::Reanalysis)
    }
}

impl fmt::Display for ClimateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name_prefix().trim_end_matches('_'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cordex_validation() {
        assert!(ClimateSource::cordex(Rcp::Rcp45, "cnrm_cerfacs_cm5", "cnrm_aladin63").is_ok());
        assert!(ClimateSource::cordex(Rcp::Rcp45, "miroc_miroc5", "clmcom_clm_cclm4_8_17").is_err());
        assert!(ClimateSource::cordex(Rcp::Rcp26, "hadgem", "cnrm_aladin63").is_err());
        assert!("rcp_6_0".parse::<Rcp>().is_err());
    }

    #[test]
    fn test_cmip6_validation() {
        assert!(ClimateSource::cmip6(Ssp::Ssp245, "CESM2").is_ok());
        assert!(ClimateSource::cmip6(Ssp::Ssp245, "access_cm2").is_err());
    }

    #[test]
    fn test_name_prefix() {
        assert_eq!(ClimateSource::Reanalysis.name_prefix(), "ERA5__");
        let cordex = ClimateSource::cordex(Rcp::Rcp26, "mpi_m_mpi_esm_lr", "ictp_regcm4_6").unwrap();
        assert_eq!(
            cordex.name_prefix(),
            "CORDEX__RCP_2_6__MPI_M_MPI_ESM_LR__ICTP_REGCM4_6__"
        );
        let cmip6 = ClimateSource::cmip6(Ssp::Ssp585, "cesm2").unwrap();
        assert_eq!(cmip6.name_prefix(), "CMIP6__SSP5_8_5__CESM2__");
        assert_eq!(cmip6.to_string(), "CMIP6__SSP5_8_5__CESM2");
    }
}
