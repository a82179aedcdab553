//! Energy carriers produced by the conversion stage.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::country::Country;
use crate::error::{EnergyError, EnergyResult};
use crate::time::Granularity;

/// How gridded values are reduced to a single country value per time step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reduction {
    /// `Σ v·w / Σ w` - intensive quantities (capacity factors, temperatures).
    WeightedMean,
    /// `Σ v·w` - extensive quantities (water mass flowing into basins).
    WeightedSum,
}

/// A supply or demand series family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Carrier {
    WindOnshore,
    WindOffshore,
    Solar,
    HydroReservoir,
    HydroRunOfRiver,
    Heating,
    Cooling,
    Temperature,
}

impl Carrier {
    pub const ALL: [Carrier; 8] = [
        Carrier::WindOnshore,
        Carrier::WindOffshore,
        Carrier::Solar,
        Carrier::HydroReservoir,
        Carrier::HydroRunOfRiver,
        Carrier::Heating,
        Carrier::Cooling,
        Carrier::Temperature,
    ];

    /// Short identifier used on the command line and in configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            Carrier::WindOnshore => "wind_onshore",
            Carrier::WindOffshore => "wind_offshore",
            Carrier::Solar => "solar",
            Carrier::HydroReservoir => "hydro_reservoir",
            Carrier::HydroRunOfRiver => "hydro_run_of_river",
            Carrier::Heating => "heating",
            Carrier::Cooling => "cooling",
            Carrier::Temperature => "temperature",
        }
    }

    /// Base name of the result file for this carrier.
    ///
    /// Heating produces one file per sector; the sector is appended to this base.
    pub fn series_name(&self) -> &'static str {
        match self {
            Carrier::WindOnshore => "wind__capacity_factor_time_series__onshore",
            Carrier::WindOffshore => "wind__capacity_factor_time_series__offshore",
            Carrier::Solar => "solar__capacity_factor_time_series",
            Carrier::HydroReservoir => "hydropower__inflow_time_series__conventional_and_pumped_storage",
            Carrier::HydroRunOfRiver => "hydropower__inflow_time_series__run_of_river",
            Carrier::Heating => "heating__demand_time_series",
            Carrier::Cooling => "cooling__demand_time_series",
            Carrier::Temperature => "temperature__time_series",
        }
    }

    /// Resource name used for calibration coefficient files.
    pub fn resource_type(&self) -> &'static str {
        match self {
            Carrier::WindOnshore | Carrier::WindOffshore => "wind",
            Carrier::Solar => "solar",
            Carrier::HydroReservoir | Carrier::HydroRunOfRiver => "hydropower",
            Carrier::Heating => "heating",
            Carrier::Cooling => "cooling",
            Carrier::Temperature => "temperature",
        }
    }

    /// Suffix distinguishing carriers that share a resource type.
    pub fn coefficient_suffix(&self) -> &'static str {
        match self {
            Carrier::WindOnshore => "__onshore",
            Carrier::WindOffshore => "__offshore",
            Carrier::HydroReservoir => "__conventional_and_pumped_storage",
            Carrier::HydroRunOfRiver => "__run_of_river",
            _ => "",
        }
    }

    /// Name of the mask file (without country prefix) used to aggregate this carrier.
    pub fn mask_kind(&self) -> &'static str {
        match self {
            Carrier::WindOnshore => "wind_onshore",
            Carrier::WindOffshore => "wind_offshore",
            Carrier::Solar => "solar",
            Carrier::HydroReservoir => "hydro_basins__conventional_and_pumped_storage",
            Carrier::HydroRunOfRiver => "hydro_basins__run_of_river",
            Carrier::Heating | Carrier::Cooling | Carrier::Temperature => "population",
        }
    }

    /// Whether a series of this carrier is produced for `country`.
    pub fn applies_to(&self, country: &Country) -> bool {
        match self {
            Carrier::WindOffshore => country.offshore_wind,
            _ => true,
        }
    }

    pub fn reduction(&self) -> Reduction {
        match self {
            Carrier::HydroReservoir | Carrier::HydroRunOfRiver => Reduction::WeightedSum,
            _ => Reduction::WeightedMean,
        }
    }

    /// Calibration period length used when none is configured.
    pub fn default_granularity(&self) -> Granularity {
        match self {
            Carrier::HydroReservoir | Carrier::HydroRunOfRiver => Granularity::Monthly,
            _ => Granularity::Yearly,
        }
    }

    pub fn units(&self) -> &'static str {
        match self {
            Carrier::WindOnshore | Carrier::WindOffshore | Carrier::Solar => "kW/kWi",
            Carrier::HydroReservoir | Carrier::HydroRunOfRiver => "GWh",
            Carrier::Heating | Carrier::Cooling => "kW/kWh",
            Carrier::Temperature => "K",
        }
    }
}

impl fmt::Display for Carrier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Carrier {
    type Err = EnergyError;

    fn from_str(s: &str) -> EnergyResult<Self> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        Carrier::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == normalized)
            .ok_or_else(|| EnergyError::invalid("carrier", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trips_identifiers() {
        for carrier in Carrier::ALL {
            assert_eq!(carrier.as_str().parse::<Carrier>().unwrap(), carrier);
        }
        assert_eq!("Hydro-Run-Of-River".parse::<Carrier>().unwrap(), Carrier::HydroRunOfRiver);
        assert!("nuclear".parse::<Carrier>().is_err());
    }

    #[test]
    fn test_hydro_is_summed() {
        assert_eq!(Carrier::HydroReservoir.reduction(), Reduction::WeightedSum);
        assert_eq!(Carrier::WindOnshore.reduction(), Reduction::WeightedMean);
        assert_eq!(Carrier::Heating.mask_kind(), "population");
    }

    #[test]
    fn test_offshore_only_where_flagged() {
        let austria = crate::find_country("AT").unwrap();
        let denmark = crate::find_country("DK").unwrap();
        assert!(!Carrier::WindOffshore.applies_to(austria));
        assert!(Carrier::WindOffshore.applies_to(denmark));
        assert!(Carrier::WindOnshore.applies_to(austria));
    }
}
