//! Registry of the European countries processed by the pipeline.

use chrono::{FixedOffset, Offset, Utc};
use chrono_tz::Tz;

use crate::error::{EnergyError, EnergyResult};

/// A country with the metadata the conversion stages need.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Country {
    /// English short name, as accepted on the command line.
    pub name: &'static str,
    /// ISO 3166-1 alpha-2 code, used in every output file name.
    pub iso_alpha2: &'static str,
    /// Standard (winter) offset from UTC in hours.
    pub utc_offset_hours: i32,
    /// Whether offshore wind series are produced for this country.
    pub offshore_wind: bool,
    /// Civil time zone, daylight saving time included.
    pub time_zone: Tz,
}

impl Country {
    /// Hours to add to UTC timestamps to obtain local standard time.
    pub fn hour_shift(&self) -> f64 {
        self.utc_offset_hours as f64
    }

    /// Local standard time zone as a fixed offset.
    pub fn local_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_hours * 3600).unwrap_or_else(|| Utc.fix())
    }
}

const fn country(
    name: &'static str,
    iso_alpha2: &'static str,
    utc_offset_hours: i32,
    offshore_wind: bool,
    time_zone: Tz,
) -> Country {
    Country {
        name,
        iso_alpha2,
        utc_offset_hours,
        offshore_wind,
        time_zone,
    }
}

static EUROPEAN_COUNTRIES: [Country; 36] = [
    country("Albania", "AL", 1, false, Tz::Europe__Tirane),
    country("Austria", "AT", 1, false, Tz::Europe__Vienna),
    country("Belgium", "BE", 1, true, Tz::Europe__Brussels),
    country("Bosnia and Herzegovina", "BA", 1, false, Tz::Europe__Sarajevo),
    country("Bulgaria", "BG", 2, false, Tz::Europe__Sofia),
    country("Croatia", "HR", 1, false, Tz::Europe__Zagreb),
    country("Cyprus", "CY", 2, false, Tz::Asia__Nicosia),
    country("Czech Republic", "CZ", 1, false, Tz::Europe__Prague),
    country("Denmark", "DK", 1, true, Tz::Europe__Copenhagen),
    country("Estonia", "EE", 2, true, Tz::Europe__Tallinn),
    country("Finland", "FI", 2, true, Tz::Europe__Helsinki),
    country("France", "FR", 1, true, Tz::Europe__Paris),
    country("Germany", "DE", 1, true, Tz::Europe__Berlin),
    country("Greece", "GR", 2, false, Tz::Europe__Athens),
    country("Hungary", "HU", 1, false, Tz::Europe__Budapest),
    country("Ireland", "IE", 0, true, Tz::Europe__Dublin),
    country("Italy", "IT", 1, true, Tz::Europe__Rome),
    country("Kosovo", "XK", 1, false, Tz::Europe__Belgrade),
    country("Latvia", "LV", 2, true, Tz::Europe__Riga),
    country("Lithuania", "LT", 2, true, Tz::Europe__Vilnius),
    country("Luxembourg", "LU", 1, false, Tz::Europe__Luxembourg),
    country("Malta", "MT", 1, false, Tz::Europe__Malta),
    country("Montenegro", "ME", 1, false, Tz::Europe__Podgorica),
    country("Netherlands", "NL", 1, true, Tz::Europe__Amsterdam),
    country("North Macedonia", "MK", 1, false, Tz::Europe__Skopje),
    country("Norway", "NO", 1, true, Tz::Europe__Oslo),
    country("Poland", "PL", 1, true, Tz::Europe__Warsaw),
    country("Portugal", "PT", 0, true, Tz::Europe__Lisbon),
    country("Romania", "RO", 2, false, Tz::Europe__Bucharest),
    country("Serbia", "RS", 1, false, Tz::Europe__Belgrade),
    country("Slovakia", "SK", 1, false, Tz::Europe__Bratislava),
    country("Slovenia", "SI", 1, false, Tz::Europe__Ljubljana),
    country("Spain", "ES", 1, true, Tz::Europe__Madrid),
    country("Sweden", "SE", 1, true, Tz::Europe__Stockholm),
    country("Switzerland", "CH", 1, false, Tz::Europe__Zurich),
    country("United Kingdom", "GB", 0, true, Tz::Europe__London),
];

/// All countries of the European focus region.
pub fn european_countries() -> &'static [Country] {
    &EUROPEAN_COUNTRIES
}

/// Look up a country by name or ISO alpha-2 code (case-insensitive).
pub fn find_country(query: &str) -> EnergyResult<&'static Country> {
    let query = query.trim();
    EUROPEAN_COUNTRIES
        .iter()
        .find(|c| c.name.eq_ignore_ascii_case(query) || c.iso_alpha2.eq_ignore_ascii_case(query))
        .ok_or_else(|| EnergyError::UnknownCountry(query.to_string()))
}

/// Resolve the optional country argument of a stage.
///
/// `None` selects every European country.
pub fn select_countries(query: Option<&str>) -> EnergyResult<Vec<&'static Country>> {
    match query {
        Some(q) => Ok(vec![find_country(q)?]),
        None => Ok(EUROPEAN_COUNTRIES.iter().collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_by_name_and_code() {
        assert_eq!(find_country("Germany").unwrap().iso_alpha2, "DE");
        assert_eq!(find_country("de").unwrap().name, "Germany");
        assert_eq!(find_country(" united kingdom ").unwrap().iso_alpha2, "GB");
        assert!(matches!(
            find_country("Atlantis"),
            Err(EnergyError::UnknownCountry(_))
        ));
    }

    #[test]
    fn test_select_defaults_to_all() {
        assert_eq!(select_countries(None).unwrap().len(), european_countries().len());
        assert_eq!(select_countries(Some("PT")).unwrap().len(), 1);
    }

    #[test]
    fn test_codes_are_unique() {
        let mut codes: Vec<_> = european_countries().iter().map(|c| c.iso_alpha2).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), european_countries().len());
    }

    #[test]
    fn test_local_offset() {
        let greece = find_country("GR").unwrap();
        assert_eq!(greece.local_offset().local_minus_utc(), 7200);
        assert_eq!(greece.hour_shift(), 2.0);
    }

    #[test]
    fn test_time_zone_follows_daylight_saving() {
        use chrono::{TimeZone, Timelike};

        let germany = find_country("DE").unwrap();
        let winter = Utc.with_ymd_and_hms(2015, 1, 15, 12, 0, 0).unwrap();
        let summer = Utc.with_ymd_and_hms(2015, 7, 15, 12, 0, 0).unwrap();
        assert_eq!(winter.with_timezone(&germany.time_zone).hour(), 13);
        assert_eq!(summer.with_timezone(&germany.time_zone).hour(), 14);
        assert_eq!(find_country("Kosovo").unwrap().time_zone, Tz::Europe__Belgrade);
    }

    #[test]
    fn test_standard_offsets_match_time_zones() {
        use chrono::TimeZone;

        let january = Utc.with_ymd_and_hms(2015, 1, 15, 0, 0, 0).unwrap().naive_utc();
        for country in european_countries() {
            let offset = country.time_zone.offset_from_utc_datetime(&january).fix();
            assert_eq!(offset, country.local_offset(), "{}", country.name);
        }
    }
}
