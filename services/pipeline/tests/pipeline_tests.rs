//! Stage runs against a temporary data tree and an in-memory grid store.

use std::path::Path;

use chrono::{Duration, TimeZone, Utc};
use climate_grid::{ClimateGrid, GridStore, InterpolationMethod, MemoryStore, RotatedPole};
use energy_common::{find_country, Carrier, ClimateSource, Country, TimeResolution, TimeSeries};
use energy_conversion::{
    ClimateInputs, ConversionSettings, DegreeDayThresholds, HeatProfiles, Quantity, SolarPanel, WindTurbine,
};
use energy_pipeline::{adequacy, calibrate, convert, fit, regrid, Settings};
use resource_adequacy::{read_table, AdequacyRow, BestMixRow};
use test_utils::{
    assert_approx_eq, constant_grid, time_varying_grid, write_capacity_csv, write_mask_csv, write_reference_csv,
    TEST_TURBINE_YAML,
};

const WIND_SERIES: &str = "wind__capacity_factor_time_series__onshore";

const CORDEX_SOURCE: &str = "
climate_source:
  kind: cordex
  experiment: rcp_2_6
  models:
    global_climate_model: cnrm_cerfacs_cm5
    regional_climate_model: cnrm_aladin63
";

fn settings(root: &Path, source_yaml: &str) -> Settings {
    let yaml = format!(
        "
directories:
  climate_data: {root}/climate
  energy_data: {root}/energy
  results: {root}/results
  calibration: {root}/calibration
years: {{start: 2015, end: 2015}}
turbines:
  onshore: unused.yaml
  offshore: unused.yaml
{source_yaml}
",
        root = root.display()
    );
    Settings::from_yaml_str(&yaml).unwrap()
}

fn conversion_settings() -> ConversionSettings {
    let turbine = WindTurbine::from_yaml_str(TEST_TURBINE_YAML).unwrap();
    ConversionSettings {
        onshore_turbine: turbine.clone(),
        offshore_turbine: turbine,
        solar_panel: SolarPanel::default(),
        heat_profiles: HeatProfiles::flat(),
        thresholds: DegreeDayThresholds::default(),
        reference_year: 2015,
        roughness_file: None,
    }
}

fn germany() -> &'static Country {
    find_country("DE").unwrap()
}

/// Three days of ERA5 wind over a 2x2 grid and the German onshore mask.
fn wind_fixture(settings: &Settings) -> MemoryStore {
    let store = MemoryStore::new();
    let paths = settings.paths();
    let inputs = ClimateInputs::new(&store, &paths, &settings.climate_source);

    let speeds: Vec<f32> = (0..72).map(|h| 4.0 + (h % 8) as f32).collect();
    store.insert(
        inputs.path(Quantity::WindU, 2015).unwrap(),
        time_varying_grid("u100", "m s**-1", 2015, &speeds, 2, 2),
    );
    store.insert(
        inputs.path(Quantity::WindV, 2015).unwrap(),
        constant_grid("v100", "m s**-1", 2015, speeds.len(), 2, 2, 0.0),
    );
    store.insert(
        inputs.path(Quantity::Roughness, 2015).unwrap(),
        constant_grid("fsr", "m", 2015, speeds.len(), 2, 2, 0.03),
    );

    write_mask_csv(
        &paths.mask_file(germany(), Carrier::WindOnshore),
        &[(50.0, 10.0, 1.0), (50.0, 10.25, 1.0), (49.75, 10.0, 1.0), (49.75, 10.25, 1.0)],
    );
    store
}

fn read_wind_result(settings: &Settings) -> TimeSeries {
    let path = settings
        .paths()
        .result_file(germany(), &settings.climate_source, WIND_SERIES);
    TimeSeries::read_csv(&path, WIND_SERIES, Carrier::WindOnshore.units()).unwrap()
}

#[test]
fn test_convert_writes_once() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings(dir.path(), "");
    let store = wind_fixture(&settings);
    let conversion = conversion_settings();

    let summary = convert::run(&store, &settings, &conversion, Carrier::WindOnshore, &[germany()], false).unwrap();
    assert_eq!(summary.written.len(), 1);
    assert!(summary.written[0].ends_with("DE__ERA5__wind__capacity_factor_time_series__onshore.csv"));

    let series = read_wind_result(&settings);
    assert_eq!(series.len(), 72);
    assert!(series.values().iter().all(|v| (0.0..=1.0).contains(v)));

    let again = convert::run(&store, &settings, &conversion, Carrier::WindOnshore, &[germany()], false).unwrap();
    assert!(again.written.is_empty());
    assert_eq!(again.skipped.len(), 1);
}

#[test]
fn test_fitted_coefficients_are_applied_on_conversion() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings(dir.path(), "");
    let store = wind_fixture(&settings);
    let conversion = conversion_settings();

    convert::run(&store, &settings, &conversion, Carrier::WindOnshore, &[germany()], false).unwrap();
    let uncorrected = fit::finite_mean(&read_wind_result(&settings));
    let measured = uncorrected * 1.1;
    write_reference_csv(
        &settings.capacity_factor_path(Carrier::WindOnshore),
        &[("DE", "2015", measured)],
    );

    let fitted = fit::run(&store, &settings, &conversion, Carrier::WindOnshore, &[germany()]).unwrap();
    assert_eq!(fitted.len(), 1);
    assert!(fitted[0].saved);
    assert_eq!(fitted[0].names, vec!["alpha", "beta"]);

    // a second fit for the same year keeps the stored values
    let refit = fit::run(&store, &settings, &conversion, Carrier::WindOnshore, &[germany()]).unwrap();
    assert!(!refit[0].saved);

    convert::run(&store, &settings, &conversion, Carrier::WindOnshore, &[germany()], true).unwrap();
    assert_approx_eq!(fit::finite_mean(&read_wind_result(&settings)), measured, 1e-3);
}

#[test]
fn test_calibrate_matches_reference_total() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings(dir.path(), "");
    let store = wind_fixture(&settings);
    convert::run(&store, &settings, &conversion_settings(), Carrier::WindOnshore, &[germany()], false).unwrap();

    write_reference_csv(
        &settings.reference_path(WIND_SERIES),
        &[("DE", "2015", 30.0), ("FR", "2015", 99.0)],
    );
    let reports = calibrate::run(&settings, Carrier::WindOnshore, &[germany()]).unwrap();
    assert_eq!(reports.len(), 1);
    assert!(reports[0].1.is_complete());
    assert_approx_eq!(read_wind_result(&settings).sum(), 30.0, 1e-6);

    assert!(calibrate::run(&settings, Carrier::Temperature, &[germany()]).is_err());
}

#[test]
fn test_regrid_projection_onto_reanalysis_grid() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings(dir.path(), CORDEX_SOURCE);
    let paths = settings.paths();
    let store = MemoryStore::new();

    store.insert(
        regrid::template_path(&paths, settings.reference_year),
        constant_grid("t2m", "K", 2015, 1, 2, 2, 280.0),
    );

    // 3-hourly native grid starting the evening before the file's year
    let start = Utc.with_ymd_and_hms(2029, 12, 31, 21, 0, 0).unwrap();
    let times = (0..4).map(|i| start + Duration::hours(3 * i)).collect();
    let native = ClimateGrid::new(
        "sfcWind",
        "m s-1",
        times,
        vec![50.5, 50.0, 49.5, 49.0],
        vec![9.5, 10.0, 10.5, 11.0],
        vec![5.0; 4 * 16],
    )
    .unwrap();
    let original = paths.original_file(
        &settings.climate_source,
        "10m_wind_speed",
        2030,
        TimeResolution::ThreeHourly,
    );
    std::fs::create_dir_all(original.parent().unwrap()).unwrap();
    std::fs::write(&original, b"").unwrap();
    store.insert(&original, native);

    let summary = regrid::run(&store, &settings, InterpolationMethod::Bilinear, false).unwrap();
    assert_eq!(summary.regridded.len(), 1);

    let output = paths.climate_file(
        &settings.climate_source,
        "10m_wind_speed",
        2030,
        TimeResolution::ThreeHourly,
    );
    assert_eq!(summary.regridded[0], output);
    let regridded = store.read(&output).unwrap();
    assert_eq!(regridded.lats(), &[50.0, 49.75]);
    assert_eq!(regridded.lons(), &[10.0, 10.25]);
    assert_eq!(regridded.nt(), 3);
    assert!(regridded.data().iter().all(|v| (*v - 5.0).abs() < 1e-6));

    let again = regrid::run(&store, &settings, InterpolationMethod::Bilinear, false).unwrap();
    assert!(again.regridded.is_empty());
    assert_eq!(again.skipped.len(), 1);
}

#[test]
fn test_regrid_rotated_pole_projection() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings(dir.path(), CORDEX_SOURCE);
    let paths = settings.paths();
    let store = MemoryStore::new();
    store.insert(
        regrid::template_path(&paths, settings.reference_year),
        constant_grid("t2m", "K", 2015, 1, 2, 2, 280.0),
    );

    // EUR-11 style rotated axes; the target cells sit near rlat -0.6, rlon -5
    let start = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
    let times = (0..2).map(|i| start + Duration::hours(3 * i)).collect();
    let native = ClimateGrid::new(
        "sfcWind",
        "m s-1",
        times,
        vec![-1.0, -0.5, 0.0],
        vec![-5.5, -5.0, -4.5],
        vec![7.0; 2 * 9],
    )
    .unwrap()
    .with_rotated_pole(RotatedPole::new(39.25, -162.0));
    let original = paths.original_file(
        &settings.climate_source,
        "10m_wind_speed",
        2030,
        TimeResolution::ThreeHourly,
    );
    std::fs::create_dir_all(original.parent().unwrap()).unwrap();
    std::fs::write(&original, b"").unwrap();
    store.insert(&original, native);

    let summary = regrid::run(&store, &settings, InterpolationMethod::Bilinear, false).unwrap();
    let regridded = store.read(&summary.regridded[0]).unwrap();
    assert!(regridded.rotated_pole().is_none());
    assert_eq!(regridded.lats(), &[50.0, 49.75]);
    assert_eq!(regridded.nt(), 2);
    assert!(regridded.data().iter().all(|v| (*v - 7.0).abs() < 1e-6));
}

#[test]
fn test_regrid_is_a_no_op_for_reanalysis() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings(dir.path(), "");
    let summary = regrid::run(&MemoryStore::new(), &settings, InterpolationMethod::Nearest, false).unwrap();
    assert!(summary.regridded.is_empty());
    assert_eq!(ClimateSource::Reanalysis, settings.climate_source);
}

const ADEQUACY_GRID: &str = "
resource_adequacy:
  wind_and_solar_fractions: {start: 1.0, end: 2.0, step: 1.0}
  wind_fractions: {start: 0.0, end: 1.0, step: 0.25}
";

/// Four hours of measured operation in 2019: wind in the first two hours,
/// sun in the last two.
fn adequacy_fixture(settings: &Settings) {
    let paths = settings.paths();
    let start = Utc.with_ymd_and_hms(2019, 6, 1, 0, 0, 0).unwrap();
    let times: Vec<_> = (0..4).map(|h| start + Duration::hours(h)).collect();

    let mut table = String::from(
        "time,demand,conventional_hydropower_generation,pumped_storage_generation,\
         pumped_storage_consumption,run_of_river_generation,reservoir_filling_level\n",
    );
    for (time, level) in times.iter().zip(["1000", "900", "950", "1000"]) {
        table.push_str(&format!("{},100,10,0,0,10,{level}\n", time.to_rfc3339()));
    }
    let system_path = settings.power_system_path(germany(), 2019);
    std::fs::create_dir_all(system_path.parent().unwrap()).unwrap();
    std::fs::write(&system_path, table).unwrap();
    write_capacity_csv(
        &settings.installed_capacity_path(),
        &[("DE", 2019, "conventional_hydropower", 40.0)],
    );

    // one hour more than measured, which is ignored
    let mut long_times = times.clone();
    long_times.push(start + Duration::hours(4));
    for (carrier, values) in [
        (Carrier::WindOnshore, vec![1.0, 1.0, 0.0, 0.0, 0.5]),
        (Carrier::Solar, vec![0.0, 0.0, 1.0, 1.0, 0.5]),
        (Carrier::HydroReservoir, vec![2.0; 5]),
    ] {
        let series = TimeSeries::new(carrier.series_name(), carrier.units(), long_times.clone(), values).unwrap();
        series
            .write_csv(&paths.result_file(germany(), &settings.climate_source, carrier.series_name()))
            .unwrap();
    }
}

#[test]
fn test_adequacy_tables_per_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings(dir.path(), ADEQUACY_GRID);
    adequacy_fixture(&settings);

    let summary = adequacy::run(&settings, &[germany()], false).unwrap();
    assert_eq!(summary.written.len(), 1);

    let rows: Vec<AdequacyRow> = read_table(&summary.written[0]).unwrap();
    // four default scenarios, two totals, five wind fractions
    assert_eq!(rows.len(), 4 * 2 * 5);
    let balanced = rows
        .iter()
        .find(|r| r.scenario == "actual_hydropower" && r.wind_and_solar_fraction == 1.0 && r.wind_fraction == 0.5)
        .unwrap();
    assert_approx_eq!(balanced.adequacy, 1.0, 1e-9);
    let only_wind = |scenario: &str| {
        rows.iter()
            .find(|r| r.scenario == scenario && r.wind_and_solar_fraction == 1.0 && r.wind_fraction == 1.0)
            .map(|r| r.adequacy)
            .unwrap()
    };
    assert_approx_eq!(only_wind("actual_hydropower"), 0.6, 1e-9);
    assert!(only_wind("dispatched_hydropower__pumped_storage_0") > 0.6);

    let best_path = settings
        .paths()
        .result_file(germany(), &settings.climate_source, adequacy::BEST_MIX_TABLE);
    let best: Vec<BestMixRow> = read_table(&best_path).unwrap();
    assert_eq!(best.len(), 4 * 2);
    assert_approx_eq!(best[0].best_wind_fraction.unwrap(), 0.5, 1e-9);

    let again = adequacy::run(&settings, &[germany()], false).unwrap();
    assert!(again.written.is_empty());
    assert_eq!(again.skipped.len(), 1);
}

#[test]
fn test_adequacy_skips_countries_without_power_system_data() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings(dir.path(), ADEQUACY_GRID);
    let summary = adequacy::run(&settings, &[germany()], false).unwrap();
    assert!(summary.written.is_empty());
    assert!(summary.skipped.is_empty());
}
