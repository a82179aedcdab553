//! Batch extraction over a cache directory.

use std::fs;

use archive_extract::{extract_all, ExtractError};
use test_utils::{write_tar_gz, write_zip};

#[test]
fn test_batch_extracts_and_reports_failures() {
    let dir = tempfile::tempdir().unwrap();
    let cordex = dir.path().join("Europe__CORDEX__RCP_2_6__2m_air_temperature");
    let cmip6 = dir.path().join("Europe__CMIP6__SSP2_4_5__near_surface_air_temperature");
    fs::create_dir_all(&cordex).unwrap();
    fs::create_dir_all(&cmip6).unwrap();

    let good = write_tar_gz(&cordex, "2015__3hourly_2m_air_temperature.tar.gz", &[("tas.nc", &b"tas"[..])]);
    let bad = write_zip(&cmip6, "2015__monthly_x.zip", &[("a.nc", &b"a"[..]), ("b.nc", &b"b"[..])]);
    fs::write(cordex.join("notes.txt"), &b"not an archive"[..]).unwrap();

    let report = extract_all(dir.path(), false).unwrap();
    assert_eq!(report.extracted.len(), 1);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, bad);
    assert!(!good.exists());
    assert_eq!(
        fs::read(cordex.join("2015__3hourly_2m_air_temperature__original.nc")).unwrap(),
        b"tas"
    );

    assert!(matches!(
        report.into_result(),
        Err(ExtractError::BatchFailed { failed: 1, total: 2 })
    ));
}

#[test]
fn test_batch_skips_existing_output() {
    let dir = tempfile::tempdir().unwrap();
    let archive = write_zip(dir.path(), "2016__daily_x.zip", &[("x.nc", &b"new"[..])]);
    let existing = dir.path().join("2016__daily_x__original.nc");
    fs::write(&existing, &b"old"[..]).unwrap();

    let report = extract_all(dir.path(), false).unwrap().into_result().unwrap();
    assert_eq!(report.skipped, vec![archive.clone()]);
    assert!(archive.exists());
    assert_eq!(fs::read(&existing).unwrap(), &b"old"[..]);
}
