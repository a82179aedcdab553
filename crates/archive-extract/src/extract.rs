//! Single-archive extraction.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Component, Path, PathBuf};

use energy_common::ArchiveFormat;
use flate2::read::GzDecoder;
use tracing::{debug, info};

use crate::error::{ExtractError, ExtractResult};

/// Suffix of files extracted from an archive, before any regridding.
pub const EXTRACTED_SUFFIX: &str = "__original.nc";

fn detect(archive: &Path) -> ExtractResult<ArchiveFormat> {
    ArchiveFormat::detect(archive).ok_or_else(|| ExtractError::UnsupportedFormat(archive.to_path_buf()))
}

/// Canonical path of the file extracted from `archive`: same directory and
/// stem, with the archive extension replaced by `__original.nc`.
pub fn extracted_path(archive: &Path) -> ExtractResult<PathBuf> {
    let format = detect(archive)?;
    let name = archive
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| ExtractError::UnsupportedFormat(archive.to_path_buf()))?;
    let stem = format.strip_extension(name);
    Ok(archive.with_file_name(format!("{stem}{EXTRACTED_SUFFIX}")))
}

fn partial_path(destination: &Path) -> PathBuf {
    let mut name = destination.as_os_str().to_owned();
    name.push(".partial");
    PathBuf::from(name)
}

/// Entry paths must be relative and stay inside the extraction directory.
fn is_safe_entry(path: &Path) -> bool {
    path.components().next().is_some()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

fn open_tar(archive: &Path) -> io::Result<tar::Archive<GzDecoder<BufReader<File>>>> {
    let file = File::open(archive)?;
    Ok(tar::Archive::new(GzDecoder::new(BufReader::new(file))))
}

fn open_zip(archive: &Path) -> ExtractResult<zip::ZipArchive<BufReader<File>>> {
    let file = File::open(archive)?;
    Ok(zip::ZipArchive::new(BufReader::new(file))?)
}

/// Names of the regular files in `archive`. Directories and links are ignored.
pub fn list_entries(archive: &Path) -> ExtractResult<Vec<String>> {
    let mut names = Vec::new();
    match detect(archive)? {
        ArchiveFormat::TarGz => {
            let mut tar = open_tar(archive)?;
            for entry in tar.entries()? {
                let entry = entry?;
                if !entry.header().entry_type().is_file() {
                    continue;
                }
                let path = entry.path()?.into_owned();
                let name = path.to_string_lossy().into_owned();
                if !is_safe_entry(&path) {
                    return Err(ExtractError::unsafe_path(archive, name));
                }
                names.push(name);
            }
        }
        ArchiveFormat::Zip => {
            let mut zip = open_zip(archive)?;
            for i in 0..zip.len() {
                let file = zip.by_index(i)?;
                if file.is_dir() {
                    continue;
                }
                let safe = file.enclosed_name().map_or(false, is_safe_entry);
                if !safe {
                    return Err(ExtractError::unsafe_path(archive, file.name()));
                }
                names.push(file.name().to_string());
            }
        }
    }
    Ok(names)
}

/// Copy the single regular file of `archive` into `target`.
fn write_single_entry(archive: &Path, format: ArchiveFormat, target: &Path) -> ExtractResult<u64> {
    let mut out = BufWriter::new(File::create(target)?);
    let written = match format {
        ArchiveFormat::TarGz => {
            let mut tar = open_tar(archive)?;
            let mut written = None;
            for entry in tar.entries()? {
                let mut entry = entry?;
                if entry.header().entry_type().is_file() {
                    written = Some(io::copy(&mut entry, &mut out)?);
                    break;
                }
            }
            written.ok_or_else(|| ExtractError::EmptyArchive(archive.to_path_buf()))?
        }
        ArchiveFormat::Zip => {
            let mut zip = open_zip(archive)?;
            let mut written = None;
            for i in 0..zip.len() {
                let mut file = zip.by_index(i)?;
                if !file.is_dir() {
                    written = Some(io::copy(&mut file, &mut out)?);
                    break;
                }
            }
            written.ok_or_else(|| ExtractError::EmptyArchive(archive.to_path_buf()))?
        }
    };
    out.flush()?;
    Ok(written)
}

/// Extract the single file of `archive` to `destination` and delete the archive.
///
/// The archive must hold exactly one regular file. On any failure the
/// archive is kept and no file is left at `destination`.
pub fn extract_archive(archive: &Path, destination: &Path, overwrite: bool) -> ExtractResult<PathBuf> {
    let format = detect(archive)?;
    let entries = list_entries(archive)?;
    let entry = match entries.as_slice() {
        [] => return Err(ExtractError::EmptyArchive(archive.to_path_buf())),
        [entry] => entry.clone(),
        _ => {
            return Err(ExtractError::MultipleEntries {
                archive: archive.to_path_buf(),
                entries,
            })
        }
    };

    if destination.exists() && !overwrite {
        return Err(ExtractError::DestinationExists(destination.to_path_buf()));
    }
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)?;
    }

    let partial = partial_path(destination);
    let written = match write_single_entry(archive, format, &partial) {
        Ok(written) => written,
        Err(e) => {
            let _ = fs::remove_file(&partial);
            return Err(e);
        }
    };
    fs::rename(&partial, destination)?;
    debug!(archive = %archive.display(), entry = %entry, bytes = written, "Extracted entry");

    fs::remove_file(archive)?;
    info!(archive = %archive.display(), destination = %destination.display(), "Extracted archive");
    Ok(destination.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::{write_tar_gz, write_zip};

    #[test]
    fn test_extracted_path() {
        let archive = Path::new("/data/CORDEX__x/2015__3hourly_10m_wind_speed.tar.gz");
        assert_eq!(
            extracted_path(archive).unwrap(),
            Path::new("/data/CORDEX__x/2015__3hourly_10m_wind_speed__original.nc")
        );
        assert_eq!(
            extracted_path(Path::new("a/2015__monthly_x.zip")).unwrap(),
            Path::new("a/2015__monthly_x__original.nc")
        );
        assert!(matches!(
            extracted_path(Path::new("a/2015.nc")),
            Err(ExtractError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_unsafe_entries() {
        assert!(is_safe_entry(Path::new("data/file.nc")));
        assert!(is_safe_entry(Path::new("./file.nc")));
        assert!(!is_safe_entry(Path::new("../file.nc")));
        assert!(!is_safe_entry(Path::new("/etc/passwd")));
        assert!(!is_safe_entry(Path::new("")));
    }

    #[test]
    fn test_tar_gz_single_entry() {
        let dir = tempfile::tempdir().unwrap();
        let archive = write_tar_gz(dir.path(), "2015__3hourly_x.tar.gz", &[("model_output.nc", &b"netcdf bytes"[..])]);
        let destination = extracted_path(&archive).unwrap();

        let out = extract_archive(&archive, &destination, false).unwrap();
        assert_eq!(fs::read(&out).unwrap(), &b"netcdf bytes"[..]);
        assert!(!archive.exists());
        assert!(!partial_path(&destination).exists());
    }

    #[test]
    fn test_zip_multiple_entries_keeps_archive() {
        let dir = tempfile::tempdir().unwrap();
        let archive = write_zip(dir.path(), "2015__monthly_x.zip", &[("a.nc", &b"a"[..]), ("b.nc", &b"b"[..])]);
        let destination = extracted_path(&archive).unwrap();

        match extract_archive(&archive, &destination, false) {
            Err(ExtractError::MultipleEntries { entries, .. }) => assert_eq!(entries, vec!["a.nc", "b.nc"]),
            other => panic!("expected MultipleEntries, got {other:?}"),
        }
        assert!(archive.exists());
        assert!(!destination.exists());
    }

    #[test]
    fn test_empty_archive() {
        let dir = tempfile::tempdir().unwrap();
        let archive = write_tar_gz(dir.path(), "empty.tgz", &[]);
        let destination = dir.path().join("out.nc");
        assert!(matches!(
            extract_archive(&archive, &destination, false),
            Err(ExtractError::EmptyArchive(_))
        ));
        assert!(archive.exists());
    }

    #[test]
    fn test_existing_destination() {
        let dir = tempfile::tempdir().unwrap();
        let archive = write_zip(dir.path(), "x.zip", &[("x.nc", &b"new"[..])]);
        let destination = dir.path().join("x.nc");
        fs::write(&destination, &b"old"[..]).unwrap();

        assert!(matches!(
            extract_archive(&archive, &destination, false),
            Err(ExtractError::DestinationExists(_))
        ));
        assert_eq!(fs::read(&destination).unwrap(), &b"old"[..]);

        extract_archive(&archive, &destination, true).unwrap();
        assert_eq!(fs::read(&destination).unwrap(), &b"new"[..]);
    }
}
