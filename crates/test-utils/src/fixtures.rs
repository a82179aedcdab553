//! On-disk fixtures: archives, masks and reference tables written into
//! temporary directories.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;

/// A small power curve in the turbine YAML format (rated at 12 m/s).
pub const TEST_TURBINE_YAML: &str = "\
name: Test turbine
manufacturer: Test
source: synthetic
hub_height: 100.0
V: [0.0, 3.0, 5.0, 10.0, 12.0, 25.0, 25.1]
P: [0.0, 0.0, 200.0, 1500.0, 2000.0, 2000.0, 0.0]
";

/// Write a `.tar.gz` archive holding the given `(name, contents)` entries.
pub fn write_tar_gz(dir: &Path, archive_name: &str, entries: &[(&str, &[u8])]) -> PathBuf {
    let path = dir.join(archive_name);
    let file = File::create(&path).expect("create archive");
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = tar::Builder::new(encoder);

    for (name, contents) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, name, *contents)
            .expect("append tar entry");
    }

    builder
        .into_inner()
        .and_then(|encoder| encoder.finish())
        .expect("finish archive");
    path
}

/// Write a `.zip` archive holding the given `(name, contents)` entries.
pub fn write_zip(dir: &Path, archive_name: &str, entries: &[(&str, &[u8])]) -> PathBuf {
    let path = dir.join(archive_name);
    let file = File::create(&path).expect("create archive");
    let mut writer = zip::ZipWriter::new(file);
    let options =
        zip::write::FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    for (name, contents) in entries {
        writer.start_file(*name, options).expect("start zip entry");
        writer.write_all(contents).expect("write zip entry");
    }
    writer.finish().expect("finish archive");
    path
}

/// `;`-separated heat factor table with decimal commas and one column per
/// temperature class; the factor of row `h` in class `c` is `base(h) + c + 20`.
pub fn temperature_class_csv(rows: usize, base: impl Fn(usize) -> f64) -> String {
    const CLASSES: [i32; 10] = [-15, -10, -5, 0, 5, 10, 15, 20, 25, 30];
    let mut text = String::from("hour");
    for class in CLASSES {
        text.push_str(&format!(";{class}"));
    }
    text.push('\n');
    for h in 0..rows {
        text.push_str(&h.to_string());
        for class in CLASSES {
            text.push_str(&format!(";{}", format!("{:.1}", base(h) + class as f64 + 20.0).replace('.', ",")));
        }
        text.push('\n');
    }
    text
}

/// Write a `lat,lon,weight` mask file.
pub fn write_mask_csv(path: &Path, rows: &[(f64, f64, f64)]) {
    write_lines(
        path,
        "lat,lon,weight",
        rows.iter().map(|(lat, lon, w)| format!("{lat},{lon},{w}")),
    );
}

/// Write a `country,period,total` reference table.
pub fn write_reference_csv(path: &Path, rows: &[(&str, &str, f64)]) {
    write_lines(
        path,
        "country,period,total",
        rows.iter().map(|(c, p, t)| format!("{c},{p},{t}")),
    );
}

/// Write a `country,year,resource,capacity` installed capacity table.
pub fn write_capacity_csv(path: &Path, rows: &[(&str, i32, &str, f64)]) {
    write_lines(
        path,
        "country,year,resource,capacity",
        rows.iter().map(|(c, y, r, cap)| format!("{c},{y},{r},{cap}")),
    );
}

fn write_lines(path: &Path, header: &str, lines: impl Iterator<Item = String>) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create fixture directory");
    }
    let mut file = File::create(path).expect("create fixture");
    writeln!(file, "{header}").expect("write header");
    for line in lines {
        writeln!(file, "{line}").expect("write row");
    }
}
