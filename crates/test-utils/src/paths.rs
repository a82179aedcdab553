//! Locations of the repository configuration used by tests.

use std::path::PathBuf;

/// Repository root, two levels above this crate.
pub fn workspace_root() -> PathBuf {
    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .ancestors()
        .nth(2)
        .map(|p| p.to_path_buf())
        .unwrap_or(manifest_dir)
}

/// `config/` directory holding settings, turbine curves and heat profiles.
pub fn config_dir() -> PathBuf {
    workspace_root().join("config")
}

/// A file under `config/`, or `None` when it is missing.
pub fn config_file(name: &str) -> Option<PathBuf> {
    Some(config_dir().join(name)).filter(|path| path.exists())
}
