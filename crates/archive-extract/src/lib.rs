//! Extraction of downloaded climate archives.
//!
//! Projection data arrives as `.tar.gz` (CORDEX) or `.zip` (CMIP6) archives
//! holding a single NetCDF file. [`extract_archive`] unpacks that file under
//! its canonical name and removes the archive; [`extract_all`] does so for
//! every archive below a directory.

pub mod batch;
pub mod error;
pub mod extract;

pub use batch::{extract_all, BatchReport};
pub use error::{ExtractError, ExtractResult};
pub use extract::{extract_archive, extracted_path, list_entries, EXTRACTED_SUFFIX};
