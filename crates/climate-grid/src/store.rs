//! Where grids are read from and written to.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{GridError, GridResult};
use crate::grid::ClimateGrid;

/// Access to gridded files by canonical path.
///
/// Each file holds a single variable on a `(time, lat, lon)` grid.
pub trait GridStore {
    fn read(&self, path: &Path) -> GridResult<ClimateGrid>;

    fn write(&self, path: &Path, grid: &ClimateGrid) -> GridResult<()>;

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

/// In-memory store keyed by path, for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    grids: RefCell<HashMap<PathBuf, ClimateGrid>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, path: impl Into<PathBuf>, grid: ClimateGrid) {
        self.grids.borrow_mut().insert(path.into(), grid);
    }

    pub fn len(&self) -> usize {
        self.grids.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.grids.borrow().is_empty()
    }
}

impl GridStore for MemoryStore {
    fn read(&self, path: &Path) -> GridResult<ClimateGrid> {
        self.grids
            .borrow()
            .get(path)
            .cloned()
            .ok_or_else(|| GridError::open_failed(format!("{} not found", path.display())))
    }

    fn write(&self, path: &Path, grid: &ClimateGrid) -> GridResult<()> {
        self.insert(path, grid.clone());
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.grids.borrow().contains_key(path)
    }
}
