//! Electrode grid geometry and recording metadata from the recording folder

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Grid description stored next to a recording
pub const GRID_FILE: &str = "grid.toml";

/// Electrode grid: `rows x cols` electrodes, channel `i` at row `i / cols`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridGeometry {
    pub rows: usize,
    pub cols: usize,
    /// Distance between rows (m)
    #[serde(default = "default_spacing")]
    pub row_spacing: f64,
    /// Distance between columns (m)
    #[serde(default = "default_spacing")]
    pub col_spacing: f64,
}

fn default_spacing() -> f64 {
    0.5
}

impl GridGeometry {
    pub fn new(rows: usize, cols: usize, row_spacing: f64, col_spacing: f64) -> Self {
        Self {
            rows,
            cols,
            row_spacing,
            col_spacing,
        }
    }

    pub fn num_electrodes(&self) -> usize {
        self.rows * self.cols
    }

    /// Read `grid.toml` from a recording folder
    pub fn load(folder: &Path) -> Result<Self> {
        let path = folder.join(GRID_FILE);
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read grid file: {}", path.display()))?;
        let grid: GridGeometry = toml::from_str(&content)
            .with_context(|| format!("Failed to parse grid file: {}", path.display()))?;
        grid.validate()?;
        Ok(grid)
    }

    pub fn validate(&self) -> Result<()> {
        if self.rows == 0 || self.cols == 0 {
            anyhow::bail!("grid needs at least one row and one column");
        }
        if self.row_spacing <= 0.0 || self.col_spacing <= 0.0 {
            anyhow::bail!("grid spacing must be > 0");
        }
        Ok(())
    }
}

/// Recording start parsed from a folder named `YYYY-MM-DD-HH_MM` (or `HH:MM`)
pub fn recording_datetime(folder: &Path) -> Option<NaiveDateTime> {
    let name = folder.file_name()?.to_str()?;
    ["%Y-%m-%d-%H_%M", "%Y-%m-%d-%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(name, fmt).ok())
}
