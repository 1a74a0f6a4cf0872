use std::fs;
use std::path::{Path, PathBuf};

use ndarray::{Array2, Array3, ArrayView2, ArrayView3};
use ndarray_npy::{read_npy, write_npy};

use rsf_core::Grid;

use crate::error::{Result, StoreError};
use crate::report::{RunReport, read_report, write_report};

pub const FIELD_FILE: &str = "field.npy";
pub const GRADIENT_MAP_FILE: &str = "gradient_map.npy";
pub const TRAJECTORIES_FILE: &str = "trajectories.npy";
pub const REPORT_FILE: &str = "report.json";

pub fn write_array(path: &Path, array: ArrayView2<'_, f64>) -> Result<()> {
    write_npy(path, &array).map_err(|e| StoreError::npy_write(path, e))?;
    tracing::debug!(path = %path.display(), shape = ?array.dim(), "array written");
    Ok(())
}

pub fn read_array(path: &Path) -> Result<Array2<f64>> {
    read_npy(path).map_err(|e| StoreError::npy_read(path, e))
}

/// Positions shaped `[n_particles, n_steps, 2]`.
pub fn write_trajectories(path: &Path, trajectories: ArrayView3<'_, f64>) -> Result<()> {
    let (n, _, dims) = trajectories.dim();
    if dims != 2 {
        return Err(StoreError::InvalidData(format!(
            "trajectories need 2 coordinates per point, got {dims}"
        )));
    }
    write_npy(path, &trajectories).map_err(|e| StoreError::npy_write(path, e))?;
    tracing::debug!(path = %path.display(), particles = n, "trajectories written");
    Ok(())
}

pub fn read_trajectories(path: &Path) -> Result<Array3<f64>> {
    read_npy(path).map_err(|e| StoreError::npy_read(path, e))
}

/// Compute |∇Φ| on `grid` and persist it to `path`. Returns the map.
pub fn export_gradient_map(
    grid: &Grid,
    field: ArrayView2<'_, f64>,
    path: &Path,
) -> Result<Array2<f64>> {
    if field.dim() != grid.shape() {
        return Err(StoreError::InvalidData(format!(
            "field has shape {:?}, grid is {:?}",
            field.dim(),
            grid.shape()
        )));
    }
    let map = grid.gradient_magnitude(field);
    write_array(path, map.view())?;
    tracing::info!(path = %path.display(), "gradient map exported");
    Ok(map)
}

/// A directory holding the artifacts of one run under fixed file names.
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    /// Open `root`, creating it (and any parents) if needed.
    pub fn open(root: &Path) -> Result<Self> {
        fs::create_dir_all(root).map_err(|e| StoreError::io(root, e))?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, file: &str) -> PathBuf {
        self.root.join(file)
    }

    pub fn write_field(&self, field: ArrayView2<'_, f64>) -> Result<PathBuf> {
        let path = self.path(FIELD_FILE);
        write_array(&path, field)?;
        Ok(path)
    }

    pub fn read_field(&self) -> Result<Array2<f64>> {
        read_array(&self.path(FIELD_FILE))
    }

    pub fn write_gradient_map(
        &self,
        grid: &Grid,
        field: ArrayView2<'_, f64>,
    ) -> Result<Array2<f64>> {
        export_gradient_map(grid, field, &self.path(GRADIENT_MAP_FILE))
    }

    pub fn write_trajectories(&self, trajectories: ArrayView3<'_, f64>) -> Result<PathBuf> {
        let path = self.path(TRAJECTORIES_FILE);
        write_trajectories(&path, trajectories)?;
        Ok(path)
    }

    pub fn write_report(&self, report: &RunReport) -> Result<PathBuf> {
        let path = self.path(REPORT_FILE);
        write_report(&path, report)?;
        Ok(path)
    }

    pub fn read_report(&self) -> Result<RunReport> {
        read_report(&self.path(REPORT_FILE))
    }
}
