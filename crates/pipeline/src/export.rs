//! Export sink: multiband GeoTIFF plus a JSON sidecar

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use vistack_core::io::write_stack_geotiff;
use vistack_core::{GeoTransform, GridSpec, RasterStack};

use crate::error::ExportFailure;
use crate::request::ExportTask;

/// What a completed export wrote
#[derive(Debug, Clone, PartialEq)]
pub struct ExportReport {
    pub path: PathBuf,
    pub sidecar: PathBuf,
    pub band_names: Vec<String>,
    pub pixel_count: u64,
}

/// Contents of the `.json` sidecar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportManifest {
    pub file_name: String,
    pub index: String,
    pub start: String,
    pub end: String,
    pub crs: String,
    pub transform: GeoTransform,
    pub rows: usize,
    pub cols: usize,
    pub pixel_count: u64,
    pub scale_m: f64,
    pub bands: Vec<ManifestBand>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestBand {
    pub name: String,
    pub acquired: DateTime<Utc>,
}

/// Refuse grids above the task's pixel ceiling.
pub fn check_pixel_budget(grid: &GridSpec, max_pixels: u64) -> Result<(), ExportFailure> {
    let pixels = grid.pixel_count();
    if pixels > max_pixels {
        return Err(ExportFailure::TooManyPixels { pixels, max_pixels });
    }
    Ok(())
}

/// Write `stack` to `<root>/<folder>/<file_name>.tif` and its sidecar.
pub fn write_export(stack: &RasterStack, task: &ExportTask, root: &Path) -> Result<ExportReport, ExportFailure> {
    check_pixel_budget(stack.grid(), task.max_pixels)?;

    let dir = root.join(&task.folder);
    fs::create_dir_all(&dir).map_err(|source| ExportFailure::Folder {
        path: dir.clone(),
        source,
    })?;

    let path = dir.join(format!("{}.tif", task.file_name));
    write_stack_geotiff(stack, &path).map_err(|source| ExportFailure::Write {
        path: path.clone(),
        source,
    })?;

    let manifest = manifest(stack, task);
    let sidecar = dir.join(format!("{}.json", task.file_name));
    let json = serde_json::to_string_pretty(&manifest).map_err(|e| ExportFailure::Sidecar {
        path: sidecar.clone(),
        reason: e.to_string(),
    })?;
    fs::write(&sidecar, json).map_err(|e| ExportFailure::Sidecar {
        path: sidecar.clone(),
        reason: e.to_string(),
    })?;

    info!(path = %path.display(), bands = stack.band_count(), "export written");
    Ok(ExportReport {
        path,
        sidecar,
        band_names: manifest.bands.into_iter().map(|b| b.name).collect(),
        pixel_count: manifest.pixel_count,
    })
}

fn manifest(stack: &RasterStack, task: &ExportTask) -> ExportManifest {
    let grid = stack.grid();
    let request = &task.request;
    ExportManifest {
        file_name: task.file_name.clone(),
        index: request.index().name().to_string(),
        start: request.interval().start().to_string(),
        end: request.interval().end().to_string(),
        crs: grid.crs.identifier(),
        transform: grid.transform,
        rows: grid.rows,
        cols: grid.cols,
        pixel_count: grid.pixel_count(),
        scale_m: task.scale_m(),
        bands: stack
            .bands()
            .iter()
            .map(|b| ManifestBand {
                name: b.name.clone(),
                acquired: b.acquired,
            })
            .collect(),
    }
}
