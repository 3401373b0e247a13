//! Request evaluation and export execution

use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{info, warn};
use vistack_algorithms::imagery::{apply_quality_mask, compute_index_image, IndexImage};
use vistack_core::{Acquisition, Error, GridSpec, RasterStack};

use crate::catalog::ImageCatalog;
use crate::collection::assemble_collection;
use crate::error::{PipelineError, Result};
use crate::export::{check_pixel_budget, write_export, ExportReport};
use crate::request::{ExportTask, StackRequest};
use crate::stack::{build_stack, target_grid};

/// Final state of one export job
#[derive(Debug)]
pub enum ExportStatus {
    Completed(ExportReport),
    Failed(PipelineError),
}

/// One export job and how it ended
#[derive(Debug)]
pub struct ExportOutcome {
    pub task: ExportTask,
    pub status: ExportStatus,
}

impl ExportOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self.status, ExportStatus::Completed(_))
    }

    pub fn report(&self) -> Option<&ExportReport> {
        match &self.status {
            ExportStatus::Completed(report) => Some(report),
            ExportStatus::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&PipelineError> {
        match &self.status {
            ExportStatus::Failed(e) => Some(e),
            ExportStatus::Completed(_) => None,
        }
    }
}

/// Evaluates [`StackRequest`]s against a catalog and writes exports under
/// `output_dir`.
pub struct Engine<C> {
    catalog: C,
    output_dir: PathBuf,
}

impl<C: ImageCatalog> Engine<C> {
    pub fn new(catalog: C, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            catalog,
            output_dir: output_dir.into(),
        }
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Filtered, time-ordered acquisitions for `request`.
    pub fn collection(&self, request: &StackRequest) -> Result<Vec<Acquisition>> {
        assemble_collection(&self.catalog, &request.catalog_query())
    }

    /// Output grid for `request`, fixed by the catalog's reference acquisition.
    pub fn plan(&self, request: &StackRequest) -> Result<GridSpec> {
        let reference = self.catalog.reference_acquisition(request.aoi())?;
        target_grid(&reference, request.aoi(), request.scale())
    }

    /// Mask, compute, reproject and clip: the stacked raster for `request`.
    pub fn evaluate(&self, request: &StackRequest) -> Result<RasterStack> {
        let grid = self.plan(request)?;
        self.evaluate_on(request, &grid)
    }

    /// Run one export job. Failures are captured in the outcome.
    pub fn export(&self, task: ExportTask) -> ExportOutcome {
        let started = Instant::now();
        let status = match self.try_export(&task) {
            Ok(report) => {
                info!(
                    file = %task.file_name,
                    bands = report.band_names.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "export completed"
                );
                ExportStatus::Completed(report)
            }
            Err(e) => {
                warn!(file = %task.file_name, error = %e, "export failed");
                ExportStatus::Failed(e)
            }
        };
        ExportOutcome { task, status }
    }

    /// Run every task in order. Each job is independent of the others.
    pub fn run(&self, tasks: impl IntoIterator<Item = ExportTask>) -> Vec<ExportOutcome> {
        tasks.into_iter().map(|task| self.export(task)).collect()
    }

    fn try_export(&self, task: &ExportTask) -> Result<ExportReport> {
        let grid = self.plan(&task.request)?;
        check_pixel_budget(&grid, task.max_pixels)?;
        let stack = self.evaluate_on(&task.request, &grid)?;
        Ok(write_export(&stack, task, &self.output_dir)?)
    }

    fn evaluate_on(&self, request: &StackRequest, grid: &GridSpec) -> Result<RasterStack> {
        let collection = self.collection(request)?;
        if collection.is_empty() {
            return Err(Error::EmptyCollection.into());
        }

        let images = collection
            .iter()
            .map(|acq| index_image(acq, request))
            .collect::<Result<Vec<_>>>()?;

        build_stack(images, grid, request.aoi())
    }
}

fn index_image(acq: &Acquisition, request: &StackRequest) -> Result<IndexImage> {
    let masked = apply_quality_mask(acq, request.quality_mask())?;
    Ok(compute_index_image(&masked, request.index())?)
}
