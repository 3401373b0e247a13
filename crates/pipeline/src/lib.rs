//! # vistack Pipeline
//!
//! Builds time-ordered vegetation-index stacks for a circular area and
//! exports them as multiband GeoTIFFs.
//!
//! ```ignore
//! use vistack_pipeline::{Engine, PipelineConfig, StacImageCatalog};
//!
//! let job = PipelineConfig::from_file("job.toml")?.validate()?;
//! let engine = Engine::new(StacImageCatalog::new(job.catalog())?, job.output_dir());
//! for outcome in engine.run(job.tasks()) {
//!     println!("{}: {}", outcome.task.file_name, outcome.is_completed());
//! }
//! ```

pub mod aoi;
pub mod catalog;
pub mod collection;
pub mod config;
pub mod engine;
pub mod error;
pub mod export;
pub mod interval;
pub mod request;
pub mod stac_catalog;
pub mod stack;

pub use aoi::AreaOfInterest;
pub use catalog::{CatalogQuery, ImageCatalog, MemoryCatalog};
pub use collection::{assemble_collection, select_acquisitions};
pub use config::{JobSpec, PipelineConfig};
pub use engine::{Engine, ExportOutcome, ExportStatus};
pub use error::{ExportFailure, PipelineError, Result};
pub use export::{ExportManifest, ExportReport};
pub use interval::DateInterval;
pub use request::{bands_for, ExportTask, StackRequest};
pub use stac_catalog::StacImageCatalog;
