//! Error types for the index pipeline

use std::path::PathBuf;

use thiserror::Error;

/// Why an export job could not produce its file
#[derive(Error, Debug)]
pub enum ExportFailure {
    #[error("export grid has {pixels} pixels, above the limit of {max_pixels}")]
    TooManyPixels { pixels: u64, max_pixels: u64 },

    #[error("cannot create export folder {path}: {source}")]
    Folder {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        source: vistack_core::Error,
    },

    #[error("cannot write sidecar {path}: {reason}")]
    Sidecar { path: PathBuf, reason: String },
}

/// Main error type for pipeline operations
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Core(#[from] vistack_core::Error),

    #[error(transparent)]
    Cloud(#[from] vistack_cloud::CloudError),

    #[error("catalog error: {0}")]
    Catalog(String),

    #[error("export failed: {0}")]
    Export(#[from] ExportFailure),
}

/// Result alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;
