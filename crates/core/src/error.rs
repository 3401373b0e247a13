//! Error types for vistack

use thiserror::Error;

/// Main error type for vistack raster and index operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Raster size mismatch: expected ({er}, {ec}), got ({ar}, {ac})")]
    SizeMismatch { er: usize, ec: usize, ar: usize, ac: usize },

    #[error("CRS mismatch: {0} vs {1}")]
    CrsMismatch(String, String),

    #[error("Unsupported CRS: {0} (only EPSG:4326 and UTM 326xx/327xx are supported)")]
    UnsupportedCrs(String),

    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(String),

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Unknown spectral index '{0}' (expected one of NDVI, EVI, kNDVI, NIRv, NDWI, NMDI)")]
    UnknownIndex(String),

    #[error("Acquisition '{acquisition}' has no {band} band")]
    MissingBand { acquisition: String, band: String },

    #[error("Acquisition '{0}' has no quality band")]
    MissingQualityBand(String),

    #[error("No acquisitions matched the collection filters")]
    EmptyCollection,

    #[error("Algorithm error: {0}")]
    Algorithm(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for vistack operations
pub type Result<T> = std::result::Result<T, Error>;
