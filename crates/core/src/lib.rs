//! # vistack Core
//!
//! Core types and I/O shared by every vistack crate.
//!
//! This crate provides:
//! - `Raster<T>`: georeferenced single-band grid
//! - `RasterStack`: ordered, named multiband raster
//! - `GeoTransform` / `GridSpec`: affine georeferencing and target grids
//! - `CRS`: coordinate reference systems, with WGS84 <-> UTM transforms
//! - `Acquisition`: one satellite capture with its spectral and quality bands
//! - GeoTIFF reading and multiband writing

pub mod acquisition;
pub mod crs;
pub mod error;
pub mod geometry;
pub mod io;
pub mod raster;

pub use acquisition::{Acquisition, SpectralBand};
pub use crs::CRS;
pub use error::{Error, Result};
pub use geometry::{BBox, GeoPoint};
pub use raster::{GeoTransform, GridSpec, NamedBand, Raster, RasterElement, RasterStack};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::acquisition::{Acquisition, SpectralBand};
    pub use crate::crs::CRS;
    pub use crate::error::{Error, Result};
    pub use crate::geometry::{BBox, GeoPoint};
    pub use crate::raster::{GeoTransform, GridSpec, Raster, RasterElement, RasterStack};
}
