//! Imagery algorithms
//!
//! - Quality mask: hide pixels whose scene class is not accepted
//! - Spectral indices: NDVI, EVI, kNDVI, NIRv, NDWI, NMDI
//! - Index images: one labelled index band per acquisition
//! - Clip: hide pixels outside a circular area of interest

mod clip;
mod index_image;
mod indices;
mod quality;

pub use clip::clip_to_circle;
pub use index_image::{compute_index_image, IndexImage};
pub use indices::{
    evi, kndvi, ndvi, ndwi, nirv, nmdi, normalized_difference, SpectralIndex, REFLECTANCE_SCALE,
};
pub use quality::{apply_quality_mask, QualityClass, QualityMask};
