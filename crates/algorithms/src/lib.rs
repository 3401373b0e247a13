//! # vistack Algorithms
//!
//! Per-pixel algorithms applied to each acquisition:
//!
//! - **imagery**: quality masking, spectral indices (NDVI, EVI, kNDVI, NIRv,
//!   NDWI, NMDI), index images and area-of-interest clipping

pub mod imagery;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::imagery::{
        apply_quality_mask, clip_to_circle, compute_index_image, IndexImage, QualityClass,
        QualityMask, SpectralIndex, REFLECTANCE_SCALE,
    };
    pub use vistack_core::prelude::*;
}
