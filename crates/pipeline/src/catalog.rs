//! The imagery catalog seam
//!
//! A catalog answers two questions: which acquisitions may match a query,
//! and which acquisition fixes the output grid for an area. The STAC-backed
//! implementation lives in [`crate::stac_catalog`]; [`MemoryCatalog`] serves
//! preloaded acquisitions and stands in for a remote platform in tests.

use vistack_core::{Acquisition, SpectralBand};

use crate::aoi::AreaOfInterest;
use crate::error::{PipelineError, Result};
use crate::interval::DateInterval;

/// Filters for one collection query
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogQuery {
    pub aoi: AreaOfInterest,
    pub interval: DateInterval,
    /// Inclusive scene cloud-cover ceiling in percent
    pub max_cloud_cover: f64,
    /// Bands the caller will read from each acquisition
    pub bands: Vec<SpectralBand>,
}

/// Source of acquisitions.
///
/// `query` may pre-filter as much or as little as it likes; collection
/// assembly re-applies every filter.
pub trait ImageCatalog {
    /// Acquisitions possibly matching `query`, with at least the requested
    /// bands and the quality band loaded.
    fn query(&self, query: &CatalogQuery) -> Result<Vec<Acquisition>>;

    /// Earliest acquisition intersecting `aoi`, ignoring dates and clouds.
    /// Only its grid is used, so implementations may load a single band.
    fn reference_acquisition(&self, aoi: &AreaOfInterest) -> Result<Acquisition>;
}

/// In-memory catalog over preloaded acquisitions.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    acquisitions: Vec<Acquisition>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, acq: Acquisition) -> Self {
        self.acquisitions.push(acq);
        self
    }

    pub fn push(&mut self, acq: Acquisition) {
        self.acquisitions.push(acq);
    }

    pub fn len(&self) -> usize {
        self.acquisitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.acquisitions.is_empty()
    }
}

impl FromIterator<Acquisition> for MemoryCatalog {
    fn from_iter<I: IntoIterator<Item = Acquisition>>(iter: I) -> Self {
        Self {
            acquisitions: iter.into_iter().collect(),
        }
    }
}

impl ImageCatalog for MemoryCatalog {
    /// Everything intersecting the area, in insertion order. Dates and
    /// clouds are left to collection assembly.
    fn query(&self, query: &CatalogQuery) -> Result<Vec<Acquisition>> {
        let bbox = query.aoi.bbox();
        Ok(self
            .acquisitions
            .iter()
            .filter(|a| a.footprint.intersects(&bbox))
            .cloned()
            .collect())
    }

    fn reference_acquisition(&self, aoi: &AreaOfInterest) -> Result<Acquisition> {
        let bbox = aoi.bbox();
        self.acquisitions
            .iter()
            .filter(|a| a.footprint.intersects(&bbox))
            .min_by_key(|a| a.acquired)
            .cloned()
            .ok_or_else(|| PipelineError::Catalog("no acquisition intersects the area of interest".into()))
    }
}

impl<C: ImageCatalog + ?Sized> ImageCatalog for &C {
    fn query(&self, query: &CatalogQuery) -> Result<Vec<Acquisition>> {
        (**self).query(query)
    }

    fn reference_acquisition(&self, aoi: &AreaOfInterest) -> Result<Acquisition> {
        (**self).reference_acquisition(aoi)
    }
}
