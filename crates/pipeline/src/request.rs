//! Declarative stack and export requests
//!
//! A [`StackRequest`] describes what to compute; nothing runs until an
//! [`Engine`](crate::engine::Engine) evaluates it.

use std::collections::BTreeSet;

use vistack_algorithms::imagery::{QualityMask, SpectralIndex};
use vistack_core::SpectralBand;

use crate::aoi::AreaOfInterest;
use crate::catalog::CatalogQuery;
use crate::interval::DateInterval;

pub const DEFAULT_MAX_CLOUD_COVER: f64 = 75.0;
pub const DEFAULT_SCALE_M: f64 = 10.0;
pub const DEFAULT_MAX_PIXELS: u64 = 10_000_000_000_000;

/// One index over one area and period, stacked on one grid.
#[derive(Debug, Clone, PartialEq)]
pub struct StackRequest {
    index: SpectralIndex,
    aoi: AreaOfInterest,
    interval: DateInterval,
    max_cloud_cover: f64,
    mask: QualityMask,
    scale_m: f64,
}

impl StackRequest {
    pub fn new(index: SpectralIndex, aoi: AreaOfInterest, interval: DateInterval) -> Self {
        Self {
            index,
            aoi,
            interval,
            max_cloud_cover: DEFAULT_MAX_CLOUD_COVER,
            mask: QualityMask::default(),
            scale_m: DEFAULT_SCALE_M,
        }
    }

    pub fn max_cloud_cover(mut self, pct: f64) -> Self {
        self.max_cloud_cover = pct;
        self
    }

    pub fn mask(mut self, mask: QualityMask) -> Self {
        self.mask = mask;
        self
    }

    /// Output pixel size in metres
    pub fn scale_m(mut self, scale_m: f64) -> Self {
        self.scale_m = scale_m;
        self
    }

    pub fn index(&self) -> SpectralIndex {
        self.index
    }

    pub fn aoi(&self) -> &AreaOfInterest {
        &self.aoi
    }

    pub fn interval(&self) -> &DateInterval {
        &self.interval
    }

    pub fn cloud_ceiling(&self) -> f64 {
        self.max_cloud_cover
    }

    pub fn quality_mask(&self) -> &QualityMask {
        &self.mask
    }

    pub fn scale(&self) -> f64 {
        self.scale_m
    }

    /// Catalog filters for this request.
    pub fn catalog_query(&self) -> CatalogQuery {
        CatalogQuery {
            aoi: self.aoi,
            interval: self.interval,
            max_cloud_cover: self.max_cloud_cover,
            bands: self.index.required_bands().to_vec(),
        }
    }
}

/// Bands needed by any of `indices`, deduplicated.
pub fn bands_for(indices: &[SpectralIndex]) -> Vec<SpectralBand> {
    let set: BTreeSet<SpectralBand> = indices
        .iter()
        .flat_map(|i| i.required_bands().iter().copied())
        .collect();
    set.into_iter().collect()
}

/// Write one evaluated request as a file.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportTask {
    pub request: StackRequest,
    /// Folder under the output root
    pub folder: String,
    /// File stem, without extension
    pub file_name: String,
    pub max_pixels: u64,
}

impl ExportTask {
    /// Task with the default name `<INDEX>_<start>_<end>`.
    pub fn new(request: StackRequest, folder: impl Into<String>) -> Self {
        let file_name = format!("{}_{}", request.index().name(), request.interval());
        Self {
            request,
            folder: folder.into(),
            file_name,
            max_pixels: DEFAULT_MAX_PIXELS,
        }
    }

    pub fn file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = name.into();
        self
    }

    pub fn max_pixels(mut self, max: u64) -> Self {
        self.max_pixels = max;
        self
    }

    pub fn region(&self) -> &AreaOfInterest {
        self.request.aoi()
    }

    pub fn scale_m(&self) -> f64 {
        self.request.scale()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use vistack_core::GeoPoint;

    fn request(index: SpectralIndex) -> StackRequest {
        StackRequest::new(
            index,
            AreaOfInterest::new(GeoPoint::new(-3.70, 40.42), 500.0).unwrap(),
            DateInterval::new(
                NaiveDate::from_ymd_opt(2022, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2022, 1, 31).unwrap(),
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_defaults() {
        let req = request(SpectralIndex::Evi);
        assert_eq!(req.cloud_ceiling(), 75.0);
        assert_eq!(req.scale(), 10.0);
        assert_eq!(req.quality_mask(), &QualityMask::default());
        assert_eq!(
            req.catalog_query().bands,
            vec![SpectralBand::Nir, SpectralBand::Red, SpectralBand::Blue]
        );
    }

    #[test]
    fn test_export_task_name() {
        let task = ExportTask::new(request(SpectralIndex::Kndvi), "vistack");
        assert_eq!(task.file_name, "kNDVI_2022-01-01_2022-01-31");
        assert_eq!(task.max_pixels, DEFAULT_MAX_PIXELS);
        assert_eq!(task.scale_m(), 10.0);
    }

    #[test]
    fn test_bands_for_dedups() {
        let bands = bands_for(&[SpectralIndex::Ndvi, SpectralIndex::Nirv, SpectralIndex::Ndwi]);
        assert_eq!(bands, vec![SpectralBand::Green, SpectralBand::Red, SpectralBand::Nir]);
    }
}
