//! Target pixel grids.

use serde::{Deserialize, Serialize};

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::geometry::BBox;
use crate::raster::{GeoTransform, Raster, RasterElement};

/// A pixel grid: CRS + transform + shape.
///
/// Every band of a stacked raster lives on one `GridSpec`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    pub crs: CRS,
    pub transform: GeoTransform,
    pub rows: usize,
    pub cols: usize,
}

impl GridSpec {
    pub fn new(crs: CRS, transform: GeoTransform, rows: usize, cols: usize) -> Self {
        Self { crs, transform, rows, cols }
    }

    /// Grid of an existing raster. Fails if the raster carries no CRS.
    pub fn of<T: RasterElement>(raster: &Raster<T>) -> Result<Self> {
        let crs = raster
            .crs()
            .cloned()
            .ok_or_else(|| Error::Other("raster has no CRS".into()))?;
        Ok(Self::new(crs, *raster.transform(), raster.rows(), raster.cols()))
    }

    /// Grid covering `bbox` (expressed in `crs`) with square cells of
    /// `cell` units, snapped to the lattice of `anchor`.
    pub fn covering(crs: CRS, anchor: &GeoTransform, bbox: &BBox, cell: f64) -> Result<Self> {
        if !(cell > 0.0) {
            return Err(Error::InvalidParameter {
                name: "cell",
                value: cell.to_string(),
                reason: "cell size must be positive".into(),
            });
        }
        let transform = anchor.aligned_to(bbox, cell);
        let cols = ((bbox.max_x - transform.origin_x) / cell).ceil().max(1.0) as usize;
        let rows = ((transform.origin_y - bbox.min_y) / cell).ceil().max(1.0) as usize;
        Ok(Self::new(crs, transform, rows, cols))
    }

    /// Number of pixels per band
    pub fn pixel_count(&self) -> u64 {
        self.rows as u64 * self.cols as u64
    }

    pub fn bounds(&self) -> BBox {
        self.transform.bounds(self.cols, self.rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_covering_contains_bbox() {
        let anchor = GeoTransform::new(399_960.0, 4_500_000.0, 10.0, -10.0);
        let bbox = BBox::new(439_800.0, 4_473_700.0, 440_800.0, 4_474_800.0);
        let grid = GridSpec::covering(CRS::from_epsg(32630), &anchor, &bbox, 10.0).unwrap();

        let b = grid.bounds();
        assert!(b.min_x <= bbox.min_x && b.max_x >= bbox.max_x);
        assert!(b.min_y <= bbox.min_y && b.max_y >= bbox.max_y);
        assert_eq!(grid.cols, 100);
        assert_eq!(grid.rows, 110);
        assert_eq!(grid.pixel_count(), 100 * 110);
    }

    #[test]
    fn test_covering_rejects_zero_cell() {
        let anchor = GeoTransform::default();
        let bbox = BBox::new(0.0, 0.0, 1.0, 1.0);
        assert!(GridSpec::covering(CRS::wgs84(), &anchor, &bbox, 0.0).is_err());
    }
}
