//! Ordered multiband raster with named bands.

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::raster::{GridSpec, Raster};

/// One band of a [`RasterStack`].
#[derive(Debug, Clone)]
pub struct NamedBand {
    /// Band label, e.g. `NDVI_S2A_MSIL2A_20220105T105421_R051_T30TVK`
    pub name: String,
    /// Acquisition time of the source image
    pub acquired: DateTime<Utc>,
    pub raster: Raster<f64>,
}

/// A multiband raster: every band shares one [`GridSpec`].
///
/// Bands keep insertion order; callers push them in acquisition order.
#[derive(Debug, Clone)]
pub struct RasterStack {
    grid: GridSpec,
    bands: Vec<NamedBand>,
}

impl RasterStack {
    pub fn new(grid: GridSpec) -> Self {
        Self {
            grid,
            bands: Vec::new(),
        }
    }

    /// Append a band. Its shape must match the stack grid.
    pub fn push(&mut self, band: NamedBand) -> Result<()> {
        let (rows, cols) = band.raster.shape();
        if rows != self.grid.rows || cols != self.grid.cols {
            return Err(Error::SizeMismatch {
                er: self.grid.rows,
                ec: self.grid.cols,
                ar: rows,
                ac: cols,
            });
        }
        self.bands.push(band);
        Ok(())
    }

    pub fn grid(&self) -> &GridSpec {
        &self.grid
    }

    pub fn bands(&self) -> &[NamedBand] {
        &self.bands
    }

    pub fn band(&self, idx: usize) -> Option<&NamedBand> {
        self.bands.get(idx)
    }

    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }

    pub fn band_names(&self) -> Vec<&str> {
        self.bands.iter().map(|b| b.name.as_str()).collect()
    }

    /// True when band timestamps never decrease.
    pub fn is_time_ordered(&self) -> bool {
        self.bands.windows(2).all(|w| w[0].acquired <= w[1].acquired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crs::CRS;
    use crate::raster::GeoTransform;
    use chrono::TimeZone;

    fn grid() -> GridSpec {
        GridSpec::new(CRS::from_epsg(32630), GeoTransform::default(), 3, 3)
    }

    fn band(name: &str, day: u32, rows: usize) -> NamedBand {
        NamedBand {
            name: name.to_string(),
            acquired: Utc.with_ymd_and_hms(2022, 1, day, 10, 0, 0).unwrap(),
            raster: Raster::filled(rows, 3, 0.5),
        }
    }

    #[test]
    fn test_push_and_order() {
        let mut stack = RasterStack::new(grid());
        stack.push(band("NDVI_a", 3, 3)).unwrap();
        stack.push(band("NDVI_b", 8, 3)).unwrap();
        assert_eq!(stack.band_names(), vec!["NDVI_a", "NDVI_b"]);
        assert!(stack.is_time_ordered());

        stack.push(band("NDVI_c", 1, 3)).unwrap();
        assert!(!stack.is_time_ordered());
    }

    #[test]
    fn test_push_rejects_shape_mismatch() {
        let mut stack = RasterStack::new(grid());
        assert!(stack.push(band("NDVI_a", 3, 4)).is_err());
        assert!(stack.is_empty());
    }
}
