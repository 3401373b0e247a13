//! Satellite acquisitions: one capture, its spectral bands and quality band.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::geometry::BBox;
use crate::raster::Raster;

/// Spectral bands used by the index formulas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpectralBand {
    Blue,
    Green,
    Red,
    Nir,
    Swir1,
    Swir2,
}

impl SpectralBand {
    pub const ALL: [SpectralBand; 6] = [
        SpectralBand::Blue,
        SpectralBand::Green,
        SpectralBand::Red,
        SpectralBand::Nir,
        SpectralBand::Swir1,
        SpectralBand::Swir2,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SpectralBand::Blue => "blue",
            SpectralBand::Green => "green",
            SpectralBand::Red => "red",
            SpectralBand::Nir => "nir",
            SpectralBand::Swir1 => "swir1",
            SpectralBand::Swir2 => "swir2",
        }
    }
}

impl fmt::Display for SpectralBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One satellite image captured at one instant.
///
/// Spectral bands hold raw digital numbers (reflectance x 10000) with NaN
/// for no-data. All bands and the quality band share the same grid.
#[derive(Debug, Clone)]
pub struct Acquisition {
    /// Catalog identity, used in output band names
    pub id: String,
    pub acquired: DateTime<Utc>,
    /// Scene-level cloud cover in percent
    pub cloud_cover: Option<f64>,
    /// Footprint in WGS84
    pub footprint: BBox,
    pub bands: HashMap<SpectralBand, Raster<f64>>,
    /// Categorical per-pixel classification (Sentinel-2 SCL codes)
    pub quality: Option<Raster<u8>>,
}

impl Acquisition {
    pub fn new(id: impl Into<String>, acquired: DateTime<Utc>, footprint: BBox) -> Self {
        Self {
            id: id.into(),
            acquired,
            cloud_cover: None,
            footprint,
            bands: HashMap::new(),
            quality: None,
        }
    }

    pub fn with_cloud_cover(mut self, pct: f64) -> Self {
        self.cloud_cover = Some(pct);
        self
    }

    pub fn with_band(mut self, band: SpectralBand, raster: Raster<f64>) -> Self {
        self.bands.insert(band, raster);
        self
    }

    pub fn with_quality(mut self, quality: Raster<u8>) -> Self {
        self.quality = Some(quality);
        self
    }

    /// Borrow a band, failing with [`Error::MissingBand`] if absent.
    pub fn band(&self, band: SpectralBand) -> Result<&Raster<f64>> {
        self.bands.get(&band).ok_or_else(|| Error::MissingBand {
            acquisition: self.id.clone(),
            band: band.to_string(),
        })
    }

    pub fn quality(&self) -> Result<&Raster<u8>> {
        self.quality
            .as_ref()
            .ok_or_else(|| Error::MissingQualityBand(self.id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_missing_band_error_names_band() {
        let acq = Acquisition::new(
            "S2A_TEST",
            Utc.with_ymd_and_hms(2022, 1, 5, 10, 54, 21).unwrap(),
            BBox::new(0.0, 0.0, 1.0, 1.0),
        )
        .with_band(SpectralBand::Red, Raster::filled(2, 2, 1000.0));

        assert!(acq.band(SpectralBand::Red).is_ok());
        let err = acq.band(SpectralBand::Nir).unwrap_err();
        assert_eq!(err.to_string(), "Acquisition 'S2A_TEST' has no nir band");
        assert!(matches!(acq.quality(), Err(Error::MissingQualityBand(_))));
    }
}
