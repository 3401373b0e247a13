//! Single-band index results tied to their source acquisition

use chrono::{DateTime, Utc};
use vistack_core::raster::Raster;
use vistack_core::{Acquisition, NamedBand, Result};

use super::indices::SpectralIndex;

/// One index evaluated on one acquisition
#[derive(Debug, Clone)]
pub struct IndexImage {
    pub index: SpectralIndex,
    pub acquisition_id: String,
    pub acquired: DateTime<Utc>,
    pub raster: Raster<f64>,
}

impl IndexImage {
    /// Output band label, `<INDEX>_<acquisition-id>`
    pub fn band_label(&self) -> String {
        format!("{}_{}", self.index.name(), self.acquisition_id)
    }

    /// Turn into a stack band, replacing the raster (e.g. after resampling).
    pub fn into_named_band(self, raster: Raster<f64>) -> NamedBand {
        NamedBand {
            name: self.band_label(),
            acquired: self.acquired,
            raster,
        }
    }
}

/// Evaluate `index` on `acq`, keeping the acquisition's identity and time.
pub fn compute_index_image(acq: &Acquisition, index: SpectralIndex) -> Result<IndexImage> {
    let mut raster = index.compute(acq)?;
    if raster.crs().is_none() {
        // Bands loaded without CRS inherit the first available band's.
        let crs = acq.bands.values().find_map(|b| b.crs().cloned());
        raster.set_crs(crs);
    }
    Ok(IndexImage {
        index,
        acquisition_id: acq.id.clone(),
        acquired: acq.acquired,
        raster,
    })
}
