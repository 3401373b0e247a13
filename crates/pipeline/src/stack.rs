//! Stacking index images onto one grid

use tracing::debug;
use vistack_algorithms::imagery::{clip_to_circle, IndexImage};
use vistack_core::raster::resample_nearest;
use vistack_core::{Acquisition, Error, GridSpec, RasterStack, SpectralBand};

use crate::aoi::AreaOfInterest;
use crate::error::Result;

/// Metres per degree of latitude on the mean sphere
const METERS_PER_DEGREE: f64 = 111_195.08;

/// Output grid: the reference acquisition's CRS and pixel lattice,
/// `scale_m` cells, covering the area of interest.
pub fn target_grid(reference: &Acquisition, aoi: &AreaOfInterest, scale_m: f64) -> Result<GridSpec> {
    let band = reference
        .bands
        .get(&SpectralBand::Red)
        .or_else(|| reference.bands.values().next())
        .ok_or_else(|| Error::MissingBand {
            acquisition: reference.id.clone(),
            band: SpectralBand::Red.to_string(),
        })?;
    let crs = band
        .crs()
        .cloned()
        .ok_or_else(|| Error::Other(format!("reference acquisition '{}' has no CRS", reference.id)))?;

    let cell = if crs.is_geographic() {
        scale_m / METERS_PER_DEGREE
    } else {
        scale_m
    };
    let bbox = aoi.bbox_in(&crs)?;
    let grid = GridSpec::covering(crs, band.transform(), &bbox, cell)?;
    debug!(
        reference = %reference.id,
        crs = %grid.crs,
        rows = grid.rows,
        cols = grid.cols,
        "target grid"
    );
    Ok(grid)
}

/// Resample every image onto `grid`, clip it to the area of interest and
/// stack the results in the given order.
pub fn build_stack(images: Vec<IndexImage>, grid: &GridSpec, aoi: &AreaOfInterest) -> Result<RasterStack> {
    if images.is_empty() {
        return Err(Error::EmptyCollection.into());
    }

    let mut stack = RasterStack::new(grid.clone());
    for image in images {
        let mut raster = resample_nearest(&image.raster, grid)?;
        clip_to_circle(&mut raster, aoi.center(), aoi.radius_m())?;
        stack.push(image.into_named_band(raster))?;
    }
    Ok(stack)
}
