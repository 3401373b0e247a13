//! Circular clip of a georeferenced raster

use ndarray::Array2;
use rayon::prelude::*;
use vistack_core::raster::Raster;
use vistack_core::{Error, GeoPoint, Result, CRS};

/// Set every pixel whose centre lies farther than `radius_m` from `center`
/// to NaN. Distances are great-circle metres, measured in WGS84.
///
/// A raster without CRS is taken to be in WGS84 degrees.
pub fn clip_to_circle(raster: &mut Raster<f64>, center: GeoPoint, radius_m: f64) -> Result<()> {
    if !(radius_m > 0.0) {
        return Err(Error::InvalidParameter {
            name: "radius_m",
            value: radius_m.to_string(),
            reason: "radius must be positive".into(),
        });
    }

    let crs = raster.crs().cloned().unwrap_or_else(CRS::wgs84);
    // Reject unsupported CRS once instead of per pixel.
    crs.to_wgs84(raster.transform().origin_x, raster.transform().origin_y)?;

    let (rows, cols) = raster.shape();
    let gt = *raster.transform();
    let src = &*raster;

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                let (x, y) = gt.pixel_to_geo(col, row);
                let inside = crs
                    .to_wgs84(x, y)
                    .map(|(lon, lat)| center.distance_m(&GeoPoint::new(lon, lat)) <= radius_m)
                    .unwrap_or(false);
                if inside {
                    *out = unsafe { src.get_unchecked(row, col) };
                }
            }
            row_data
        })
        .collect();

    *raster.data_mut() =
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;
    raster.set_nodata(Some(f64::NAN));
    Ok(())
}
