//! Nearest-neighbour resampling onto a target grid.

use ndarray::Array2;
use rayon::prelude::*;

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{GridSpec, Raster};

/// Resample `src` onto `target` using nearest neighbour.
///
/// Each target pixel centre is transformed into the source CRS and the
/// source cell containing it is copied. Centres that fall outside the
/// source, or on source no-data, become NaN. A source raster without CRS
/// is assumed to share the target CRS.
pub fn resample_nearest(src: &Raster<f64>, target: &GridSpec) -> Result<Raster<f64>> {
    let src_crs = src.crs().cloned().unwrap_or_else(|| target.crs.clone());
    let same_crs = src_crs.is_equivalent(&target.crs);
    if !same_crs {
        // Fail early rather than once per pixel.
        probe_transform(&target.crs, &src_crs)?;
    }

    let (src_rows, src_cols) = src.shape();
    let nodata = src.nodata();
    let src_gt = *src.transform();
    let dst_gt = target.transform;
    let cols = target.cols;

    let data: Vec<f64> = (0..target.rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                let (x, y) = dst_gt.pixel_to_geo(col, row);
                let (sx, sy) = if same_crs {
                    (x, y)
                } else {
                    match target.crs.transform_to(&src_crs, x, y) {
                        Ok(p) => p,
                        Err(_) => continue,
                    }
                };

                let (c, r) = src_gt.geo_to_pixel(sx, sy);
                if !(c >= 0.0 && r >= 0.0) {
                    continue;
                }
                let (c, r) = (c.floor() as usize, r.floor() as usize);
                if c >= src_cols || r >= src_rows {
                    continue;
                }

                let v = unsafe { src.get_unchecked(r, c) };
                if v.is_nan() || nodata.map_or(false, |nd| (v - nd).abs() < f64::EPSILON) {
                    continue;
                }
                *out = v;
            }
            row_data
        })
        .collect();

    let mut out = Raster::from_array(
        Array2::from_shape_vec((target.rows, target.cols), data)
            .map_err(|e| Error::Other(e.to_string()))?,
    );
    out.set_transform(target.transform);
    out.set_crs(Some(target.crs.clone()));
    out.set_nodata(Some(f64::NAN));
    Ok(out)
}

fn probe_transform(from: &CRS, to: &CRS) -> Result<()> {
    let (lon, lat) = (0.0, 0.0);
    from.from_wgs84(lon, lat)?;
    to.from_wgs84(lon, lat)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::GeoTransform;

    fn gradient(rows: usize, cols: usize, gt: GeoTransform) -> Raster<f64> {
        let mut r = Raster::new(rows, cols);
        for row in 0..rows {
            for col in 0..cols {
                r.set(row, col, (row * cols + col) as f64).unwrap();
            }
        }
        r.set_transform(gt);
        r.set_crs(Some(CRS::from_epsg(32630)));
        r
    }

    #[test]
    fn test_identity_grid_copies_values() {
        let gt = GeoTransform::new(500_000.0, 4_000_000.0, 10.0, -10.0);
        let src = gradient(4, 4, gt);
        let grid = GridSpec::of(&src).unwrap();

        let out = resample_nearest(&src, &grid).unwrap();
        assert_eq!(out.data(), src.data());
    }

    #[test]
    fn test_downsample_20m_to_10m() {
        // 20 m source, 10 m target: every source cell covers 2x2 targets
        let src = gradient(2, 2, GeoTransform::new(500_000.0, 4_000_000.0, 20.0, -20.0));
        let grid = GridSpec::new(
            CRS::from_epsg(32630),
            GeoTransform::new(500_000.0, 4_000_000.0, 10.0, -10.0),
            4,
            4,
        );

        let out = resample_nearest(&src, &grid).unwrap();
        assert_eq!(out.get(0, 0).unwrap(), 0.0);
        assert_eq!(out.get(1, 1).unwrap(), 0.0);
        assert_eq!(out.get(0, 2).unwrap(), 1.0);
        assert_eq!(out.get(3, 3).unwrap(), 3.0);
    }

    #[test]
    fn test_outside_source_is_nan() {
        let src = gradient(2, 2, GeoTransform::new(500_000.0, 4_000_000.0, 10.0, -10.0));
        let grid = GridSpec::new(
            CRS::from_epsg(32630),
            GeoTransform::new(499_990.0, 4_000_000.0, 10.0, -10.0),
            1,
            2,
        );
        let out = resample_nearest(&src, &grid).unwrap();
        assert!(out.get(0, 0).unwrap().is_nan());
        assert_eq!(out.get(0, 1).unwrap(), 0.0);
    }

    #[test]
    fn test_unsupported_crs_fails() {
        let mut src = gradient(2, 2, GeoTransform::default());
        src.set_crs(Some(CRS::from_epsg(3857)));
        let grid = GridSpec::new(CRS::from_epsg(32630), GeoTransform::default(), 2, 2);
        assert!(matches!(
            resample_nearest(&src, &grid),
            Err(Error::UnsupportedCrs(_))
        ));
    }
}
