//! Turn a STAC item's band assets into an [`Acquisition`].
//!
//! Each asset is a single-band GeoTIFF. Bands are decoded clipped to the
//! area of interest, raw no-data is turned into NaN, and bands coarser than
//! the red band (20 m SWIR and SCL on Sentinel-2) are resampled onto the
//! red band's grid.

use serde::{Deserialize, Serialize};
use tracing::debug;
use vistack_core::io::{read_geotiff_from_buffer, GeoTiffReadOptions};
use vistack_core::raster::{resample_nearest, GridSpec, Raster};
use vistack_core::{Acquisition, BBox, SpectralBand, CRS};

use crate::error::{CloudError, Result};
use crate::stac_client::StacCatalog;
use crate::stac_models::StacItem;

/// Asset key for every band in a collection.
///
/// Defaults are the Earth Search `sentinel-2-l2a` names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetKeys {
    pub blue: String,
    pub green: String,
    pub red: String,
    pub nir: String,
    pub swir1: String,
    pub swir2: String,
    pub quality: String,
}

impl Default for AssetKeys {
    fn default() -> Self {
        Self {
            blue: "blue".into(),
            green: "green".into(),
            red: "red".into(),
            nir: "nir".into(),
            swir1: "swir16".into(),
            swir2: "swir22".into(),
            quality: "scl".into(),
        }
    }
}

impl AssetKeys {
    /// Planetary Computer `sentinel-2-l2a` names.
    pub fn planetary_computer() -> Self {
        Self {
            blue: "B02".into(),
            green: "B03".into(),
            red: "B04".into(),
            nir: "B08".into(),
            swir1: "B11".into(),
            swir2: "B12".into(),
            quality: "SCL".into(),
        }
    }

    /// Default names for a catalog's `sentinel-2-l2a` collection. Custom
    /// endpoints get the Earth Search names.
    pub fn for_catalog(catalog: &StacCatalog) -> Self {
        match catalog {
            StacCatalog::PlanetaryComputer => Self::planetary_computer(),
            StacCatalog::EarthSearch | StacCatalog::Custom(_) => Self::default(),
        }
    }

    pub fn key(&self, band: SpectralBand) -> &str {
        match band {
            SpectralBand::Blue => &self.blue,
            SpectralBand::Green => &self.green,
            SpectralBand::Red => &self.red,
            SpectralBand::Nir => &self.nir,
            SpectralBand::Swir1 => &self.swir1,
            SpectralBand::Swir2 => &self.swir2,
        }
    }
}

/// Build an acquisition from `item`, loading `bands` plus the quality band.
///
/// `fetch` returns the bytes behind an asset href. `clip` is a WGS84 box;
/// when the item advertises its EPSG code each asset is cropped to it.
pub fn load_acquisition<F>(
    item: &StacItem,
    keys: &AssetKeys,
    bands: &[SpectralBand],
    clip: Option<&BBox>,
    mut fetch: F,
) -> Result<Acquisition>
where
    F: FnMut(&str) -> Result<Vec<u8>>,
{
    let acquired = item.acquired().ok_or_else(|| invalid(item, "missing or bad datetime"))?;
    let footprint = item.footprint().ok_or_else(|| invalid(item, "missing bbox"))?;
    let crs = item.epsg().map(CRS::from_epsg);

    let options = GeoTiffReadOptions {
        band: None,
        clip: match (clip, &crs) {
            (Some(bbox), Some(crs)) => Some(project_bbox(bbox, crs)?),
            _ => None,
        },
    };

    let mut read = |key: &str| -> Result<Vec<u8>> {
        let asset = item.asset(key).ok_or_else(|| CloudError::AssetNotFound {
            item: item.id.clone(),
            key: key.to_string(),
        })?;
        fetch(&asset.href)
    };

    // The red band fixes the acquisition grid.
    let mut red: Raster<f64> = read_geotiff_from_buffer(&read(&keys.red)?, &options)?;
    if red.crs().is_none() {
        red.set_crs(crs.clone());
    }
    let grid = GridSpec::of(&red).map_err(|_| invalid(item, "red band has no CRS"))?;

    let mut acq = Acquisition::new(item.id.clone(), acquired, footprint);
    if let Some(cc) = item.cloud_cover() {
        acq = acq.with_cloud_cover(cc);
    }

    for &band in bands {
        let raster = if band == SpectralBand::Red {
            red.clone()
        } else {
            let mut raster: Raster<f64> = read_geotiff_from_buffer(&read(keys.key(band))?, &options)?;
            if raster.crs().is_none() {
                raster.set_crs(crs.clone());
            }
            onto_grid(raster, &grid)?
        };
        acq = acq.with_band(band, raster.map_valid(|v| v));
    }

    let scl: Raster<u8> = read_geotiff_from_buffer(&read(&keys.quality)?, &options)?;
    let quality = quality_onto_grid(scl, &grid, crs)?;

    debug!(id = %acq.id, bands = acq.bands.len(), rows = grid.rows, cols = grid.cols, "loaded acquisition");
    Ok(acq.with_quality(quality))
}

/// Classification codes are resampled like any band, then cast back.
fn quality_onto_grid(scl: Raster<u8>, grid: &GridSpec, crs: Option<CRS>) -> Result<Raster<u8>> {
    if scl.shape() == (grid.rows, grid.cols) && *scl.transform() == grid.transform {
        return Ok(scl);
    }
    let mut as_f64 = scl.map_valid(|v| v as f64);
    if as_f64.crs().is_none() {
        as_f64.set_crs(crs);
    }
    Ok(resample_nearest(&as_f64, grid)?.map_valid(|v| v as u8))
}

fn onto_grid(raster: Raster<f64>, grid: &GridSpec) -> Result<Raster<f64>> {
    if raster.shape() == (grid.rows, grid.cols) && *raster.transform() == grid.transform {
        return Ok(raster);
    }
    Ok(resample_nearest(&raster.map_valid(|v| v), grid)?)
}

/// Envelope of a WGS84 box in `crs`, sampled along its edges.
fn project_bbox(bbox: &BBox, crs: &CRS) -> Result<BBox> {
    const STEPS: usize = 8;
    let mut points = Vec::with_capacity(4 * STEPS);
    for i in 0..STEPS {
        let t = i as f64 / (STEPS - 1) as f64;
        let x = bbox.min_x + t * bbox.width();
        let y = bbox.min_y + t * bbox.height();
        for (lon, lat) in [(x, bbox.min_y), (x, bbox.max_y), (bbox.min_x, y), (bbox.max_x, y)] {
            points.push(crs.from_wgs84(lon, lat)?);
        }
    }
    BBox::enclosing(points).ok_or_else(|| CloudError::Network("empty clip box".into()))
}

fn invalid(item: &StacItem, reason: &str) -> CloudError {
    CloudError::InvalidItem {
        item: item.id.clone(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::collections::HashMap;
    use vistack_core::io::write_stack_geotiff_to_buffer;
    use vistack_core::{GeoTransform, NamedBand, RasterStack};

    use crate::stac_models::{StacAsset, StacItemProperties};

    fn tiff(rows: usize, cols: usize, cell: f64, value: f64) -> Vec<u8> {
        let mut raster = Raster::filled(rows, cols, value);
        raster.set_transform(GeoTransform::new(440_000.0, 4_475_000.0, cell, -cell));
        encode(raster)
    }

    fn encode(raster: Raster<f64>) -> Vec<u8> {
        let grid = GridSpec::new(CRS::from_epsg(32630), *raster.transform(), raster.rows(), raster.cols());
        let mut stack = RasterStack::new(grid);
        stack
            .push(NamedBand {
                name: "b".into(),
                acquired: Utc::now(),
                raster,
            })
            .unwrap();
        write_stack_geotiff_to_buffer(&stack).unwrap()
    }

    fn item(keys: &[&str]) -> StacItem {
        let mut extra = HashMap::new();
        extra.insert("proj:epsg".to_string(), serde_json::json!(32630));
        StacItem {
            type_: "Feature".into(),
            id: "S2A_TEST".into(),
            geometry: None,
            bbox: Some(vec![-3.72, 40.40, -3.69, 40.43]),
            properties: StacItemProperties {
                datetime: Some("2022-01-05T10:54:21Z".into()),
                eo_cloud_cover: Some(12.0),
                platform: None,
                gsd: None,
                extra,
            },
            assets: keys
                .iter()
                .map(|k| {
                    let asset = StacAsset {
                        href: k.to_string(),
                        type_: None,
                        title: None,
                        roles: None,
                        extra: HashMap::new(),
                    };
                    (k.to_string(), asset)
                })
                .collect(),
            collection: None,
            links: vec![],
        }
    }

    #[test]
    fn loads_and_aligns_bands() {
        let item = item(&["red", "nir", "swir16", "scl"]);
        let fetch = |href: &str| -> Result<Vec<u8>> {
            Ok(match href {
                "red" => tiff(20, 20, 10.0, 1000.0),
                "nir" => tiff(20, 20, 10.0, 4000.0),
                "swir16" => tiff(10, 10, 20.0, 2500.0),
                _ => tiff(10, 10, 20.0, 4.0),
            })
        };

        let acq = load_acquisition(
            &item,
            &AssetKeys::default(),
            &[SpectralBand::Red, SpectralBand::Nir, SpectralBand::Swir1],
            None,
            fetch,
        )
        .unwrap();

        assert_eq!(acq.id, "S2A_TEST");
        assert_eq!(acq.acquired, Utc.with_ymd_and_hms(2022, 1, 5, 10, 54, 21).unwrap());
        assert_eq!(acq.cloud_cover, Some(12.0));
        let swir = acq.band(SpectralBand::Swir1).unwrap();
        assert_eq!(swir.shape(), (20, 20));
        assert_eq!(swir.get(19, 19).unwrap(), 2500.0);
        let q = acq.quality().unwrap();
        assert_eq!(q.shape(), (20, 20));
        assert_eq!(q.get(0, 0).unwrap(), 4);
    }

    #[test]
    fn quality_band_on_shifted_grid_is_realigned() {
        // Same shape as red, but 50 m further east; codes are column + 1
        let mut scl = Raster::filled(20, 20, 0.0);
        scl.set_transform(GeoTransform::new(440_050.0, 4_475_000.0, 10.0, -10.0));
        for row in 0..20 {
            for col in 0..20 {
                scl.set(row, col, (col + 1) as f64).unwrap();
            }
        }
        let scl = encode(scl);

        let item = item(&["red", "scl"]);
        let acq = load_acquisition(&item, &AssetKeys::default(), &[SpectralBand::Red], None, |href| {
            Ok(if href == "red" { tiff(20, 20, 10.0, 1000.0) } else { scl.clone() })
        })
        .unwrap();

        let q = acq.quality().unwrap();
        assert_eq!(q.shape(), (20, 20));
        assert_eq!(q.transform(), acq.band(SpectralBand::Red).unwrap().transform());
        assert_eq!(q.get(0, 10).unwrap(), 6);
        assert_eq!(q.get(7, 19).unwrap(), 15);
    }

    #[test]
    fn asset_keys_follow_catalog() {
        assert_eq!(AssetKeys::for_catalog(&StacCatalog::PlanetaryComputer).red, "B04");
        assert_eq!(AssetKeys::for_catalog(&StacCatalog::EarthSearch), AssetKeys::default());
        assert_eq!(
            AssetKeys::for_catalog(&StacCatalog::Custom("https://stac.example/v1".into())).quality,
            "scl"
        );
    }

    #[test]
    fn missing_asset_is_reported() {
        let item = item(&["red", "scl"]);
        let err = load_acquisition(
            &item,
            &AssetKeys::default(),
            &[SpectralBand::Nir],
            None,
            |_| Ok(tiff(2, 2, 10.0, 1.0)),
        )
        .unwrap_err();
        assert!(matches!(err, CloudError::AssetNotFound { ref key, .. } if key == "nir"));
    }

    #[test]
    fn projected_clip_box_is_in_utm() {
        let bbox = BBox::new(-3.71, 40.41, -3.70, 40.42);
        let utm = project_bbox(&bbox, &CRS::from_epsg(32630)).unwrap();
        assert!(utm.min_x > 400_000.0 && utm.max_x < 500_000.0);
        assert!(utm.min_y > 4_400_000.0 && utm.max_y < 4_500_000.0);
        // ~850 m wide at this latitude
        assert!((utm.width() - 850.0).abs() < 30.0, "width {}", utm.width());
    }
}
