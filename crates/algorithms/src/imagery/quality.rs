//! Per-pixel quality masking from a categorical classification band
//!
//! Codes follow the Sentinel-2 L2A Scene Classification Layer (SCL).
//! Masking hides pixels (sets them to NaN); it never drops an acquisition.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use ndarray::Zip;
use vistack_core::{Acquisition, Error, Result};

/// Scene classification classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum QualityClass {
    NoData,
    SaturatedOrDefective,
    DarkArea,
    CloudShadow,
    Vegetation,
    NotVegetated,
    Water,
    Unclassified,
    CloudMediumProbability,
    CloudHighProbability,
    ThinCirrus,
    SnowIce,
}

impl QualityClass {
    pub const ALL: [QualityClass; 12] = [
        QualityClass::NoData,
        QualityClass::SaturatedOrDefective,
        QualityClass::DarkArea,
        QualityClass::CloudShadow,
        QualityClass::Vegetation,
        QualityClass::NotVegetated,
        QualityClass::Water,
        QualityClass::Unclassified,
        QualityClass::CloudMediumProbability,
        QualityClass::CloudHighProbability,
        QualityClass::ThinCirrus,
        QualityClass::SnowIce,
    ];

    /// Numeric code stored in the quality band
    pub fn code(&self) -> u8 {
        *self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }

    /// snake_case name accepted in configuration
    pub fn name(&self) -> &'static str {
        match self {
            QualityClass::NoData => "no_data",
            QualityClass::SaturatedOrDefective => "saturated_or_defective",
            QualityClass::DarkArea => "dark_area",
            QualityClass::CloudShadow => "cloud_shadow",
            QualityClass::Vegetation => "vegetation",
            QualityClass::NotVegetated => "not_vegetated",
            QualityClass::Water => "water",
            QualityClass::Unclassified => "unclassified",
            QualityClass::CloudMediumProbability => "cloud_medium_probability",
            QualityClass::CloudHighProbability => "cloud_high_probability",
            QualityClass::ThinCirrus => "thin_cirrus",
            QualityClass::SnowIce => "snow_ice",
        }
    }
}

impl fmt::Display for QualityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for QualityClass {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().replace(['-', ' '], "_");
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.name().eq_ignore_ascii_case(&wanted))
            .ok_or_else(|| Error::InvalidParameter {
                name: "accepted_classes",
                value: s.to_string(),
                reason: "unknown scene classification class".into(),
            })
    }
}

/// The set of quality classes whose pixels stay visible
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualityMask {
    accepted: BTreeSet<QualityClass>,
}

impl QualityMask {
    pub fn new(accepted: impl IntoIterator<Item = QualityClass>) -> Self {
        Self {
            accepted: accepted.into_iter().collect(),
        }
    }

    pub fn accepts(&self, code: u8) -> bool {
        QualityClass::from_code(code).is_some_and(|c| self.accepted.contains(&c))
    }

    pub fn accepted(&self) -> impl Iterator<Item = QualityClass> + '_ {
        self.accepted.iter().copied()
    }
}

impl Default for QualityMask {
    /// Vegetation and bare ground only
    fn default() -> Self {
        Self::new([QualityClass::Vegetation, QualityClass::NotVegetated])
    }
}

/// Hide every band pixel whose quality code is outside `mask`.
///
/// Quality pixels equal to the quality band's nodata are hidden as well.
/// The acquisition's id, time and footprint are untouched.
pub fn apply_quality_mask(acq: &Acquisition, mask: &QualityMask) -> Result<Acquisition> {
    let quality = acq.quality()?;
    let q_nodata = quality.nodata();

    let mut out = acq.clone();
    for raster in out.bands.values_mut() {
        if raster.shape() != quality.shape() {
            return Err(Error::SizeMismatch {
                er: quality.rows(),
                ec: quality.cols(),
                ar: raster.rows(),
                ac: raster.cols(),
            });
        }
        Zip::from(raster.data_mut())
            .and(quality.data())
            .for_each(|v, &q| {
                if Some(q) == q_nodata || !mask.accepts(q) {
                    *v = f64::NAN;
                }
            });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use vistack_core::{BBox, GeoTransform, Raster, SpectralBand};

    fn make_band(rows: usize, cols: usize, value: f64) -> Raster<f64> {
        let mut r = Raster::filled(rows, cols, value);
        r.set_transform(GeoTransform::new(0.0, rows as f64, 1.0, -1.0));
        r
    }

    fn scene(codes: &[u8]) -> Acquisition {
        let quality = Raster::from_vec(codes.to_vec(), 1, codes.len()).unwrap();
        Acquisition::new(
            "S2B_TEST",
            Utc.with_ymd_and_hms(2022, 1, 10, 11, 0, 0).unwrap(),
            BBox::new(0.0, 0.0, 1.0, 1.0),
        )
        .with_cloud_cover(12.5)
        .with_band(SpectralBand::Red, make_band(1, codes.len(), 1200.0))
        .with_band(SpectralBand::Nir, make_band(1, codes.len(), 4100.0))
        .with_quality(quality)
    }

    #[test]
    fn test_codes_round_trip_names() {
        for class in QualityClass::ALL {
            assert_eq!(QualityClass::from_code(class.code()), Some(class));
            assert_eq!(class.name().parse::<QualityClass>().unwrap(), class);
        }
        assert_eq!(QualityClass::Vegetation.code(), 4);
        assert_eq!(QualityClass::SnowIce.code(), 11);
        assert_eq!(QualityClass::from_code(12), None);
        assert_eq!("Not-Vegetated".parse::<QualityClass>().unwrap(), QualityClass::NotVegetated);
        assert!("clouds".parse::<QualityClass>().is_err());
    }

    #[test]
    fn test_default_mask_keeps_vegetation_and_bare_ground() {
        let mask = QualityMask::default();
        for code in 0..=255u8 {
            assert_eq!(mask.accepts(code), code == 4 || code == 5, "code {}", code);
        }
    }

    #[test]
    fn test_mask_hides_only_rejected_pixels() {
        let acq = scene(&[4, 5, 9, 3, 6, 8, 10, 0]);
        let masked = apply_quality_mask(&acq, &QualityMask::default()).unwrap();

        for band in [SpectralBand::Red, SpectralBand::Nir] {
            let r = masked.band(band).unwrap();
            let original = acq.band(band).unwrap();
            for col in 0..8 {
                let v = r.get(0, col).unwrap();
                if col < 2 {
                    assert_eq!(v, original.get(0, col).unwrap());
                } else {
                    assert!(v.is_nan(), "col {} should be masked, got {}", col, v);
                }
            }
        }
    }

    #[test]
    fn test_mask_preserves_identity() {
        let acq = scene(&[9, 9, 9]);
        let masked = apply_quality_mask(&acq, &QualityMask::default()).unwrap();
        assert_eq!(masked.id, acq.id);
        assert_eq!(masked.acquired, acq.acquired);
        assert_eq!(masked.cloud_cover, acq.cloud_cover);
        assert_eq!(masked.bands.len(), acq.bands.len());
    }

    #[test]
    fn test_quality_nodata_is_hidden() {
        let mut acq = scene(&[4, 4]);
        if let Some(q) = acq.quality.as_mut() {
            q.set_nodata(Some(4));
        }
        let masked = apply_quality_mask(&acq, &QualityMask::default()).unwrap();
        assert!(masked.band(SpectralBand::Red).unwrap().get(0, 0).unwrap().is_nan());
    }

    #[test]
    fn test_custom_mask_accepts_water() {
        let acq = scene(&[6, 4]);
        let mask = QualityMask::new([QualityClass::Water]);
        let masked = apply_quality_mask(&acq, &mask).unwrap();
        let red = masked.band(SpectralBand::Red).unwrap();
        assert_eq!(red.get(0, 0).unwrap(), 1200.0);
        assert!(red.get(0, 1).unwrap().is_nan());
    }

    #[test]
    fn test_missing_quality_band_is_an_error() {
        let mut acq = scene(&[4]);
        acq.quality = None;
        assert!(matches!(
            apply_quality_mask(&acq, &QualityMask::default()),
            Err(Error::MissingQualityBand(_))
        ));
    }

    #[test]
    fn test_shape_mismatch() {
        let acq = scene(&[4, 4]).with_band(SpectralBand::Blue, make_band(2, 2, 300.0));
        assert!(matches!(
            apply_quality_mask(&acq, &QualityMask::default()),
            Err(Error::SizeMismatch { .. })
        ));
    }
}
