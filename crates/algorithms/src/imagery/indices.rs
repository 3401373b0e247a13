//! Spectral vegetation and water indices
//!
//! Bands arrive as raw digital numbers (surface reflectance x 10000).
//! Normalized-difference forms are scale invariant and use them as-is;
//! every other formula multiplies by [`REFLECTANCE_SCALE`] first.

use std::fmt;
use std::str::FromStr;

use ndarray::Array2;
use rayon::prelude::*;
use vistack_core::raster::Raster;
use vistack_core::{Acquisition, Error, Result, SpectralBand};

/// Digital number to surface reflectance
pub const REFLECTANCE_SCALE: f64 = 1e-4;

const EPS: f64 = 1e-10;

/// The closed set of supported spectral indices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SpectralIndex {
    /// Normalized Difference Vegetation Index
    Ndvi,
    /// Enhanced Vegetation Index
    Evi,
    /// Kernel NDVI
    Kndvi,
    /// Near-Infrared Reflectance of Vegetation
    Nirv,
    /// Normalized Difference Water Index (McFeeters)
    Ndwi,
    /// Normalized Multi-band Drought Index
    Nmdi,
}

impl SpectralIndex {
    pub const ALL: [SpectralIndex; 6] = [
        SpectralIndex::Ndvi,
        SpectralIndex::Evi,
        SpectralIndex::Kndvi,
        SpectralIndex::Nirv,
        SpectralIndex::Ndwi,
        SpectralIndex::Nmdi,
    ];

    /// Canonical name, also used as the output band prefix
    pub fn name(&self) -> &'static str {
        match self {
            SpectralIndex::Ndvi => "NDVI",
            SpectralIndex::Evi => "EVI",
            SpectralIndex::Kndvi => "kNDVI",
            SpectralIndex::Nirv => "NIRv",
            SpectralIndex::Ndwi => "NDWI",
            SpectralIndex::Nmdi => "NMDI",
        }
    }

    /// Human-readable formula
    pub fn formula(&self) -> &'static str {
        match self {
            SpectralIndex::Ndvi => "(NIR - Red) / (NIR + Red)",
            SpectralIndex::Evi => "2.5 * (NIR - Red) / (NIR + 6 * Red - 7.5 * Blue + 1)",
            SpectralIndex::Kndvi => "exp(-NDVI^2 / (2 * sigma^2)), sigma = (NIR + Red) / 2",
            SpectralIndex::Nirv => "NDVI * NIR",
            SpectralIndex::Ndwi => "(Green - NIR) / (Green + NIR)",
            SpectralIndex::Nmdi => "(NIR - (SWIR1 - SWIR2)) / (NIR + (SWIR1 - SWIR2))",
        }
    }

    /// Bands the formula reads
    pub fn required_bands(&self) -> &'static [SpectralBand] {
        use SpectralBand::*;
        match self {
            SpectralIndex::Ndvi | SpectralIndex::Kndvi | SpectralIndex::Nirv => &[Nir, Red],
            SpectralIndex::Evi => &[Nir, Red, Blue],
            SpectralIndex::Ndwi => &[Green, Nir],
            SpectralIndex::Nmdi => &[Nir, Swir1, Swir2],
        }
    }

    /// Evaluate the formula on one acquisition's bands.
    pub fn compute(&self, acq: &Acquisition) -> Result<Raster<f64>> {
        use SpectralBand::*;
        match self {
            SpectralIndex::Ndvi => ndvi(acq.band(Nir)?, acq.band(Red)?),
            SpectralIndex::Evi => evi(acq.band(Nir)?, acq.band(Red)?, acq.band(Blue)?),
            SpectralIndex::Kndvi => kndvi(acq.band(Nir)?, acq.band(Red)?),
            SpectralIndex::Nirv => nirv(acq.band(Nir)?, acq.band(Red)?),
            SpectralIndex::Ndwi => ndwi(acq.band(Green)?, acq.band(Nir)?),
            SpectralIndex::Nmdi => nmdi(acq.band(Nir)?, acq.band(Swir1)?, acq.band(Swir2)?),
        }
    }
}

impl fmt::Display for SpectralIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SpectralIndex {
    type Err = Error;

    /// Case-insensitive. Unknown names are an error, never a default.
    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|idx| idx.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| Error::UnknownIndex(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Formulas
// ---------------------------------------------------------------------------

/// `(a - b) / (a + b)`. NaN where either input is no-data or the sum is 0.
pub fn normalized_difference(band_a: &Raster<f64>, band_b: &Raster<f64>) -> Result<Raster<f64>> {
    pixelwise(&[band_a, band_b], |px| nd(px[0], px[1]))
}

/// `NDVI = (NIR - Red) / (NIR + Red)` on unscaled bands
pub fn ndvi(nir: &Raster<f64>, red: &Raster<f64>) -> Result<Raster<f64>> {
    normalized_difference(nir, red)
}

/// `NDWI = (Green - NIR) / (Green + NIR)` on unscaled bands
pub fn ndwi(green: &Raster<f64>, nir: &Raster<f64>) -> Result<Raster<f64>> {
    normalized_difference(green, nir)
}

/// Enhanced Vegetation Index (Huete et al., 2002) on scaled reflectance
///
/// `EVI = 2.5 * (NIR - Red) / (NIR + 6 * Red - 7.5 * Blue + 1)`
pub fn evi(nir: &Raster<f64>, red: &Raster<f64>, blue: &Raster<f64>) -> Result<Raster<f64>> {
    pixelwise(&[nir, red, blue], |px| {
        let (n, r, b) = (
            px[0] * REFLECTANCE_SCALE,
            px[1] * REFLECTANCE_SCALE,
            px[2] * REFLECTANCE_SCALE,
        );
        let denom = n + 6.0 * r - 7.5 * b + 1.0;
        (denom.abs() >= EPS).then(|| 2.5 * (n - r) / denom)
    })
}

/// Kernel NDVI with the per-pixel bandwidth `sigma = (NIR + Red) / 2`
/// taken on scaled reflectance.
///
/// `kNDVI = exp(-NDVI^2 / (2 * sigma^2))`
///
/// Output lies in (0, 1]; exactly 1 where NDVI is 0.
pub fn kndvi(nir: &Raster<f64>, red: &Raster<f64>) -> Result<Raster<f64>> {
    pixelwise(&[nir, red], |px| {
        let v = nd(px[0], px[1])?;
        let sigma = (px[0] + px[1]) * REFLECTANCE_SCALE / 2.0;
        if sigma.abs() < EPS {
            return None;
        }
        Some((-(v * v) / (2.0 * sigma * sigma)).exp())
    })
}

/// `NIRv = NDVI * NIR`, NIR as scaled reflectance
pub fn nirv(nir: &Raster<f64>, red: &Raster<f64>) -> Result<Raster<f64>> {
    pixelwise(&[nir, red], |px| {
        nd(px[0], px[1]).map(|v| v * px[0] * REFLECTANCE_SCALE)
    })
}

/// Normalized Multi-band Drought Index (Wang & Qu, 2007) on scaled reflectance
///
/// `NMDI = (NIR - (SWIR1 - SWIR2)) / (NIR + (SWIR1 - SWIR2))`
pub fn nmdi(nir: &Raster<f64>, swir1: &Raster<f64>, swir2: &Raster<f64>) -> Result<Raster<f64>> {
    pixelwise(&[nir, swir1, swir2], |px| {
        let n = px[0] * REFLECTANCE_SCALE;
        let d = (px[1] - px[2]) * REFLECTANCE_SCALE;
        nd(n, d)
    })
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn nd(a: f64, b: f64) -> Option<f64> {
    let sum = a + b;
    (sum.abs() >= EPS).then(|| (a - b) / sum)
}

fn is_nodata_f64(value: f64, nodata: Option<f64>) -> bool {
    if value.is_nan() {
        return true;
    }
    match nodata {
        Some(nd) => (value - nd).abs() < f64::EPSILON,
        None => false,
    }
}

/// Row-parallel per-pixel kernel over same-shaped bands. `f` receives the
/// pixel values in band order; `None` or any no-data input yields NaN.
fn pixelwise<const N: usize, F>(bands: &[&Raster<f64>; N], f: F) -> Result<Raster<f64>>
where
    F: Fn([f64; N]) -> Option<f64> + Sync + Send,
{
    let first = bands[0];
    for other in &bands[1..] {
        check_dimensions(first, other)?;
    }

    let (rows, cols) = first.shape();
    let nodata: [Option<f64>; N] = std::array::from_fn(|i| bands[i].nodata());

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            'px: for (col, out) in row_data.iter_mut().enumerate() {
                let mut px = [0.0; N];
                for i in 0..N {
                    let v = unsafe { bands[i].get_unchecked(row, col) };
                    if is_nodata_f64(v, nodata[i]) {
                        continue 'px;
                    }
                    px[i] = v;
                }
                if let Some(v) = f(px) {
                    *out = v;
                }
            }
            row_data
        })
        .collect();

    build_output(first, rows, cols, data)
}

fn check_dimensions(a: &Raster<f64>, b: &Raster<f64>) -> Result<()> {
    if a.shape() != b.shape() {
        return Err(Error::SizeMismatch {
            er: a.rows(),
            ec: a.cols(),
            ar: b.rows(),
            ac: b.cols(),
        });
    }
    Ok(())
}

fn build_output(
    template: &Raster<f64>,
    rows: usize,
    cols: usize,
    data: Vec<f64>,
) -> Result<Raster<f64>> {
    let mut output = template.with_same_meta::<f64>(rows, cols);
    output.set_nodata(Some(f64::NAN));
    *output.data_mut() =
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;
    Ok(output)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
