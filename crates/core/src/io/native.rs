//! Native GeoTIFF reading/writing built on the `tiff` crate.
//!
//! Reading understands ModelPixelScale/ModelTiepoint, the EPSG code in the
//! GeoKeyDirectory and GDAL's nodata tag. Writing produces an uncompressed
//! float32 band-sequential (planar) multiband file with one strip per stack
//! band and the band names in GDAL metadata, which GDAL/QGIS show as band
//! descriptions.
//!
//! The `tiff` decoder only handles single-sample gray images, so
//! uncompressed multi-sample files are read strip by strip here.

use std::fs::File;
use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;

use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::geometry::BBox;
use crate::raster::{GeoTransform, Raster, RasterElement, RasterStack, Window};

// Not among the tags `tiff` names, so it decodes as `Tag::Unknown`.
const TAG_GDAL_METADATA: u16 = 42112;

const KEY_GT_MODEL_TYPE: u16 = 1024;
const KEY_GT_RASTER_TYPE: u16 = 1025;
const KEY_GEOGRAPHIC_TYPE: u16 = 2048;
const KEY_PROJECTED_CS_TYPE: u16 = 3072;

const PLANAR_CHUNKY: u16 = 1;
const PLANAR_SEPARATE: u16 = 2;
const FORMAT_UINT: u16 = 1;
const FORMAT_IEEEFP: u16 = 3;

/// Options for reading GeoTIFF files
#[derive(Debug, Clone, Default)]
pub struct GeoTiffReadOptions {
    /// Zero-based sample (band) to read; defaults to the first
    pub band: Option<usize>,
    /// Only keep pixels covering this box (in the file's CRS)
    pub clip: Option<BBox>,
}

/// Read a GeoTIFF file into a Raster
pub fn read_geotiff<T, P>(path: P, options: &GeoTiffReadOptions) -> Result<Raster<T>>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let data = std::fs::read(path.as_ref())?;
    decode_geotiff(&data, options)
}

/// Read a GeoTIFF from an in-memory buffer into a Raster
pub fn read_geotiff_from_buffer<T>(data: &[u8], options: &GeoTiffReadOptions) -> Result<Raster<T>>
where
    T: RasterElement,
{
    decode_geotiff(data, options)
}

fn tiff_read_err(what: &'static str) -> impl Fn(tiff::TiffError) -> Error {
    move |e| Error::Other(format!("{}: {}", what, e))
}

fn decode_geotiff<T>(data: &[u8], options: &GeoTiffReadOptions) -> Result<Raster<T>>
where
    T: RasterElement,
{
    let mut decoder = Decoder::new(Cursor::new(data)).map_err(tiff_read_err("TIFF decode error"))?;

    let (width, height) = decoder
        .dimensions()
        .map_err(tiff_read_err("Cannot read dimensions"))?;
    let rows = height as usize;
    let cols = width as usize;

    // Metadata first: the image read borrows the decoder mutably.
    let transform = read_geotransform(&mut decoder).ok();
    let crs = read_crs(&mut decoder);
    let nodata = decoder
        .get_tag_ascii_string(Tag::GdalNodata)
        .ok()
        .and_then(|s| s.trim_matches(char::from(0)).trim().parse::<f64>().ok());

    let window = match (&options.clip, &transform) {
        (Some(bbox), Some(gt)) => Window::covering(gt, cols, rows, bbox)
            .ok_or_else(|| Error::Other("clip box does not intersect the image".into()))?,
        _ => Window { col: 0, row: 0, width: cols, height: rows },
    };

    let samples = decoder
        .find_tag_unsigned::<u16>(Tag::SamplesPerPixel)
        .ok()
        .flatten()
        .unwrap_or(1);

    let values: Vec<T> = if samples > 1 {
        let (buf, band) = read_multisample(&mut decoder, data, samples as usize, rows, cols, options.band)?;
        extract(&buf, rows, cols, window, Some(band))?
    } else {
        let image = decoder
            .read_image()
            .map_err(tiff_read_err("Cannot read image data"))?;
        match image {
            DecodingResult::U8(buf) => extract(&buf, rows, cols, window, options.band)?,
            DecodingResult::U16(buf) => extract(&buf, rows, cols, window, options.band)?,
            DecodingResult::U32(buf) => extract(&buf, rows, cols, window, options.band)?,
            DecodingResult::I8(buf) => extract(&buf, rows, cols, window, options.band)?,
            DecodingResult::I16(buf) => extract(&buf, rows, cols, window, options.band)?,
            DecodingResult::I32(buf) => extract(&buf, rows, cols, window, options.band)?,
            DecodingResult::F32(buf) => extract(&buf, rows, cols, window, options.band)?,
            DecodingResult::F64(buf) => extract(&buf, rows, cols, window, options.band)?,
            _ => {
                return Err(Error::UnsupportedDataType(
                    "Unsupported TIFF pixel format".to_string(),
                ))
            }
        }
    };

    let mut raster = Raster::from_vec(values, window.height, window.width)?;
    if let Some(gt) = transform {
        let (x, y) = gt.pixel_to_geo_corner(window.col, window.row);
        raster.set_transform(GeoTransform { origin_x: x, origin_y: y, ..gt });
    }
    raster.set_crs(crs);
    raster.set_nodata(nodata.and_then(|nd| num_traits::cast(nd)));
    Ok(raster)
}

/// Raw samples of an uncompressed multi-sample strip image.
///
/// Planar files yield only the strips of the requested band, so the
/// returned band index is 0; chunky files yield every sample interleaved.
fn read_multisample(
    decoder: &mut Decoder<Cursor<&[u8]>>,
    data: &[u8],
    samples: usize,
    rows: usize,
    cols: usize,
    band: Option<usize>,
) -> Result<(Vec<f64>, usize)> {
    let band = band.unwrap_or(0);
    if band >= samples {
        return Err(Error::InvalidParameter {
            name: "band",
            value: band.to_string(),
            reason: format!("image has {} band(s)", samples),
        });
    }

    let unsupported = |what: String| Error::UnsupportedDataType(format!("multi-sample TIFF: {}", what));

    let compression = decoder
        .find_tag_unsigned::<u16>(Tag::Compression)
        .map_err(tiff_read_err("Compression"))?
        .unwrap_or(1);
    if compression != 1 {
        return Err(unsupported(format!("compression {}", compression)));
    }
    let bits = decoder
        .get_tag_u16_vec(Tag::BitsPerSample)
        .map_err(tiff_read_err("BitsPerSample"))?
        .first()
        .copied()
        .unwrap_or(8);
    let format = decoder
        .get_tag_u16_vec(Tag::SampleFormat)
        .ok()
        .and_then(|f| f.first().copied())
        .unwrap_or(FORMAT_UINT);
    let planar = decoder
        .find_tag_unsigned::<u16>(Tag::PlanarConfiguration)
        .map_err(tiff_read_err("PlanarConfiguration"))?
        .unwrap_or(PLANAR_CHUNKY);
    let offsets = decoder
        .get_tag_u64_vec(Tag::StripOffsets)
        .map_err(|_| unsupported("tiled layout".into()))?;
    let counts = decoder
        .get_tag_u64_vec(Tag::StripByteCounts)
        .map_err(tiff_read_err("StripByteCounts"))?;
    if offsets.len() != counts.len() || offsets.is_empty() {
        return Err(Error::Other("inconsistent strip tables".into()));
    }

    let (strips, per_pixel, band_in_buf) = match planar {
        PLANAR_SEPARATE => {
            if offsets.len() % samples != 0 {
                return Err(Error::Other("inconsistent strip tables".into()));
            }
            let per_band = offsets.len() / samples;
            (band * per_band..(band + 1) * per_band, 1, 0)
        }
        PLANAR_CHUNKY => (0..offsets.len(), samples, band),
        other => return Err(unsupported(format!("planar configuration {}", other))),
    };

    let mut raw = Vec::new();
    for i in strips {
        let start = usize::try_from(offsets[i]).map_err(|_| Error::Other("strip offset overflow".into()))?;
        let len = usize::try_from(counts[i]).map_err(|_| Error::Other("strip size overflow".into()))?;
        let strip = start
            .checked_add(len)
            .and_then(|end| data.get(start..end))
            .ok_or_else(|| Error::Other(format!("strip {} lies outside the file", i)))?;
        raw.extend_from_slice(strip);
    }

    let little_endian = data.starts_with(b"II");
    let mut values = decode_samples(&raw, little_endian, bits, format)
        .ok_or_else(|| unsupported(format!("{}-bit sample format {}", bits, format)))?;
    values.truncate(rows * cols * per_pixel);
    Ok((values, band_in_buf))
}

/// Convert raw sample bytes to f64. `None` for unsupported sample types.
fn decode_samples(raw: &[u8], little_endian: bool, bits: u16, format: u16) -> Option<Vec<f64>> {
    macro_rules! decode {
        ($ty:ty, $n:expr) => {
            raw.chunks_exact($n)
                .map(|c| {
                    let mut b = [0u8; $n];
                    b.copy_from_slice(c);
                    let v = if little_endian {
                        <$ty>::from_le_bytes(b)
                    } else {
                        <$ty>::from_be_bytes(b)
                    };
                    v as f64
                })
                .collect()
        };
    }
    let values: Vec<f64> = match (format, bits) {
        (FORMAT_IEEEFP, 32) => decode!(f32, 4),
        (FORMAT_IEEEFP, 64) => decode!(f64, 8),
        (FORMAT_UINT, 8) => raw.iter().map(|&v| v as f64).collect(),
        (FORMAT_UINT, 16) => decode!(u16, 2),
        _ => return None,
    };
    Some(values)
}

/// Pull one sample out of a (possibly pixel-interleaved) buffer, limited
/// to `window`, converting to `T`.
fn extract<S, T>(
    buf: &[S],
    rows: usize,
    cols: usize,
    window: Window,
    band: Option<usize>,
) -> Result<Vec<T>>
where
    S: Copy + num_traits::NumCast,
    T: RasterElement,
{
    let cells = rows * cols;
    if cells == 0 || buf.len() % cells != 0 {
        return Err(Error::InvalidDimensions { width: cols, height: rows });
    }
    let samples = buf.len() / cells;
    let band = band.unwrap_or(0);
    if band >= samples {
        return Err(Error::InvalidParameter {
            name: "band",
            value: band.to_string(),
            reason: format!("image has {} band(s)", samples),
        });
    }

    let mut out = Vec::with_capacity(window.width * window.height);
    for row in window.row..window.row + window.height {
        let base = row * cols;
        for col in window.col..window.col + window.width {
            let v = buf[(base + col) * samples + band];
            out.push(num_traits::cast(v).unwrap_or_else(T::default_nodata));
        }
    }
    Ok(out)
}

/// GeoTransform from ModelPixelScaleTag + ModelTiepointTag
fn read_geotransform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<GeoTransform> {
    let scale = decoder
        .get_tag_f64_vec(Tag::ModelPixelScaleTag)
        .map_err(|_| Error::Other("No pixel scale tag".into()))?;
    let tiepoint = decoder
        .get_tag_f64_vec(Tag::ModelTiepointTag)
        .map_err(|_| Error::Other("No tiepoint tag".into()))?;

    if scale.len() >= 2 && tiepoint.len() >= 6 {
        // tiepoint: [I, J, K, X, Y, Z], scale: [ScaleX, ScaleY, ScaleZ]
        let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
        let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
        return Ok(GeoTransform::new(origin_x, origin_y, scale[0], -scale[1]));
    }

    Err(Error::Other("Cannot determine geotransform".into()))
}

/// EPSG code from the GeoKeyDirectory (projected first, then geographic)
fn read_crs<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<CRS> {
    let keys = decoder
        .get_tag_u16_vec(Tag::GeoKeyDirectoryTag)
        .ok()?;
    epsg_from_geokeys(&keys).map(CRS::from_epsg)
}

fn epsg_from_geokeys(keys: &[u16]) -> Option<u32> {
    if keys.len() < 4 {
        return None;
    }
    let count = keys[3] as usize;
    let entries: Vec<&[u16]> = keys[4..].chunks(4).take(count).collect();

    let lookup = |id: u16| {
        entries
            .iter()
            .find(|e| e.len() == 4 && e[0] == id && e[1] == 0)
            .map(|e| e[3] as u32)
            .filter(|&v| v != 0 && v != 32767)
    };
    lookup(KEY_PROJECTED_CS_TYPE).or_else(|| lookup(KEY_GEOGRAPHIC_TYPE))
}

fn geokeys_for(crs: Option<&CRS>) -> Vec<u16> {
    match crs.and_then(|c| c.epsg()) {
        Some(4326) => vec![
            1, 1, 0, 3,
            KEY_GT_MODEL_TYPE, 0, 1, 2, // ModelTypeGeographic
            KEY_GT_RASTER_TYPE, 0, 1, 1, // RasterPixelIsArea
            KEY_GEOGRAPHIC_TYPE, 0, 1, 4326,
        ],
        Some(code) if code <= u16::MAX as u32 => vec![
            1, 1, 0, 3,
            KEY_GT_MODEL_TYPE, 0, 1, 1, // ModelTypeProjected
            KEY_GT_RASTER_TYPE, 0, 1, 1,
            KEY_PROJECTED_CS_TYPE, 0, 1, code as u16,
        ],
        _ => vec![
            1, 1, 0, 2,
            KEY_GT_MODEL_TYPE, 0, 1, 1,
            KEY_GT_RASTER_TYPE, 0, 1, 1,
        ],
    }
}

/// GDAL_METADATA XML carrying one description per band.
fn gdal_band_metadata(names: &[&str]) -> String {
    let mut xml = String::from("<GDALMetadata>");
    for (i, name) in names.iter().enumerate() {
        xml.push_str(&format!(
            "<Item name=\"DESCRIPTION\" sample=\"{}\" role=\"description\">{}</Item>",
            i,
            escape_xml(name)
        ));
    }
    xml.push_str("</GDALMetadata>");
    xml
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Write a stack to a multiband GeoTIFF file
pub fn write_stack_geotiff<P: AsRef<Path>>(stack: &RasterStack, path: P) -> Result<()> {
    let file = File::create(path.as_ref())?;
    encode_stack(stack, file)
}

/// Write a stack to an in-memory GeoTIFF buffer
pub fn write_stack_geotiff_to_buffer(stack: &RasterStack) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    encode_stack(stack, Cursor::new(&mut buf))?;
    Ok(buf)
}

fn tiff_err(what: &'static str) -> impl Fn(tiff::TiffError) -> Error {
    move |e| Error::Other(format!("{}: {}", what, e))
}

fn encode_stack<W: Write + Seek>(stack: &RasterStack, writer: W) -> Result<()> {
    if stack.is_empty() {
        return Err(Error::EmptyCollection);
    }

    let grid = stack.grid();
    let (rows, cols) = (grid.rows, grid.cols);
    let n = stack.band_count();
    let too_large = || Error::Other("stack exceeds 4 GiB; BigTIFF is not supported".into());

    let mut encoder = TiffEncoder::new(writer).map_err(tiff_err("TIFF encoder error"))?;
    let mut dir = encoder
        .new_directory()
        .map_err(tiff_err("Cannot create TIFF directory"))?;

    // Band-sequential: one strip per band, in stack order.
    let mut offsets: Vec<u32> = Vec::with_capacity(n);
    let mut byte_counts: Vec<u32> = Vec::with_capacity(n);
    for band in stack.bands() {
        let data: Vec<f32> = band
            .raster
            .data()
            .iter()
            .map(|&v| num_traits::cast(v).unwrap_or(f32::NAN))
            .collect();
        let offset = dir
            .write_data(data.as_slice())
            .map_err(tiff_err("Cannot write image data"))?;
        offsets.push(u32::try_from(offset).map_err(|_| too_large())?);
        byte_counts.push(
            u32::try_from(data.len() * std::mem::size_of::<f32>()).map_err(|_| too_large())?,
        );
    }

    let bits = vec![32u16; n];
    let formats = vec![FORMAT_IEEEFP; n];
    let names = stack.band_names();

    dir.write_tag(Tag::ImageWidth, cols as u32).map_err(tiff_err("ImageWidth"))?;
    dir.write_tag(Tag::ImageLength, rows as u32).map_err(tiff_err("ImageLength"))?;
    dir.write_tag(Tag::BitsPerSample, bits.as_slice()).map_err(tiff_err("BitsPerSample"))?;
    dir.write_tag(Tag::Compression, 1u16).map_err(tiff_err("Compression"))?;
    dir.write_tag(Tag::PhotometricInterpretation, 1u16)
        .map_err(tiff_err("PhotometricInterpretation"))?;
    dir.write_tag(Tag::StripOffsets, offsets.as_slice()).map_err(tiff_err("StripOffsets"))?;
    dir.write_tag(Tag::SamplesPerPixel, n as u16).map_err(tiff_err("SamplesPerPixel"))?;
    dir.write_tag(Tag::RowsPerStrip, rows as u32).map_err(tiff_err("RowsPerStrip"))?;
    dir.write_tag(Tag::StripByteCounts, byte_counts.as_slice())
        .map_err(tiff_err("StripByteCounts"))?;
    dir.write_tag(Tag::PlanarConfiguration, PLANAR_SEPARATE)
        .map_err(tiff_err("PlanarConfiguration"))?;
    dir.write_tag(Tag::SampleFormat, formats.as_slice()).map_err(tiff_err("SampleFormat"))?;
    if n > 1 {
        let extra = vec![0u16; n - 1]; // unspecified
        dir.write_tag(Tag::ExtraSamples, extra.as_slice()).map_err(tiff_err("ExtraSamples"))?;
    }

    let gt = grid.transform;
    let scale = [gt.pixel_width, gt.pixel_height.abs(), 0.0];
    dir.write_tag(Tag::ModelPixelScaleTag, &scale[..])
        .map_err(tiff_err("ModelPixelScale"))?;
    let tiepoint = [0.0, 0.0, 0.0, gt.origin_x, gt.origin_y, 0.0];
    dir.write_tag(Tag::ModelTiepointTag, &tiepoint[..])
        .map_err(tiff_err("ModelTiepoint"))?;
    let geokeys = geokeys_for(Some(&grid.crs));
    dir.write_tag(Tag::GeoKeyDirectoryTag, geokeys.as_slice())
        .map_err(tiff_err("GeoKeyDirectory"))?;
    dir.write_tag(Tag::Unknown(TAG_GDAL_METADATA), gdal_band_metadata(&names).as_str())
        .map_err(tiff_err("GDAL_METADATA"))?;
    dir.write_tag(Tag::GdalNodata, "nan")
        .map_err(tiff_err("GDAL_NODATA"))?;

    dir.finish().map_err(tiff_err("Cannot finish TIFF directory"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::{GridSpec, NamedBand};
    use chrono::{TimeZone, Utc};
    use tiff::encoder::colortype::Gray16;

    fn stack(n: usize) -> RasterStack {
        let grid = GridSpec::new(
            CRS::from_epsg(32630),
            GeoTransform::new(440_000.0, 4_475_000.0, 10.0, -10.0),
            3,
            4,
        );
        let mut stack = RasterStack::new(grid);
        for i in 0..n {
            let mut raster = Raster::filled(3, 4, 0.1 * (i + 1) as f64);
            raster.set(0, 0, f64::NAN).unwrap();
            raster.set(1, 2, -(i as f64) * 0.25).unwrap();
            stack
                .push(NamedBand {
                    name: format!("NDVI_img{}", i),
                    acquired: Utc.with_ymd_and_hms(2022, 1, 1 + i as u32, 0, 0, 0).unwrap(),
                    raster,
                })
                .unwrap();
        }
        stack
    }

    /// 6x5 UInt16 image with two-row strips, a tiepoint at pixel (1, 1)
    /// and EPSG:32631, written through the `tiff` image encoder.
    fn strip_image_u16() -> Vec<u8> {
        let data: Vec<u16> = (0..5u16)
            .flat_map(|row| (0..6u16).map(move |col| row * 10 + col + 1))
            .collect();
        let geokeys: [u16; 20] = [
            1, 1, 0, 4,
            KEY_GT_MODEL_TYPE, 0, 1, 1,
            KEY_GT_RASTER_TYPE, 0, 1, 1,
            KEY_PROJECTED_CS_TYPE, 0, 1, 32631,
            3076, 0, 1, 9001, // ProjLinearUnits: metre
        ];

        let mut buf = Vec::new();
        {
            let mut encoder = TiffEncoder::new(Cursor::new(&mut buf)).unwrap();
            let mut image = encoder.new_image::<Gray16>(6, 5).unwrap();
            image.rows_per_strip(2).unwrap();
            let dir = image.encoder();
            dir.write_tag(Tag::ModelPixelScaleTag, &[20.0, 20.0, 0.0][..]).unwrap();
            dir.write_tag(
                Tag::ModelTiepointTag,
                &[1.0, 1.0, 0.0, 300_020.0, 4_999_980.0, 0.0][..],
            )
            .unwrap();
            dir.write_tag(Tag::GeoKeyDirectoryTag, &geokeys[..]).unwrap();
            dir.write_tag(Tag::GdalNodata, "0").unwrap();
            image.write_data(&data).unwrap();
        }
        buf
    }

    #[test]
    fn test_single_band_roundtrip() {
        let buf = write_stack_geotiff_to_buffer(&stack(1)).unwrap();
        let raster: Raster<f64> =
            read_geotiff_from_buffer(&buf, &GeoTiffReadOptions::default()).unwrap();

        assert_eq!(raster.shape(), (3, 4));
        assert!(raster.get(0, 0).unwrap().is_nan());
        assert!((raster.get(2, 3).unwrap() - 0.1).abs() < 1e-6);
        assert_eq!(raster.crs(), Some(&CRS::from_epsg(32630)));
        assert_eq!(raster.transform().origin_x, 440_000.0);
        assert_eq!(raster.transform().pixel_height, -10.0);
        assert!(raster.nodata().is_some_and(|nd| nd.is_nan()));
    }

    #[test]
    fn test_multiband_roundtrip_every_band() {
        let buf = write_stack_geotiff_to_buffer(&stack(3)).unwrap();

        for band in 0..3 {
            let options = GeoTiffReadOptions { band: Some(band), clip: None };
            let raster: Raster<f64> = read_geotiff_from_buffer(&buf, &options).unwrap();
            assert_eq!(raster.shape(), (3, 4));
            assert!(raster.get(0, 0).unwrap().is_nan());
            assert!((raster.get(2, 3).unwrap() - 0.1 * (band + 1) as f64).abs() < 1e-6);
            assert!((raster.get(1, 2).unwrap() + band as f64 * 0.25).abs() < 1e-6);
            assert_eq!(raster.crs(), Some(&CRS::from_epsg(32630)));
            assert_eq!(raster.transform().origin_y, 4_475_000.0);
        }

        let options = GeoTiffReadOptions { band: Some(3), clip: None };
        assert!(matches!(
            read_geotiff_from_buffer::<f64>(&buf, &options),
            Err(Error::InvalidParameter { name: "band", .. })
        ));
    }

    #[test]
    fn test_multiband_clip_window() {
        let buf = write_stack_geotiff_to_buffer(&stack(2)).unwrap();
        let options = GeoTiffReadOptions {
            band: Some(1),
            clip: Some(BBox::new(440_021.0, 4_474_981.0, 440_039.0, 4_474_989.0)),
        };
        let raster: Raster<f64> = read_geotiff_from_buffer(&buf, &options).unwrap();

        assert_eq!(raster.shape(), (1, 2));
        assert_eq!(raster.transform().origin_x, 440_020.0);
        assert_eq!(raster.transform().origin_y, 4_474_990.0);
        assert!((raster.get(0, 0).unwrap() + 0.25).abs() < 1e-6);
        assert!((raster.get(0, 1).unwrap() - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_multiband_tags() {
        let buf = write_stack_geotiff_to_buffer(&stack(3)).unwrap();
        let mut decoder = Decoder::new(Cursor::new(&buf)).unwrap();

        assert_eq!(decoder.dimensions().unwrap(), (4, 3));
        assert_eq!(decoder.get_tag_u32(Tag::SamplesPerPixel).unwrap(), 3);
        assert_eq!(
            decoder.get_tag_u32(Tag::PlanarConfiguration).unwrap(),
            PLANAR_SEPARATE as u32
        );
        assert_eq!(decoder.get_tag_u64_vec(Tag::StripOffsets).unwrap().len(), 3);
        let meta = decoder
            .get_tag_ascii_string(Tag::Unknown(TAG_GDAL_METADATA))
            .unwrap();
        assert!(meta.contains(">NDVI_img0<"));
        assert!(meta.contains("sample=\"2\""));
    }

    #[test]
    fn test_reads_strip_image_with_offset_tiepoint() {
        let buf = strip_image_u16();
        let raster: Raster<f64> =
            read_geotiff_from_buffer(&buf, &GeoTiffReadOptions::default()).unwrap();

        assert_eq!(raster.shape(), (5, 6));
        assert_eq!(raster.crs(), Some(&CRS::from_epsg(32631)));
        assert_eq!(raster.transform().origin_x, 300_000.0);
        assert_eq!(raster.transform().origin_y, 5_000_000.0);
        assert_eq!(raster.transform().pixel_width, 20.0);
        assert_eq!(raster.transform().pixel_height, -20.0);
        assert_eq!(raster.nodata(), Some(0.0));
        assert_eq!(raster.get(0, 0).unwrap(), 1.0);
        assert_eq!(raster.get(4, 5).unwrap(), 46.0);
    }

    #[test]
    fn test_clip_window_on_strip_image() {
        let buf = strip_image_u16();
        let options = GeoTiffReadOptions {
            band: None,
            clip: Some(BBox::new(300_041.0, 4_999_941.0, 300_079.0, 4_999_979.0)),
        };
        let raster: Raster<u16> = read_geotiff_from_buffer(&buf, &options).unwrap();

        assert_eq!(raster.shape(), (2, 2));
        assert_eq!(raster.transform().origin_x, 300_040.0);
        assert_eq!(raster.transform().origin_y, 4_999_980.0);
        assert_eq!(raster.get(0, 0).unwrap(), 13);
        assert_eq!(raster.get(0, 1).unwrap(), 14);
        assert_eq!(raster.get(1, 0).unwrap(), 23);
        assert_eq!(raster.get(1, 1).unwrap(), 24);
    }

    #[test]
    fn test_decode_samples_byte_orders() {
        let one_be = 1.0f32.to_be_bytes();
        assert_eq!(decode_samples(&one_be, false, 32, FORMAT_IEEEFP), Some(vec![1.0]));
        let pair_le = [2u8, 1, 0, 1];
        assert_eq!(decode_samples(&pair_le, true, 16, FORMAT_UINT), Some(vec![258.0, 256.0]));
        assert_eq!(decode_samples(&pair_le, true, 12, FORMAT_UINT), None);
    }

    #[test]
    fn test_empty_stack_is_rejected() {
        assert!(matches!(
            write_stack_geotiff_to_buffer(&stack(0)),
            Err(Error::EmptyCollection)
        ));
    }

    #[test]
    fn test_geokeys_roundtrip() {
        assert_eq!(epsg_from_geokeys(&geokeys_for(Some(&CRS::from_epsg(32721)))), Some(32721));
        assert_eq!(epsg_from_geokeys(&geokeys_for(Some(&CRS::wgs84()))), Some(4326));
        assert_eq!(epsg_from_geokeys(&geokeys_for(None)), None);
    }

    #[test]
    fn test_xml_escape() {
        let xml = gdal_band_metadata(&["a<b"]);
        assert!(xml.contains("a&lt;b"));
    }
}
