//! GeoTIFF reading and writing.
//!
//! Pure Rust on top of the `tiff` crate (no GDAL). Files are written
//! uncompressed, pixel-interleaved, as a single strip, with:
//!
//! - `ModelPixelScale` + `ModelTiepoint` for north-up transforms, or
//!   `ModelTransformation` when the transform carries rotation terms
//! - a `GeoKeyDirectory` holding the EPSG code
//! - `GDAL_NODATA` as an ASCII tag when a nodata value is set
//!
//! Reading accepts the same layout and recovers the transform, CRS and
//! nodata value exactly as written.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use ndarray::{Array3, ArrayView3};
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;

use super::{DataType, GeoTransform, Raster, RasterError, RasterMeta, RasterResult};
use crate::region::is_geographic_crs;

/// File extension used for every raster this crate writes.
pub const GEOTIFF_EXTENSION: &str = "tif";

// GeoTIFF tag IDs
const MODEL_PIXEL_SCALE: u16 = 33550;
const MODEL_TIEPOINT: u16 = 33922;
const MODEL_TRANSFORMATION: u16 = 34264;
const GEO_KEY_DIRECTORY: u16 = 34735;
const GDAL_NODATA: u16 = 42113;

// GeoKey IDs
const GT_MODEL_TYPE_GEO_KEY: u16 = 1024;
const GT_RASTER_TYPE_GEO_KEY: u16 = 1025;
const GEOGRAPHIC_TYPE_GEO_KEY: u16 = 2048;
const PROJECTED_CS_TYPE_GEO_KEY: u16 = 3072;

// GeoKey values
const MODEL_TYPE_PROJECTED: u16 = 1;
const MODEL_TYPE_GEOGRAPHIC: u16 = 2;
const RASTER_PIXEL_IS_AREA: u16 = 1;
const USER_DEFINED: u16 = 32767;

const PHOTOMETRIC_BLACK_IS_ZERO: u16 = 1;
const PHOTOMETRIC_RGB: u16 = 2;

/// Resolve a numeric tag to the variant the decoder uses for lookups.
fn geo_tag(code: u16) -> Tag {
    Tag::from_u16_exhaustive(code)
}

fn tiff_error(path: &Path) -> impl Fn(tiff::TiffError) -> RasterError + '_ {
    move |e| RasterError::Tiff {
        path: path.to_path_buf(),
        message: e.to_string(),
    }
}

fn io_error(path: &Path) -> impl Fn(std::io::Error) -> RasterError + '_ {
    move |source| RasterError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Write a `(bands, rows, cols)` block as a GeoTIFF.
///
/// `meta.width` / `meta.height` must match the block; `meta.dtype` decides
/// the on-disk sample type.
pub fn write_geotiff(
    path: &Path,
    meta: &RasterMeta,
    data: ArrayView3<'_, f32>,
) -> RasterResult<()> {
    let (bands, rows, cols) = data.dim();
    if bands == 0 || rows == 0 || cols == 0 {
        return Err(RasterError::InvalidData(format!(
            "cannot write empty raster {}x{}x{} to {}",
            bands,
            rows,
            cols,
            path.display()
        )));
    }
    if rows != meta.height || cols != meta.width {
        return Err(RasterError::ShapeMismatch {
            label: path.display().to_string(),
            expected: (bands, meta.height, meta.width),
            actual: (bands, rows, cols),
        });
    }

    let geo_keys = build_geo_key_directory(meta.epsg)?;

    let file = File::create(path).map_err(io_error(path))?;
    let mut writer = BufWriter::new(file);
    let tiff = tiff_error(path);

    let mut encoder = TiffEncoder::new(&mut writer).map_err(&tiff)?;
    let mut dir = encoder.image_directory().map_err(&tiff)?;

    dir.write_tag(Tag::ImageWidth, cols as u32).map_err(&tiff)?;
    dir.write_tag(Tag::ImageLength, rows as u32).map_err(&tiff)?;

    let bits_per_sample = vec![meta.dtype.bits(); bands];
    dir.write_tag(Tag::BitsPerSample, bits_per_sample.as_slice())
        .map_err(&tiff)?;
    dir.write_tag(Tag::Compression, 1u16).map_err(&tiff)?;

    let photometric = if bands == 3 {
        PHOTOMETRIC_RGB
    } else {
        PHOTOMETRIC_BLACK_IS_ZERO
    };
    dir.write_tag(Tag::PhotometricInterpretation, photometric)
        .map_err(&tiff)?;
    dir.write_tag(Tag::SamplesPerPixel, bands as u16)
        .map_err(&tiff)?;
    dir.write_tag(Tag::RowsPerStrip, rows as u32).map_err(&tiff)?;
    dir.write_tag(Tag::PlanarConfiguration, 1u16).map_err(&tiff)?;

    let sample_format = vec![meta.dtype.sample_format(); bands];
    dir.write_tag(Tag::SampleFormat, sample_format.as_slice())
        .map_err(&tiff)?;

    if photometric == PHOTOMETRIC_BLACK_IS_ZERO && bands > 1 {
        let extra_samples = vec![0u16; bands - 1];
        dir.write_tag(Tag::ExtraSamples, extra_samples.as_slice())
            .map_err(&tiff)?;
    }

    // Georeferencing
    let t = &meta.transform;
    if t.is_north_up() {
        let pixel_scale = [t.a, -t.e, 0.0];
        dir.write_tag(geo_tag(MODEL_PIXEL_SCALE), &pixel_scale[..])
            .map_err(&tiff)?;
        let tiepoint = [0.0, 0.0, 0.0, t.c, t.f, 0.0];
        dir.write_tag(geo_tag(MODEL_TIEPOINT), &tiepoint[..])
            .map_err(&tiff)?;
    } else {
        let matrix = [
            t.a, t.b, 0.0, t.c, //
            t.d, t.e, 0.0, t.f, //
            0.0, 0.0, 0.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ];
        dir.write_tag(geo_tag(MODEL_TRANSFORMATION), &matrix[..])
            .map_err(&tiff)?;
    }
    dir.write_tag(geo_tag(GEO_KEY_DIRECTORY), geo_keys.as_slice())
        .map_err(&tiff)?;

    if let Some(nodata) = meta.nodata {
        let text = nodata.to_string();
        dir.write_tag(geo_tag(GDAL_NODATA), text.as_str())
            .map_err(&tiff)?;
    }

    // Pixel data, interleaved as (row, col, band)
    let interleaved = data.permuted_axes([1, 2, 0]);
    let samples = interleaved.iter().copied();
    let (offset, byte_count) = match meta.dtype {
        DataType::UInt8 => {
            let buf: Vec<u8> = samples.map(|v| v as u8).collect();
            (dir.write_data(buf.as_slice()).map_err(&tiff)?, buf.len())
        }
        DataType::UInt16 => {
            let buf: Vec<u16> = samples.map(|v| v as u16).collect();
            (dir.write_data(buf.as_slice()).map_err(&tiff)?, buf.len() * 2)
        }
        DataType::Int16 => {
            let buf: Vec<i16> = samples.map(|v| v as i16).collect();
            (dir.write_data(buf.as_slice()).map_err(&tiff)?, buf.len() * 2)
        }
        DataType::Float32 => {
            let buf: Vec<f32> = samples.collect();
            (dir.write_data(buf.as_slice()).map_err(&tiff)?, buf.len() * 4)
        }
    };

    let offset = strip_field(path, "strip offset", offset)?;
    let byte_count = strip_field(path, "strip byte count", byte_count as u64)?;
    dir.write_tag(Tag::StripOffsets, offset).map_err(&tiff)?;
    dir.write_tag(Tag::StripByteCounts, byte_count)
        .map_err(&tiff)?;
    dir.finish().map_err(&tiff)?;
    drop(encoder);

    writer.flush().map_err(io_error(path))?;
    Ok(())
}

/// Classic TIFF stores strip offsets and sizes as 32-bit values.
fn strip_field(path: &Path, what: &str, value: u64) -> RasterResult<u32> {
    u32::try_from(value).map_err(|_| {
        RasterError::InvalidData(format!(
            "{} {} of {} exceeds the 4 GiB classic TIFF limit",
            what,
            value,
            path.display()
        ))
    })
}

fn build_geo_key_directory(epsg: Option<u32>) -> RasterResult<Vec<u16>> {
    // [KeyDirectoryVersion, KeyRevision, MinorRevision, NumberOfKeys,
    //  KeyID, TIFFTagLocation, Count, Value, ...]
    let Some(epsg) = epsg else {
        return Ok(vec![
            1,
            1,
            0,
            1,
            GT_RASTER_TYPE_GEO_KEY,
            0,
            1,
            RASTER_PIXEL_IS_AREA,
        ]);
    };

    let code = u16::try_from(epsg)
        .ok()
        .filter(|c| *c != USER_DEFINED)
        .ok_or_else(|| {
            RasterError::InvalidData(format!("EPSG:{} cannot be stored as a GeoKey", epsg))
        })?;

    let (model_type, cs_key) = if is_geographic_crs(epsg) {
        (MODEL_TYPE_GEOGRAPHIC, GEOGRAPHIC_TYPE_GEO_KEY)
    } else {
        (MODEL_TYPE_PROJECTED, PROJECTED_CS_TYPE_GEO_KEY)
    };

    Ok(vec![
        1,
        1,
        0,
        3,
        GT_MODEL_TYPE_GEO_KEY,
        0,
        1,
        model_type,
        GT_RASTER_TYPE_GEO_KEY,
        0,
        1,
        RASTER_PIXEL_IS_AREA,
        cs_key,
        0,
        1,
        code,
    ])
}

/// Read a GeoTIFF into memory.
pub fn read_geotiff(path: &Path) -> RasterResult<Raster> {
    let file = File::open(path).map_err(io_error(path))?;
    let tiff = tiff_error(path);

    let mut decoder = Decoder::new(BufReader::new(file))
        .map_err(&tiff)?
        .with_limits(Limits::unlimited());

    let (width, height) = decoder.dimensions().map_err(&tiff)?;
    let (width, height) = (width as usize, height as usize);
    let bands = match decoder.find_tag(Tag::SamplesPerPixel).map_err(&tiff)? {
        Some(value) => value.into_u32().map_err(&tiff)? as usize,
        None => 1,
    };

    let transform = read_transform(&mut decoder, path)?;
    let epsg = read_epsg(&mut decoder, path)?;
    let nodata = read_nodata(&mut decoder, path)?;

    let (dtype, samples): (DataType, Vec<f32>) = match decoder.read_image().map_err(&tiff)? {
        DecodingResult::U8(v) => (DataType::UInt8, v.into_iter().map(f32::from).collect()),
        DecodingResult::U16(v) => (DataType::UInt16, v.into_iter().map(f32::from).collect()),
        DecodingResult::I16(v) => (DataType::Int16, v.into_iter().map(f32::from).collect()),
        DecodingResult::F32(v) => (DataType::Float32, v),
        _ => {
            return Err(RasterError::UnsupportedDataType(format!(
                "{} uses a sample type other than uint8/uint16/int16/float32",
                path.display()
            )))
        }
    };

    let expected = width * height * bands;
    if samples.len() != expected {
        return Err(RasterError::InvalidData(format!(
            "{}: decoded {} samples, expected {} ({}x{}x{})",
            path.display(),
            samples.len(),
            expected,
            bands,
            height,
            width
        )));
    }

    let interleaved = Array3::from_shape_vec((height, width, bands), samples)
        .map_err(|e| RasterError::InvalidData(e.to_string()))?;
    let data = interleaved
        .permuted_axes([2, 0, 1])
        .as_standard_layout()
        .into_owned();

    let meta = RasterMeta {
        width,
        height,
        dtype,
        transform,
        epsg,
        nodata,
    };
    Raster::new(meta, data)
}

fn read_transform<R: std::io::Read + std::io::Seek>(
    decoder: &mut Decoder<R>,
    path: &Path,
) -> RasterResult<GeoTransform> {
    let tiff = tiff_error(path);

    if decoder
        .find_tag(geo_tag(MODEL_TRANSFORMATION))
        .map_err(&tiff)?
        .is_some()
    {
        let m = decoder
            .get_tag_f64_vec(geo_tag(MODEL_TRANSFORMATION))
            .map_err(&tiff)?;
        if m.len() < 8 {
            return Err(RasterError::MissingGeoreference(path.to_path_buf()));
        }
        return Ok(GeoTransform::new(m[0], m[1], m[3], m[4], m[5], m[7]));
    }

    let has_scale = decoder
        .find_tag(geo_tag(MODEL_PIXEL_SCALE))
        .map_err(&tiff)?
        .is_some();
    let has_tiepoint = decoder
        .find_tag(geo_tag(MODEL_TIEPOINT))
        .map_err(&tiff)?
        .is_some();
    if !has_scale || !has_tiepoint {
        return Err(RasterError::MissingGeoreference(path.to_path_buf()));
    }

    let scale = decoder
        .get_tag_f64_vec(geo_tag(MODEL_PIXEL_SCALE))
        .map_err(&tiff)?;
    let tie = decoder
        .get_tag_f64_vec(geo_tag(MODEL_TIEPOINT))
        .map_err(&tiff)?;
    if scale.len() < 2 || tie.len() < 6 {
        return Err(RasterError::MissingGeoreference(path.to_path_buf()));
    }

    let (sx, sy) = (scale[0], scale[1]);
    let (i, j, x, y) = (tie[0], tie[1], tie[3], tie[4]);
    Ok(GeoTransform::new(sx, 0.0, x - i * sx, 0.0, -sy, y + j * sy))
}

fn read_epsg<R: std::io::Read + std::io::Seek>(
    decoder: &mut Decoder<R>,
    path: &Path,
) -> RasterResult<Option<u32>> {
    let tiff = tiff_error(path);

    if decoder
        .find_tag(geo_tag(GEO_KEY_DIRECTORY))
        .map_err(&tiff)?
        .is_none()
    {
        return Ok(None);
    }
    let keys = decoder
        .get_tag_u16_vec(geo_tag(GEO_KEY_DIRECTORY))
        .map_err(&tiff)?;

    let mut projected = None;
    let mut geographic = None;
    for entry in keys.get(4..).unwrap_or_default().chunks_exact(4) {
        let (key, location, value) = (entry[0], entry[1], entry[3]);
        if location != 0 || value == USER_DEFINED {
            continue;
        }
        match key {
            PROJECTED_CS_TYPE_GEO_KEY => projected = Some(u32::from(value)),
            GEOGRAPHIC_TYPE_GEO_KEY => geographic = Some(u32::from(value)),
            _ => {}
        }
    }
    Ok(projected.or(geographic))
}

fn read_nodata<R: std::io::Read + std::io::Seek>(
    decoder: &mut Decoder<R>,
    path: &Path,
) -> RasterResult<Option<f64>> {
    let tiff = tiff_error(path);

    if decoder
        .find_tag(geo_tag(GDAL_NODATA))
        .map_err(&tiff)?
        .is_none()
    {
        return Ok(None);
    }
    let text = decoder
        .get_tag_ascii_string(geo_tag(GDAL_NODATA))
        .map_err(&tiff)?;
    Ok(text.trim_matches(|c: char| c == '\0' || c.is_whitespace()).parse().ok())
}
