//! GeoTIFF decoding into [`SourceRaster`].

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::tags::Tag;
use tiff::ColorType;
use tracing::debug;

use tms_common::{BandBuf, SampleType};

use crate::error::{GeoTiffError, GeoTiffResult};
use crate::raster::{GeoTransform, SourceRaster};

const TAG_GEOKEY_DIRECTORY: u16 = 34735;
const TAG_GDAL_NODATA: u16 = 42113;

// GeoKey IDs carrying the EPSG code
const GEOGRAPHIC_TYPE_GEO_KEY: u16 = 2048;
const PROJECTED_CS_TYPE_GEO_KEY: u16 = 3072;

/// Cheap structural summary of a GeoTIFF, used by ingestion validation.
///
/// Probing only confirms the file decodes as a TIFF with nonzero
/// dimensions. Sample type and georeferencing problems are surfaced
/// later, by [`open_geotiff`].
#[derive(Debug, Clone, Copy)]
pub struct RasterProbe {
    pub width: u32,
    pub height: u32,
}

/// Opens a file just far enough to confirm it is a readable raster.
pub fn probe_geotiff(path: &Path) -> GeoTiffResult<RasterProbe> {
    let file = File::open(path)?;
    let mut decoder = Decoder::new(BufReader::new(file))?.with_limits(Limits::unlimited());
    let (width, height) = decoder.dimensions()?;
    if width == 0 || height == 0 {
        return Err(GeoTiffError::InvalidRaster(format!(
            "zero dimension: {width}x{height}"
        )));
    }
    Ok(RasterProbe { width, height })
}

/// Fully decodes a GeoTIFF into a [`SourceRaster`].
///
/// Interleaved pixel data is split into planar band buffers. The EPSG
/// code comes from the GeoKeyDirectory (projected key first, then
/// geographic), the geotransform from ModelPixelScale + ModelTiepoint,
/// and nodata from GDAL_NODATA when present.
pub fn open_geotiff(path: &Path) -> GeoTiffResult<SourceRaster> {
    let file = File::open(path)?;
    let mut decoder = Decoder::new(BufReader::new(file))?.with_limits(Limits::unlimited());

    let (width, height) = decoder.dimensions()?;
    let samples_per_pixel = samples_per_pixel(decoder.colortype()?)?;
    let transform = read_geotransform(&mut decoder)?;
    let srid = read_epsg(&mut decoder)?;
    let nodata = read_nodata(&mut decoder);

    let image = decoder.read_image()?;
    let (sample_type, bands) = split_bands(image, samples_per_pixel)?;

    let expected = width as usize * height as usize;
    for band in &bands {
        if band.len() != expected {
            return Err(GeoTiffError::InvalidRaster(format!(
                "band has {} samples, expected {expected}",
                band.len()
            )));
        }
    }

    debug!(
        ?path,
        width,
        height,
        srid,
        bands = bands.len(),
        %sample_type,
        "decoded geotiff"
    );

    SourceRaster::new(width, height, srid, transform, sample_type, bands, nodata)
}

fn samples_per_pixel(color: ColorType) -> GeoTiffResult<usize> {
    match color {
        ColorType::Gray(_) => Ok(1),
        ColorType::GrayA(_) => Ok(2),
        ColorType::RGB(_) => Ok(3),
        ColorType::RGBA(_) => Ok(4),
        other => Err(GeoTiffError::UnsupportedLayout(format!("{other:?}"))),
    }
}

fn read_geotransform<R: std::io::Read + std::io::Seek>(
    decoder: &mut Decoder<R>,
) -> GeoTiffResult<GeoTransform> {
    let scale = decoder
        .get_tag_f64_vec(Tag::ModelPixelScaleTag)
        .map_err(|_| {
            GeoTiffError::MissingGeoreferencing("ModelPixelScale tag absent".to_string())
        })?;
    if scale.len() < 2 || scale[0] <= 0.0 || scale[1] <= 0.0 {
        return Err(GeoTiffError::MissingGeoreferencing(format!(
            "bad ModelPixelScale: {scale:?}"
        )));
    }

    let tiepoint = decoder
        .get_tag_f64_vec(Tag::ModelTiepointTag)
        .map_err(|_| {
            GeoTiffError::MissingGeoreferencing("ModelTiepoint tag absent".to_string())
        })?;
    if tiepoint.len() < 6 {
        return Err(GeoTiffError::MissingGeoreferencing(format!(
            "bad ModelTiepoint: {tiepoint:?}"
        )));
    }

    // Tiepoint binds pixel (i, j) to world (x, y); shift back to pixel (0, 0).
    let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
    let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
    Ok(GeoTransform::new(origin_x, origin_y, scale[0], -scale[1]))
}

fn read_epsg<R: std::io::Read + std::io::Seek>(decoder: &mut Decoder<R>) -> GeoTiffResult<u32> {
    let keys = decoder
        .get_tag_u16_vec(Tag::from_u16_exhaustive(TAG_GEOKEY_DIRECTORY))
        .map_err(|_| {
            GeoTiffError::MissingGeoreferencing("GeoKeyDirectory tag absent".to_string())
        })?;
    if keys.len() < 4 {
        return Err(GeoTiffError::MissingGeoreferencing(
            "truncated GeoKeyDirectory".to_string(),
        ));
    }

    // Entries are [KeyID, TIFFTagLocation, Count, ValueOffset]; a zero
    // location means the value is inline in ValueOffset.
    let num_keys = keys[3] as usize;
    let mut geographic = None;
    for entry in keys[4..].chunks_exact(4).take(num_keys) {
        let (key_id, location, value) = (entry[0], entry[1], entry[3]);
        if location != 0 {
            continue;
        }
        match key_id {
            PROJECTED_CS_TYPE_GEO_KEY => return Ok(u32::from(value)),
            GEOGRAPHIC_TYPE_GEO_KEY => geographic = Some(u32::from(value)),
            _ => {}
        }
    }
    geographic.ok_or_else(|| {
        GeoTiffError::MissingGeoreferencing("no EPSG code in GeoKeyDirectory".to_string())
    })
}

fn read_nodata<R: std::io::Read + std::io::Seek>(decoder: &mut Decoder<R>) -> Option<f64> {
    decoder
        .get_tag_ascii_string(Tag::from_u16_exhaustive(TAG_GDAL_NODATA))
        .ok()
        .and_then(|s| s.trim().trim_end_matches('\0').trim().parse::<f64>().ok())
}

fn split_bands(
    image: DecodingResult,
    samples_per_pixel: usize,
) -> GeoTiffResult<(SampleType, Vec<BandBuf>)> {
    match image {
        DecodingResult::U8(data) => Ok((
            SampleType::U8,
            deinterleave(data, samples_per_pixel).into_iter().map(BandBuf::U8).collect(),
        )),
        DecodingResult::U16(data) => Ok((
            SampleType::U16,
            deinterleave(data, samples_per_pixel).into_iter().map(BandBuf::U16).collect(),
        )),
        DecodingResult::I16(data) => Ok((
            SampleType::I16,
            deinterleave(data, samples_per_pixel).into_iter().map(BandBuf::I16).collect(),
        )),
        DecodingResult::U32(data) => Ok((
            SampleType::U32,
            deinterleave(data, samples_per_pixel).into_iter().map(BandBuf::U32).collect(),
        )),
        DecodingResult::I32(data) => Ok((
            SampleType::I32,
            deinterleave(data, samples_per_pixel).into_iter().map(BandBuf::I32).collect(),
        )),
        DecodingResult::F32(data) => Ok((
            SampleType::F32,
            deinterleave(data, samples_per_pixel).into_iter().map(BandBuf::F32).collect(),
        )),
        DecodingResult::F64(data) => Ok((
            SampleType::F64,
            deinterleave(data, samples_per_pixel).into_iter().map(BandBuf::F64).collect(),
        )),
        DecodingResult::U64(_) => Err(GeoTiffError::UnsupportedSampleType("uint64".to_string())),
        DecodingResult::I8(_) => Err(GeoTiffError::UnsupportedSampleType("int8".to_string())),
        DecodingResult::I64(_) => Err(GeoTiffError::UnsupportedSampleType("int64".to_string())),
        other => Err(GeoTiffError::UnsupportedSampleType(format!("{other:?}"))),
    }
}

/// Splits interleaved samples (b0 b1 .. bN b0 b1 ..) into planar buffers.
fn deinterleave<T: Copy>(data: Vec<T>, bands: usize) -> Vec<Vec<T>> {
    if bands <= 1 {
        return vec![data];
    }
    let pixels = data.len() / bands;
    let mut out: Vec<Vec<T>> = (0..bands).map(|_| Vec::with_capacity(pixels)).collect();
    for chunk in data.chunks_exact(bands) {
        for (band, &sample) in out.iter_mut().zip(chunk.iter()) {
            band.push(sample);
        }
    }
    out
}
