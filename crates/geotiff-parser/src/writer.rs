//! GeoTIFF encoding.
//!
//! Used by ingestion tests to build fixtures and by tooling that needs to
//! persist a raster. Writes single-strip, chunky (interleaved) images via
//! the low-level directory encoder so every supported sample type goes
//! through one code path.

use std::fs::File;
use std::io::{BufWriter, Seek, Write};
use std::path::Path;

use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;

use tms_common::{BandBuf, SampleType};

use crate::error::{GeoTiffError, GeoTiffResult};
use crate::raster::{GeoTransform, SourceRaster};

const TAG_MODEL_PIXEL_SCALE: u16 = 33550;
const TAG_MODEL_TIEPOINT: u16 = 33922;
const TAG_GEOKEY_DIRECTORY: u16 = 34735;
const TAG_GDAL_NODATA: u16 = 42113;

const GT_MODEL_TYPE_GEO_KEY: u16 = 1024;
const GT_RASTER_TYPE_GEO_KEY: u16 = 1025;
const GEOGRAPHIC_TYPE_GEO_KEY: u16 = 2048;
const PROJECTED_CS_TYPE_GEO_KEY: u16 = 3072;

const MODEL_TYPE_PROJECTED: u16 = 1;
const MODEL_TYPE_GEOGRAPHIC: u16 = 2;
const RASTER_PIXEL_IS_AREA: u16 = 1;

// SampleFormat tag values
const FORMAT_UNSIGNED: u16 = 1;
const FORMAT_SIGNED: u16 = 2;
const FORMAT_FLOAT: u16 = 3;

/// Writes a raster to a GeoTIFF file. Supports 1-band (grayscale) and
/// 3-band (RGB) layouts.
pub fn write_geotiff(path: &Path, raster: &SourceRaster) -> GeoTiffResult<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    write_geotiff_to(writer, raster)
}

pub fn write_geotiff_to<W: Write + Seek>(writer: W, raster: &SourceRaster) -> GeoTiffResult<()> {
    let bands = raster.band_count();
    let photometric: u16 = match bands {
        1 => 1, // BlackIsZero
        3 => 2, // RGB
        other => {
            return Err(GeoTiffError::InvalidRaster(format!(
                "writer supports 1 or 3 bands, got {other}"
            )))
        }
    };

    let (bits, format) = sample_layout(raster.sample_type);
    let pixel_bytes = interleave_bytes(&raster.bands);

    let mut encoder = TiffEncoder::new(writer)?;
    let mut dir = encoder.new_directory()?;

    dir.write_tag(Tag::ImageWidth, raster.width)?;
    dir.write_tag(Tag::ImageLength, raster.height)?;
    dir.write_tag(Tag::BitsPerSample, vec![bits; bands].as_slice())?;
    dir.write_tag(Tag::Compression, 1u16)?;
    dir.write_tag(Tag::PhotometricInterpretation, photometric)?;
    dir.write_tag(Tag::SamplesPerPixel, bands as u16)?;
    dir.write_tag(Tag::SampleFormat, vec![format; bands].as_slice())?;
    dir.write_tag(Tag::PlanarConfiguration, 1u16)?;
    dir.write_tag(Tag::RowsPerStrip, raster.height)?;

    write_geo_tags(
        &mut dir,
        &raster.transform,
        raster.srid,
        raster.nodata,
    )?;

    let offset = dir.write_data(pixel_bytes.as_slice())?;
    dir.write_tag(Tag::StripOffsets, offset as u32)?;
    dir.write_tag(Tag::StripByteCounts, pixel_bytes.len() as u32)?;
    dir.finish()?;
    Ok(())
}

/// Writes a single-band uint64 GeoTIFF.
///
/// The pipeline itself cannot ingest uint64 data; this exists so tests can
/// produce files that are structurally valid TIFFs but carry a sample type
/// the decoder rejects.
pub fn write_u64_geotiff(
    path: &Path,
    width: u32,
    height: u32,
    srid: u32,
    transform: &GeoTransform,
    data: &[u64],
) -> GeoTiffResult<()> {
    if data.len() != width as usize * height as usize {
        return Err(GeoTiffError::InvalidRaster(format!(
            "expected {} samples, got {}",
            width as usize * height as usize,
            data.len()
        )));
    }

    let file = File::create(path)?;
    let mut encoder = TiffEncoder::new(BufWriter::new(file))?;
    let mut dir = encoder.new_directory()?;

    dir.write_tag(Tag::ImageWidth, width)?;
    dir.write_tag(Tag::ImageLength, height)?;
    dir.write_tag(Tag::BitsPerSample, 64u16)?;
    dir.write_tag(Tag::Compression, 1u16)?;
    dir.write_tag(Tag::PhotometricInterpretation, 1u16)?;
    dir.write_tag(Tag::SamplesPerPixel, 1u16)?;
    dir.write_tag(Tag::SampleFormat, FORMAT_UNSIGNED)?;
    dir.write_tag(Tag::PlanarConfiguration, 1u16)?;
    dir.write_tag(Tag::RowsPerStrip, height)?;

    write_geo_tags(&mut dir, transform, srid, None)?;

    let bytes: Vec<u8> = data.iter().flat_map(|v| v.to_le_bytes()).collect();
    let offset = dir.write_data(bytes.as_slice())?;
    dir.write_tag(Tag::StripOffsets, offset as u32)?;
    dir.write_tag(Tag::StripByteCounts, bytes.len() as u32)?;
    dir.finish()?;
    Ok(())
}

fn write_geo_tags<W: Write + Seek, K: tiff::encoder::TiffKind>(
    dir: &mut tiff::encoder::DirectoryEncoder<W, K>,
    transform: &GeoTransform,
    srid: u32,
    nodata: Option<f64>,
) -> GeoTiffResult<()> {
    let pixel_scale = [transform.pixel_width, -transform.pixel_height, 0.0];
    dir.write_tag(Tag::Unknown(TAG_MODEL_PIXEL_SCALE), pixel_scale.as_slice())?;

    // Tie pixel (0, 0) to the raster's top-left world corner.
    let tiepoint = [0.0, 0.0, 0.0, transform.origin_x, transform.origin_y, 0.0];
    dir.write_tag(Tag::Unknown(TAG_MODEL_TIEPOINT), tiepoint.as_slice())?;

    let (model_type, epsg_key) = if srid == 4326 {
        (MODEL_TYPE_GEOGRAPHIC, GEOGRAPHIC_TYPE_GEO_KEY)
    } else {
        (MODEL_TYPE_PROJECTED, PROJECTED_CS_TYPE_GEO_KEY)
    };
    let geokeys: [u16; 16] = [
        1, 1, 0, 3, // directory header, 3 keys follow
        GT_MODEL_TYPE_GEO_KEY, 0, 1, model_type,
        GT_RASTER_TYPE_GEO_KEY, 0, 1, RASTER_PIXEL_IS_AREA,
        epsg_key, 0, 1, srid as u16,
    ];
    dir.write_tag(Tag::Unknown(TAG_GEOKEY_DIRECTORY), geokeys.as_slice())?;

    if let Some(nodata) = nodata {
        let text = format!("{nodata}");
        dir.write_tag(Tag::Unknown(TAG_GDAL_NODATA), text.as_str())?;
    }
    Ok(())
}

fn sample_layout(sample_type: SampleType) -> (u16, u16) {
    match sample_type {
        SampleType::U8 => (8, FORMAT_UNSIGNED),
        SampleType::U16 => (16, FORMAT_UNSIGNED),
        SampleType::I16 => (16, FORMAT_SIGNED),
        SampleType::U32 => (32, FORMAT_UNSIGNED),
        SampleType::I32 => (32, FORMAT_SIGNED),
        SampleType::F32 => (32, FORMAT_FLOAT),
        SampleType::F64 => (64, FORMAT_FLOAT),
    }
}

/// Interleaves planar band buffers into chunky little-endian strip bytes.
fn interleave_bytes(bands: &[BandBuf]) -> Vec<u8> {
    let pixels = bands.first().map_or(0, BandBuf::len);
    let sample_bytes = bands
        .first()
        .map_or(1, |b| b.sample_type().byte_size());
    let mut out = Vec::with_capacity(pixels * bands.len() * sample_bytes);
    for i in 0..pixels {
        for band in bands {
            match band {
                BandBuf::U8(v) => out.push(v[i]),
                BandBuf::U16(v) => out.extend_from_slice(&v[i].to_le_bytes()),
                BandBuf::I16(v) => out.extend_from_slice(&v[i].to_le_bytes()),
                BandBuf::U32(v) => out.extend_from_slice(&v[i].to_le_bytes()),
                BandBuf::I32(v) => out.extend_from_slice(&v[i].to_le_bytes()),
                BandBuf::F32(v) => out.extend_from_slice(&v[i].to_le_bytes()),
                BandBuf::F64(v) => out.extend_from_slice(&v[i].to_le_bytes()),
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::open_geotiff;
    use tms_common::SampleType;

    fn transform() -> GeoTransform {
        GeoTransform::new(-20000.0, 20000.0, 100.0, -100.0)
    }

    #[test]
    fn test_gray_f32_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gray.tif");

        let band = BandBuf::F32(vec![0.5, 1.5, -2.0, 9.25]);
        let raster = SourceRaster::new(
            2,
            2,
            3857,
            transform(),
            SampleType::F32,
            vec![band],
            Some(-9999.0),
        )
        .unwrap();
        write_geotiff(&path, &raster).unwrap();

        let read = open_geotiff(&path).unwrap();
        assert_eq!(read.width, 2);
        assert_eq!(read.height, 2);
        assert_eq!(read.srid, 3857);
        assert_eq!(read.sample_type, SampleType::F32);
        assert_eq!(read.nodata, Some(-9999.0));
        assert_eq!(read.sample(0, 1, 1), Some(9.25));
        assert_eq!(read.transform, transform());
    }

    #[test]
    fn test_rgb_u8_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rgb.tif");

        let raster = SourceRaster::new(
            2,
            1,
            4326,
            GeoTransform::new(10.0, 50.0, 0.01, -0.01),
            SampleType::U8,
            vec![
                BandBuf::U8(vec![10, 20]),
                BandBuf::U8(vec![30, 40]),
                BandBuf::U8(vec![50, 60]),
            ],
            None,
        )
        .unwrap();
        write_geotiff(&path, &raster).unwrap();

        let read = open_geotiff(&path).unwrap();
        assert_eq!(read.band_count(), 3);
        assert_eq!(read.srid, 4326);
        assert_eq!(read.sample(1, 1, 0), Some(40.0));
        assert_eq!(read.nodata, None);
    }

    #[test]
    fn test_signed_int16_preserved() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dem.tif");

        let raster = SourceRaster::new(
            2,
            1,
            3857,
            transform(),
            SampleType::I16,
            vec![BandBuf::I16(vec![-500, 8848])],
            Some(-32768.0),
        )
        .unwrap();
        write_geotiff(&path, &raster).unwrap();

        let read = open_geotiff(&path).unwrap();
        assert_eq!(read.sample_type, SampleType::I16);
        assert_eq!(read.sample(0, 0, 0), Some(-500.0));
    }

    #[test]
    fn test_u64_fixture_is_rejected_by_reader() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wide.tif");

        write_u64_geotiff(&path, 2, 2, 3857, &transform(), &[1, 2, 3, 4]).unwrap();

        // Structurally valid, so a probe succeeds...
        let probe = crate::reader::probe_geotiff(&path).unwrap();
        assert_eq!((probe.width, probe.height), (2, 2));

        // ...but a full decode refuses the sample type.
        match open_geotiff(&path) {
            Err(GeoTiffError::UnsupportedSampleType(_)) => {}
            other => panic!("expected UnsupportedSampleType, got {other:?}"),
        }
    }
}
