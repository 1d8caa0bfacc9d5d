//! Nearest-neighbor band resampling.
//!
//! Resampling never changes a buffer's sample type: a `BandBuf::I16` in is
//! a `BandBuf::I16` out. Destination pixels whose source lookup lands out
//! of range, or whose coordinate fails to transform, are left at the
//! nodata fill; gaps are absorbed here and never become errors.

use geotiff_parser::GeoTransform;
use tms_common::{BandBuf, TmsResult};

use crate::projection::CoordTransformer;

/// Per-destination-pixel source sample index, `None` for gaps.
///
/// Built once per tile and applied to every band, so the projection math
/// runs once regardless of band count.
pub(crate) fn build_mapping(
    dst_width: u32,
    dst_height: u32,
    dst_transform: &GeoTransform,
    to_source: &CoordTransformer,
    src_width: u32,
    src_height: u32,
    src_transform: &GeoTransform,
) -> Vec<Option<usize>> {
    let mut mapping = Vec::with_capacity(dst_width as usize * dst_height as usize);

    for row in 0..dst_height {
        for col in 0..dst_width {
            // Destination pixel center.
            let (wx, wy) =
                dst_transform.pixel_to_world(f64::from(col) + 0.5, f64::from(row) + 0.5);
            let index = match to_source.transform(wx, wy) {
                Ok((sx, sy)) => {
                    let (sc, sr) = src_transform.world_to_pixel(sx, sy);
                    let (sc, sr) = (sc.floor(), sr.floor());
                    if sc >= 0.0
                        && sc < f64::from(src_width)
                        && sr >= 0.0
                        && sr < f64::from(src_height)
                    {
                        Some(sr as usize * src_width as usize + sc as usize)
                    } else {
                        None
                    }
                }
                Err(_) => None,
            };
            mapping.push(index);
        }
    }

    mapping
}

/// Applies a source-index mapping to one band, filling gaps with `fill`
/// cast into the band's own type.
pub(crate) fn apply_mapping(band: &BandBuf, mapping: &[Option<usize>], fill: f64) -> BandBuf {
    match band {
        BandBuf::U8(v) => {
            let f = fill.clamp(0.0, f64::from(u8::MAX)) as u8;
            BandBuf::U8(mapping.iter().map(|m| m.map_or(f, |i| v[i])).collect())
        }
        BandBuf::U16(v) => {
            let f = fill.clamp(0.0, f64::from(u16::MAX)) as u16;
            BandBuf::U16(mapping.iter().map(|m| m.map_or(f, |i| v[i])).collect())
        }
        BandBuf::I16(v) => {
            let f = fill.clamp(f64::from(i16::MIN), f64::from(i16::MAX)) as i16;
            BandBuf::I16(mapping.iter().map(|m| m.map_or(f, |i| v[i])).collect())
        }
        BandBuf::U32(v) => {
            let f = fill.clamp(0.0, f64::from(u32::MAX)) as u32;
            BandBuf::U32(mapping.iter().map(|m| m.map_or(f, |i| v[i])).collect())
        }
        BandBuf::I32(v) => {
            let f = fill.clamp(f64::from(i32::MIN), f64::from(i32::MAX)) as i32;
            BandBuf::I32(mapping.iter().map(|m| m.map_or(f, |i| v[i])).collect())
        }
        BandBuf::F32(v) => {
            let f = fill as f32;
            BandBuf::F32(mapping.iter().map(|m| m.map_or(f, |i| v[i])).collect())
        }
        BandBuf::F64(v) => {
            BandBuf::F64(mapping.iter().map(|m| m.map_or(fill, |i| v[i])).collect())
        }
    }
}

/// Resamples one band from a source grid onto a destination grid,
/// nearest-neighbor, preserving the sample type exactly.
///
/// Only transformer construction can fail (unknown EPSG); individual
/// sample gaps fall back to `nodata`.
#[allow(clippy::too_many_arguments)]
pub fn resample_band(
    band: &BandBuf,
    src_dims: (u32, u32),
    src_transform: &GeoTransform,
    src_epsg: u32,
    nodata: f64,
    dst_dims: (u32, u32),
    dst_transform: &GeoTransform,
    dst_epsg: u32,
) -> TmsResult<BandBuf> {
    let to_source = CoordTransformer::new(dst_epsg, src_epsg)?;
    let mapping = build_mapping(
        dst_dims.0,
        dst_dims.1,
        dst_transform,
        &to_source,
        src_dims.0,
        src_dims.1,
        src_transform,
    );
    Ok(apply_mapping(band, &mapping, nodata))
}
