//! Synthetic raster generators.
//!
//! Values follow the pattern `col * 1000 + row` (truncated into the
//! sample type's range), so tests can verify any resampled pixel against
//! its source coordinate.

use geotiff_parser::{GeoTransform, SourceRaster};
use tms_common::{BandBuf, SampleType, TilingScheme};

/// A gradient band where `sample(col, row) = col * 1000 + row`, cast
/// into the requested type.
pub fn gradient_band(width: u32, height: u32, sample_type: SampleType) -> BandBuf {
    let mut values = Vec::with_capacity(width as usize * height as usize);
    for row in 0..height {
        for col in 0..width {
            values.push(f64::from(col * 1000 + row));
        }
    }
    match sample_type {
        SampleType::U8 => BandBuf::U8(values.iter().map(|&v| v as u8).collect()),
        SampleType::U16 => BandBuf::U16(values.iter().map(|&v| v as u16).collect()),
        SampleType::I16 => BandBuf::I16(values.iter().map(|&v| v as i16).collect()),
        SampleType::U32 => BandBuf::U32(values.iter().map(|&v| v as u32).collect()),
        SampleType::I32 => BandBuf::I32(values.iter().map(|&v| v as i32).collect()),
        SampleType::F32 => BandBuf::F32(values.iter().map(|&v| v as f32).collect()),
        SampleType::F64 => BandBuf::F64(values),
    }
}

/// A raster positioned inside the scheme's world, `span_fraction` of the
/// world wide, centered at the origin.
pub fn centered_raster(
    scheme: &TilingScheme,
    size: u32,
    bands: usize,
    sample_type: SampleType,
    span_fraction: f64,
) -> SourceRaster {
    let extent = scheme.world_size * span_fraction;
    let step = extent / f64::from(size);
    let band = gradient_band(size, size, sample_type);

    SourceRaster::new(
        size,
        size,
        scheme.srid,
        GeoTransform::new(-extent / 2.0, extent / 2.0, step, -step),
        sample_type,
        vec![band; bands],
        Some(0.0),
    )
    .unwrap_or_else(|e| panic!("fixture raster invalid: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tms_common::WEB_MERCATOR;

    #[test]
    fn test_gradient_pattern() {
        let band = gradient_band(4, 4, SampleType::F64);
        assert_eq!(band.get_f64(0), 0.0);
        assert_eq!(band.get_f64(1), 1000.0); // col 1, row 0
        assert_eq!(band.get_f64(4), 1.0); // col 0, row 1
    }

    #[test]
    fn test_centered_raster_bounds() {
        let raster = centered_raster(&WEB_MERCATOR, 16, 1, SampleType::U8, 0.5);
        let b = raster.bounds();
        assert!((b.width() - WEB_MERCATOR.world_size / 2.0).abs() < 1e-6);
        assert!((b.min_x + b.max_x).abs() < 1e-6);
    }
}
