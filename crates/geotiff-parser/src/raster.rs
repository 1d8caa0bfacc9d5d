//! In-memory raster model with affine georeferencing.

use tms_common::{BandBuf, BoundingBox, SampleType};

use crate::error::{GeoTiffError, GeoTiffResult};

/// Affine geotransform mapping pixel indices to world coordinates.
///
/// Follows the north-up convention: `pixel_height` is negative and
/// `origin_y` is the northern edge of the raster. Only axis-aligned
/// transforms are supported (no rotation terms).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    /// World x of the top-left corner of pixel (0, 0)
    pub origin_x: f64,
    /// World y of the top-left corner of pixel (0, 0)
    pub origin_y: f64,
    /// World units per pixel in x (positive)
    pub pixel_width: f64,
    /// World units per pixel in y (negative for north-up rasters)
    pub pixel_height: f64,
}

impl GeoTransform {
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
        }
    }

    /// World coordinate of the top-left corner of pixel (col, row).
    pub fn pixel_to_world(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.origin_x + col * self.pixel_width,
            self.origin_y + row * self.pixel_height,
        )
    }

    /// Fractional pixel indices of a world coordinate.
    pub fn world_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        (
            (x - self.origin_x) / self.pixel_width,
            (y - self.origin_y) / self.pixel_height,
        )
    }

    /// Bounding box covered by a raster of the given dimensions.
    pub fn bounds(&self, width: u32, height: u32) -> BoundingBox {
        let (x0, y0) = self.pixel_to_world(0.0, 0.0);
        let (x1, y1) = self.pixel_to_world(f64::from(width), f64::from(height));
        BoundingBox::new(x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1))
    }
}

/// A decoded raster: planar band buffers plus georeferencing.
///
/// All bands share one sample type and the `width * height` length.
/// The nodata value applies to every band; in practice it is read from
/// the file-level GDAL_NODATA tag.
#[derive(Debug, Clone)]
pub struct SourceRaster {
    pub width: u32,
    pub height: u32,
    /// EPSG code of the source coordinate system
    pub srid: u32,
    pub transform: GeoTransform,
    pub sample_type: SampleType,
    pub bands: Vec<BandBuf>,
    pub nodata: Option<f64>,
}

impl SourceRaster {
    /// Validates band shapes against the raster dimensions.
    pub fn new(
        width: u32,
        height: u32,
        srid: u32,
        transform: GeoTransform,
        sample_type: SampleType,
        bands: Vec<BandBuf>,
        nodata: Option<f64>,
    ) -> GeoTiffResult<Self> {
        if width == 0 || height == 0 {
            return Err(GeoTiffError::InvalidRaster(format!(
                "zero dimension: {width}x{height}"
            )));
        }
        if bands.is_empty() {
            return Err(GeoTiffError::InvalidRaster("no bands".to_string()));
        }
        let expected = width as usize * height as usize;
        for (i, band) in bands.iter().enumerate() {
            if band.sample_type() != sample_type {
                return Err(GeoTiffError::InvalidRaster(format!(
                    "band {i} is {} but raster is {}",
                    band.sample_type(),
                    sample_type
                )));
            }
            if band.len() != expected {
                return Err(GeoTiffError::InvalidRaster(format!(
                    "band {i} has {} samples, expected {expected}",
                    band.len()
                )));
            }
        }
        Ok(Self {
            width,
            height,
            srid,
            transform,
            sample_type,
            bands,
            nodata,
        })
    }

    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    /// World extent of the raster in its native coordinate system.
    pub fn bounds(&self) -> BoundingBox {
        self.transform.bounds(self.width, self.height)
    }

    /// Sample at (col, row) from the given band, as f64. Out-of-range
    /// indices return None.
    pub fn sample(&self, band: usize, col: u32, row: u32) -> Option<f64> {
        if col >= self.width || row >= self.height {
            return None;
        }
        let idx = row as usize * self.width as usize + col as usize;
        self.bands.get(band).map(|b| b.get_f64(idx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn north_up() -> GeoTransform {
        GeoTransform::new(1000.0, 2000.0, 10.0, -10.0)
    }

    #[test]
    fn test_pixel_world_round_trip() {
        let gt = north_up();
        let (x, y) = gt.pixel_to_world(3.0, 7.0);
        assert_eq!((x, y), (1030.0, 1930.0));
        let (c, r) = gt.world_to_pixel(x, y);
        assert!((c - 3.0).abs() < 1e-9);
        assert!((r - 7.0).abs() < 1e-9);
    }

    #[test]
    fn test_bounds_normalized() {
        let gt = north_up();
        let b = gt.bounds(100, 50);
        assert_eq!(b.min_x, 1000.0);
        assert_eq!(b.max_x, 2000.0);
        assert_eq!(b.min_y, 1500.0);
        assert_eq!(b.max_y, 2000.0);
    }

    #[test]
    fn test_raster_rejects_mismatched_band() {
        let gt = north_up();
        let band = BandBuf::filled(SampleType::U8, 4, 0.0);
        let err = SourceRaster::new(2, 2, 3857, gt, SampleType::U16, vec![band], None);
        assert!(err.is_err());
    }

    #[test]
    fn test_sample_access() {
        let gt = north_up();
        let band = BandBuf::U8(vec![1, 2, 3, 4]);
        let raster =
            SourceRaster::new(2, 2, 4326, gt, SampleType::U8, vec![band], Some(0.0)).unwrap();
        assert_eq!(raster.sample(0, 1, 1), Some(4.0));
        assert_eq!(raster.sample(0, 2, 0), None);
        assert_eq!(raster.sample(1, 0, 0), None);
    }
}
