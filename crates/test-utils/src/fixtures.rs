//! On-disk GeoTIFF fixtures.

use std::path::PathBuf;

use geotiff_parser::{write_geotiff, SourceRaster};
use tempfile::TempDir;
use tms_common::{SampleType, TilingScheme};

use crate::generators::centered_raster;

/// A scratch directory holding one written GeoTIFF.
///
/// The directory lives as long as the fixture; dropping it removes the
/// file.
pub struct GeoTiffFixture {
    pub dir: TempDir,
    pub path: PathBuf,
    pub raster: SourceRaster,
}

/// Writes a centered synthetic raster to disk as `name` inside a fresh
/// temp directory.
pub fn geotiff_fixture(
    scheme: &TilingScheme,
    name: &str,
    size: u32,
    bands: usize,
    sample_type: SampleType,
) -> GeoTiffFixture {
    let raster = centered_raster(scheme, size, bands, sample_type, 0.25);
    let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir failed: {e}"));
    let path = dir.path().join(name);
    write_geotiff(&path, &raster).unwrap_or_else(|e| panic!("fixture write failed: {e}"));
    GeoTiffFixture { dir, path, raster }
}
