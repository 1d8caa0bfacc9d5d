//! GeoTIFF reading and writing for the tile pyramid pipeline.
//!
//! This crate provides a pure Rust GeoTIFF layer on top of the `tiff` crate:
//! decoding georeferenced rasters into [`SourceRaster`] (planar band buffers
//! plus an affine geotransform), and encoding rasters back to GeoTIFF, which
//! the ingestion tests use to build fixtures.
//!
//! Georeferencing is read from the standard GeoTIFF tags: ModelPixelScale
//! (33550), ModelTiepoint (33922), GeoKeyDirectory (34735) for the EPSG code,
//! and GDAL_NODATA (42113) for the nodata value.

pub mod error;
pub mod raster;
pub mod reader;
pub mod writer;

pub use error::{GeoTiffError, GeoTiffResult};
pub use raster::{GeoTransform, SourceRaster};
pub use reader::{open_geotiff, probe_geotiff, RasterProbe};
pub use writer::{write_geotiff, write_u64_geotiff};
