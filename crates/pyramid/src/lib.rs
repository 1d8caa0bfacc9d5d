//! Tile pyramid generation: CRS transforms, band resampling, tile
//! compositing and the zoom-by-zoom driver.
//!
//! The pipeline is: reproject a decoded raster to the scheme CRS once
//! ([`reproject_raster`]), then walk the requested zoom range with
//! [`generate_pyramid`], which resamples each covering tile
//! nearest-neighbor, composites it into an analytic or visual payload
//! and hands it to a caller-supplied sink.

pub mod compose;
pub mod driver;
pub mod png;
pub mod projection;
pub mod resample;

pub use compose::{compose_visual, AnalyticTile, TilePayload, VisualTile};
pub use driver::{generate_pyramid, PyramidReport, RenderConfig};
pub use projection::{reproject_raster, CoordTransformer};
pub use resample::resample_band;
