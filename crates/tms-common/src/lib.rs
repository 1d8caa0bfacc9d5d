//! Common types shared across the raster-tms workspace.

pub mod bbox;
pub mod error;
pub mod geom;
pub mod layer;
pub mod sample;
pub mod scheme;

pub use bbox::BoundingBox;
pub use error::{TmsError, TmsResult};
pub use geom::{MultiPolygon, Polygon};
pub use layer::{LayerId, LayerKind, LayerRecord};
pub use sample::{BandBuf, SampleType};
pub use scheme::{Quadrant, TileIndex, TileIndexBounds, TilingScheme, WEB_MERCATOR};
