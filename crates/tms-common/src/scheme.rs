//! The global tiling scheme: pixel sizes, tile extents, index math and
//! quadrant partitioning.
//!
//! One scheme is supported: a power-of-two pyramid over a square world
//! extent centered at (0, 0) in projection units. Tile x grows eastward,
//! tile y grows southward from the world's northern edge.

use crate::BoundingBox;
use serde::{Deserialize, Serialize};

/// Highest zoom level the scheme supports. Beyond this the per-tile world
/// span loses enough precision that index math stops being exact.
pub const MAX_ZOOM: u32 = 24;

/// A tile coordinate (z/x/y), valid range [0, 2^z - 1] on both axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileIndex {
    pub z: u32,
    pub x: u32,
    pub y: u32,
}

impl TileIndex {
    pub fn new(z: u32, x: u32, y: u32) -> Self {
        Self { z, x, y }
    }
}

/// An inclusive rectangle of tile indices at one zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileIndexBounds {
    pub x_min: u32,
    pub y_min: u32,
    pub x_max: u32,
    pub y_max: u32,
}

impl TileIndexBounds {
    /// Number of tile columns covered (inclusive bounds).
    pub fn width(&self) -> u32 {
        self.x_max - self.x_min + 1
    }

    /// Number of tile rows covered (inclusive bounds).
    pub fn height(&self) -> u32 {
        self.y_max - self.y_min + 1
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x_min && x <= self.x_max && y >= self.y_min && y <= self.y_max
    }
}

/// An inclusive run of tile indices processed as one batch.
///
/// Purely an iteration convenience; a quadrant has no identity beyond its
/// bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quadrant {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl Quadrant {
    /// Number of tiles in this quadrant.
    pub fn tile_count(&self) -> u64 {
        u64::from(self.x1 - self.x0 + 1) * u64::from(self.y1 - self.y0 + 1)
    }
}

/// Fixed parameters of a tiling scheme.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TilingScheme {
    /// Ground units spanned by the full pyramid at zoom 0.
    pub world_size: f64,
    /// Pixels per tile edge.
    pub tile_size: u32,
    /// EPSG code of the scheme projection.
    pub srid: u32,
}

/// The Web Mercator scheme used by the whole system: EPSG:3857, 512 px
/// tiles, world size 2π·6378137 meters.
pub const WEB_MERCATOR: TilingScheme = TilingScheme {
    world_size: 2.0 * std::f64::consts::PI * 6_378_137.0,
    tile_size: 512,
    srid: 3857,
};

impl TilingScheme {
    /// Ground units per pixel at a zoom level.
    ///
    /// Halves at each successive zoom: `pixel_size(z + 1) == pixel_size(z) / 2`.
    pub fn pixel_size(&self, zoom: u32) -> f64 {
        debug_assert!(zoom <= MAX_ZOOM, "zoom {zoom} outside supported range");
        (self.world_size / f64::from(1u32 << zoom.min(MAX_ZOOM))) / f64::from(self.tile_size)
    }

    /// Ground units spanned by one tile edge at a zoom level.
    pub fn tile_span(&self, zoom: u32) -> f64 {
        debug_assert!(zoom <= MAX_ZOOM, "zoom {zoom} outside supported range");
        self.world_size / f64::from(1u32 << zoom.min(MAX_ZOOM))
    }

    /// World extent of the whole scheme, centered at the origin.
    pub fn world_bounds(&self) -> BoundingBox {
        let half = self.world_size / 2.0;
        BoundingBox::new(-half, -half, half, half)
    }

    /// Geographic extent of a tile, in scheme projection units.
    ///
    /// Returned normalized (min_y < max_y); tile y counts down from the
    /// northern world edge.
    pub fn tile_world_bbox(&self, x: u32, y: u32, zoom: u32) -> BoundingBox {
        let span = self.tile_span(zoom);
        let shift = self.world_size / 2.0;

        let min_x = f64::from(x) * span - shift;
        let max_x = f64::from(x + 1) * span - shift;
        let max_y = shift - f64::from(y) * span;
        let min_y = shift - f64::from(y + 1) * span;

        BoundingBox::new(min_x, min_y, max_x, max_y)
    }

    /// The tile-index rectangle covering a geographic bbox at a zoom level.
    ///
    /// Truncates toward the tile containing each corner, so a bbox edge
    /// lying exactly on a tile boundary includes both adjacent tiles. This
    /// is the authoritative boundary policy: indexing must never exclude
    /// area the bbox overlaps. Indices are clamped to the world's valid
    /// range.
    pub fn tile_index_bbox(&self, bbox: &BoundingBox, zoom: u32) -> TileIndexBounds {
        let span = self.tile_span(zoom);
        let shift = self.world_size / 2.0;
        let last = (1u32 << zoom.min(MAX_ZOOM)) - 1;

        let clamp = |v: f64| (v.floor().max(0.0) as u32).min(last);

        TileIndexBounds {
            x_min: clamp((bbox.min_x + shift) / span),
            x_max: clamp((bbox.max_x + shift) / span),
            y_min: clamp((shift - bbox.max_y) / span),
            y_max: clamp((shift - bbox.min_y) / span),
        }
    }

    /// Partition a geographic bbox at a zoom level into quadrants of at
    /// most `quadrant_size` tiles per side.
    ///
    /// Iteration is x-major (outer x, inner y); the order carries no
    /// meaning but is deterministic so fixtures reproduce. With
    /// `quadrant_size == 1` every tile is its own quadrant.
    pub fn make_quadrants(
        &self,
        bbox: &BoundingBox,
        zoom: u32,
        quadrant_size: u32,
    ) -> Vec<Quadrant> {
        debug_assert!(quadrant_size > 0, "quadrant_size must be positive");
        let idx = self.tile_index_bbox(bbox, zoom);
        let mut quadrants = Vec::new();

        let mut x = idx.x_min;
        while x <= idx.x_max {
            let mut y = idx.y_min;
            while y <= idx.y_max {
                quadrants.push(Quadrant {
                    x0: x,
                    y0: y,
                    x1: (x + quadrant_size - 1).min(idx.x_max),
                    y1: (y + quadrant_size - 1).min(idx.y_max),
                });
                y = match y.checked_add(quadrant_size) {
                    Some(next) => next,
                    None => break,
                };
            }
            x = match x.checked_add(quadrant_size) {
                Some(next) => next,
                None => break,
            };
        }

        quadrants
    }
}
