//! Footprint geometry for layer coverage.
//!
//! Coverage is the union of per-source footprint rectangles, kept as a
//! multi-polygon of exterior rings. Serving-side spatial lookups are an
//! external concern; this module only builds and carries the geometry.

use crate::BoundingBox;
use serde::{Deserialize, Serialize};

/// A simple polygon: one closed exterior ring of (x, y) vertices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    /// EPSG code of the ring coordinates.
    pub srid: u32,
    /// Closed ring; first and last vertex are equal.
    pub ring: Vec<(f64, f64)>,
}

impl Polygon {
    /// Rectangle footprint of a bounding box, wound counter-clockwise
    /// from the south-west corner.
    pub fn from_bbox(bbox: &BoundingBox, srid: u32) -> Self {
        Self {
            srid,
            ring: vec![
                (bbox.min_x, bbox.min_y),
                (bbox.max_x, bbox.min_y),
                (bbox.max_x, bbox.max_y),
                (bbox.min_x, bbox.max_y),
                (bbox.min_x, bbox.min_y),
            ],
        }
    }

    /// Axis-aligned bounds of the ring.
    pub fn envelope(&self) -> BoundingBox {
        let mut bbox = BoundingBox::new(
            f64::INFINITY,
            f64::INFINITY,
            f64::NEG_INFINITY,
            f64::NEG_INFINITY,
        );
        for &(x, y) in &self.ring {
            bbox.min_x = bbox.min_x.min(x);
            bbox.min_y = bbox.min_y.min(y);
            bbox.max_x = bbox.max_x.max(x);
            bbox.max_y = bbox.max_y.max(y);
        }
        bbox
    }
}

/// Union of per-source footprints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MultiPolygon {
    pub polygons: Vec<Polygon>,
}

impl MultiPolygon {
    pub fn new(polygons: Vec<Polygon>) -> Self {
        Self { polygons }
    }

    pub fn push(&mut self, polygon: Polygon) {
        self.polygons.push(polygon);
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    /// Envelope over all member polygons; `None` when empty.
    pub fn envelope(&self) -> Option<BoundingBox> {
        let mut iter = self.polygons.iter().map(Polygon::envelope);
        let first = iter.next()?;
        Some(iter.fold(first, |acc, b| {
            BoundingBox::new(
                acc.min_x.min(b.min_x),
                acc.min_y.min(b.min_y),
                acc.max_x.max(b.max_x),
                acc.max_y.max(b.max_y),
            )
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_bbox_is_closed_ring() {
        let poly = Polygon::from_bbox(&BoundingBox::new(0.0, 0.0, 10.0, 5.0), 3857);
        assert_eq!(poly.ring.len(), 5);
        assert_eq!(poly.ring.first(), poly.ring.last());
        assert_eq!(poly.envelope(), BoundingBox::new(0.0, 0.0, 10.0, 5.0));
    }

    #[test]
    fn test_multipolygon_envelope() {
        let mut coverage = MultiPolygon::default();
        assert!(coverage.envelope().is_none());

        coverage.push(Polygon::from_bbox(&BoundingBox::new(0.0, 0.0, 1.0, 1.0), 3857));
        coverage.push(Polygon::from_bbox(&BoundingBox::new(5.0, -2.0, 8.0, 3.0), 3857));

        let env = coverage.envelope().unwrap();
        assert_eq!(env, BoundingBox::new(0.0, -2.0, 8.0, 3.0));
    }
}
