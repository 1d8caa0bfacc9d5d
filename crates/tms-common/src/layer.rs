//! Layer model: identity, tile kind, and the per-layer record persisted
//! through the storage collaborator.

use crate::MultiPolygon;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for a layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayerId(pub String);

impl LayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for LayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What kind of tiles a layer carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerKind {
    /// Raw multi-band tiles preserving source samples and datatype.
    Analytic,
    /// RGBA PNG tiles for direct display.
    Visual,
}

/// A layer record as stored and served.
///
/// The band special-cases of the tiler are explicit configuration here
/// rather than positional assumptions: `nodata_band_index` names the band
/// whose nodata value stamps the whole analytic tile, and
/// `visual_band_indices` names the bands composited to RGB.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerRecord {
    pub id: LayerId,
    pub name: String,
    pub kind: LayerKind,
    pub min_zoom: u32,
    pub max_zoom: u32,
    /// Band whose nodata value is carried by analytic tiles. The original
    /// system always took band 0, even for multi-band sources whose other
    /// bands differ; that behavior is preserved, just made visible.
    pub nodata_band_index: usize,
    /// Bands composited to R, G, B for visual tiles.
    pub visual_band_indices: [usize; 3],
    /// Set true only when ingestion has fully completed.
    pub available: bool,
    /// Union of source footprints, in the scheme CRS.
    pub coverage: MultiPolygon,
    pub created_at: DateTime<Utc>,
}

impl LayerRecord {
    pub fn new(id: LayerId, name: impl Into<String>, kind: LayerKind) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            min_zoom: 0,
            max_zoom: 18,
            nodata_band_index: 0,
            visual_band_indices: [0, 1, 2],
            available: false,
            coverage: MultiPolygon::default(),
            created_at: Utc::now(),
        }
    }

    pub fn with_zoom_range(mut self, min_zoom: u32, max_zoom: u32) -> Self {
        self.min_zoom = min_zoom;
        self.max_zoom = max_zoom;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_defaults() {
        let record = LayerRecord::new(LayerId::new("ortho"), "Orthophoto", LayerKind::Visual);
        assert!(!record.available);
        assert_eq!(record.nodata_band_index, 0);
        assert_eq!(record.visual_band_indices, [0, 1, 2]);
        assert!(record.coverage.is_empty());
    }

    #[test]
    fn test_record_serde_roundtrip() {
        let record = LayerRecord::new(LayerId::new("dem"), "Elevation", LayerKind::Analytic)
            .with_zoom_range(2, 12);
        let json = serde_json::to_string(&record).unwrap();
        let parsed: LayerRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id, record.id);
        assert_eq!(parsed.kind, LayerKind::Analytic);
        assert_eq!(parsed.min_zoom, 2);
        assert_eq!(parsed.max_zoom, 12);
    }
}
