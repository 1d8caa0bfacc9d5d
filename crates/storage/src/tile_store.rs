//! The tile store abstraction and its in-process implementation.
//!
//! The store is synchronous on purpose: the pyramid driver's sink runs on
//! a blocking worker thread and writes tiles directly, with no executor in
//! the loop. Async front ends hold the store behind an `Arc` and call into
//! it from handlers; individual operations are short lock-bounded map
//! accesses.

use std::collections::HashMap;
use std::sync::RwLock;

use pyramid::TilePayload;
use tms_common::{LayerId, LayerRecord, MultiPolygon, TileIndex, TmsError, TmsResult};
use tracing::debug;

/// Persistence seam for layers and tiles.
///
/// Durable backends are external collaborators behind this trait; the
/// in-memory implementation below serves tests and single-process
/// deployments. `put_tile` is last-write-wins.
pub trait TileStore: Send + Sync {
    fn create_layer(&self, record: LayerRecord) -> TmsResult<()>;
    fn delete_layer(&self, id: &LayerId) -> TmsResult<()>;
    fn put_tile(&self, id: &LayerId, index: TileIndex, payload: TilePayload) -> TmsResult<()>;
    fn get_tile(&self, id: &LayerId, index: TileIndex) -> Option<TilePayload>;
    fn set_available(&self, id: &LayerId, available: bool) -> TmsResult<()>;
    fn set_coverage(&self, id: &LayerId, coverage: MultiPolygon) -> TmsResult<()>;
    fn layer(&self, id: &LayerId) -> Option<LayerRecord>;
}

struct LayerEntry {
    record: LayerRecord,
    tiles: HashMap<(u32, u32, u32), TilePayload>,
}

/// In-process [`TileStore`] backed by RwLock-guarded maps.
#[derive(Default)]
pub struct MemoryTileStore {
    layers: RwLock<HashMap<LayerId, LayerEntry>>,
}

impl MemoryTileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tiles stored for a layer, for tests and diagnostics.
    pub fn tile_count(&self, id: &LayerId) -> usize {
        self.layers
            .read()
            .map(|layers| layers.get(id).map_or(0, |e| e.tiles.len()))
            .unwrap_or(0)
    }

    fn with_entry<T>(
        &self,
        id: &LayerId,
        f: impl FnOnce(&mut LayerEntry) -> T,
    ) -> TmsResult<T> {
        let mut layers = self
            .layers
            .write()
            .map_err(|_| TmsError::Storage("layer map lock poisoned".to_string()))?;
        let entry = layers
            .get_mut(id)
            .ok_or_else(|| TmsError::LayerNotFound(id.to_string()))?;
        Ok(f(entry))
    }
}

impl TileStore for MemoryTileStore {
    fn create_layer(&self, record: LayerRecord) -> TmsResult<()> {
        let mut layers = self
            .layers
            .write()
            .map_err(|_| TmsError::Storage("layer map lock poisoned".to_string()))?;
        if layers.contains_key(&record.id) {
            return Err(TmsError::Storage(format!(
                "layer {} already exists",
                record.id
            )));
        }
        debug!(layer = %record.id, "layer created");
        layers.insert(
            record.id.clone(),
            LayerEntry {
                record,
                tiles: HashMap::new(),
            },
        );
        Ok(())
    }

    fn delete_layer(&self, id: &LayerId) -> TmsResult<()> {
        let mut layers = self
            .layers
            .write()
            .map_err(|_| TmsError::Storage("layer map lock poisoned".to_string()))?;
        layers
            .remove(id)
            .map(|_| debug!(layer = %id, "layer deleted"))
            .ok_or_else(|| TmsError::LayerNotFound(id.to_string()))
    }

    fn put_tile(&self, id: &LayerId, index: TileIndex, payload: TilePayload) -> TmsResult<()> {
        self.with_entry(id, |entry| {
            entry.tiles.insert((index.z, index.x, index.y), payload);
        })
    }

    fn get_tile(&self, id: &LayerId, index: TileIndex) -> Option<TilePayload> {
        self.layers
            .read()
            .ok()?
            .get(id)?
            .tiles
            .get(&(index.z, index.x, index.y))
            .cloned()
    }

    fn set_available(&self, id: &LayerId, available: bool) -> TmsResult<()> {
        self.with_entry(id, |entry| {
            entry.record.available = available;
        })
    }

    fn set_coverage(&self, id: &LayerId, coverage: MultiPolygon) -> TmsResult<()> {
        self.with_entry(id, |entry| {
            entry.record.coverage = coverage;
        })
    }

    fn layer(&self, id: &LayerId) -> Option<LayerRecord> {
        self.layers.read().ok()?.get(id).map(|e| e.record.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pyramid::VisualTile;
    use tms_common::LayerKind;

    fn record(name: &str) -> LayerRecord {
        LayerRecord::new(LayerId::new(name), name, LayerKind::Visual)
    }

    fn png_payload(marker: u8) -> TilePayload {
        TilePayload::Visual(VisualTile(vec![marker; 8]))
    }

    #[test]
    fn test_layer_lifecycle() {
        let store = MemoryTileStore::new();
        let id = LayerId::new("rainfall");

        store.create_layer(record("rainfall")).unwrap();
        assert!(!store.layer(&id).unwrap().available);

        store.set_available(&id, true).unwrap();
        assert!(store.layer(&id).unwrap().available);

        store.delete_layer(&id).unwrap();
        assert!(store.layer(&id).is_none());
        assert!(matches!(
            store.delete_layer(&id),
            Err(TmsError::LayerNotFound(_))
        ));
    }

    #[test]
    fn test_duplicate_layer_rejected() {
        let store = MemoryTileStore::new();
        store.create_layer(record("dem")).unwrap();
        assert!(store.create_layer(record("dem")).is_err());
    }

    #[test]
    fn test_put_tile_is_last_write_wins() {
        let store = MemoryTileStore::new();
        let id = LayerId::new("imagery");
        store.create_layer(record("imagery")).unwrap();

        let index = TileIndex::new(3, 2, 1);
        store.put_tile(&id, index, png_payload(1)).unwrap();
        store.put_tile(&id, index, png_payload(2)).unwrap();

        match store.get_tile(&id, index) {
            Some(TilePayload::Visual(tile)) => assert_eq!(tile.0[0], 2),
            other => panic!("expected the second write, got {other:?}"),
        }
        assert_eq!(store.tile_count(&id), 1);
    }

    #[test]
    fn test_missing_lookups_are_none_not_errors() {
        let store = MemoryTileStore::new();
        let id = LayerId::new("ghost");
        assert!(store.get_tile(&id, TileIndex::new(0, 0, 0)).is_none());
        assert!(store.layer(&id).is_none());
    }

    #[test]
    fn test_put_tile_requires_layer() {
        let store = MemoryTileStore::new();
        let id = LayerId::new("nope");
        assert!(matches!(
            store.put_tile(&id, TileIndex::new(0, 0, 0), png_payload(0)),
            Err(TmsError::LayerNotFound(_))
        ));
    }
}
