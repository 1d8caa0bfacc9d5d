//! Application state and shared resources.

use std::sync::Arc;

use ingestion::Ingestor;
use storage::{JobQueue, MemoryTileStore, TileCache, TileStore};
use tms_common::{TilingScheme, WEB_MERCATOR};

use crate::config::Args;

/// Shared application state.
pub struct AppState {
    pub store: Arc<dyn TileStore>,
    pub cache: TileCache,
    pub queue: JobQueue,
    pub ingestor: Arc<Ingestor>,
    pub scheme: TilingScheme,
    pub default_min_zoom: u32,
    pub default_max_zoom: u32,
}

impl AppState {
    /// Builds the in-process state; must run on a tokio runtime since the
    /// job queue spawns its worker here.
    pub fn new(args: &Args) -> Self {
        let store: Arc<dyn TileStore> = Arc::new(MemoryTileStore::new());
        let scheme = WEB_MERCATOR;
        let ingestor = Arc::new(Ingestor::new(
            Arc::clone(&store),
            scheme,
            args.scratch_dir.clone(),
        ));

        Self {
            store,
            cache: TileCache::new(args.cache_mb * 1024 * 1024),
            queue: JobQueue::start(),
            ingestor,
            scheme,
            default_min_zoom: args.default_min_zoom,
            default_max_zoom: args.default_max_zoom,
        }
    }
}
