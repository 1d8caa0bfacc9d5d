//! Storage layer: the tile store abstraction, the serving-side tile
//! cache, and the ingestion job queue.

pub mod queue;
pub mod tile_cache;
pub mod tile_store;

pub use queue::{JobInfo, JobQueue, JobStatus};
pub use tile_cache::{TileCache, TileCacheStats};
pub use tile_store::{MemoryTileStore, TileStore};
