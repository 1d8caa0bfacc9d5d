//! Byte-budgeted LRU cache for rendered tile bytes on the serving path.
//!
//! The budget is explicit and eviction is accounted, replacing the
//! grow-forever per-process dictionary this design started from. Values
//! are the final PNG bytes, so a hit skips both the store lookup and any
//! analytic re-rendering.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use bytes::Bytes;
use lru::LruCache;
use tms_common::{LayerId, TileIndex};
use tracing::debug;

// The LruCache entry bound is effectively unlimited; eviction is driven
// by the byte budget below.
const LRU_CAPACITY: usize = 1_000_000;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    layer: LayerId,
    z: u32,
    x: u32,
    y: u32,
}

/// Hit/miss/eviction counters, atomics for lock-free reads.
#[derive(Default)]
pub struct TileCacheStats {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub evictions: AtomicU64,
    pub size_bytes: AtomicU64,
}

impl TileCacheStats {
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64 * 100.0
        }
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes.load(Ordering::Relaxed)
    }

    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }
}

/// Size-bounded LRU over rendered tile bytes, keyed by layer/z/x/y.
pub struct TileCache {
    cache: Mutex<LruCache<CacheKey, Bytes>>,
    max_bytes: u64,
    stats: TileCacheStats,
}

impl TileCache {
    /// A cache holding at most `max_bytes` of tile data.
    pub fn new(max_bytes: u64) -> Self {
        let capacity = NonZeroUsize::new(LRU_CAPACITY).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Mutex::new(LruCache::new(capacity)),
            max_bytes,
            stats: TileCacheStats::default(),
        }
    }

    pub fn stats(&self) -> &TileCacheStats {
        &self.stats
    }

    pub fn get(&self, layer: &LayerId, index: TileIndex) -> Option<Bytes> {
        let key = CacheKey {
            layer: layer.clone(),
            z: index.z,
            x: index.x,
            y: index.y,
        };
        let Ok(mut cache) = self.cache.lock() else {
            return None;
        };
        match cache.get(&key) {
            Some(bytes) => {
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                Some(bytes.clone())
            }
            None => {
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Inserts tile bytes, evicting LRU entries until the byte budget
    /// holds. A value larger than the whole budget is skipped outright.
    pub fn put(&self, layer: &LayerId, index: TileIndex, bytes: Bytes) {
        let size = bytes.len() as u64;
        if size > self.max_bytes {
            return;
        }
        let key = CacheKey {
            layer: layer.clone(),
            z: index.z,
            x: index.x,
            y: index.y,
        };

        let Ok(mut cache) = self.cache.lock() else {
            return;
        };
        if let Some(old) = cache.peek(&key) {
            self.stats
                .size_bytes
                .fetch_sub(old.len() as u64, Ordering::Relaxed);
        }
        cache.put(key, bytes);
        let mut current = self.stats.size_bytes.fetch_add(size, Ordering::Relaxed) + size;

        while current > self.max_bytes {
            match cache.pop_lru() {
                Some((evicted_key, evicted)) => {
                    let freed = evicted.len() as u64;
                    current = self
                        .stats
                        .size_bytes
                        .fetch_sub(freed, Ordering::Relaxed)
                        - freed;
                    self.stats.evictions.fetch_add(1, Ordering::Relaxed);
                    debug!(
                        layer = %evicted_key.layer,
                        z = evicted_key.z,
                        x = evicted_key.x,
                        y = evicted_key.y,
                        freed,
                        "cache eviction"
                    );
                }
                None => break,
            }
        }
    }

    /// Drops every cached tile for a layer, used when a layer is deleted
    /// or re-ingested.
    pub fn invalidate_layer(&self, layer: &LayerId) {
        let Ok(mut cache) = self.cache.lock() else {
            return;
        };
        let doomed: Vec<CacheKey> = cache
            .iter()
            .filter(|(key, _)| &key.layer == layer)
            .map(|(key, _)| key.clone())
            .collect();
        for key in doomed {
            if let Some(bytes) = cache.pop(&key) {
                self.stats
                    .size_bytes
                    .fetch_sub(bytes.len() as u64, Ordering::Relaxed);
            }
        }
    }
}
