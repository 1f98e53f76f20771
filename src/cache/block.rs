//! Block cache for SSTable data blocks.
//!
//! Wraps a [`ShardedLruCache`] holding [`Bytes`] blocks. Several block caches
//! (one per open table set, say) can share one underlying cache: each takes a
//! namespace id from [`ShardedLruCache::new_id`] and prefixes it to its keys.

use super::sharded::ShardedLruCache;
use crate::config::CacheOptions;
use crate::error::Result;
use crate::util::Slice;
use bytes::{BufMut, Bytes};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Encoded key length: namespace + file id + offset.
const ENCODED_KEY_LEN: usize = 24;

/// A unique identifier for a cached block.
///
/// Combines the file number and block offset to uniquely identify a block
/// across all SSTables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// SSTable file number
    pub file_id: u64,
    /// Block offset in the file
    pub offset: u64,
}

impl CacheKey {
    /// Create a new cache key
    pub fn new(file_id: u64, offset: u64) -> Self {
        Self { file_id, offset }
    }

    fn encode(&self, namespace: u64) -> [u8; ENCODED_KEY_LEN] {
        let mut buf = [0u8; ENCODED_KEY_LEN];
        let mut out = &mut buf[..];
        out.put_u64_le(namespace);
        out.put_u64_le(self.file_id);
        out.put_u64_le(self.offset);
        buf
    }
}

/// Statistics for cache performance monitoring.
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    /// Total number of cache lookups
    pub lookups: u64,
    /// Number of cache hits
    pub hits: u64,
    /// Number of cache misses
    pub misses: u64,
    /// Number of insertions
    pub insertions: u64,
    /// Number of blocks dropped by the cache (evicted, replaced or removed)
    pub evictions: u64,
}

impl CacheStats {
    /// Calculate the cache hit rate (0.0 to 1.0)
    pub fn hit_rate(&self) -> f64 {
        if self.lookups == 0 {
            0.0
        } else {
            self.hits as f64 / self.lookups as f64
        }
    }
}

#[derive(Debug, Default)]
struct StatsCounters {
    lookups: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    insertions: AtomicU64,
    evictions: AtomicU64,
}

impl StatsCounters {
    fn snapshot(&self) -> CacheStats {
        CacheStats {
            lookups: self.lookups.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            insertions: self.insertions.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    fn reset(&self) {
        self.lookups.store(0, Ordering::Relaxed);
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.insertions.store(0, Ordering::Relaxed);
        self.evictions.store(0, Ordering::Relaxed);
    }
}

/// Thread-safe cache for SSTable blocks.
///
/// # Thread Safety
///
/// This cache is thread-safe and can be shared across multiple threads
/// using `Arc<BlockCache>`.
#[derive(Debug)]
pub struct BlockCache {
    cache: Arc<ShardedLruCache<Bytes>>,
    /// Key prefix separating this block cache from other users of `cache`.
    namespace: u64,
    /// Blocks charged above this are not cached.
    max_block_charge: u64,
    stats: Arc<StatsCounters>,
}

impl BlockCache {
    /// Create a new BlockCache with the specified capacity.
    ///
    /// # Arguments
    ///
    /// * `capacity` - Maximum cache size in bytes. Set to 0 to disable caching.
    ///
    /// # Examples
    ///
    /// ```
    /// use sharded_lru::BlockCache;
    ///
    /// // Create a 8MB cache
    /// let cache = BlockCache::new(8 * 1024 * 1024);
    /// ```
    pub fn new(capacity: u64) -> Self {
        Self::shared(Arc::new(ShardedLruCache::new(capacity)))
    }

    /// Create a BlockCache from validated options.
    pub fn with_options(options: &CacheOptions) -> Result<Self> {
        let cache = Arc::new(ShardedLruCache::with_options(options)?);
        let mut block_cache = Self::shared(cache);
        if let Some(max) = options.max_entry_charge {
            block_cache.max_block_charge = max;
        }
        Ok(block_cache)
    }

    /// Create a BlockCache storing its blocks in an existing, possibly shared,
    /// cache.
    pub fn shared(cache: Arc<ShardedLruCache<Bytes>>) -> Self {
        let namespace = cache.new_id();
        let max_block_charge = cache.per_shard_capacity();
        Self { cache, namespace, max_block_charge, stats: Arc::new(StatsCounters::default()) }
    }

    /// Get a block from the cache.
    ///
    /// Returns `Some(block)` if the block is in the cache (cache hit),
    /// or `None` if not found (cache miss). A hit makes the block the most
    /// recently used.
    pub fn get(&self, key: &CacheKey) -> Option<Bytes> {
        self.stats.lookups.fetch_add(1, Ordering::Relaxed);

        let encoded = key.encode(self.namespace);
        match self.cache.lookup(&encoded) {
            Some(handle) => {
                let block = handle.value().clone();
                self.cache.release(handle);
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                Some(block)
            }
            None => {
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Insert a block into the cache, replacing any block under the same key.
    ///
    /// Evicts least recently used blocks as needed to stay within capacity.
    /// Blocks larger than the per-block limit are not cached.
    pub fn insert(&self, key: CacheKey, value: Bytes) {
        if self.cache.capacity() == 0 {
            return;
        }

        let encoded = key.encode(self.namespace);
        let charge = value.len() as u64;
        if charge > self.max_block_charge {
            log::trace!(
                "not caching block {:?}: {} bytes exceeds limit {}",
                key,
                charge,
                self.max_block_charge
            );
            // an older version of the block must not outlive this one
            self.cache.erase(&encoded);
            return;
        }

        let stats = Arc::clone(&self.stats);
        let handle = self.cache.insert(&encoded, value, charge, move |_: Slice<'_>, _: Bytes| {
            stats.evictions.fetch_add(1, Ordering::Relaxed);
        });
        self.cache.release(handle);
        self.stats.insertions.fetch_add(1, Ordering::Relaxed);
    }

    /// Remove a block from the cache.
    pub fn remove(&self, key: &CacheKey) {
        self.cache.erase(&key.encode(self.namespace));
    }

    /// Drop every block not currently being read, across all users of the
    /// underlying cache.
    pub fn prune(&self) {
        self.cache.prune();
    }

    /// Get current cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }

    /// Reset cache statistics to zero.
    pub fn reset_stats(&self) {
        self.stats.reset();
    }

    /// Get the current size of cached data in bytes, across all users of the
    /// underlying cache.
    pub fn size(&self) -> u64 {
        self.cache.total_charge()
    }

    /// Get the cache capacity in bytes.
    pub fn capacity(&self) -> u64 {
        self.cache.capacity()
    }
}
