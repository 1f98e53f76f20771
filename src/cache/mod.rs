//! Sharded LRU cache.
//!
//! A [`Cache`] maps keys to values. It has internal synchronization and may
//! be safely accessed concurrently from multiple threads. It may evict entries
//! to make room for new ones. Each value has a caller-assigned charge against
//! the cache capacity; a cache of variable-length blocks might use the block
//! length as the charge.
//!
//! [`ShardedLruCache`] is the built-in implementation with least-recently-used
//! eviction. Callers wanting scan resistance or a custom policy can implement
//! [`Cache`] themselves.
//!
//! [`BlockCache`] layers a typed, statistics-gathering block cache for
//! SSTable reads on top of a (possibly shared) `ShardedLruCache`.

mod block;
mod entry;
mod handle;
mod shard;
mod sharded;
mod table;

pub use block::{BlockCache, CacheKey, CacheStats};
pub use handle::{CachedValue, Handle};
pub use sharded::{shard_index, ShardedLruCache, NUM_SHARDS, NUM_SHARD_BITS};

use crate::util::Slice;

/// Create a new cache with a fixed capacity and least-recently-used eviction.
pub fn new_lru_cache<V>(capacity: u64) -> ShardedLruCache<V> {
    ShardedLruCache::new(capacity)
}

/// A concurrent, capacity-bounded key/value cache with pinned handles.
pub trait Cache<V> {
    /// Opaque reference to an entry stored in the cache.
    type Handle;

    /// Insert a mapping from `key` to `value` with the given charge against
    /// the capacity, replacing any existing mapping for `key`.
    ///
    /// Returns a handle to the new mapping which must be passed to
    /// [`Cache::release`] once no longer needed. When the entry is no longer
    /// referenced by the cache or any handle, `deleter` receives its key and
    /// value.
    fn insert<'k>(
        &self,
        key: impl Into<Slice<'k>>,
        value: V,
        charge: u64,
        deleter: impl FnOnce(Slice<'_>, V) + Send + 'static,
    ) -> Self::Handle;

    /// Return a handle to the mapping for `key`, or `None` if there is none.
    fn lookup<'k>(&self, key: impl Into<Slice<'k>>) -> Option<Self::Handle>;

    /// Release a handle returned by a previous `insert` or `lookup` on this cache.
    fn release(&self, handle: Self::Handle);

    /// Return the value pinned by `handle`.
    fn value<'h>(&self, handle: &'h Self::Handle) -> &'h V;

    /// Erase the mapping for `key`, if any. The entry itself is kept until
    /// every handle to it has been released.
    fn erase<'k>(&self, key: impl Into<Slice<'k>>);

    /// Return a new numeric id.
    ///
    /// Clients sharing one cache typically allocate an id at startup and
    /// prepend it to their keys to partition the key space.
    fn new_id(&self) -> u64;

    /// Drop every entry not currently referenced by a handle.
    fn prune(&self);

    /// Combined charge of all entries stored in the cache.
    fn total_charge(&self) -> u64;

    /// Like [`Cache::lookup`], but the returned guard releases itself on drop.
    fn lookup_pinned<'k>(&self, key: impl Into<Slice<'k>>) -> Option<CachedValue<'_, V, Self>>
    where
        Self: Sized,
    {
        self.lookup(key).map(|handle| CachedValue::new(self, handle))
    }

    /// Like [`Cache::insert`], but the returned guard releases itself on drop.
    fn insert_pinned<'k>(
        &self,
        key: impl Into<Slice<'k>>,
        value: V,
        charge: u64,
        deleter: impl FnOnce(Slice<'_>, V) + Send + 'static,
    ) -> CachedValue<'_, V, Self>
    where
        Self: Sized,
    {
        let handle = self.insert(key, value, charge, deleter);
        CachedValue::new(self, handle)
    }
}

/// Report a broken cache invariant and abort the operation.
///
/// These indicate a corrupted list/refcount structure or a misused handle;
/// carrying on would hide the corruption.
#[cold]
#[track_caller]
pub(crate) fn invariant_violation(msg: &str) -> ! {
    log::error!("cache invariant violated: {}", msg);
    panic!("cache invariant violated: {}", msg)
}
