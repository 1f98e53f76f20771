//! Router spreading the key space across independently locked shards.

use super::entry::Deleter;
use super::handle::Handle;
use super::shard::LruShard;
use super::{invariant_violation, Cache};
use crate::config::CacheOptions;
use crate::error::Result;
use crate::util::{hash, Slice};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Number of top hash bits used to pick a shard.
pub const NUM_SHARD_BITS: u32 = 4;

/// Number of shards in every [`ShardedLruCache`].
pub const NUM_SHARDS: usize = 1 << NUM_SHARD_BITS;

/// Source of per-instance ids stamped into handles.
static NEXT_CACHE_ID: AtomicU64 = AtomicU64::new(1);

/// Shard selected by the top bits of a key hash.
pub fn shard_index(hash: u32) -> usize {
    (hash >> (32 - NUM_SHARD_BITS)) as usize
}

fn hash_key(key: &[u8]) -> u32 {
    hash(key, 0)
}

/// LRU cache split into [`NUM_SHARDS`] independently locked shards.
///
/// Each shard gets `ceil(capacity / NUM_SHARDS)` of the budget, so the
/// effective total may slightly exceed the nominal capacity. Operations on
/// keys in different shards never contend.
///
/// # Thread Safety
///
/// This cache is thread-safe and can be shared across multiple threads
/// using `Arc<ShardedLruCache<V>>`.
///
/// # Examples
///
/// ```
/// use sharded_lru::ShardedLruCache;
///
/// let cache = ShardedLruCache::new(1024);
/// let handle = cache.insert("answer", 42u32, 1, |_key, _value| {});
/// cache.release(handle);
///
/// let handle = cache.lookup("answer").unwrap();
/// assert_eq!(*cache.value(&handle), 42);
/// cache.release(handle);
/// ```
pub struct ShardedLruCache<V> {
    shards: [LruShard<V>; NUM_SHARDS],
    /// Last id handed out by `new_id`.
    last_id: Mutex<u64>,
    capacity: u64,
    cache_id: u64,
}

impl<V> ShardedLruCache<V> {
    /// Create a cache with the given total capacity. A capacity of 0
    /// disables caching: inserted entries live only as long as their handles.
    pub fn new(capacity: u64) -> Self {
        Self::build(capacity, false)
    }

    /// Create a cache from validated options.
    pub fn with_options(options: &CacheOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self::build(options.capacity, options.paranoid_checks))
    }

    fn build(capacity: u64, paranoid_checks: bool) -> Self {
        let per_shard = capacity.div_ceil(NUM_SHARDS as u64);
        log::debug!(
            "creating sharded LRU cache: capacity={}, shards={}, per_shard={}",
            capacity,
            NUM_SHARDS,
            per_shard
        );
        Self {
            shards: std::array::from_fn(|_| LruShard::new(per_shard, paranoid_checks)),
            last_id: Mutex::new(0),
            capacity,
            cache_id: NEXT_CACHE_ID.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Nominal capacity the cache was created with.
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Capacity of each individual shard.
    pub fn per_shard_capacity(&self) -> u64 {
        self.capacity.div_ceil(NUM_SHARDS as u64)
    }

    fn shard(&self, hash: u32) -> &LruShard<V> {
        &self.shards[shard_index(hash)]
    }

    fn check_owner(&self, handle: &Handle<V>) {
        if handle.cache_id != self.cache_id {
            invariant_violation("handle was issued by a different cache");
        }
    }

    /// Insert a mapping from `key` to `value`, charged `charge` against the
    /// capacity. Never fails; may evict unreferenced entries.
    ///
    /// The returned handle must be passed back to [`release`](Self::release).
    /// `deleter` runs exactly once, after the entry has left the cache and its
    /// last handle has been released.
    pub fn insert<'k>(
        &self,
        key: impl Into<Slice<'k>>,
        value: V,
        charge: u64,
        deleter: impl FnOnce(Slice<'_>, V) + Send + 'static,
    ) -> Handle<V> {
        let key = key.into();
        let hash = hash_key(key.data());
        let deleter: Deleter<V> = Box::new(deleter);
        let entry = self.shard(hash).insert(key.data(), hash, value, charge, deleter);
        Handle::new(entry, hash, self.cache_id)
    }

    /// Return a handle to the mapping for `key`, marking it most recently used.
    pub fn lookup<'k>(&self, key: impl Into<Slice<'k>>) -> Option<Handle<V>> {
        let key = key.into();
        let hash = hash_key(key.data());
        let entry = self.shard(hash).lookup(key.data(), hash)?;
        Some(Handle::new(entry, hash, self.cache_id))
    }

    /// Release a handle obtained from this cache.
    ///
    /// # Panics
    ///
    /// Panics if the handle was issued by another cache.
    pub fn release(&self, handle: Handle<V>) {
        self.check_owner(&handle);
        let (id, hash) = handle.into_entry();
        self.shard(hash).release(id);
    }

    /// Return the value pinned by `handle`.
    ///
    /// # Panics
    ///
    /// Panics if the handle was issued by another cache.
    pub fn value<'h>(&self, handle: &'h Handle<V>) -> &'h V {
        self.check_owner(handle);
        handle.value()
    }

    /// Erase the mapping for `key`. A no-op if there is none.
    pub fn erase<'k>(&self, key: impl Into<Slice<'k>>) {
        let key = key.into();
        let hash = hash_key(key.data());
        self.shard(hash).erase(key.data(), hash);
    }

    /// Return a new id, strictly greater than every id returned before.
    pub fn new_id(&self) -> u64 {
        let mut last_id = self.last_id.lock();
        *last_id += 1;
        *last_id
    }

    /// Drop every entry not referenced by a handle, in every shard.
    pub fn prune(&self) {
        let pruned: usize = self.shards.iter().map(LruShard::prune).sum();
        log::debug!("pruned {} unreferenced cache entries", pruned);
    }

    /// Sum of the charges of all cached entries, wrapping on overflow.
    pub fn total_charge(&self) -> u64 {
        self.shards.iter().map(LruShard::total_charge).fold(0, u64::wrapping_add)
    }
}

impl<V> fmt::Debug for ShardedLruCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShardedLruCache")
            .field("capacity", &self.capacity)
            .field("total_charge", &self.total_charge())
            .finish()
    }
}

impl<V> Cache<V> for ShardedLruCache<V> {
    type Handle = Handle<V>;

    fn insert<'k>(
        &self,
        key: impl Into<Slice<'k>>,
        value: V,
        charge: u64,
        deleter: impl FnOnce(Slice<'_>, V) + Send + 'static,
    ) -> Handle<V> {
        ShardedLruCache::insert(self, key, value, charge, deleter)
    }

    fn lookup<'k>(&self, key: impl Into<Slice<'k>>) -> Option<Handle<V>> {
        ShardedLruCache::lookup(self, key)
    }

    fn release(&self, handle: Handle<V>) {
        ShardedLruCache::release(self, handle)
    }

    fn value<'h>(&self, handle: &'h Handle<V>) -> &'h V {
        ShardedLruCache::value(self, handle)
    }

    fn erase<'k>(&self, key: impl Into<Slice<'k>>) {
        ShardedLruCache::erase(self, key)
    }

    fn new_id(&self) -> u64 {
        ShardedLruCache::new_id(self)
    }

    fn prune(&self) {
        ShardedLruCache::prune(self)
    }

    fn total_charge(&self) -> u64 {
        ShardedLruCache::total_charge(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::new_lru_cache;

    #[test]
    fn test_shard_index_uses_top_bits() {
        assert_eq!(shard_index(0), 0);
        assert_eq!(shard_index(0x0fff_ffff), 0);
        assert_eq!(shard_index(0x1000_0000), 1);
        assert_eq!(shard_index(u32::MAX), NUM_SHARDS - 1);
    }

    #[test]
    fn test_same_key_same_shard() {
        for i in 0..100u32 {
            let key = i.to_le_bytes();
            assert_eq!(shard_index(hash_key(&key)), shard_index(hash_key(&key)));
            assert!(shard_index(hash_key(&key)) < NUM_SHARDS);
        }
    }

    #[test]
    fn test_per_shard_capacity_rounds_up() {
        let cache: ShardedLruCache<()> = new_lru_cache(1000);
        assert_eq!(cache.capacity(), 1000);
        assert_eq!(cache.per_shard_capacity(), 63);

        let cache: ShardedLruCache<()> = new_lru_cache(0);
        assert_eq!(cache.per_shard_capacity(), 0);

        let cache: ShardedLruCache<()> = new_lru_cache(1);
        assert_eq!(cache.per_shard_capacity(), 1);
    }

    #[test]
    fn test_entry_lands_in_its_shard() {
        let cache = ShardedLruCache::new(1600);
        let key = b"routed";
        let h = cache.insert(key, 1u8, 3, |_, _| {});
        cache.release(h);

        let target = shard_index(hash_key(key));
        for (i, shard) in cache.shards.iter().enumerate() {
            let expected = if i == target { 3 } else { 0 };
            assert_eq!(shard.total_charge(), expected);
            shard.check_invariants();
        }
    }

    #[test]
    fn test_new_id_is_strictly_increasing() {
        let cache: ShardedLruCache<()> = ShardedLruCache::new(16);
        let ids: Vec<u64> = (0..10).map(|_| cache.new_id()).collect();
        assert_eq!(ids, (1..=10).collect::<Vec<_>>());
    }

    #[test]
    fn test_handles_carry_key_and_charge() {
        let cache = ShardedLruCache::new(100);
        let h = cache.insert("abc", 5u32, 2, |_, _| {});
        assert_eq!(h.key(), Slice::from("abc"));
        assert_eq!(h.charge(), 2);
        assert!(format!("{:?}", h).contains("charge: 2"));
        cache.release(h);
        assert!(format!("{:?}", cache).contains("total_charge: 2"));
    }
}
