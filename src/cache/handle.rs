//! Caller-held references to cache entries.

use super::entry::{EntryData, EntryId, EntryRef};
use super::{invariant_violation, Cache};
use crate::util::Slice;
use std::fmt;
use std::marker::PhantomData;
use std::ops::Deref;
use std::sync::Arc;

/// One reference to a cached entry.
///
/// A handle keeps its entry's payload alive, even after the entry has been
/// erased, overwritten or evicted from the cache. Every handle returned by
/// `insert` or `lookup` must be passed back to `release` exactly once;
/// `release` takes the handle by value, so a handle cannot be released twice.
/// A cache dropped while handles to its cached entries are outstanding panics.
#[must_use = "a handle must be passed back to the cache's `release`"]
pub struct Handle<V> {
    pub(crate) id: EntryId,
    pub(crate) hash: u32,
    pub(crate) cache_id: u64,
    charge: u64,
    data: Arc<EntryData<V>>,
}

impl<V> Handle<V> {
    pub(crate) fn new(entry: EntryRef<V>, hash: u32, cache_id: u64) -> Self {
        let EntryRef { id, charge, data } = entry;
        Self { id, hash, cache_id, charge, data }
    }

    /// The payload this handle refers to.
    pub fn value(&self) -> &V {
        &self.data.value
    }

    /// The key the entry was inserted under.
    pub fn key(&self) -> Slice<'_> {
        Slice::new(&self.data.key)
    }

    /// The charge the entry was inserted with.
    pub fn charge(&self) -> u64 {
        self.charge
    }

    /// Consume the handle, dropping its payload reference, and return the
    /// entry it pinned.
    pub(crate) fn into_entry(self) -> (EntryId, u32) {
        (self.id, self.hash)
    }
}

impl<V> fmt::Debug for Handle<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("key", &self.key())
            .field("hash", &format_args!("{:#010x}", self.hash))
            .field("charge", &self.charge)
            .finish()
    }
}

/// A handle that releases itself when dropped.
///
/// Derefs to the cached payload.
pub struct CachedValue<'a, V, C: Cache<V>> {
    cache: &'a C,
    /// Always `Some` until `into_handle` takes it.
    handle: Option<C::Handle>,
    _value: PhantomData<fn() -> V>,
}

impl<'a, V, C: Cache<V>> CachedValue<'a, V, C> {
    pub(crate) fn new(cache: &'a C, handle: C::Handle) -> Self {
        Self { cache, handle: Some(handle), _value: PhantomData }
    }

    /// Give up automatic release and return the raw handle.
    pub fn into_handle(mut self) -> C::Handle {
        match self.handle.take() {
            Some(handle) => handle,
            None => invariant_violation("pinned value lost its handle"),
        }
    }
}

impl<V, C: Cache<V>> Deref for CachedValue<'_, V, C> {
    type Target = V;

    fn deref(&self) -> &V {
        match &self.handle {
            Some(handle) => self.cache.value(handle),
            None => invariant_violation("pinned value lost its handle"),
        }
    }
}

impl<V, C: Cache<V>> Drop for CachedValue<'_, V, C> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.cache.release(handle);
        }
    }
}

impl<V: fmt::Debug, C: Cache<V>> fmt::Debug for CachedValue<'_, V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CachedValue").field(&**self).finish()
    }
}
