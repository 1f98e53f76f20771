//! Cache entries and the intrusive lists that order them.
//!
//! Entries live in a slot-map arena owned by their shard. List and hash-chain
//! links are arena indices, so an entry can sit on one list and one hash chain
//! at the same time without any aliasing pointers.

use super::invariant_violation;
use crate::util::Slice;
use slotmap::{new_key_type, SlotMap};
use std::sync::Arc;

new_key_type! {
    /// Arena index of a cache entry.
    pub struct EntryId;
}

/// Callback receiving an entry's key and payload once its last reference is gone.
pub(crate) type Deleter<V> = Box<dyn FnOnce(Slice<'_>, V) + Send>;

pub(crate) type EntryArena<V> = SlotMap<EntryId, LruEntry<V>>;

/// Immutable part of an entry, shared between the arena and outstanding handles.
#[derive(Debug)]
pub(crate) struct EntryData<V> {
    pub(crate) key: Box<[u8]>,
    pub(crate) value: V,
}

pub(crate) struct LruEntry<V> {
    pub(crate) data: Arc<EntryData<V>>,
    deleter: Deleter<V>,
    pub(crate) charge: u64,
    /// Hash of the key; used for sharding and fast comparisons.
    pub(crate) hash: u32,
    /// References, including the cache's own reference if present.
    pub(crate) refs: u32,
    /// Whether the table holds this entry.
    pub(crate) in_cache: bool,
    pub(crate) prev: Option<EntryId>,
    pub(crate) next: Option<EntryId>,
    pub(crate) next_hash: Option<EntryId>,
}

impl<V> LruEntry<V> {
    pub(crate) fn new(data: Arc<EntryData<V>>, deleter: Deleter<V>, charge: u64, hash: u32) -> Self {
        Self {
            data,
            deleter,
            charge,
            hash,
            refs: 1,
            in_cache: false,
            prev: None,
            next: None,
            next_hash: None,
        }
    }

    pub(crate) fn key(&self) -> &[u8] {
        &self.data.key
    }

    /// Turn a dead entry into its pending deleter call.
    pub(crate) fn retire(self) -> Retired<V> {
        Retired { data: self.data, deleter: self.deleter }
    }
}

/// A new reference to an entry, handed out of a shard.
pub(crate) struct EntryRef<V> {
    pub(crate) id: EntryId,
    pub(crate) charge: u64,
    pub(crate) data: Arc<EntryData<V>>,
}

/// An entry whose refcount reached zero, waiting for its deleter to run.
///
/// Shards collect these under their lock and finish them after unlocking.
pub(crate) struct Retired<V> {
    data: Arc<EntryData<V>>,
    deleter: Deleter<V>,
}

impl<V> Retired<V> {
    pub(crate) fn finish(self) {
        match Arc::try_unwrap(self.data) {
            Ok(EntryData { key, value }) => (self.deleter)(Slice::new(&key), value),
            Err(_) => invariant_violation("retired entry payload is still shared by a handle"),
        }
    }
}

/// Run the deleters of every retired entry, in retirement order.
pub(crate) fn finish_all<V>(retired: Vec<Retired<V>>) {
    for r in retired {
        r.finish();
    }
}

/// Doubly-linked list threaded through arena entries.
///
/// `head` is the oldest entry, `tail` the newest.
#[derive(Debug, Default)]
pub(crate) struct EntryList {
    head: Option<EntryId>,
    tail: Option<EntryId>,
    len: usize,
}

impl EntryList {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn front(&self) -> Option<EntryId> {
        self.head
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Make `id` the newest entry.
    pub(crate) fn push_back<V>(&mut self, arena: &mut EntryArena<V>, id: EntryId) {
        let old_tail = self.tail;
        {
            let e = &mut arena[id];
            e.prev = old_tail;
            e.next = None;
        }
        match old_tail {
            Some(t) => arena[t].next = Some(id),
            None => self.head = Some(id),
        }
        self.tail = Some(id);
        self.len += 1;
    }

    /// Unlink `id`, which must be a member of this list.
    pub(crate) fn unlink<V>(&mut self, arena: &mut EntryArena<V>, id: EntryId) {
        let (prev, next) = {
            let e = &mut arena[id];
            (e.prev.take(), e.next.take())
        };
        match prev {
            Some(p) => arena[p].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => arena[n].prev = prev,
            None => self.tail = prev,
        }
        self.len -= 1;
    }

    /// Walk the list from oldest to newest.
    pub(crate) fn iter<'a, V>(&self, arena: &'a EntryArena<V>) -> impl Iterator<Item = EntryId> + 'a {
        let mut cur = self.head;
        std::iter::from_fn(move || {
            let id = cur?;
            cur = arena[id].next;
            Some(id)
        })
    }
}
