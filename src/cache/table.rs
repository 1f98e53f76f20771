//! Open-chaining hash table over arena entries.
//!
//! Buckets hold the head of a chain threaded through each entry's `next_hash`
//! link. The table is not synchronized; the owning shard's lock guards it.
//!
//! Cache entries are fairly large, so the table aims for an average chain
//! length of at most one and doubles its bucket array once the element count
//! exceeds the bucket count.

use super::entry::{EntryArena, EntryId};
use super::invariant_violation;

const MIN_BUCKETS: usize = 4;

#[derive(Debug)]
pub(crate) struct HandleTable {
    /// Bucket heads; the length is always a power of two.
    buckets: Vec<Option<EntryId>>,
    elems: usize,
}

impl HandleTable {
    pub(crate) fn new() -> Self {
        Self { buckets: vec![None; MIN_BUCKETS], elems: 0 }
    }

    pub(crate) fn len(&self) -> usize {
        self.elems
    }

    #[cfg(test)]
    pub(crate) fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    fn bucket(&self, hash: u32) -> usize {
        hash as usize & (self.buckets.len() - 1)
    }

    /// Find the entry matching `key`/`hash` and the chain link pointing at it.
    ///
    /// Returns `(predecessor, match)`; a `None` predecessor means the match is
    /// the bucket head.
    fn find<V>(
        &self,
        arena: &EntryArena<V>,
        key: &[u8],
        hash: u32,
    ) -> (Option<EntryId>, Option<EntryId>) {
        let mut prev = None;
        let mut cur = self.buckets[self.bucket(hash)];
        while let Some(id) = cur {
            let e = &arena[id];
            if e.hash == hash && e.key() == key {
                return (prev, Some(id));
            }
            prev = cur;
            cur = e.next_hash;
        }
        (prev, None)
    }

    fn unlink<V>(&mut self, arena: &mut EntryArena<V>, hash: u32, prev: Option<EntryId>, id: EntryId) {
        let next = arena[id].next_hash.take();
        match prev {
            Some(p) => arena[p].next_hash = next,
            None => {
                let b = self.bucket(hash);
                self.buckets[b] = next;
            }
        }
    }

    pub(crate) fn lookup<V>(&self, arena: &EntryArena<V>, key: &[u8], hash: u32) -> Option<EntryId> {
        self.find(arena, key, hash).1
    }

    /// Insert `id` at the head of its bucket.
    ///
    /// An existing entry with the same key is unlinked and returned; the
    /// caller must finish removing it from the cache.
    pub(crate) fn insert<V>(&mut self, arena: &mut EntryArena<V>, id: EntryId) -> Option<EntryId> {
        let hash = arena[id].hash;
        let (prev, old) = {
            let e = &arena[id];
            self.find(arena, e.key(), hash)
        };
        if let Some(old_id) = old {
            self.unlink(arena, hash, prev, old_id);
        }

        let b = self.bucket(hash);
        arena[id].next_hash = self.buckets[b];
        self.buckets[b] = Some(id);

        if old.is_none() {
            self.elems += 1;
            if self.elems > self.buckets.len() {
                self.resize(arena);
            }
        }
        old
    }

    pub(crate) fn remove<V>(&mut self, arena: &mut EntryArena<V>, key: &[u8], hash: u32) -> Option<EntryId> {
        let (prev, found) = self.find(arena, key, hash);
        if let Some(id) = found {
            self.unlink(arena, hash, prev, id);
            self.elems -= 1;
        }
        found
    }

    /// Remove whatever entry is stored under the key of `id`.
    pub(crate) fn remove_entry<V>(&mut self, arena: &mut EntryArena<V>, id: EntryId) -> Option<EntryId> {
        let hash = arena[id].hash;
        let (prev, found) = {
            let e = &arena[id];
            self.find(arena, e.key(), hash)
        };
        if let Some(found_id) = found {
            self.unlink(arena, hash, prev, found_id);
            self.elems -= 1;
        }
        found
    }

    fn resize<V>(&mut self, arena: &mut EntryArena<V>) {
        let mut new_len = MIN_BUCKETS;
        while new_len < self.elems {
            new_len *= 2;
        }

        let mut new_buckets: Vec<Option<EntryId>> = vec![None; new_len];
        let mut count = 0;
        for head in std::mem::take(&mut self.buckets) {
            let mut cur = head;
            while let Some(id) = cur {
                let e = &mut arena[id];
                cur = e.next_hash;
                let b = e.hash as usize & (new_len - 1);
                e.next_hash = new_buckets[b];
                new_buckets[b] = Some(id);
                count += 1;
            }
        }
        if count != self.elems {
            invariant_violation(&format!(
                "handle table resize moved {} entries, expected {}",
                count, self.elems
            ));
        }
        self.buckets = new_buckets;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::entry::{EntryData, LruEntry};
    use crate::util::{hash, Slice};
    use std::sync::Arc;

    fn add(arena: &mut EntryArena<u32>, key: &[u8], value: u32) -> EntryId {
        let data = Arc::new(EntryData { key: key.into(), value });
        arena.insert(LruEntry::new(data, Box::new(|_: Slice<'_>, _: u32| {}), 1, hash(key, 0)))
    }

    fn get(table: &HandleTable, arena: &EntryArena<u32>, key: &[u8]) -> Option<u32> {
        table.lookup(arena, key, hash(key, 0)).map(|id| arena[id].data.value)
    }

    #[test]
    fn test_insert_lookup_remove() {
        let mut arena = EntryArena::with_key();
        let mut table = HandleTable::new();

        let a = add(&mut arena, b"a", 1);
        let b = add(&mut arena, b"b", 2);
        assert_eq!(table.insert(&mut arena, a), None);
        assert_eq!(table.insert(&mut arena, b), None);
        assert_eq!(table.len(), 2);

        assert_eq!(get(&table, &arena, b"a"), Some(1));
        assert_eq!(get(&table, &arena, b"b"), Some(2));
        assert_eq!(get(&table, &arena, b"c"), None);

        assert_eq!(table.remove(&mut arena, b"a", hash(b"a", 0)), Some(a));
        assert_eq!(table.remove(&mut arena, b"a", hash(b"a", 0)), None);
        assert_eq!(get(&table, &arena, b"a"), None);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_duplicate_key_is_displaced() {
        let mut arena = EntryArena::with_key();
        let mut table = HandleTable::new();

        let first = add(&mut arena, b"dup", 1);
        let second = add(&mut arena, b"dup", 2);
        assert_eq!(table.insert(&mut arena, first), None);
        assert_eq!(table.insert(&mut arena, second), Some(first));
        assert_eq!(table.len(), 1);
        assert_eq!(get(&table, &arena, b"dup"), Some(2));
        assert_eq!(arena[first].next_hash, None);
    }

    #[test]
    fn test_resize_keeps_every_entry() {
        let mut arena = EntryArena::with_key();
        let mut table = HandleTable::new();
        assert_eq!(table.bucket_count(), MIN_BUCKETS);

        let keys: Vec<Vec<u8>> = (0..1000u32).map(|i| i.to_le_bytes().to_vec()).collect();
        for (i, k) in keys.iter().enumerate() {
            let id = add(&mut arena, k, i as u32);
            table.insert(&mut arena, id);
            assert!(table.len() <= table.bucket_count());
            assert!(table.bucket_count().is_power_of_two());
        }
        assert_eq!(table.len(), 1000);
        assert_eq!(table.bucket_count(), 1024);

        for (i, k) in keys.iter().enumerate() {
            assert_eq!(get(&table, &arena, k), Some(i as u32));
        }
    }

    #[test]
    fn test_colliding_chain_removal() {
        // Entries forced into one chain by sharing a hash value.
        let mut arena = EntryArena::with_key();
        let mut table = HandleTable::new();
        let ids: Vec<_> = (0..3u32)
            .map(|v| {
                let data = Arc::new(EntryData { key: vec![v as u8].into(), value: v });
                arena.insert(LruEntry::new(data, Box::new(|_: Slice<'_>, _: u32| {}), 1, 7))
            })
            .collect();
        for &id in &ids {
            table.insert(&mut arena, id);
        }

        assert_eq!(table.remove(&mut arena, &[1], 7), Some(ids[1]));
        assert_eq!(table.lookup(&arena, &[0], 7), Some(ids[0]));
        assert_eq!(table.lookup(&arena, &[2], 7), Some(ids[2]));
        assert_eq!(table.remove_entry(&mut arena, ids[2]), Some(ids[2]));
        assert_eq!(table.lookup(&arena, &[0], 7), Some(ids[0]));
        assert_eq!(table.len(), 1);
    }
}
