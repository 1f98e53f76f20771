//! A single shard of the sharded cache.
//!
//! Every entry in the cache is on exactly one of two lists while the table
//! holds it, and on neither once it has been erased but is still referenced
//! by a caller:
//!
//! - in-use: entries referenced by callers (`refs >= 2`), in no particular
//!   order. Kept so teardown can detect leaked handles.
//! - LRU: entries only the cache references (`refs == 1`), oldest first.
//!
//! Entries move between the lists when a reference count crosses 1 <-> 2.
//! Deleters for entries whose count reaches zero are collected while the
//! lock is held and run after it is released.

use super::entry::{
    finish_all, Deleter, EntryArena, EntryData, EntryId, EntryList, EntryRef, LruEntry, Retired,
};
use super::invariant_violation;
use super::table::HandleTable;
use parking_lot::Mutex;
use std::sync::Arc;

pub(crate) struct LruShard<V> {
    paranoid_checks: bool,
    state: Mutex<ShardState<V>>,
}

impl<V> LruShard<V> {
    pub(crate) fn new(capacity: u64, paranoid_checks: bool) -> Self {
        Self { paranoid_checks, state: Mutex::new(ShardState::new(capacity)) }
    }

    /// Run `op` under the lock, then run any deleters it retired.
    fn with_state<R>(&self, op: impl FnOnce(&mut ShardState<V>, &mut Vec<Retired<V>>) -> R) -> R {
        let mut retired = Vec::new();
        let result = {
            let mut state = self.state.lock();
            let result = op(&mut *state, &mut retired);
            if self.paranoid_checks {
                state.check_invariants();
            }
            result
        };
        finish_all(retired);
        result
    }

    pub(crate) fn insert(
        &self,
        key: &[u8],
        hash: u32,
        value: V,
        charge: u64,
        deleter: Deleter<V>,
    ) -> EntryRef<V> {
        self.with_state(|state, retired| state.insert(key, hash, value, charge, deleter, retired))
    }

    pub(crate) fn lookup(&self, key: &[u8], hash: u32) -> Option<EntryRef<V>> {
        self.with_state(|state, _| state.lookup(key, hash))
    }

    pub(crate) fn release(&self, id: EntryId) {
        self.with_state(|state, retired| {
            if !state.entries.contains_key(id) {
                invariant_violation("released a handle whose entry no longer exists");
            }
            retired.extend(state.unref(id));
        })
    }

    pub(crate) fn erase(&self, key: &[u8], hash: u32) {
        self.with_state(|state, retired| {
            if let Some(id) = state.table.remove(&mut state.entries, key, hash) {
                retired.extend(state.finish_erase(id));
            }
        })
    }

    /// Drop every entry not referenced by a caller. Returns how many went.
    pub(crate) fn prune(&self) -> usize {
        self.with_state(|state, retired| {
            let mut pruned = 0;
            while let Some(id) = state.lru.front() {
                state.evict(id, retired);
                pruned += 1;
            }
            pruned
        })
    }

    pub(crate) fn total_charge(&self) -> u64 {
        self.state.lock().usage
    }

    #[cfg(test)]
    pub(crate) fn check_invariants(&self) {
        self.state.lock().check_invariants();
    }
}

struct ShardState<V> {
    capacity: u64,
    usage: u64,
    entries: EntryArena<V>,
    /// Entries with `refs == 1 && in_cache`, oldest first.
    lru: EntryList,
    /// Entries with `refs >= 2 && in_cache`.
    in_use: EntryList,
    table: HandleTable,
}

impl<V> ShardState<V> {
    fn new(capacity: u64) -> Self {
        Self {
            capacity,
            usage: 0,
            entries: EntryArena::with_key(),
            lru: EntryList::new(),
            in_use: EntryList::new(),
            table: HandleTable::new(),
        }
    }

    fn insert(
        &mut self,
        key: &[u8],
        hash: u32,
        value: V,
        charge: u64,
        deleter: Deleter<V>,
        retired: &mut Vec<Retired<V>>,
    ) -> EntryRef<V> {
        let data = Arc::new(EntryData { key: key.into(), value });
        // refs starts at 1 for the returned handle.
        let id = self.entries.insert(LruEntry::new(Arc::clone(&data), deleter, charge, hash));

        // A zero capacity turns caching off: the entry never enters the table.
        if self.capacity > 0 {
            let e = &mut self.entries[id];
            e.refs += 1;
            e.in_cache = true;
            self.in_use.push_back(&mut self.entries, id);
            self.usage = self.usage.wrapping_add(charge);
            if let Some(old) = self.table.insert(&mut self.entries, id) {
                retired.extend(self.finish_erase(old));
            }
        }

        while self.usage > self.capacity {
            let Some(oldest) = self.lru.front() else {
                break;
            };
            log::trace!(
                "evicting entry (charge {}) to bring usage {} under capacity {}",
                self.entries[oldest].charge,
                self.usage,
                self.capacity
            );
            self.evict(oldest, retired);
        }

        EntryRef { id, charge, data }
    }

    fn lookup(&mut self, key: &[u8], hash: u32) -> Option<EntryRef<V>> {
        let id = self.table.lookup(&self.entries, key, hash)?;
        self.ref_entry(id);
        let e = &self.entries[id];
        Some(EntryRef { id, charge: e.charge, data: Arc::clone(&e.data) })
    }

    /// Remove an entry from the head of the LRU list.
    fn evict(&mut self, id: EntryId, retired: &mut Vec<Retired<V>>) {
        if self.entries[id].refs != 1 {
            invariant_violation("entry on the LRU list is referenced by a caller");
        }
        if self.table.remove_entry(&mut self.entries, id) != Some(id) {
            invariant_violation("entry on the LRU list is missing from the table");
        }
        retired.extend(self.finish_erase(id));
    }

    fn ref_entry(&mut self, id: EntryId) {
        let e = &self.entries[id];
        if e.refs == 1 && e.in_cache {
            self.lru.unlink(&mut self.entries, id);
            self.in_use.push_back(&mut self.entries, id);
        }
        self.entries[id].refs += 1;
    }

    fn unref(&mut self, id: EntryId) -> Option<Retired<V>> {
        let e = &mut self.entries[id];
        if e.refs == 0 {
            invariant_violation("reference count underflow");
        }
        e.refs -= 1;
        if e.refs == 0 {
            if e.in_cache {
                invariant_violation("entry still in cache lost its last reference");
            }
            return self.entries.remove(id).map(LruEntry::retire);
        }
        if e.in_cache && e.refs == 1 {
            // No longer in use; becomes evictable again.
            self.in_use.unlink(&mut self.entries, id);
            self.lru.push_back(&mut self.entries, id);
        }
        None
    }

    /// Finish removing `id`, which has already been removed from the table.
    fn finish_erase(&mut self, id: EntryId) -> Option<Retired<V>> {
        let e = &self.entries[id];
        if !e.in_cache {
            invariant_violation("erased entry was not in cache");
        }
        let charge = e.charge;
        if e.refs == 1 {
            self.lru.unlink(&mut self.entries, id);
        } else {
            self.in_use.unlink(&mut self.entries, id);
        }
        self.entries[id].in_cache = false;
        self.usage = self.usage.wrapping_sub(charge);
        self.unref(id)
    }

    fn check_invariants(&self) {
        let mut charge = 0u64;
        for id in self.lru.iter(&self.entries) {
            let e = &self.entries[id];
            if !e.in_cache || e.refs != 1 {
                invariant_violation("LRU list holds an entry that is referenced or not cached");
            }
            charge = charge.wrapping_add(e.charge);
        }
        for id in self.in_use.iter(&self.entries) {
            let e = &self.entries[id];
            if !e.in_cache || e.refs < 2 {
                invariant_violation("in-use list holds an entry that is unreferenced or not cached");
            }
            charge = charge.wrapping_add(e.charge);
        }
        if charge != self.usage {
            invariant_violation(&format!("usage {} does not match listed charge {}", self.usage, charge));
        }
        let listed = self.lru.len() + self.in_use.len();
        if listed != self.table.len() {
            invariant_violation(&format!(
                "lists hold {} entries but the table holds {}",
                listed,
                self.table.len()
            ));
        }
        let cached = self.entries.values().filter(|e| e.in_cache).count();
        if cached != listed {
            invariant_violation(&format!("{} entries flagged in cache, {} listed", cached, listed));
        }
    }
}

impl<V> Drop for ShardState<V> {
    fn drop(&mut self) {
        if !self.in_use.is_empty() {
            if std::thread::panicking() {
                log::error!("cache shard dropped during a panic with {} handles outstanding", self.in_use.len());
                return;
            }
            invariant_violation(&format!(
                "cache dropped while {} entries are still referenced by callers",
                self.in_use.len()
            ));
        }

        let mut retired = Vec::new();
        while let Some(id) = self.lru.front() {
            self.lru.unlink(&mut self.entries, id);
            let e = &mut self.entries[id];
            if !e.in_cache || e.refs != 1 {
                invariant_violation("LRU list holds an entry that is referenced or not cached");
            }
            e.in_cache = false;
            retired.extend(self.unref(id));
        }
        if !self.entries.is_empty() {
            log::warn!(
                "{} erased entries are still pinned by handles at cache teardown",
                self.entries.len()
            );
        }
        finish_all(retired);
    }
}
