// Model-based property tests for the sharded LRU cache
//
// A single-threaded cache is compared against a simple model that tracks
// which keys must be live. Eviction makes the cache a subset of the model,
// so the checks are one-sided where eviction is allowed to happen.

use parking_lot::Mutex;
use proptest::prelude::*;
use sharded_lru::{CacheOptions, Handle, ShardedLruCache, Slice};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone)]
enum Op {
    Insert { key: u8, charge: u64, pin: bool },
    Lookup { key: u8, pin: bool },
    Erase { key: u8 },
    ReleaseOne,
    Prune,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (any::<u8>(), 0u64..8, any::<bool>())
            .prop_map(|(key, charge, pin)| Op::Insert { key, charge, pin }),
        4 => (any::<u8>(), any::<bool>()).prop_map(|(key, pin)| Op::Lookup { key, pin }),
        1 => any::<u8>().prop_map(|key| Op::Erase { key }),
        2 => Just(Op::ReleaseOne),
        1 => Just(Op::Prune),
    ]
}

const MAX_CHARGE: u64 = 3;

type Log = Arc<Mutex<Vec<(u8, u32)>>>;

fn insert(cache: &ShardedLruCache<u32>, log: &Log, key: u8, value: u32, charge: u64) -> Handle<u32> {
    let log = Arc::clone(log);
    cache.insert(&[key], value, charge, move |k: Slice<'_>, v: u32| {
        log.lock().push((k.at(0), v));
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Every inserted value is deleted exactly once, never while pinned, and
    /// lookups only ever return the latest value for a key.
    #[test]
    fn prop_matches_model(capacity in 0u64..64, ops in prop::collection::vec(op_strategy(), 1..200)) {
        let options = CacheOptions::new().capacity(capacity).paranoid_checks(true);
        let cache = ShardedLruCache::with_options(&options).unwrap();
        let log: Log = Arc::new(Mutex::new(Vec::new()));

        // latest value inserted for each key that has not been erased since
        let mut latest: HashMap<u8, u32> = HashMap::new();
        let mut pinned: Vec<Handle<u32>> = Vec::new();
        let mut inserted = 0usize;

        for op in ops {
            match op {
                Op::Insert { key, charge, pin } => {
                    // values are unique so deleter calls can be attributed
                    let value = inserted as u32;
                    let h = insert(&cache, &log, key, value, charge);
                    inserted += 1;
                    prop_assert_eq!(*h.value(), value);
                    latest.insert(key, value);
                    if pin { pinned.push(h) } else { cache.release(h) }
                }
                Op::Lookup { key, pin } => {
                    if let Some(h) = cache.lookup(&[key]) {
                        prop_assert_eq!(Some(h.value()), latest.get(&key));
                        if pin { pinned.push(h) } else { cache.release(h) }
                    }
                }
                Op::Erase { key } => {
                    cache.erase(&[key]);
                    latest.remove(&key);
                    prop_assert!(cache.lookup(&[key]).is_none());
                }
                Op::ReleaseOne => {
                    if let Some(h) = pinned.pop() {
                        cache.release(h);
                    }
                }
                Op::Prune => cache.prune(),
            }

            // a pinned value has never been handed to its deleter
            let deleted = log.lock().clone();
            for h in &pinned {
                let entry = (h.key().at(0), *h.value());
                prop_assert!(!deleted.contains(&entry));
            }
            if capacity == 0 {
                prop_assert_eq!(cache.total_charge(), 0);
            }
        }

        for h in pinned.drain(..) {
            cache.release(h);
        }
        cache.prune();
        prop_assert_eq!(cache.total_charge(), 0);
        prop_assert_eq!(log.lock().len(), inserted);
    }

    /// Usage never exceeds the per-shard budget while nothing is pinned,
    /// except for a lone entry charged more than its whole shard.
    #[test]
    fn prop_unpinned_usage_within_capacity(
        capacity in 16u64..256,
        entries in prop::collection::vec((any::<u16>(), 1u64..=MAX_CHARGE), 1..500),
    ) {
        let cache: ShardedLruCache<u16> = ShardedLruCache::new(capacity);
        for (key, charge) in entries {
            let h = cache.insert(&key.to_le_bytes(), key, charge, |_: Slice<'_>, _: u16| {});
            cache.release(h);
            let per_shard = cache.per_shard_capacity().max(MAX_CHARGE);
            prop_assert!(cache.total_charge() <= per_shard * 16);
        }
    }
}
