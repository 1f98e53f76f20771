//! # sharded-lru - A Concurrent Block Cache for Storage Engines
//!
//! An in-process, fixed-capacity key/value cache with least-recently-used
//! eviction, built to sit inside an LSM-tree storage engine as its block
//! cache.
//!
//! ## Architecture
//!
//! - **Sharding**: the key space is split across 16 shards by the top four
//!   bits of the key hash; each shard has its own lock
//! - **Charges**: capacity is a budget of caller-assigned charges, not an
//!   entry count
//! - **Handles**: callers pin entries with handles; a pinned entry is never
//!   freed, even after it has been erased, replaced or evicted
//! - **Deleters**: each entry carries a callback that receives its key and
//!   value once the last reference is gone
//!
//! ## Example Usage
//!
//! ```rust
//! use sharded_lru::{Cache, ShardedLruCache};
//!
//! let cache: ShardedLruCache<String> = ShardedLruCache::new(1024);
//!
//! // Insert returns a handle that must be released.
//! let handle = cache.insert("key1", "value1".to_string(), 6, |_key, _value| {});
//! cache.release(handle);
//!
//! // Pinned lookups release themselves on drop.
//! if let Some(value) = cache.lookup_pinned("key1") {
//!     assert_eq!(*value, "value1");
//! }
//!
//! cache.erase("key1");
//! assert!(cache.lookup("key1").is_none());
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

// Module declarations
pub mod cache;
pub mod config;
pub mod error;
pub mod util;

// Re-exports
pub use cache::{
    new_lru_cache, BlockCache, Cache, CacheKey, CacheStats, CachedValue, Handle, ShardedLruCache,
};
pub use config::CacheOptions;
pub use error::{Error, Result};
pub use util::{hash, Slice};
