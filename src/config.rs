//! Configuration options for the block cache.

/// Configuration options for building a cache.
#[derive(Debug, Clone)]
pub struct CacheOptions {
    /// Total charge budget shared by all shards.
    /// Set to 0 to disable caching.
    /// Default: 8MB
    pub capacity: u64,

    /// Largest charge `BlockCache` will admit. Bigger blocks are handed back
    /// to the caller without being cached.
    /// Default: None (the per-shard capacity)
    pub max_entry_charge: Option<u64>,

    /// Verify list, refcount and usage invariants after every mutation.
    /// Costs a full walk of the shard per operation.
    /// Default: false
    pub paranoid_checks: bool,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            capacity: 8 * 1024 * 1024, // 8MB
            max_entry_charge: None,
            paranoid_checks: false,
        }
    }
}

impl CacheOptions {
    /// Creates a new CacheOptions with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the total cache capacity.
    pub fn capacity(mut self, capacity: u64) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the largest charge admitted by `BlockCache`.
    pub fn max_entry_charge(mut self, charge: u64) -> Self {
        self.max_entry_charge = Some(charge);
        self
    }

    /// Enables or disables per-operation invariant checks.
    pub fn paranoid_checks(mut self, value: bool) -> Self {
        self.paranoid_checks = value;
        self
    }

    /// Validates the options and returns an error if any are invalid.
    pub fn validate(&self) -> crate::Result<()> {
        if let Some(max) = self.max_entry_charge {
            if max == 0 {
                return Err(crate::Error::invalid_argument("max_entry_charge must be > 0"));
            }
            if self.capacity > 0 && max > self.capacity {
                return Err(crate::Error::invalid_argument(format!(
                    "max_entry_charge {} exceeds capacity {}",
                    max, self.capacity
                )));
            }
        }
        Ok(())
    }
}
