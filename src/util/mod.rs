//! Small building blocks shared by the cache and its callers.
//!
//! - [`Slice`]: a borrowed view over key bytes
//! - [`hash`]: the 32-bit hash used for sharding and table lookup
//! - [`crc32c`]: masked CRC-32C checksums for on-disk records

pub mod crc32c;
pub mod hash;
pub mod slice;

pub use hash::hash;
pub use slice::Slice;
