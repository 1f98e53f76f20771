//! Fast non-cryptographic 32-bit hash, similar to murmur hash.
//!
//! Input is consumed four bytes at a time, each chunk read as little-endian,
//! so the result is identical on every host byte order.

const M: u32 = 0xc6a4a793;
const R: u32 = 24;

/// Hash `data` with the given `seed`.
pub fn hash(data: &[u8], seed: u32) -> u32 {
    // Length is deliberately truncated to 32 bits.
    let mut h = seed ^ (data.len() as u32).wrapping_mul(M);

    let mut chunks = data.chunks_exact(4);
    for chunk in &mut chunks {
        let w = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        h = h.wrapping_add(w);
        h = h.wrapping_mul(M);
        h ^= h >> 16;
    }

    let rest = chunks.remainder();
    if rest.len() == 3 {
        h = h.wrapping_add(u32::from(rest[2]) << 16);
    }
    if rest.len() >= 2 {
        h = h.wrapping_add(u32::from(rest[1]) << 8);
    }
    if !rest.is_empty() {
        h = h.wrapping_add(u32::from(rest[0]));
        h = h.wrapping_mul(M);
        h ^= h >> R;
    }

    h
}
