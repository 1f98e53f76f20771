//! CRC-32C (Castagnoli) checksums with masking for stored records.
//!
//! Computing the CRC of a string that contains embedded CRCs is problematic,
//! so CRCs written to files should be masked first.

use crate::error::{Error, Result};

const MASK_DELTA: u32 = 0xa282ead8;

/// Return the CRC-32C of `data`.
pub fn value(data: &[u8]) -> u32 {
    ::crc32c::crc32c(data)
}

/// Return the CRC-32C of `A ++ data` given `init_crc`, the CRC-32C of `A`.
pub fn extend(init_crc: u32, data: &[u8]) -> u32 {
    ::crc32c::crc32c_append(init_crc, data)
}

/// Return a masked representation of `crc`.
pub fn mask(crc: u32) -> u32 {
    crc.rotate_right(15).wrapping_add(MASK_DELTA)
}

/// Return the crc whose masked representation is `masked_crc`.
pub fn unmask(masked_crc: u32) -> u32 {
    masked_crc.wrapping_sub(MASK_DELTA).rotate_left(15)
}

/// Check `data` against a masked CRC read back from storage.
pub fn verify_masked(data: &[u8], masked_crc: u32) -> Result<()> {
    let expected = unmask(masked_crc);
    let actual = value(data);
    if expected != actual {
        return Err(Error::ChecksumMismatch { expected, actual });
    }
    Ok(())
}
