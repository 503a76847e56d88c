//! CRC-32C checksums with the masking used throughout TensorFlow file formats.
//!
//! Storing the CRC of a string that itself contains embedded CRCs is
//! problematic, so stored checksums are rotated and offset first.

use crc::crc32::{self, Hasher32};

const MASK_DELTA: u32 = 0xa282_ead8;

/// Computes the unmasked CRC-32C (Castagnoli) of `data`.
pub fn crc32c(data: &[u8]) -> u32 {
    crc32::checksum_castagnoli(data)
}

/// Computes the unmasked CRC-32C over several byte slices, as if they were
/// concatenated.
pub fn crc32c_chain(parts: &[&[u8]]) -> u32 {
    let mut digest = crc32::Digest::new(crc32::CASTAGNOLI);
    for part in parts {
        digest.write(part);
    }
    digest.sum32()
}

pub fn mask(crc: u32) -> u32 {
    ((crc >> 15) | (crc << 17)).wrapping_add(MASK_DELTA)
}

pub fn unmask(masked: u32) -> u32 {
    let rot = masked.wrapping_sub(MASK_DELTA);
    (rot >> 17) | (rot << 15)
}

/// Convenience for `mask(crc32c(data))`.
pub fn masked_crc32c(data: &[u8]) -> u32 {
    mask(crc32c(data))
}
