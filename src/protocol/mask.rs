//! Payload masking (RFC 6455 section 5.3).
//!
//! Masking is an XOR with a 4-byte key repeated over the payload, so the
//! same operation masks and unmasks.

use crate::error::Result;

/// Key that leaves a payload unchanged. Used for unmasked incoming frames.
pub const IDENTITY_MASK: [u8; 4] = [0; 4];

/// Byte-by-byte XOR masking.
#[inline]
pub fn apply_mask(data: &mut [u8], mask: [u8; 4]) {
    for (i, byte) in data.iter_mut().enumerate() {
        *byte ^= mask[i % 4];
    }
}

/// Word-at-a-time XOR masking, equivalent to [`apply_mask`].
#[inline]
pub fn apply_mask_fast(data: &mut [u8], mask: [u8; 4]) {
    if mask == IDENTITY_MASK {
        return;
    }

    let mask_u32 = u32::from_ne_bytes(mask);
    let mut chunks = data.chunks_exact_mut(4);
    for chunk in &mut chunks {
        let word = u32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]) ^ mask_u32;
        chunk.copy_from_slice(&word.to_ne_bytes());
    }
    // chunks_exact keeps the key phase aligned, the tail starts at mask[0]
    for (i, byte) in chunks.into_remainder().iter_mut().enumerate() {
        *byte ^= mask[i];
    }
}

/// Generate a fresh masking key from the system random source.
///
/// # Errors
///
/// Returns `Error::Rng` if the random source is unavailable.
pub fn generate_mask() -> Result<[u8; 4]> {
    let mut key = [0u8; 4];
    getrandom::getrandom(&mut key)?;
    Ok(key)
}
