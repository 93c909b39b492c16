//! `.tef` size arithmetic and chunk-framing validation.
//!
//! A persisted encrypted file is a 4-byte magic header followed by a
//! sequence of chunks, each `magic(4) | nonce(24) | ciphertext | tag(16)`,
//! where the ciphertext's plaintext preamble is a big-endian `chunk_id`.
//! This module only deals in sizes and framing bytes; it never touches
//! the ciphertext payload itself.

use crate::constants::{
    CHUNK_DATA_SIZE, CHUNK_EXTRA_DATA_SIZE, CHUNK_FULL_SIZE, CHUNK_MAGIC,
    ENCRYPTED_FILE_HEADER_SIZE,
};

/// The encrypted (on-disk) size of a file whose plaintext is `raw` bytes.
///
/// A zero-byte file still takes one (empty) chunk, so `chunk_count` is never
/// zero even when `raw == 0`.
#[must_use]
pub fn encrypted_size(raw: u64) -> u64 {
    let chunk_count = chunk_count(raw);
    ENCRYPTED_FILE_HEADER_SIZE + chunk_count * CHUNK_EXTRA_DATA_SIZE + raw
}

/// Number of chunks a file of `raw` plaintext bytes is split into. A
/// zero-byte file is one (empty) chunk, matching the client's chunker.
#[must_use]
pub fn chunk_count(raw: u64) -> u64 {
    if raw == 0 {
        1
    } else {
        raw.div_ceil(CHUNK_DATA_SIZE)
    }
}

/// Inverse of [`encrypted_size`]: recover the plaintext size and chunk
/// count an encrypted blob of `enc` bytes must have been built from.
///
/// Returns `(chunk_count, raw_size)`. `raw_size` is floored at zero so
/// that a pathological `enc` smaller than the header never underflows.
#[must_use]
pub fn raw_from_encrypted(enc: u64) -> (u64, u64) {
    if enc < ENCRYPTED_FILE_HEADER_SIZE {
        return (0, 0);
    }
    let body = enc - ENCRYPTED_FILE_HEADER_SIZE;
    let chunk_count = body.div_ceil(CHUNK_FULL_SIZE).max(1);
    let raw = enc
        .saturating_sub(chunk_count * CHUNK_EXTRA_DATA_SIZE)
        .saturating_sub(ENCRYPTED_FILE_HEADER_SIZE);
    (chunk_count, raw)
}

/// Errors validating an incoming chunk submission's framing.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkFramingError {
    #[error("chunk payload too small: {actual} bytes, minimum is {min} bytes")]
    TooSmall { actual: usize, min: usize },
    #[error("chunk payload too large: {actual} bytes, maximum is {max} bytes")]
    TooLarge { actual: usize, max: usize },
    #[error("chunk magic mismatch: expected {expected:02X?}, got {actual:02X?}")]
    BadMagic { expected: [u8; 4], actual: [u8; 4] },
}

/// Validate the outer shape of a chunk submission: total size within
/// `[CHUNK_EXTRA_DATA_SIZE, CHUNK_FULL_SIZE]` and the leading four bytes
/// equal to the chunk magic. Does not interpret the ciphertext.
pub fn validate_chunk_framing(bytes: &[u8]) -> Result<(), ChunkFramingError> {
    let len = bytes.len() as u64;
    if len < CHUNK_EXTRA_DATA_SIZE {
        return Err(ChunkFramingError::TooSmall {
            actual: bytes.len(),
            min: CHUNK_EXTRA_DATA_SIZE as usize,
        });
    }
    if len > CHUNK_FULL_SIZE {
        return Err(ChunkFramingError::TooLarge {
            actual: bytes.len(),
            max: CHUNK_FULL_SIZE as usize,
        });
    }
    let actual: [u8; 4] = bytes[0..4].try_into().expect("checked length above");
    if actual != CHUNK_MAGIC {
        return Err(ChunkFramingError::BadMagic {
            expected: CHUNK_MAGIC,
            actual,
        });
    }
    Ok(())
}

/// Expected on-disk size of the chunk at `written_bytes` into a blob whose
/// final size is `declared_encrypted_size`. Returns `0` once the blob is
/// complete.
#[must_use]
pub fn expected_chunk_size(declared_encrypted_size: u64, written_bytes: u64) -> u64 {
    let bytes_left = declared_encrypted_size.saturating_sub(written_bytes);
    bytes_left.min(CHUNK_FULL_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn empty_file_is_one_chunk() {
        assert_eq!(chunk_count(0), 1);
        assert_eq!(encrypted_size(0), ENCRYPTED_FILE_HEADER_SIZE + CHUNK_EXTRA_DATA_SIZE);
    }

    #[test]
    fn exact_multiple_of_chunk_size() {
        let raw = CHUNK_DATA_SIZE * 3;
        assert_eq!(chunk_count(raw), 3);
    }

    #[test]
    fn scenario_from_walkthrough() {
        // raw = 5 MiB + 1 byte -> 3 chunks, encrypted_size = 4 + 3*48 + raw
        let raw = 5 * 1024 * 1024 + 1;
        assert_eq!(chunk_count(raw), 3);
        assert_eq!(encrypted_size(raw), 4 + 3 * 48 + raw);
    }

    #[test]
    fn bad_magic_rejected() {
        let mut bytes = vec![0u8; CHUNK_EXTRA_DATA_SIZE as usize];
        bytes[0..4].copy_from_slice(&[0, 0, 0, 0]);
        assert!(matches!(
            validate_chunk_framing(&bytes),
            Err(ChunkFramingError::BadMagic { .. })
        ));
    }

    #[test]
    fn minimum_chunk_accepted() {
        let mut bytes = vec![0u8; CHUNK_EXTRA_DATA_SIZE as usize];
        bytes[0..4].copy_from_slice(&CHUNK_MAGIC);
        assert!(validate_chunk_framing(&bytes).is_ok());
    }

    proptest! {
        #[test]
        fn size_round_trip(raw in 0u64..200_000_000u64) {
            let enc = encrypted_size(raw);
            let (_, recovered) = raw_from_encrypted(enc);
            prop_assert_eq!(recovered, raw);
        }
    }
}
