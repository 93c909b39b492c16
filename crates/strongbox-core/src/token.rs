//! Random alphanumeric identifier generation: file/folder handles and
//! one-time claim codes share the same shape, just different lengths.

use rand::distr::Alphanumeric;
use rand::Rng;

/// Generate a random alphanumeric string of `len` characters.
#[must_use]
pub fn random_alphanumeric(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Generate a fresh file/folder handle.
#[must_use]
pub fn new_handle() -> String {
    random_alphanumeric(crate::constants::FILE_HANDLE_LENGTH)
}

/// Generate a fresh one-time account claim code.
#[must_use]
pub fn new_claim_code() -> String {
    random_alphanumeric(crate::constants::CLAIM_ACCOUNT_CODE_LENGTH)
}

/// Generate `len` random bytes, suitable for salts and nonces whose
/// randomness source doesn't need to be a CSPRNG beyond what `rand`
/// already provides.
#[must_use]
pub fn random_bytes(len: usize) -> Vec<u8> {
    let mut buf = vec![0u8; len];
    rand::rng().fill(buf.as_mut_slice());
    buf
}

/// Validate that `s` is alphanumeric ASCII of exactly `len` characters.
#[must_use]
pub fn is_alphanumeric_of_length(s: &str, len: usize) -> bool {
    s.len() == len && s.chars().all(|c| c.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_are_right_length_and_shape() {
        for _ in 0..50 {
            let h = new_handle();
            assert!(is_alphanumeric_of_length(&h, 16));
        }
    }

    #[test]
    fn claim_codes_are_right_length_and_shape() {
        for _ in 0..50 {
            let c = new_claim_code();
            assert!(is_alphanumeric_of_length(&c, 20));
        }
    }
}
