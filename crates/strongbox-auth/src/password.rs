//! Server-side re-hashing of the client's pre-hashed password.
//!
//! The client already ran Argon2id against `password_public_salt` before
//! sending `password_hash` over the wire (so the server never sees the raw
//! password). The server hashes that value a second time, against the
//! reservation/user's *private* salt, using fixed wire-compatible
//! parameters, and stores/compares the hex-encoded result. Both phases run
//! server-side, just against different inputs: a stored verifier for real
//! users, a throwaway salt for cover traffic.

use argon2::{Algorithm, Argon2, Params, Version};
use strongbox_core::{ARGON2_HASH_LENGTH, ARGON2_ITERATIONS, ARGON2_MEMORY_KIB, ARGON2_PARALLELISM};

fn argon2() -> Argon2<'static> {
    let params = Params::new(
        ARGON2_MEMORY_KIB,
        ARGON2_ITERATIONS,
        ARGON2_PARALLELISM,
        Some(ARGON2_HASH_LENGTH),
    )
    .expect("fixed argon2 parameters are valid");
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
}

/// Hash `password_hash` (the client's pre-hash, as lowercase hex) against
/// `salt`, returning the result as lowercase hex.
pub fn verifier_for(password_hash: &str, salt: &[u8; 32]) -> anyhow::Result<String> {
    let mut out = [0u8; ARGON2_HASH_LENGTH];
    argon2()
        .hash_password_into(password_hash.as_bytes(), salt, &mut out)
        .map_err(|e| anyhow::anyhow!("argon2 hashing failed: {e}"))?;
    Ok(hex::encode(out))
}

/// Burn a full Argon2id pass against a random salt, discarding the result.
/// Used only to equalise timing on the cover-traffic branch of `login`.
pub fn hash_with_random_salt(password_hash: &str) -> String {
    let salt = strongbox_core::model::Salt::random();
    verifier_for(password_hash, salt.as_bytes()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_inputs_produce_same_verifier() {
        let salt = [1u8; 32];
        let a = verifier_for("deadbeef", &salt).unwrap();
        let b = verifier_for("deadbeef", &salt).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn different_salts_produce_different_verifiers() {
        let a = verifier_for("deadbeef", &[1u8; 32]).unwrap();
        let b = verifier_for("deadbeef", &[2u8; 32]).unwrap();
        assert_ne!(a, b);
    }
}
