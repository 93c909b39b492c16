//! Persistent entities: `User`, `UnclaimedReservation`, `FileEntry`.
//!
//! These are storage-layer structs, not wire DTOs — `strongbox-server`
//! maps them to/from its own `serde` request/response types at the HTTP
//! boundary rather than exposing them directly.

use std::fmt;

use crate::constants::{ENCRYPTED_CRYPT_KEY_SIZE, USER_DATA_SALT_BYTE_LENGTH};

/// A 32-byte random salt. `Debug` redacts contents; salts are not secret
/// by cryptographic standards but there is no reason to ever print one.
#[derive(Clone, PartialEq, Eq)]
pub struct Salt(pub [u8; USER_DATA_SALT_BYTE_LENGTH]);

impl fmt::Debug for Salt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Salt([REDACTED])")
    }
}

impl Salt {
    #[must_use]
    pub fn random() -> Self {
        let bytes = crate::token::random_bytes(USER_DATA_SALT_BYTE_LENGTH);
        let mut arr = [0u8; USER_DATA_SALT_BYTE_LENGTH];
        arr.copy_from_slice(&bytes);
        Self(arr)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; USER_DATA_SALT_BYTE_LENGTH] {
        &self.0
    }
}

/// An opaque, sealed private-key half: `nonce(24) || key(32) || tag(16)`.
#[derive(Clone, PartialEq, Eq)]
pub struct SealedPrivateKey(pub [u8; ENCRYPTED_CRYPT_KEY_SIZE]);

impl fmt::Debug for SealedPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SealedPrivateKey([REDACTED])")
    }
}

/// An account record.
#[derive(Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub storage_quota_bytes: u64,
    /// Argon2id verifier of the client's pre-hashed password.
    pub password_hash: String,
    pub password_public_salt: Salt,
    pub password_private_salt: Salt,
    pub master_key_salt: Salt,
    pub ed25519_private_key_encrypted: SealedPrivateKey,
    pub ed25519_public_key: Vec<u8>,
    pub x25519_private_key_encrypted: SealedPrivateKey,
    pub x25519_public_key: Vec<u8>,
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("storage_quota_bytes", &self.storage_quota_bytes)
            .field("password_hash", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

/// A pre-issued account slot, waiting to be claimed.
#[derive(Clone)]
pub struct UnclaimedReservation {
    pub claim_code: String,
    pub storage_quota_bytes: u64,
    pub password_public_salt: Salt,
    pub password_private_salt: Salt,
    pub master_key_salt: Salt,
}

impl fmt::Debug for UnclaimedReservation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnclaimedReservation")
            .field("claim_code", &"[REDACTED]")
            .field("storage_quota_bytes", &self.storage_quota_bytes)
            .finish_non_exhaustive()
    }
}

/// The keypairs a client submits at claim time, already sealed under the
/// not-yet-derived master key. The server never sees a master key.
#[derive(Clone, Debug)]
pub struct ClaimKeypairs {
    pub ed25519_private_key_encrypted: SealedPrivateKey,
    pub ed25519_public_key: Vec<u8>,
    pub x25519_private_key_encrypted: SealedPrivateKey,
    pub x25519_public_key: Vec<u8>,
}

/// A node in a user's file forest: either a file (non-empty crypt key and
/// signature) or a folder (both empty).
#[derive(Clone, Debug)]
pub struct FileEntry {
    pub owner_id: i64,
    pub handle: String,
    pub parent_handle: String,
    pub size_bytes: u64,
    pub encrypted_file_crypt_key: Vec<u8>,
    pub encrypted_metadata: Vec<u8>,
    /// Base64-encoded Ed25519 signature, empty for folders.
    pub signature: String,
}

impl FileEntry {
    #[must_use]
    pub fn is_folder(&self) -> bool {
        self.encrypted_file_crypt_key.is_empty()
    }
}
