//! Password verification, account-claim ceremony, and session lifecycle.
//!
//! This crate owns no HTTP concerns; `strongbox-server` maps its errors
//! onto status codes and its session tokens onto cookies.

mod error;
mod password;
pub mod ratelimit;
mod session;

pub use error::AuthError;
pub use session::{Session, SessionStore, SessionToken};

use std::sync::Arc;

use strongbox_catalog::Catalog;
use strongbox_core::model::{ClaimKeypairs, User};
use subtle::ConstantTimeEq;
use tracing::instrument;

const USERNAME_MIN_LENGTH: usize = 3;
const USERNAME_MAX_LENGTH: usize = 20;
const PASSWORD_HASH_HEX_LENGTH: usize = 2 * strongbox_core::ARGON2_HASH_LENGTH;

/// Outcome of `login` when a salt (not a full session) is returned.
#[derive(Debug, Clone)]
pub struct SaltReply {
    pub password_public_salt: [u8; 32],
}

/// Outcome of a successful authenticating `login`.
#[derive(Debug)]
pub struct AuthenticatedReply {
    pub token: SessionToken,
    pub master_key_salt: [u8; 32],
    pub ed25519_private_key_encrypted: Vec<u8>,
    pub ed25519_public_key: Vec<u8>,
    pub x25519_private_key_encrypted: Vec<u8>,
    pub x25519_public_key: Vec<u8>,
}

/// Either half of `login`'s two possible successful shapes.
#[derive(Debug)]
pub enum LoginReply {
    Salt(SaltReply),
    Authenticated(AuthenticatedReply),
}

/// Probe-phase reply to `claim` when only a code was supplied.
#[derive(Debug)]
pub struct ClaimProbeReply {
    pub storage_quota_bytes: u64,
    pub password_public_salt: [u8; 32],
    pub master_key_salt: [u8; 32],
}

pub struct Authenticator {
    catalog: Arc<Catalog>,
    sessions: SessionStore,
    server_secret: [u8; 32],
}

impl Authenticator {
    #[must_use]
    pub fn new(catalog: Arc<Catalog>, server_secret: [u8; 32]) -> Self {
        Self {
            catalog,
            sessions: SessionStore::new(),
            server_secret,
        }
    }

    #[must_use]
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// `login(username, password_hash)`. `password_hash` is empty for a
    /// salt request, or a lowercase hex Argon2id pre-hash otherwise.
    #[instrument(skip(self, password_hash))]
    pub fn login(&self, username: &str, password_hash: &str) -> Result<LoginReply, AuthError> {
        validate_username_shape(username)?;
        validate_password_hash_shape(password_hash)?;

        let user = self
            .catalog
            .lookup_user(username)
            .map_err(AuthError::catalog)?;

        match user {
            None => self.cover_traffic_branch(username, password_hash),
            Some(user) => self.real_user_branch(&user, password_hash),
        }
    }

    fn cover_traffic_branch(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<LoginReply, AuthError> {
        if password_hash.is_empty() {
            let fake_salt = fake_public_salt(username, &self.server_secret);
            return Ok(LoginReply::Salt(SaltReply {
                password_public_salt: fake_salt,
            }));
        }
        // Burn an Argon2id hash against a throwaway salt so the unknown-user
        // path takes as long as a real verification, then report uniformly.
        let _ = password::hash_with_random_salt(password_hash);
        Err(AuthError::InvalidCredentials)
    }

    fn real_user_branch(&self, user: &User, password_hash: &str) -> Result<LoginReply, AuthError> {
        if password_hash.is_empty() {
            return Ok(LoginReply::Salt(SaltReply {
                password_public_salt: *user.password_public_salt.as_bytes(),
            }));
        }

        let verifier = password::verifier_for(password_hash, user.password_public_salt.as_bytes())
            .map_err(AuthError::internal)?;
        let matches: bool = verifier
            .as_bytes()
            .ct_eq(user.password_hash.as_bytes())
            .into();
        if !matches {
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.sessions.create(user.id, user.username.clone());
        Ok(LoginReply::Authenticated(AuthenticatedReply {
            token,
            master_key_salt: *user.master_key_salt.as_bytes(),
            ed25519_private_key_encrypted: user.ed25519_private_key_encrypted.0.to_vec(),
            ed25519_public_key: user.ed25519_public_key.clone(),
            x25519_private_key_encrypted: user.x25519_private_key_encrypted.0.to_vec(),
            x25519_public_key: user.x25519_public_key.clone(),
        }))
    }

    /// `claim` probe phase: only `code` supplied.
    #[instrument(skip(self))]
    pub fn claim_probe(&self, code: &str) -> Result<ClaimProbeReply, AuthError> {
        let reservation = self
            .catalog
            .find_reservation(code)
            .map_err(AuthError::catalog)?
            .ok_or(AuthError::ClaimCodeInvalid)?;
        Ok(ClaimProbeReply {
            storage_quota_bytes: reservation.storage_quota_bytes,
            password_public_salt: *reservation.password_public_salt.as_bytes(),
            master_key_salt: *reservation.master_key_salt.as_bytes(),
        })
    }

    /// `claim` commit phase: `code`, `username`, `password_hash`, and the
    /// client-submitted sealed keypairs are all present.
    #[instrument(skip(self, password_hash, keypairs))]
    pub fn claim_commit(
        &self,
        code: &str,
        username: &str,
        password_hash: &str,
        keypairs: ClaimKeypairs,
    ) -> Result<User, AuthError> {
        validate_username_shape(username)?;
        if password_hash.len() != PASSWORD_HASH_HEX_LENGTH || !is_hex(password_hash) {
            return Err(AuthError::MalformedInput("malformed password hash".into()));
        }

        let reservation = self
            .catalog
            .find_reservation(code)
            .map_err(AuthError::catalog)?
            .ok_or(AuthError::ClaimCodeInvalid)?;

        let stored_hash =
            password::verifier_for(password_hash, reservation.password_private_salt.as_bytes())
                .map_err(AuthError::internal)?;

        self.catalog
            .claim(code, username, &stored_hash, keypairs)
            .map_err(AuthError::catalog)
    }
}

fn validate_username_shape(username: &str) -> Result<(), AuthError> {
    let len = username.chars().count();
    if !(USERNAME_MIN_LENGTH..=USERNAME_MAX_LENGTH).contains(&len)
        || !username.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return Err(AuthError::MalformedInput("malformed username".into()));
    }
    Ok(())
}

fn validate_password_hash_shape(password_hash: &str) -> Result<(), AuthError> {
    if password_hash.is_empty() {
        return Ok(());
    }
    if password_hash.len() != PASSWORD_HASH_HEX_LENGTH || !is_hex(password_hash) {
        return Err(AuthError::MalformedInput("malformed password hash".into()));
    }
    Ok(())
}

fn is_hex(s: &str) -> bool {
    s.chars().all(|c| c.is_ascii_hexdigit())
}

/// Deterministic, server-bound fake salt for a username that doesn't exist,
/// so repeated probes of the same unknown username see the same value.
/// A plain hash of `username || server_secret`, not a keyed hash.
fn fake_public_salt(username: &str, server_secret: &[u8; 32]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    hasher.update(username.as_bytes());
    hasher.update(server_secret);
    *hasher.finalize().as_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fake_salt_is_stable_for_same_username() {
        let secret = [9u8; 32];
        let a = fake_public_salt("bob", &secret);
        let b = fake_public_salt("bob", &secret);
        assert_eq!(a, b);
    }

    #[test]
    fn fake_salt_differs_across_usernames() {
        let secret = [9u8; 32];
        assert_ne!(
            fake_public_salt("bob", &secret),
            fake_public_salt("alice", &secret)
        );
    }

    #[test]
    fn username_shape_rejects_short_and_symbols() {
        assert!(validate_username_shape("ab").is_err());
        assert!(validate_username_shape("a_b").is_err());
        assert!(validate_username_shape("alice").is_ok());
    }
}
