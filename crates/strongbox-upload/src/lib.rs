//! Per-upload state machine: `start`, `chunk`, `finalise`, `cancel`, plus a
//! background sweeper for abandoned sessions.

mod error;
mod session;

pub use error::UploadError;
pub use session::UploadSession;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::instrument;

use strongbox_catalog::Catalog;
use strongbox_core::model::FileEntry;
use strongbox_core::token::{is_alphanumeric_of_length, new_handle};
use strongbox_core::{
    chunk, CHUNK_EXTRA_DATA_SIZE, ENCRYPTED_FILE_METADATA_MAX_SIZE, FILE_HANDLE_LENGTH, FILE_MAGIC,
    MAX_FILE_SIZE,
};

struct SessionEntry {
    owner_id: i64,
    inner: Mutex<UploadSession>,
}

pub struct UploadCoordinator {
    catalog: Arc<Catalog>,
    sessions: DashMap<String, Arc<SessionEntry>>,
    temp_dir: PathBuf,
    storage_dir: PathBuf,
}

impl UploadCoordinator {
    #[must_use]
    pub fn new(catalog: Arc<Catalog>, temp_dir: PathBuf, storage_dir: PathBuf) -> Self {
        Self {
            catalog,
            sessions: DashMap::new(),
            temp_dir,
            storage_dir,
        }
    }

    /// **start(encrypted_size)**: validate size, reserve a handle, open a
    /// temp file with the magic header written, register the session.
    #[instrument(skip(self))]
    pub async fn start(&self, owner_id: i64, encrypted_size: u64) -> Result<String, UploadError> {
        if encrypted_size != 0
            && !(CHUNK_EXTRA_DATA_SIZE..=MAX_FILE_SIZE).contains(&encrypted_size)
        {
            return Err(UploadError::MalformedInput(
                "encrypted_size out of range".into(),
            ));
        }

        let user = self
            .catalog
            .lookup_user_by_id(owner_id)
            .map_err(UploadError::catalog)?
            .ok_or_else(|| UploadError::internal(anyhow::anyhow!("owner vanished")))?;
        let used = self
            .catalog
            .bytes_used(owner_id)
            .map_err(UploadError::catalog)?;
        if used.saturating_add(encrypted_size) > user.storage_quota_bytes {
            return Err(UploadError::PayloadTooLarge);
        }

        let handle = new_handle();
        let temp_path = self.temp_dir.join(format!("{handle}.tef"));
        let mut sink = File::create(&temp_path).await?;
        sink.write_all(&FILE_MAGIC).await?;
        let written_bytes = u64::try_from(FILE_MAGIC.len()).expect("magic length fits in u64");

        let session = UploadSession::new(
            owner_id,
            handle.clone(),
            encrypted_size,
            temp_path,
            sink,
            written_bytes,
        );
        self.sessions.insert(
            handle.clone(),
            Arc::new(SessionEntry {
                owner_id,
                inner: Mutex::new(session),
            }),
        );
        Ok(handle)
    }

    /// **chunk(handle, chunk_id, bytes)**.
    #[instrument(skip(self, bytes))]
    pub async fn chunk(
        &self,
        owner_id: i64,
        handle: &str,
        chunk_id: u32,
        bytes: Vec<u8>,
    ) -> Result<(), UploadError> {
        chunk::validate_chunk_framing(&bytes)
            .map_err(|e| UploadError::MalformedInput(e.to_string()))?;

        let entry = self
            .sessions
            .get(handle)
            .map(|e| Arc::clone(&e))
            .ok_or(UploadError::SessionNotFound)?;
        if entry.owner_id != owner_id {
            return Err(UploadError::NotAuthorised);
        }

        let mut session = entry.inner.lock().await;
        let result = session.accept_chunk(chunk_id, bytes).await;
        if result.is_err() && session.failed {
            let temp_path = session.temp_path.clone();
            drop(session);
            self.sessions.remove(handle);
            let _ = fs::remove_file(&temp_path).await;
        }
        result
    }

    /// **finalise(handle, parent_handle, encrypted_metadata,
    /// encrypted_crypt_key, signature)**.
    #[instrument(skip(self, encrypted_metadata, encrypted_crypt_key, signature))]
    pub async fn finalise(
        &self,
        owner_id: i64,
        handle: &str,
        parent_handle: &str,
        encrypted_metadata: Vec<u8>,
        encrypted_crypt_key: Vec<u8>,
        signature: String,
    ) -> Result<(), UploadError> {
        if !is_alphanumeric_of_length(parent_handle, FILE_HANDLE_LENGTH) {
            return Err(UploadError::MalformedInput("malformed parent handle".into()));
        }
        if parent_handle != strongbox_core::ROOT_HANDLE {
            let parent = self
                .catalog
                .get_file(parent_handle)
                .map_err(UploadError::catalog)?
                .ok_or(UploadError::NotAuthorised)?;
            if parent.owner_id != owner_id {
                return Err(UploadError::NotAuthorised);
            }
        }
        if encrypted_metadata.len() > ENCRYPTED_FILE_METADATA_MAX_SIZE {
            return Err(UploadError::MalformedInput("metadata too large".into()));
        }
        if encrypted_crypt_key.len() != strongbox_core::ENCRYPTED_CRYPT_KEY_SIZE {
            return Err(UploadError::MalformedInput("malformed crypt key".into()));
        }
        if !is_valid_signature(&signature) {
            return Err(UploadError::MalformedInput("malformed signature".into()));
        }

        let (_, entry) = self
            .sessions
            .remove(handle)
            .ok_or(UploadError::SessionNotFound)?;
        if entry.owner_id != owner_id {
            self.sessions.insert(handle.to_string(), entry);
            return Err(UploadError::NotAuthorised);
        }

        let mut session = entry.inner.lock().await;
        if !session.is_complete() {
            return Err(UploadError::MalformedInput(
                "upload incomplete: written_bytes does not match declared size".into(),
            ));
        }

        let declared_size = session.declared_encrypted_size;
        let temp_path = session.temp_path.clone();
        session.flush().await?;
        drop(session);

        let final_path = self.storage_dir.join(format!("{handle}.tef"));
        fs::rename(&temp_path, &final_path).await?;

        let (_, raw_size) = chunk::raw_from_encrypted(declared_size);
        let file_entry = FileEntry {
            owner_id,
            handle: handle.to_string(),
            parent_handle: parent_handle.to_string(),
            size_bytes: raw_size,
            encrypted_file_crypt_key: encrypted_crypt_key,
            encrypted_metadata,
            signature,
        };
        if let Err(err) = self.catalog.insert_file(&file_entry) {
            tracing::error!(%handle, %err, "catalog insert failed after rename; blob retained for recovery");
            return Err(UploadError::catalog(err));
        }
        Ok(())
    }

    /// **cancel(handle)**: drop the session and delete its temp file.
    #[instrument(skip(self))]
    pub async fn cancel(&self, owner_id: i64, handle: &str) -> Result<(), UploadError> {
        let (_, entry) = self
            .sessions
            .remove(handle)
            .ok_or(UploadError::SessionNotFound)?;
        if entry.owner_id != owner_id {
            self.sessions.insert(handle.to_string(), entry);
            return Err(UploadError::NotAuthorised);
        }
        let session = entry.inner.lock().await;
        let _ = fs::remove_file(&session.temp_path).await;
        Ok(())
    }

    /// Scan for sessions idle longer than `timeout` and cancel them.
    /// Intended to run on a fixed interval from `strongbox-server`'s
    /// lifecycle module.
    pub async fn sweep_idle(&self, timeout: Duration) -> usize {
        let now = Instant::now();
        let mut stale = Vec::new();
        for entry in &self.sessions {
            let session = entry.value().inner.lock().await;
            if now.duration_since(session.last_activity) > timeout {
                stale.push(entry.key().clone());
            }
        }
        for handle in &stale {
            if let Some((_, entry)) = self.sessions.remove(handle) {
                let session = entry.inner.lock().await;
                let _ = fs::remove_file(&session.temp_path).await;
            }
        }
        stale.len()
    }

    #[must_use]
    pub fn active_session_count(&self) -> usize {
        self.sessions.len()
    }
}

fn is_valid_signature(signature: &str) -> bool {
    use base64::Engine;
    let Ok(decoded) = base64::engine::general_purpose::STANDARD.decode(signature) else {
        return false;
    };
    decoded.len() == strongbox_core::ED25519_SIGNATURE_BYTE_LENGTH
}

#[cfg(test)]
mod tests {
    use super::*;
    use strongbox_core::model::{ClaimKeypairs, SealedPrivateKey};

    async fn fixture() -> (UploadCoordinator, tempfile::TempDir, i64) {
        let dir = tempfile::tempdir().unwrap();
        let temp_dir = dir.path().join("temp");
        let storage_dir = dir.path().join("storage");
        tokio::fs::create_dir_all(&temp_dir).await.unwrap();
        tokio::fs::create_dir_all(&storage_dir).await.unwrap();

        let catalog = Arc::new(Catalog::open(dir.path().join("userdata.db")).unwrap());
        let code = catalog
            .reserve_account(
                1_000_000_000,
                (
                    strongbox_core::model::Salt::random(),
                    strongbox_core::model::Salt::random(),
                    strongbox_core::model::Salt::random(),
                ),
            )
            .unwrap();
        let user = catalog
            .claim(
                &code,
                "uploader",
                "hash",
                ClaimKeypairs {
                    ed25519_private_key_encrypted: SealedPrivateKey(
                        [0u8; strongbox_core::ENCRYPTED_CRYPT_KEY_SIZE],
                    ),
                    ed25519_public_key: vec![],
                    x25519_private_key_encrypted: SealedPrivateKey(
                        [0u8; strongbox_core::ENCRYPTED_CRYPT_KEY_SIZE],
                    ),
                    x25519_public_key: vec![],
                },
            )
            .unwrap();

        let coordinator = UploadCoordinator::new(catalog, temp_dir, storage_dir);
        (coordinator, dir, user.id)
    }

    fn framed_chunk(chunk_id: u32, payload: &[u8]) -> Vec<u8> {
        let mut plaintext = Vec::new();
        plaintext.extend_from_slice(&chunk_id.to_be_bytes());
        plaintext.extend_from_slice(payload);
        let mut out = Vec::new();
        out.extend_from_slice(&strongbox_core::CHUNK_MAGIC);
        out.extend_from_slice(&[0u8; 24]); // nonce
        out.extend_from_slice(&plaintext);
        out.extend_from_slice(&[0u8; 16]); // tag
        out
    }

    #[tokio::test]
    async fn single_chunk_upload_round_trips_through_finalise() {
        let (coordinator, _dir, owner_id) = fixture().await;

        let raw = b"hello world".to_vec();
        let encrypted_size = strongbox_core::encrypted_size(raw.len() as u64);
        let handle = coordinator.start(owner_id, encrypted_size).await.unwrap();

        let frame = framed_chunk(0, &raw);
        coordinator.chunk(owner_id, &handle, 0, frame).await.unwrap();

        coordinator
            .finalise(
                owner_id,
                &handle,
                strongbox_core::ROOT_HANDLE,
                vec![1, 2, 3],
                vec![0u8; strongbox_core::ENCRYPTED_CRYPT_KEY_SIZE],
                base64::Engine::encode(
                    &base64::engine::general_purpose::STANDARD,
                    [0u8; strongbox_core::ED25519_SIGNATURE_BYTE_LENGTH],
                ),
            )
            .await
            .unwrap();

        assert_eq!(coordinator.active_session_count(), 0);
    }

    #[tokio::test]
    async fn out_of_order_chunks_commit_in_order() {
        let (coordinator, _dir, owner_id) = fixture().await;

        let chunk_data_size = strongbox_core::CHUNK_DATA_SIZE as usize;
        let raw = vec![7u8; chunk_data_size * 2];
        let encrypted_size = strongbox_core::encrypted_size(raw.len() as u64);
        let handle = coordinator.start(owner_id, encrypted_size).await.unwrap();

        let chunk1 = framed_chunk(1, &raw[chunk_data_size..]);
        let chunk0 = framed_chunk(0, &raw[..chunk_data_size]);

        coordinator.chunk(owner_id, &handle, 1, chunk1).await.unwrap();
        coordinator.chunk(owner_id, &handle, 0, chunk0).await.unwrap();

        coordinator
            .finalise(
                owner_id,
                &handle,
                strongbox_core::ROOT_HANDLE,
                vec![],
                vec![0u8; strongbox_core::ENCRYPTED_CRYPT_KEY_SIZE],
                base64::Engine::encode(
                    &base64::engine::general_purpose::STANDARD,
                    [0u8; strongbox_core::ED25519_SIGNATURE_BYTE_LENGTH],
                ),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn chunk_rejects_wrong_owner() {
        let (coordinator, _dir, owner_id) = fixture().await;
        let handle = coordinator.start(owner_id, 0).await.unwrap();
        let result = coordinator.chunk(owner_id + 1, &handle, 0, framed_chunk(0, b"")).await;
        assert!(matches!(result, Err(UploadError::NotAuthorised)));
    }

    #[tokio::test]
    async fn start_rejects_over_quota() {
        let (coordinator, _dir, owner_id) = fixture().await;
        let result = coordinator.start(owner_id, strongbox_core::MAX_FILE_SIZE).await;
        assert!(matches!(result, Err(UploadError::PayloadTooLarge)));
    }
}
