//! Authenticated, authorised reads against the persisted blob tree:
//! single-chunk fetches plus directory listing delegated to the catalog.

mod error;

pub use error::DownloadError;

use std::path::PathBuf;
use std::sync::Arc;

use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt, SeekFrom};
use tracing::instrument;

use strongbox_catalog::Catalog;
use strongbox_core::model::FileEntry;
use strongbox_core::{CHUNK_FULL_SIZE, ENCRYPTED_FILE_HEADER_SIZE};

pub struct DownloadStreamer {
    catalog: Arc<Catalog>,
    storage_dir: PathBuf,
}

impl DownloadStreamer {
    #[must_use]
    pub fn new(catalog: Arc<Catalog>, storage_dir: PathBuf) -> Self {
        Self { catalog, storage_dir }
    }

    /// **chunk(handle, chunk_id)**: return the raw on-disk bytes of one
    /// chunk, unverified and still encrypted — the client decrypts.
    #[instrument(skip(self))]
    pub async fn chunk(
        &self,
        requester_id: i64,
        handle: &str,
        chunk_id: u64,
    ) -> Result<Vec<u8>, DownloadError> {
        let owner = self
            .catalog
            .file_owner(handle)
            .map_err(DownloadError::catalog)?
            .ok_or(DownloadError::NotFound)?;
        if owner != requester_id {
            return Err(DownloadError::NotAuthorised);
        }

        let path = self.storage_dir.join(format!("{handle}.tef"));
        let mut file = File::open(&path).await?;
        let offset = ENCRYPTED_FILE_HEADER_SIZE + chunk_id * CHUNK_FULL_SIZE;
        file.seek(SeekFrom::Start(offset)).await?;

        let mut buf = vec![0u8; CHUNK_FULL_SIZE as usize];
        let mut total = 0usize;
        loop {
            let n = file.read(&mut buf[total..]).await?;
            if n == 0 {
                break;
            }
            total += n;
        }
        if total == 0 {
            return Err(DownloadError::NotFound);
        }
        buf.truncate(total);
        Ok(buf)
    }

    /// List the `FileEntry`s directly under `parent_handle` for
    /// `requester_id`. A catalog read only; no blob-tree I/O.
    #[instrument(skip(self))]
    pub fn list_children(
        &self,
        requester_id: i64,
        parent_handle: &str,
    ) -> Result<Vec<FileEntry>, DownloadError> {
        self.catalog
            .list_children(requester_id, parent_handle)
            .map_err(DownloadError::catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strongbox_core::model::{ClaimKeypairs, SealedPrivateKey};

    async fn fixture() -> (DownloadStreamer, tempfile::TempDir, i64) {
        let dir = tempfile::tempdir().unwrap();
        let storage_dir = dir.path().join("storage");
        tokio::fs::create_dir_all(&storage_dir).await.unwrap();

        let catalog = Arc::new(Catalog::open(dir.path().join("userdata.db")).unwrap());
        let code = catalog
            .reserve_account(
                1_000_000,
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
                "downloader",
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

        (DownloadStreamer::new(catalog, storage_dir), dir, user.id)
    }

    #[tokio::test]
    async fn chunk_returns_exact_bytes_at_offset() {
        let (streamer, dir, owner_id) = fixture().await;

        let handle = strongbox_core::token::new_handle();
        let mut blob = strongbox_core::FILE_MAGIC.to_vec();
        let chunk_payload = vec![9u8; strongbox_core::CHUNK_EXTRA_DATA_SIZE as usize];
        blob.extend_from_slice(&chunk_payload);
        tokio::fs::write(dir.path().join("storage").join(format!("{handle}.tef")), &blob)
            .await
            .unwrap();

        streamer
            .catalog
            .insert_file(&FileEntry {
                owner_id,
                handle: handle.clone(),
                parent_handle: strongbox_core::ROOT_HANDLE.to_string(),
                size_bytes: 0,
                encrypted_file_crypt_key: vec![0u8; strongbox_core::ENCRYPTED_CRYPT_KEY_SIZE],
                encrypted_metadata: vec![],
                signature: "a".repeat(88),
            })
            .unwrap();

        let fetched = streamer.chunk(owner_id, &handle, 0).await.unwrap();
        assert_eq!(fetched, chunk_payload);
    }

    #[tokio::test]
    async fn chunk_rejects_non_owner() {
        let (streamer, dir, owner_id) = fixture().await;
        let handle = strongbox_core::token::new_handle();
        tokio::fs::write(
            dir.path().join("storage").join(format!("{handle}.tef")),
            strongbox_core::FILE_MAGIC,
        )
        .await
        .unwrap();
        streamer
            .catalog
            .insert_file(&FileEntry {
                owner_id,
                handle: handle.clone(),
                parent_handle: strongbox_core::ROOT_HANDLE.to_string(),
                size_bytes: 0,
                encrypted_file_crypt_key: vec![0u8; strongbox_core::ENCRYPTED_CRYPT_KEY_SIZE],
                encrypted_metadata: vec![],
                signature: "a".repeat(88),
            })
            .unwrap();

        let result = streamer.chunk(owner_id + 1, &handle, 0).await;
        assert!(matches!(result, Err(DownloadError::NotAuthorised)));
    }
}
