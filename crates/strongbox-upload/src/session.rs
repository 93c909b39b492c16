//! A single in-flight upload's reorder buffer and sink.
//!
//! Out-of-order chunk arrival is the normal case — a client saturates
//! bandwidth with several concurrent chunk requests — so each session
//! buffers chunks by id and only appends to the on-disk sink once its
//! buffer's head is the next expected id, draining into a single
//! append-only sink in front of which sits the reordering stage.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Instant;

use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use strongbox_core::{expected_chunk_size, MAX_CONCURRENT_CHUNKS};

use crate::error::UploadError;

pub struct UploadSession {
    pub owner_id: i64,
    pub handle: String,
    pub declared_encrypted_size: u64,
    pub written_bytes: u64,
    pub last_written_chunk_id: i64,
    pub temp_path: PathBuf,
    pub last_activity: Instant,
    pub failed: bool,
    sink: File,
    reorder_buffer: BTreeMap<u32, Vec<u8>>,
}

impl UploadSession {
    pub fn new(
        owner_id: i64,
        handle: String,
        declared_encrypted_size: u64,
        temp_path: PathBuf,
        sink: File,
        written_bytes: u64,
    ) -> Self {
        Self {
            owner_id,
            handle,
            declared_encrypted_size,
            written_bytes,
            last_written_chunk_id: -1,
            temp_path,
            last_activity: Instant::now(),
            failed: false,
            sink,
            reorder_buffer: BTreeMap::new(),
        }
    }

    /// Buffer `bytes` under `chunk_id`, then flush every in-order chunk
    /// currently at the buffer's head to the sink.
    pub async fn accept_chunk(&mut self, chunk_id: u32, bytes: Vec<u8>) -> Result<(), UploadError> {
        self.last_activity = Instant::now();

        if self.reorder_buffer.len() >= MAX_CONCURRENT_CHUNKS {
            return Err(UploadError::TooManyInFlight);
        }
        self.reorder_buffer.insert(chunk_id, bytes);

        loop {
            let next_id = u32::try_from(self.last_written_chunk_id + 1)
                .map_err(|_| UploadError::internal(anyhow::anyhow!("chunk id overflow")))?;
            let Some(chunk) = self.reorder_buffer.get(&next_id) else {
                break;
            };

            let expected = expected_chunk_size(self.declared_encrypted_size, self.written_bytes);
            if expected == 0 {
                self.failed = true;
                return Err(UploadError::PayloadTooLarge);
            }
            if chunk.len() as u64 != expected {
                self.failed = true;
                return Err(UploadError::MalformedInput(format!(
                    "chunk {next_id} length {} does not match expected {expected}",
                    chunk.len()
                )));
            }

            let chunk = self.reorder_buffer.remove(&next_id).expect("checked above");
            self.sink.write_all(&chunk).await?;
            self.written_bytes += chunk.len() as u64;
            self.last_written_chunk_id = i64::from(next_id);
        }

        Ok(())
    }

    /// True once every declared byte has been written to the sink.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.written_bytes == self.declared_encrypted_size
    }

    pub async fn flush(&mut self) -> Result<(), UploadError> {
        self.sink.flush().await?;
        Ok(())
    }
}
