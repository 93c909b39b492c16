//! Wire-level request/response records. Every JSON boundary is a
//! schema-validated, strongly-typed struct; nothing resembling `any`
//! crosses into handler logic. Validation of *shape* (lengths, base64-ness)
//! happens here, before a request reaches `strongbox-auth`/`-catalog`/etc.,
//! which re-validate the semantics they actually care about.

use serde::{Deserialize, Serialize};

use strongbox_core::model::{ClaimKeypairs, FileEntry, SealedPrivateKey};
use strongbox_core::ENCRYPTED_CRYPT_KEY_SIZE;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum LoginResponse {
    Salt {
        #[serde(rename = "passwordPublicSalt")]
        password_public_salt: String,
    },
    Authenticated {
        #[serde(rename = "masterKeySalt")]
        master_key_salt: String,
        #[serde(rename = "ed25519PrivateKeyEncryptedB64")]
        ed25519_private_key_encrypted_b64: String,
        #[serde(rename = "ed25519PublicKeyB64")]
        ed25519_public_key_b64: String,
        #[serde(rename = "x25519PrivateKeyEncryptedB64")]
        x25519_private_key_encrypted_b64: String,
        #[serde(rename = "x25519PublicKeyB64")]
        x25519_public_key_b64: String,
    },
}

#[derive(Debug, Deserialize)]
pub struct ClaimAccountRequest {
    pub code: String,
    pub username: Option<String>,
    pub password: Option<String>,
    #[serde(rename = "ed25519PrivateKeyEncryptedB64")]
    pub ed25519_private_key_encrypted_b64: Option<String>,
    #[serde(rename = "ed25519PublicKeyB64")]
    pub ed25519_public_key_b64: Option<String>,
    #[serde(rename = "x25519PrivateKeyEncryptedB64")]
    pub x25519_private_key_encrypted_b64: Option<String>,
    #[serde(rename = "x25519PublicKeyB64")]
    pub x25519_public_key_b64: Option<String>,
}

impl ClaimAccountRequest {
    /// `true` once every field needed to commit an account is present;
    /// otherwise this is only a probe of the reservation.
    pub fn is_commit(&self) -> bool {
        self.username.is_some() && self.password.is_some()
    }

    pub fn keypairs(&self) -> Result<ClaimKeypairs, String> {
        let decode_key = |field: &str, value: &Option<String>| -> Result<SealedPrivateKey, String> {
            let raw = decode_b64(value.as_deref().unwrap_or_default())
                .map_err(|_| format!("{field} is not valid base64"))?;
            let arr: [u8; ENCRYPTED_CRYPT_KEY_SIZE] = raw
                .try_into()
                .map_err(|_| format!("{field} has the wrong length"))?;
            Ok(SealedPrivateKey(arr))
        };
        Ok(ClaimKeypairs {
            ed25519_private_key_encrypted: decode_key(
                "ed25519PrivateKeyEncryptedB64",
                &self.ed25519_private_key_encrypted_b64,
            )?,
            ed25519_public_key: decode_b64(self.ed25519_public_key_b64.as_deref().unwrap_or_default())
                .map_err(|_| "ed25519PublicKeyB64 is not valid base64".to_string())?,
            x25519_private_key_encrypted: decode_key(
                "x25519PrivateKeyEncryptedB64",
                &self.x25519_private_key_encrypted_b64,
            )?,
            x25519_public_key: decode_b64(self.x25519_public_key_b64.as_deref().unwrap_or_default())
                .map_err(|_| "x25519PublicKeyB64 is not valid base64".to_string())?,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ClaimProbeResponse {
    #[serde(rename = "storageQuota")]
    pub storage_quota: u64,
    #[serde(rename = "passwordPublicSalt")]
    pub password_public_salt: String,
    #[serde(rename = "masterKeySalt")]
    pub master_key_salt: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct BoolValue {
    pub value: bool,
}

#[derive(Debug, Serialize)]
pub struct U64Value {
    pub value: u64,
}

#[derive(Debug, Deserialize)]
pub struct HandleRequest {
    pub handle: String,
}

#[derive(Debug, Serialize)]
pub struct FileSystemListing {
    pub data: Vec<FileSystemEntryDto>,
}

#[derive(Debug, Serialize)]
pub struct FileSystemEntryDto {
    pub handle: String,
    #[serde(rename = "parentHandle")]
    pub parent_handle: String,
    #[serde(rename = "sizeBytes")]
    pub size_bytes: u64,
    #[serde(rename = "encryptedFileCryptKeyB64")]
    pub encrypted_file_crypt_key_b64: String,
    #[serde(rename = "encryptedMetadataB64")]
    pub encrypted_metadata_b64: String,
    pub signature: String,
    #[serde(rename = "isFolder")]
    pub is_folder: bool,
}

impl From<FileEntry> for FileSystemEntryDto {
    fn from(entry: FileEntry) -> Self {
        let is_folder = entry.is_folder();
        Self {
            handle: entry.handle,
            parent_handle: entry.parent_handle,
            size_bytes: entry.size_bytes,
            encrypted_file_crypt_key_b64: encode_b64(&entry.encrypted_file_crypt_key),
            encrypted_metadata_b64: encode_b64(&entry.encrypted_metadata),
            signature: entry.signature,
            is_folder,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateFolderRequest {
    #[serde(rename = "parentHandle")]
    pub parent_handle: String,
    #[serde(rename = "encryptedMetadataB64")]
    pub encrypted_metadata_b64: String,
}

#[derive(Debug, Serialize)]
pub struct HandleResponse {
    pub handle: String,
}

#[derive(Debug, Deserialize)]
pub struct EditMetadataEntry {
    pub handle: String,
    #[serde(rename = "encryptedMetadataB64")]
    pub encrypted_metadata_b64: String,
}

#[derive(Debug, Deserialize)]
pub struct StartUploadRequest {
    #[serde(rename = "fileSize")]
    pub file_size: u64,
}

#[derive(Debug, Deserialize)]
pub struct FinaliseUploadRequest {
    pub handle: String,
    #[serde(rename = "parentHandle")]
    pub parent_handle: String,
    #[serde(rename = "encryptedMetadataB64")]
    pub encrypted_metadata_b64: String,
    #[serde(rename = "encryptedFileCryptKeyB64")]
    pub encrypted_file_crypt_key_b64: String,
    pub signature: String,
}

#[derive(Debug, Deserialize)]
pub struct DownloadChunkRequest {
    pub handle: String,
    #[serde(rename = "chunkId")]
    pub chunk_id: u64,
}

pub fn encode_b64(bytes: &[u8]) -> String {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

pub fn decode_b64(s: &str) -> Result<Vec<u8>, base64::DecodeError> {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.decode(s)
}
