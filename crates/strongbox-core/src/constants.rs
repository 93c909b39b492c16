//! Wire-format constants, normative per the on-disk `.tef` layout and the
//! HTTP surface's size limits.

/// Length, in characters, of a file/folder handle.
pub const FILE_HANDLE_LENGTH: usize = 16;

/// Length, in characters, of a one-time account claim code.
pub const CLAIM_ACCOUNT_CODE_LENGTH: usize = 20;

/// Length, in bytes, of every stored salt.
pub const USER_DATA_SALT_BYTE_LENGTH: usize = 32;

/// Maximum plaintext bytes carried by a single non-final chunk.
pub const CHUNK_DATA_SIZE: u64 = 2 * 1024 * 1024;

/// Bytes of framing overhead per on-disk chunk: `chunk_id(4) + magic(4) + nonce(24) + tag(16)`.
pub const CHUNK_EXTRA_DATA_SIZE: u64 = 4 + 4 + 24 + 16;

/// Total on-disk size of a full (non-final) chunk.
pub const CHUNK_FULL_SIZE: u64 = CHUNK_DATA_SIZE + CHUNK_EXTRA_DATA_SIZE;

/// Size of the `.tef` file magic header.
pub const ENCRYPTED_FILE_HEADER_SIZE: u64 = 4;

/// Maximum size of a single stored file, encrypted-size accounting.
pub const MAX_FILE_SIZE: u64 = 1024 * 1024 * 1024 * 1024; // 1 TiB

/// Maximum size of an opaque encrypted-metadata blob attached to a `FileEntry`.
pub const ENCRYPTED_FILE_METADATA_MAX_SIZE: usize = 1024;

/// Size of an encrypted per-file content key: `nonce(24) + key(32) + tag(16)`.
pub const ENCRYPTED_CRYPT_KEY_SIZE: usize = 72;

/// Size of a raw (non-base64) Ed25519 signature.
pub const ED25519_SIGNATURE_BYTE_LENGTH: usize = 64;

/// Maximum number of chunks an upload may have in flight (reorder buffer cap).
pub const MAX_UPLOAD_CONCURRENT_CHUNKS: usize = 4;

/// The 4-byte magic that opens every `.tef` file.
pub const FILE_MAGIC: [u8; 4] = [0x2E, 0x54, 0x45, 0x46];

/// The 4-byte magic that opens every on-disk chunk.
pub const CHUNK_MAGIC: [u8; 4] = [0x43, 0x48, 0x4E, 0x4B];

/// The all-zero handle denoting the root of a user's file forest.
pub const ROOT_HANDLE: &str = "0000000000000000";

/// Argon2id parameters, fixed for wire compatibility with the client's
/// pre-hash scheme. See `strongbox-auth` for where these are applied.
pub const ARGON2_PARALLELISM: u32 = 2;
pub const ARGON2_ITERATIONS: u32 = 8;
pub const ARGON2_MEMORY_KIB: u32 = 32 * 1024;
pub const ARGON2_HASH_LENGTH: usize = 32;

/// Maximum bytes in-flight per upload before the reorder buffer rejects a
/// chunk with `TooManyInFlight`. Alias kept distinct from
/// `MAX_UPLOAD_CONCURRENT_CHUNKS` for call-site clarity.
pub const MAX_CONCURRENT_CHUNKS: usize = MAX_UPLOAD_CONCURRENT_CHUNKS;

/// Request body caps enforced by the gateway.
pub const MAX_JSON_BODY_BYTES: u64 = 5 * 1024 * 1024;
pub const MAX_BINARY_BODY_BYTES: u64 = 50 * 1024 * 1024;

/// Login/claim rate limit: N requests per window, per client.
pub const AUTH_RATE_LIMIT_REQUESTS: u32 = 10;
pub const AUTH_RATE_LIMIT_WINDOW_SECS: u64 = 30;

/// How often the upload sweeper scans for idle sessions.
pub const UPLOAD_SWEEP_INTERVAL_SECS: u64 = 5 * 60;

/// How long an upload session may sit idle before the sweeper cancels it.
pub const UPLOAD_SESSION_IDLE_TIMEOUT_SECS: u64 = 30 * 60;

/// How often the session store sweeps expired sessions.
pub const SESSION_SWEEP_INTERVAL_SECS: u64 = 60 * 60;

/// How long a session may live before it is evicted by the sweeper.
pub const SESSION_TTL_SECS: u64 = 7 * 24 * 60 * 60;
