//! Transactional metadata store: users, unclaimed reservations, and each
//! user's file forest.
//!
//! `Catalog` is a value whose constructor opens the backing SQLite file
//! and whose public methods take `&self`. The single-writer discipline
//! required by the upload/auth protocols is expressed as an internal
//! `Mutex<Connection>` rather than a global — every mutating call takes
//! the lock for the duration of one transaction. Reads open their own
//! short-lived connection against the same WAL-mode file, so lookups
//! never contend with an in-flight write.

mod error;
mod schema;

pub use error::CatalogError;

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension};
use tracing::instrument;

use strongbox_core::model::{
    ClaimKeypairs, FileEntry, Salt, SealedPrivateKey, UnclaimedReservation, User,
};
use strongbox_core::ENCRYPTED_CRYPT_KEY_SIZE;

pub struct Catalog {
    db_path: PathBuf,
    writer: Mutex<Connection>,
    /// Append-only set of claim codes already consumed, consulted before
    /// opening a transaction to short-circuit an obviously-reused code.
    /// The transactional delete of the reservation row remains the
    /// source of truth for correctness under races.
    used_claim_codes: Mutex<HashSet<String>>,
}

impl Catalog {
    /// Open (creating if necessary) the catalog at `db_path`.
    #[instrument(skip_all, fields(path = %db_path.as_ref().display()))]
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let db_path = db_path.as_ref().to_path_buf();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(&db_path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        schema::bootstrap(&conn)?;
        tracing::info!("catalog opened");
        Ok(Self {
            db_path,
            writer: Mutex::new(conn),
            used_claim_codes: Mutex::new(HashSet::new()),
        })
    }

    fn read_conn(&self) -> Result<Connection, CatalogError> {
        let conn = Connection::open(&self.db_path)?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(conn)
    }

    /// Insert a new unclaimed reservation, returning its freshly minted
    /// claim code.
    #[instrument(skip(self, salts))]
    pub fn reserve_account(
        &self,
        quota: u64,
        salts: (Salt, Salt, Salt),
    ) -> Result<String, CatalogError> {
        let (public_salt, private_salt, master_key_salt) = salts;
        let code = strongbox_core::token::new_claim_code();
        let writer = self.writer.lock().expect("writer mutex poisoned");
        writer.execute(
            "INSERT INTO unclaimed_reservations
                (claim_code, storage_quota_bytes, password_public_salt, password_private_salt, master_key_salt)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                code,
                quota as i64,
                public_salt.as_bytes().as_slice(),
                private_salt.as_bytes().as_slice(),
                master_key_salt.as_bytes().as_slice(),
            ],
        )?;
        Ok(code)
    }

    /// Look up a reservation by its claim code without consuming it (the
    /// "probe" phase of the claim ceremony).
    #[instrument(skip(self))]
    pub fn find_reservation(
        &self,
        code: &str,
    ) -> Result<Option<UnclaimedReservation>, CatalogError> {
        let conn = self.read_conn()?;
        conn.query_row(
            "SELECT claim_code, storage_quota_bytes, password_public_salt, password_private_salt, master_key_salt
             FROM unclaimed_reservations WHERE claim_code = ?1",
            params![code],
            row_to_reservation,
        )
        .optional()
        .map_err(CatalogError::from)
    }

    /// Commit the claim ceremony: verify the code is unused, delete the
    /// reservation, insert the new `User` carrying its salts, all inside
    /// one transaction. On success, remembers the code as used.
    #[instrument(skip(self, password_hash, keypairs))]
    pub fn claim(
        &self,
        code: &str,
        username: &str,
        password_hash: &str,
        keypairs: ClaimKeypairs,
    ) -> Result<User, CatalogError> {
        {
            let used = self.used_claim_codes.lock().expect("used-codes mutex poisoned");
            if used.contains(code) {
                return Err(CatalogError::ClaimCodeInvalid);
            }
        }

        let mut writer = self.writer.lock().expect("writer mutex poisoned");
        let tx = writer.transaction()?;

        let reservation = tx
            .query_row(
                "SELECT claim_code, storage_quota_bytes, password_public_salt, password_private_salt, master_key_salt
                 FROM unclaimed_reservations WHERE claim_code = ?1",
                params![code],
                row_to_reservation,
            )
            .optional()?
            .ok_or(CatalogError::ClaimCodeInvalid)?;

        let deleted = tx.execute(
            "DELETE FROM unclaimed_reservations WHERE claim_code = ?1",
            params![code],
        )?;
        if deleted == 0 {
            return Err(CatalogError::ClaimCodeInvalid);
        }

        let existing: Option<i64> = tx
            .query_row(
                "SELECT id FROM users WHERE username = ?1",
                params![username],
                |r| r.get(0),
            )
            .optional()?;
        if existing.is_some() {
            return Err(CatalogError::UsernameTaken);
        }

        tx.execute(
            "INSERT INTO users
                (username, storage_quota_bytes, password_hash, password_public_salt, password_private_salt,
                 master_key_salt, ed25519_private_key_encrypted, ed25519_public_key,
                 x25519_private_key_encrypted, x25519_public_key)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                username,
                reservation.storage_quota_bytes as i64,
                password_hash,
                reservation.password_public_salt.as_bytes().as_slice(),
                reservation.password_private_salt.as_bytes().as_slice(),
                reservation.master_key_salt.as_bytes().as_slice(),
                keypairs.ed25519_private_key_encrypted.0.as_slice(),
                keypairs.ed25519_public_key,
                keypairs.x25519_private_key_encrypted.0.as_slice(),
                keypairs.x25519_public_key,
            ],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        self.used_claim_codes
            .lock()
            .expect("used-codes mutex poisoned")
            .insert(code.to_string());

        Ok(User {
            id,
            username: username.to_string(),
            storage_quota_bytes: reservation.storage_quota_bytes,
            password_hash: password_hash.to_string(),
            password_public_salt: reservation.password_public_salt,
            password_private_salt: reservation.password_private_salt,
            master_key_salt: reservation.master_key_salt,
            ed25519_private_key_encrypted: keypairs.ed25519_private_key_encrypted,
            ed25519_public_key: keypairs.ed25519_public_key,
            x25519_private_key_encrypted: keypairs.x25519_private_key_encrypted,
            x25519_public_key: keypairs.x25519_public_key,
        })
    }

    #[instrument(skip(self))]
    pub fn lookup_user(&self, username: &str) -> Result<Option<User>, CatalogError> {
        let conn = self.read_conn()?;
        conn.query_row(
            "SELECT id, username, storage_quota_bytes, password_hash, password_public_salt,
                    password_private_salt, master_key_salt, ed25519_private_key_encrypted,
                    ed25519_public_key, x25519_private_key_encrypted, x25519_public_key
             FROM users WHERE username = ?1",
            params![username],
            row_to_user,
        )
        .optional()
        .map_err(CatalogError::from)
    }

    pub fn lookup_user_by_id(&self, id: i64) -> Result<Option<User>, CatalogError> {
        let conn = self.read_conn()?;
        conn.query_row(
            "SELECT id, username, storage_quota_bytes, password_hash, password_public_salt,
                    password_private_salt, master_key_salt, ed25519_private_key_encrypted,
                    ed25519_public_key, x25519_private_key_encrypted, x25519_public_key
             FROM users WHERE id = ?1",
            params![id],
            row_to_user,
        )
        .optional()
        .map_err(CatalogError::from)
    }

    #[instrument(skip(self))]
    pub fn list_children(
        &self,
        owner_id: i64,
        parent_handle: &str,
    ) -> Result<Vec<FileEntry>, CatalogError> {
        let conn = self.read_conn()?;
        let mut stmt = conn.prepare(
            "SELECT owner_id, handle, parent_handle, size_bytes, encrypted_file_crypt_key,
                    encrypted_metadata, signature
             FROM file_entries WHERE owner_id = ?1 AND parent_handle = ?2",
        )?;
        let rows = stmt
            .query_map(params![owner_id, parent_handle], row_to_file_entry)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    #[instrument(skip(self, entry))]
    pub fn insert_file(&self, entry: &FileEntry) -> Result<(), CatalogError> {
        let writer = self.writer.lock().expect("writer mutex poisoned");
        writer.execute(
            "INSERT INTO file_entries
                (owner_id, handle, parent_handle, size_bytes, encrypted_file_crypt_key,
                 encrypted_metadata, signature)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                entry.owner_id,
                entry.handle,
                entry.parent_handle,
                entry.size_bytes as i64,
                entry.encrypted_file_crypt_key,
                entry.encrypted_metadata,
                entry.signature,
            ],
        )?;
        Ok(())
    }

    /// Update the opaque metadata of a file entry. Only affects rows
    /// owned by `owner_id`; silently a no-op (zero rows affected) if the
    /// caller does not own `handle` or it doesn't exist — callers should
    /// check the affected-row count if they need to surface `NotFound`
    /// vs. `NotAuthorised` distinctly.
    #[instrument(skip(self, new_encrypted_metadata))]
    pub fn update_metadata(
        &self,
        owner_id: i64,
        handle: &str,
        new_encrypted_metadata: &[u8],
    ) -> Result<usize, CatalogError> {
        let writer = self.writer.lock().expect("writer mutex poisoned");
        let affected = writer.execute(
            "UPDATE file_entries SET encrypted_metadata = ?1 WHERE owner_id = ?2 AND handle = ?3",
            params![new_encrypted_metadata, owner_id, handle],
        )?;
        Ok(affected)
    }

    #[instrument(skip(self))]
    pub fn bytes_used(&self, owner_id: i64) -> Result<u64, CatalogError> {
        let conn = self.read_conn()?;
        let total: i64 = conn.query_row(
            "SELECT COALESCE(SUM(size_bytes), 0) FROM file_entries WHERE owner_id = ?1",
            params![owner_id],
            |r| r.get(0),
        )?;
        Ok(total.max(0) as u64)
    }

    #[instrument(skip(self))]
    pub fn file_owner(&self, handle: &str) -> Result<Option<i64>, CatalogError> {
        let conn = self.read_conn()?;
        conn.query_row(
            "SELECT owner_id FROM file_entries WHERE handle = ?1",
            params![handle],
            |r| r.get(0),
        )
        .optional()
        .map_err(CatalogError::from)
    }

    #[instrument(skip(self))]
    pub fn get_file(&self, handle: &str) -> Result<Option<FileEntry>, CatalogError> {
        let conn = self.read_conn()?;
        conn.query_row(
            "SELECT owner_id, handle, parent_handle, size_bytes, encrypted_file_crypt_key,
                    encrypted_metadata, signature
             FROM file_entries WHERE handle = ?1",
            params![handle],
            row_to_file_entry,
        )
        .optional()
        .map_err(CatalogError::from)
    }

    /// Number of distinct users, used by the admin console's `viewusers`.
    pub fn list_users(&self) -> Result<Vec<User>, CatalogError> {
        let conn = self.read_conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, username, storage_quota_bytes, password_hash, password_public_salt,
                    password_private_salt, master_key_salt, ed25519_private_key_encrypted,
                    ed25519_public_key, x25519_private_key_encrypted, x25519_public_key
             FROM users ORDER BY id",
        )?;
        let rows = stmt
            .query_map([], row_to_user)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn list_reservations(&self) -> Result<Vec<UnclaimedReservation>, CatalogError> {
        let conn = self.read_conn()?;
        let mut stmt = conn.prepare(
            "SELECT claim_code, storage_quota_bytes, password_public_salt, password_private_salt, master_key_salt
             FROM unclaimed_reservations ORDER BY claim_code",
        )?;
        let rows = stmt
            .query_map([], row_to_reservation)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

fn blob_to_salt(blob: Vec<u8>) -> rusqlite::Result<Salt> {
    let arr: [u8; 32] = blob.try_into().map_err(|_| {
        rusqlite::Error::FromSqlConversionFailure(
            32,
            rusqlite::types::Type::Blob,
            "salt length mismatch".into(),
        )
    })?;
    Ok(Salt(arr))
}

fn blob_to_sealed_key(blob: Vec<u8>) -> rusqlite::Result<SealedPrivateKey> {
    let arr: [u8; ENCRYPTED_CRYPT_KEY_SIZE] = blob.try_into().map_err(|_| {
        rusqlite::Error::FromSqlConversionFailure(
            ENCRYPTED_CRYPT_KEY_SIZE,
            rusqlite::types::Type::Blob,
            "sealed key length mismatch".into(),
        )
    })?;
    Ok(SealedPrivateKey(arr))
}

fn row_to_reservation(row: &rusqlite::Row<'_>) -> rusqlite::Result<UnclaimedReservation> {
    Ok(UnclaimedReservation {
        claim_code: row.get(0)?,
        storage_quota_bytes: row.get::<_, i64>(1)? as u64,
        password_public_salt: blob_to_salt(row.get(2)?)?,
        password_private_salt: blob_to_salt(row.get(3)?)?,
        master_key_salt: blob_to_salt(row.get(4)?)?,
    })
}

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        storage_quota_bytes: row.get::<_, i64>(2)? as u64,
        password_hash: row.get(3)?,
        password_public_salt: blob_to_salt(row.get(4)?)?,
        password_private_salt: blob_to_salt(row.get(5)?)?,
        master_key_salt: blob_to_salt(row.get(6)?)?,
        ed25519_private_key_encrypted: blob_to_sealed_key(row.get(7)?)?,
        ed25519_public_key: row.get(8)?,
        x25519_private_key_encrypted: blob_to_sealed_key(row.get(9)?)?,
        x25519_public_key: row.get(10)?,
    })
}

fn row_to_file_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<FileEntry> {
    Ok(FileEntry {
        owner_id: row.get(0)?,
        handle: row.get(1)?,
        parent_handle: row.get(2)?,
        size_bytes: row.get::<_, i64>(3)? as u64,
        encrypted_file_crypt_key: row.get(4)?,
        encrypted_metadata: row.get(5)?,
        signature: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use strongbox_core::model::SealedPrivateKey;

    fn temp_catalog() -> (Catalog, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let catalog = Catalog::open(dir.path().join("userdata.db")).unwrap();
        (catalog, dir)
    }

    fn dummy_keypairs() -> ClaimKeypairs {
        ClaimKeypairs {
            ed25519_private_key_encrypted: SealedPrivateKey([7u8; ENCRYPTED_CRYPT_KEY_SIZE]),
            ed25519_public_key: vec![1, 2, 3],
            x25519_private_key_encrypted: SealedPrivateKey([8u8; ENCRYPTED_CRYPT_KEY_SIZE]),
            x25519_public_key: vec![4, 5, 6],
        }
    }

    #[test]
    fn reserve_then_claim_creates_exactly_one_user() {
        let (catalog, _dir) = temp_catalog();
        let code = catalog
            .reserve_account(10_000_000_000, (Salt::random(), Salt::random(), Salt::random()))
            .unwrap();

        assert!(catalog.find_reservation(&code).unwrap().is_some());

        let user = catalog
            .claim(&code, "alice", "deadbeef", dummy_keypairs())
            .unwrap();
        assert_eq!(user.username, "alice");
        assert!(catalog.find_reservation(&code).unwrap().is_none());
        assert_eq!(catalog.list_users().unwrap().len(), 1);
    }

    #[test]
    fn claim_rejects_reused_code() {
        let (catalog, _dir) = temp_catalog();
        let code = catalog
            .reserve_account(1, (Salt::random(), Salt::random(), Salt::random()))
            .unwrap();
        catalog.claim(&code, "bob", "hash", dummy_keypairs()).unwrap();

        let second = catalog.claim(&code, "carol", "hash", dummy_keypairs());
        assert!(matches!(second, Err(CatalogError::ClaimCodeInvalid)));
        assert_eq!(catalog.list_users().unwrap().len(), 1);
    }

    #[test]
    fn claim_rejects_duplicate_username() {
        let (catalog, _dir) = temp_catalog();
        let code1 = catalog
            .reserve_account(1, (Salt::random(), Salt::random(), Salt::random()))
            .unwrap();
        catalog.claim(&code1, "dave", "hash", dummy_keypairs()).unwrap();

        let code2 = catalog
            .reserve_account(1, (Salt::random(), Salt::random(), Salt::random()))
            .unwrap();
        let result = catalog.claim(&code2, "dave", "hash", dummy_keypairs());
        assert!(matches!(result, Err(CatalogError::UsernameTaken)));
        // the failed claim rolled back before deleting the reservation, so it remains
        assert!(catalog.find_reservation(&code2).unwrap().is_some());
    }

    #[test]
    fn bytes_used_sums_file_sizes() {
        let (catalog, _dir) = temp_catalog();
        let code = catalog
            .reserve_account(1, (Salt::random(), Salt::random(), Salt::random()))
            .unwrap();
        let user = catalog.claim(&code, "erin", "hash", dummy_keypairs()).unwrap();

        assert_eq!(catalog.bytes_used(user.id).unwrap(), 0);

        let entry = FileEntry {
            owner_id: user.id,
            handle: strongbox_core::token::new_handle(),
            parent_handle: strongbox_core::ROOT_HANDLE.to_string(),
            size_bytes: 4096,
            encrypted_file_crypt_key: vec![0u8; ENCRYPTED_CRYPT_KEY_SIZE],
            encrypted_metadata: vec![1, 2, 3],
            signature: "a".repeat(88),
        };
        catalog.insert_file(&entry).unwrap();
        assert_eq!(catalog.bytes_used(user.id).unwrap(), 4096);
        assert_eq!(catalog.file_owner(&entry.handle).unwrap(), Some(user.id));
    }

    #[test]
    fn list_children_filters_by_owner_and_parent() {
        let (catalog, _dir) = temp_catalog();
        let code = catalog
            .reserve_account(1, (Salt::random(), Salt::random(), Salt::random()))
            .unwrap();
        let user = catalog.claim(&code, "frank", "hash", dummy_keypairs()).unwrap();

        let folder = FileEntry {
            owner_id: user.id,
            handle: strongbox_core::token::new_handle(),
            parent_handle: strongbox_core::ROOT_HANDLE.to_string(),
            size_bytes: 0,
            encrypted_file_crypt_key: vec![],
            encrypted_metadata: vec![],
            signature: String::new(),
        };
        catalog.insert_file(&folder).unwrap();

        let children = catalog
            .list_children(user.id, strongbox_core::ROOT_HANDLE)
            .unwrap();
        assert_eq!(children.len(), 1);
        assert!(children[0].is_folder());
    }
}
