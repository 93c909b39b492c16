//! Bootstrap schema, applied once inside a single transaction at open time.

use rusqlite::Connection;

pub fn bootstrap(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "
        BEGIN;

        CREATE TABLE IF NOT EXISTS users (
            id                              INTEGER PRIMARY KEY AUTOINCREMENT,
            username                        TEXT NOT NULL UNIQUE,
            storage_quota_bytes             INTEGER NOT NULL,
            password_hash                   TEXT NOT NULL,
            password_public_salt            BLOB NOT NULL,
            password_private_salt           BLOB NOT NULL,
            master_key_salt                 BLOB NOT NULL,
            ed25519_private_key_encrypted   BLOB NOT NULL,
            ed25519_public_key              BLOB NOT NULL,
            x25519_private_key_encrypted    BLOB NOT NULL,
            x25519_public_key               BLOB NOT NULL
        );

        CREATE TABLE IF NOT EXISTS unclaimed_reservations (
            claim_code              TEXT PRIMARY KEY,
            storage_quota_bytes     INTEGER NOT NULL,
            password_public_salt    BLOB NOT NULL,
            password_private_salt   BLOB NOT NULL,
            master_key_salt         BLOB NOT NULL
        );

        CREATE TABLE IF NOT EXISTS file_entries (
            owner_id                    INTEGER NOT NULL REFERENCES users(id),
            handle                      TEXT PRIMARY KEY,
            parent_handle               TEXT NOT NULL,
            size_bytes                  INTEGER NOT NULL,
            encrypted_file_crypt_key    BLOB NOT NULL,
            encrypted_metadata          BLOB NOT NULL,
            signature                   TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_file_entries_owner_parent
            ON file_entries(owner_id, parent_handle);

        CREATE INDEX IF NOT EXISTS idx_file_entries_owner
            ON file_entries(owner_id);

        COMMIT;
        ",
    )
}
