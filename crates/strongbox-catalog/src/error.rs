//! Catalog-local error type. Converts into `strongbox_core::AppError` only
//! at the HTTP boundary in `strongbox-server`.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("username already taken")]
    UsernameTaken,

    #[error("claim code already used or unknown")]
    ClaimCodeInvalid,

    #[error("not found")]
    NotFound,

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl CatalogError {
    /// True for errors that represent a uniqueness/ownership conflict
    /// rather than a transient or programming failure.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            CatalogError::UsernameTaken | CatalogError::ClaimCodeInvalid
        )
    }
}
