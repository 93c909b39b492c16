use thiserror::Error;

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("no such upload session")]
    SessionNotFound,

    #[error("not authorised")]
    NotAuthorised,

    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("too many chunks in flight")]
    TooManyInFlight,

    #[error("payload too large")]
    PayloadTooLarge,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl UploadError {
    pub fn internal(err: impl Into<anyhow::Error>) -> Self {
        UploadError::Internal(err.into())
    }

    pub(crate) fn catalog(err: strongbox_catalog::CatalogError) -> Self {
        UploadError::Internal(err.into())
    }
}
