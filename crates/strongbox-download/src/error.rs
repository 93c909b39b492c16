use thiserror::Error;

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("not found")]
    NotFound,

    #[error("not authorised")]
    NotAuthorised,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl DownloadError {
    pub(crate) fn catalog(err: strongbox_catalog::CatalogError) -> Self {
        match err {
            strongbox_catalog::CatalogError::NotFound => DownloadError::NotFound,
            other => DownloadError::Internal(other.into()),
        }
    }
}
