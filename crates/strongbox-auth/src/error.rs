use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("incorrect credentials")]
    InvalidCredentials,

    #[error("claim code already used or unknown")]
    ClaimCodeInvalid,

    #[error("username already taken")]
    UsernameTaken,

    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("not authenticated")]
    NotAuthenticated,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AuthError {
    pub fn internal(err: impl Into<anyhow::Error>) -> Self {
        AuthError::Internal(err.into())
    }

    pub(crate) fn catalog(err: strongbox_catalog::CatalogError) -> Self {
        match err {
            strongbox_catalog::CatalogError::UsernameTaken => AuthError::UsernameTaken,
            strongbox_catalog::CatalogError::ClaimCodeInvalid => AuthError::ClaimCodeInvalid,
            other => AuthError::Internal(other.into()),
        }
    }
}
