//! Conversions from each component crate's local error enum into
//! `strongbox_core::AppError`, applied at the HTTP boundary — the last
//! point any error is allowed to be handled generically rather than
//! matched on its concrete variant.

use strongbox_core::AppError;

pub fn from_auth(err: strongbox_auth::AuthError) -> AppError {
    use strongbox_auth::AuthError as E;
    match err {
        E::InvalidCredentials => AppError::InvalidCredentials,
        E::ClaimCodeInvalid => AppError::Conflict("invalid or already-used claim code".into()),
        E::UsernameTaken => AppError::Conflict("username already taken".into()),
        E::MalformedInput(msg) => AppError::MalformedInput(msg),
        E::NotAuthenticated => AppError::AuthRequired,
        E::Internal(e) => AppError::internal(e),
    }
}

pub fn from_upload(err: strongbox_upload::UploadError) -> AppError {
    use strongbox_upload::UploadError as E;
    match err {
        E::SessionNotFound | E::NotAuthorised => AppError::NotAuthorised,
        E::MalformedInput(msg) => AppError::MalformedInput(msg),
        E::TooManyInFlight => AppError::TooManyInFlight,
        E::PayloadTooLarge => AppError::PayloadTooLarge,
        E::Io(e) => AppError::internal(e),
        E::Internal(e) => AppError::internal(e),
    }
}

pub fn from_download(err: strongbox_download::DownloadError) -> AppError {
    use strongbox_download::DownloadError as E;
    match err {
        E::NotFound | E::NotAuthorised => AppError::NotAuthorised,
        E::Io(e) => AppError::internal(e),
        E::Internal(e) => AppError::internal(e),
    }
}

pub fn from_catalog(err: strongbox_catalog::CatalogError) -> AppError {
    use strongbox_catalog::CatalogError as E;
    match err {
        E::UsernameTaken => AppError::Conflict("username already taken".into()),
        E::ClaimCodeInvalid => AppError::Conflict("invalid or already-used claim code".into()),
        E::NotFound => AppError::NotAuthorised,
        E::Sqlite(e) => AppError::internal(e),
        E::Io(e) => AppError::internal(e),
    }
}
