//! Cross-cutting error taxonomy.
//!
//! Every crate in the workspace defines its own local error enum (for
//! precise `match`ing and `#[source]` chains close to where the error
//! occurs) and converts into `AppError` only at the point it crosses a
//! component boundary.

use thiserror::Error;

/// The abstract error kinds a gateway handler can produce, each with a
/// fixed HTTP status. `Display` text is safe to send to clients; full
/// causes are logged via `tracing::error!` and never serialized.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("authentication required")]
    AuthRequired,

    /// Session present, but the caller does not own the referenced
    /// resource. Deliberately reported the same as `MalformedInput` to
    /// avoid acting as an existence oracle.
    #[error("not authorised")]
    NotAuthorised,

    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("rate limited")]
    RateLimited,

    #[error("too many chunks in flight")]
    TooManyInFlight,

    #[error("payload too large")]
    PayloadTooLarge,

    #[error("incorrect credentials")]
    InvalidCredentials,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("internal error")]
    Internal(#[source] anyhow::Error),
}

impl AppError {
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::AuthRequired => 401,
            AppError::NotAuthorised
            | AppError::MalformedInput(_)
            | AppError::InvalidCredentials
            | AppError::Conflict(_) => 400,
            AppError::RateLimited | AppError::TooManyInFlight => 429,
            AppError::PayloadTooLarge => 413,
            AppError::Internal(_) => 500,
        }
    }

    /// Text safe to return to the client as `{"message": ...}`. Internal
    /// errors never disclose their cause.
    #[must_use]
    pub fn client_message(&self) -> String {
        match self {
            AppError::Internal(_) => "internal error".to_string(),
            other => other.to_string(),
        }
    }

    pub fn internal(err: impl Into<anyhow::Error>) -> Self {
        AppError::Internal(err.into())
    }
}
