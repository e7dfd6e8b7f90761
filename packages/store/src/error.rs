//! Errors reported by a [`crate::SessionStore`].

use thiserror::Error;

/// Failure talking to the Session Store.
///
/// Messages coming back from the store are kept verbatim so callers can
/// surface them to the user unchanged.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The access token was rejected or no user is attached to it.
    #[error("{0}")]
    Unauthorized(String),

    /// The store answered with a non-success status.
    #[error("{message}")]
    Api { status: u16, message: String },

    /// The requested row does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The store answered but the body was not what we expected.
    #[error("Unexpected response: {0}")]
    Decode(String),

    /// The request never completed.
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

pub type Result<T, E = StoreError> = std::result::Result<T, E>;
