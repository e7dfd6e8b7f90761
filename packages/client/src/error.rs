use store::StoreError;
use thiserror::Error;

/// Failure of a client-side operation. The `Display` text is what the user sees.
#[derive(Debug, Error)]
pub enum ClientError {
    /// A required field is missing; nothing was sent.
    #[error("{0}")]
    Validation(String),

    #[error("Not signed in")]
    NotSignedIn,

    #[error("User not found in database")]
    MissingProfile,

    #[error(transparent)]
    Store(#[from] StoreError),

    /// The gateway answered with an error body.
    #[error("{message}")]
    Gateway { status: u16, message: String },

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("Invalid gateway url: {0}")]
    Url(#[from] url::ParseError),
}
