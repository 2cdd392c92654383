use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("API error ({status}): {message}")]
    Status { status: u16, message: String },

    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("iCloud Photo Library not finished indexing or not activated (state: {0})")]
    NotActivated(String),

    #[error("download of photo {photo_id} ended after {written} of {expected} bytes")]
    IncompleteDownload {
        photo_id: String,
        expected: u64,
        written: u64,
    },

    #[error("session is not signed in: {0}")]
    NotAuthenticated(&'static str),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("failed to verify security code")]
    CodeRejected,

    #[error("failed to send verification code")]
    CodeNotSent,

    #[error("no trusted devices available for two-step authentication")]
    NoTrustedDevices,

    #[error("terminal error: {0}")]
    Console(#[from] io::Error),

    #[error(transparent)]
    Api(#[from] ApiError),
}
