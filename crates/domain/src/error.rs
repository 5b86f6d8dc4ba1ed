use thiserror::Error;

use crate::validate::MAX_ATTACHMENT_BYTES;

/// The shared error taxonomy. `Cancelled` marks a superseded request and
/// must never reach the user.
#[derive(Error, Debug)]
pub enum Error {
    #[error("unsupported attachment type: {0}")]
    InvalidType(String),

    #[error("attachment too large: {size} bytes (limit {MAX_ATTACHMENT_BYTES})")]
    TooLarge { size: u64 },

    #[error("a comment needs text or an image")]
    EmptySubmission,

    #[error("{0} not found: {1}")]
    NotFound(&'static str, String),

    #[error("store error: {0}")]
    Store(String),

    #[error("upload failed: {0}")]
    UploadFailed(String),

    #[error("request superseded")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::InvalidType(_) | Error::TooLarge { .. } | Error::EmptySubmission
        )
    }

    pub fn is_cancellation(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}
