//! Error types for shmarray

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("shared memory allocation failed: {0}")]
    AllocationFailed(String),

    #[error("shared region unavailable: {0}")]
    RegionUnavailable(String),

    #[error("failed to attach to shared region: {0}")]
    AttachFailed(String),

    #[error("element type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("access denied: view is read-only")]
    ReadOnly,

    #[error("failed to release shared region: {0}")]
    ReleaseFailed(String),

    #[error("descriptor encoding error: {0}")]
    Descriptor(String),
}

impl Error {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }
}

impl From<bincode::Error> for Error {
    fn from(e: bincode::Error) -> Self {
        Error::Descriptor(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
