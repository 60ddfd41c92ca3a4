use thiserror::Error;

#[derive(Error, Debug)]
pub enum SplitError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Unexpected status code: {status} (expected {expected})")]
    UnexpectedStatus { status: u16, expected: u16 },

    #[error("Content-Length not found in response header")]
    MissingLength,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Short write: expected {expected} bytes, wrote {actual}")]
    ShortWrite { expected: u64, actual: u64 },

    #[error("Server sent more than the {expected} bytes requested")]
    Overflow { expected: u64 },

    #[error("Worker error: {0}")]
    Worker(String),
}

/// Coarse classification of a [`SplitError`], stable across variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArgument,
    UnexpectedStatus,
    MissingLength,
    TransportError,
    IoError,
    Internal,
}

impl SplitError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SplitError::InvalidArgument(_) | SplitError::InvalidUrl(_) => ErrorKind::InvalidArgument,
            SplitError::UnexpectedStatus { .. } => ErrorKind::UnexpectedStatus,
            SplitError::MissingLength => ErrorKind::MissingLength,
            SplitError::Transport(_) => ErrorKind::TransportError,
            SplitError::Io(_) | SplitError::ShortWrite { .. } | SplitError::Overflow { .. } => {
                ErrorKind::IoError
            }
            SplitError::Worker(_) => ErrorKind::Internal,
        }
    }
}
