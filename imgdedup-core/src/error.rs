use thiserror::Error;

use crate::repository::RepositoryError;

#[derive(Error, Debug)]
pub enum DedupError {
    /// The bytes are not a decodable raster image.
    #[error("Decode error: {0}")]
    Decode(String),

    /// The byte stream could not be fully read. Safe to retry.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No hash type could be compared between two fingerprint sets.
    #[error("Incomplete fingerprint: {0}")]
    IncompleteFingerprint(String),

    /// A stored fingerprint is not 16 hex characters.
    #[error("Invalid fingerprint: {0}")]
    InvalidFingerprint(String),

    /// Storage-layer uniqueness violation.
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    /// Write or move failure after the admission decision.
    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Repository error: {0}")]
    Repository(String),

    /// A blocking worker panicked or was cancelled.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DedupError {
    /// Whether the failure was caused by the submitted input rather than the server.
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::Decode(_) | Self::Io(_))
    }
}

impl From<RepositoryError> for DedupError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::DuplicateKey(key) => Self::DuplicateKey(key),
            other => Self::Repository(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, DedupError>;
