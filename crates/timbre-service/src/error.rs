use thiserror::Error;
use timbre_analysis::ExtractionError;
use timbre_search::IndexError;

/// Errors returned by request handlers.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Index(#[from] IndexError),

    /// A serialized vector in the request could not be decoded.
    #[error("invalid vector: {0}")]
    InvalidVector(#[from] timbre_core::Error),

    /// The handler's blocking task panicked or was cancelled.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Convenience alias for handler results.
pub type ServiceResult<T> = std::result::Result<T, ServiceError>;
