use std::path::PathBuf;

use thiserror::Error;

/// Errors from reading or writing the persisted index artifacts.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Graph encoding failed: {0}")]
    Encode(#[source] bincode::Error),

    #[error("Graph decoding failed: {0}")]
    Decode(#[source] bincode::Error),

    #[error("Metadata error: {0}")]
    Metadata(#[from] serde_json::Error),

    #[error("Checksum mismatch in {path}: expected {expected:#010x}, computed {actual:#010x}")]
    Checksum {
        path: PathBuf,
        expected: u32,
        actual: u32,
    },

    #[error("Artifacts disagree: {0}")]
    Inconsistent(String),

    #[error("Missing artifact: {0}")]
    Missing(PathBuf),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors surfaced by [`crate::SimilarityIndex`] operations.
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Dimension mismatch: index has {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Index has not been built")]
    NotBuilt,

    #[error("Persistence failed: {0}")]
    Persistence(#[from] StoreError),
}

pub type IndexResult<T> = std::result::Result<T, IndexError>;
