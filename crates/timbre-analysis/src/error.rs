//! Extraction error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while turning an audio file into descriptors.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The file could not be opened.
    #[error("cannot open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The container or codec could not be decoded.
    #[error("cannot decode {path}: {message}")]
    Decode { path: PathBuf, message: String },

    /// The file decoded to no samples at all.
    #[error("no audio samples in {0}")]
    Silent(PathBuf),

    /// A failure reported by an extraction engine, passed through verbatim.
    #[error("{0}")]
    Engine(String),
}

impl ExtractionError {
    pub(crate) fn decode(path: &std::path::Path, message: impl std::fmt::Display) -> Self {
        Self::Decode {
            path: path.to_path_buf(),
            message: message.to_string(),
        }
    }
}

/// Best-effort text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Convenience alias for extraction results.
pub type ExtractionResult<T> = std::result::Result<T, ExtractionError>;
