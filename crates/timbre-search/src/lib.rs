//! Vector search for timbre.
//!
//! Maintains an HNSW similarity index over feature vectors, persisted as a
//! graph blob plus an id/dimension metadata record under one root directory.

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod error;
pub mod hnsw;
pub mod index;
pub mod store;

pub use error::{IndexError, IndexResult, StoreError};
pub use hnsw::{Hnsw, HnswConfig};
pub use index::{IndexStatus, SearchMatch, SimilarityIndex};
pub use store::{EmptyReason, IndexMetadata, IndexStore, LoadOutcome, PersistedIndex};
