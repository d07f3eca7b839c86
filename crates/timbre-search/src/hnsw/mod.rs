//! Hierarchical Navigable Small World graph for approximate nearest
//! neighbor search over dense `f32` vectors.
//!
//! Vectors live in one contiguous arena indexed by internal id; internal ids
//! are assigned in insertion order starting at zero. Distances are squared
//! Euclidean, so an exact match reports `0.0`.

/// Squared Euclidean distance.
pub mod distance;
/// Graph structure and tuning parameters.
pub mod graph;
/// Insertion with heuristic neighbor selection.
pub mod insert;
/// Layer search and multi-layer k-NN.
pub mod search;
/// Generation-stamped visited set.
pub mod visited;

pub use distance::squared_l2;
pub use graph::{Hnsw, HnswConfig};
pub use search::knn_search;
