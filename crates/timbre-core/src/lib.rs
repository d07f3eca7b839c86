//! Core domain model for timbre.
//!
//! This crate defines the descriptor model produced by audio analysis, the
//! fixed-order feature vector built from it, the little-endian vector codec
//! shared by every caller, and the analysis depth levels.

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod depth;
pub mod descriptor;
pub mod error;
pub mod vector;

pub use depth::AnalysisDepth;
pub use descriptor::{DescriptorSet, DescriptorValue};
pub use error::{Error, Result};
pub use vector::{
    build_matrix, build_vector, decode_vector, encode_vector, normalize_tempo, FeatureVector,
    FEATURE_DIM, FEATURE_ORDER,
};
