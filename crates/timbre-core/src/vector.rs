//! Feature vector construction.
//!
//! A [`FeatureVector`] is a fixed-order encoding of the descriptors that
//! matter for similarity. Construction is total: missing, categorical or
//! malformed descriptors become `0.0`, so vectors built at different times
//! stay directly comparable.

use serde::{Deserialize, Serialize};

use crate::descriptor::DescriptorSet;
use crate::error::{Error, Result};

/// Number of components in a feature vector.
pub const FEATURE_DIM: usize = 16;

/// Descriptor names in vector component order.
pub const FEATURE_ORDER: [&str; FEATURE_DIM] = [
    "tempo",
    "energy",
    "danceability",
    "valence",
    "acousticness",
    "instrumentalness",
    "speechiness",
    "loudness",
    "spectral_centroid",
    "spectral_rolloff",
    "zero_crossing_rate",
    "dynamic_complexity",
    "beats_confidence",
    "onset_rate",
    "key_strength",
    "dissonance",
];

/// Lower bound of the tempo range mapped onto `[0, 1]`.
const TEMPO_FLOOR_BPM: f32 = 60.0;

/// Width of the tempo range mapped onto `[0, 1]` (60 to 200 BPM).
const TEMPO_SPAN_BPM: f32 = 140.0;

/// A clipped, L2-normalized encoding of a descriptor set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector([f32; FEATURE_DIM]);

impl FeatureVector {
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    #[must_use]
    pub fn to_vec(&self) -> Vec<f32> {
        self.0.to_vec()
    }

    /// Component for a named descriptor, if it is part of the vector.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<f32> {
        FEATURE_ORDER
            .iter()
            .position(|feature| *feature == name)
            .map(|idx| self.0[idx])
    }

    #[must_use]
    pub fn norm(&self) -> f32 {
        l2_norm(&self.0)
    }

    /// Whether every component is zero (no usable descriptors).
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&c| c == 0.0)
    }

    /// Little-endian `f32` bytes, the wire form of a vector.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        encode_vector(&self.0)
    }
}

impl AsRef<[f32]> for FeatureVector {
    fn as_ref(&self) -> &[f32] {
        &self.0
    }
}

impl From<FeatureVector> for Vec<f32> {
    fn from(vector: FeatureVector) -> Self {
        vector.to_vec()
    }
}

/// Map a raw tempo in BPM onto the 60–200 BPM range.
///
/// Non-positive tempos (no beat detected) map to exactly `0.0`. Tempos above
/// 200 BPM exceed `1.0` and are clipped later.
#[must_use]
pub fn normalize_tempo(raw_bpm: f32) -> f32 {
    if raw_bpm > 0.0 {
        (raw_bpm - TEMPO_FLOOR_BPM) / TEMPO_SPAN_BPM
    } else {
        0.0
    }
}

/// Build the feature vector for one descriptor set. Never fails.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn build_vector(descriptors: &DescriptorSet) -> FeatureVector {
    let mut components = [0.0_f32; FEATURE_DIM];

    for (component, name) in components.iter_mut().zip(FEATURE_ORDER) {
        *component = descriptors.number(name).map_or(0.0, |value| value as f32);
    }

    components[0] = normalize_tempo(components[0]);

    for component in &mut components {
        *component = component.clamp(0.0, 1.0);
    }

    let norm = l2_norm(&components);
    if norm > 0.0 {
        for component in &mut components {
            // Division can round a lone component to just above 1.0.
            *component = (*component / norm).min(1.0);
        }
    }

    FeatureVector(components)
}

/// Build one feature vector per descriptor set, preserving order.
#[must_use]
pub fn build_matrix(descriptor_sets: &[DescriptorSet]) -> Vec<FeatureVector> {
    descriptor_sets.iter().map(build_vector).collect()
}

/// Serialize any vector as little-endian `f32` bytes.
#[must_use]
pub fn encode_vector(components: &[f32]) -> Vec<u8> {
    components.iter().flat_map(|c| c.to_le_bytes()).collect()
}

/// Decode little-endian `f32` bytes into a vector of any dimension.
pub fn decode_vector(bytes: &[u8]) -> Result<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(Error::MalformedVector { len: bytes.len() });
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

fn l2_norm(components: &[f32]) -> f32 {
    components.iter().map(|c| c * c).sum::<f32>().sqrt()
}
