//! Request and response messages.
//!
//! Serialized vectors are little-endian `f32` bytes; in JSON they travel as
//! standard base64 strings.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use timbre_core::AnalysisDepth;
use timbre_search::SearchMatch;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeTrackRequest {
    pub path: PathBuf,
    /// Falls back to the service's default depth.
    #[serde(default)]
    pub depth: Option<AnalysisDepth>,
    /// When non-empty, only these descriptors are returned and vectorized.
    #[serde(default)]
    pub descriptors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeTrackResponse {
    pub descriptors: BTreeMap<String, String>,
    #[serde(with = "base64_bytes")]
    pub feature_vector: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeBatchRequest {
    pub paths: Vec<PathBuf>,
    #[serde(default)]
    pub depth: Option<AnalysisDepth>,
    #[serde(default)]
    pub descriptors: Vec<String>,
}

/// One item to index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexItem {
    pub id: String,
    #[serde(with = "base64_bytes")]
    pub vector: Vec<u8>,
}

impl IndexItem {
    pub fn new(id: impl Into<String>, vector: &[f32]) -> Self {
        Self {
            id: id.into(),
            vector: timbre_core::encode_vector(vector),
        }
    }
}

/// Body of both BuildIndex and AddItems.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexItemsRequest {
    pub items: Vec<IndexItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexItemsResponse {
    pub success: bool,
    pub item_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl IndexItemsResponse {
    pub(crate) fn ok(item_count: usize) -> Self {
        Self {
            success: true,
            item_count,
            error: None,
        }
    }

    pub(crate) fn failed(error: impl ToString) -> Self {
        Self {
            success: false,
            item_count: 0,
            error: Some(error.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindSimilarRequest {
    #[serde(with = "base64_bytes")]
    pub query: Vec<u8>,
    pub k: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FindSimilarResponse {
    pub matches: Vec<SearchMatch>,
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        STANDARD
            .decode(text.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
