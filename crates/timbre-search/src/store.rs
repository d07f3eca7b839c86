//! Durable storage for one similarity index.
//!
//! An index root holds exactly two artifacts:
//!
//! - `hnsw.bin`: the bincode-encoded graph followed by an 8-byte footer,
//!   the magic `TMB1` and a big-endian CRC32 of the payload
//! - `metadata.json`: item ids in insertion order, the dimension, the graph
//!   checksum and a save timestamp
//!
//! The metadata carries the graph checksum, so a graph and a metadata file
//! from different saves are detected and never loaded together.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::hnsw::Hnsw;

pub const GRAPH_FILE: &str = "hnsw.bin";
pub const METADATA_FILE: &str = "metadata.json";

const GRAPH_MAGIC: &[u8; 4] = b"TMB1";
const FOOTER_LEN: usize = 8;

/// Id list and dimension persisted next to the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexMetadata {
    pub item_ids: Vec<String>,
    pub dimension: usize,
    pub graph_checksum: u32,
    pub saved_at: DateTime<Utc>,
}

/// A graph and its id list, read back from disk and checked for agreement.
#[derive(Debug, Clone)]
pub struct PersistedIndex {
    pub graph: Hnsw,
    pub item_ids: Vec<String>,
    pub saved_at: DateTime<Utc>,
}

/// Why [`IndexStore::load`] produced no index.
#[derive(Debug)]
pub enum EmptyReason {
    /// Neither artifact exists.
    Missing,
    /// Artifacts exist but cannot be used together.
    Corrupt(StoreError),
}

/// Result of loading an index root. Loading never fails outright.
#[derive(Debug)]
pub enum LoadOutcome {
    Loaded(PersistedIndex),
    Empty(EmptyReason),
}

impl LoadOutcome {
    pub fn into_loaded(self) -> Option<PersistedIndex> {
        match self {
            Self::Loaded(index) => Some(index),
            Self::Empty(_) => None,
        }
    }
}

/// Reads and writes the two artifacts under one root directory.
#[derive(Debug, Clone)]
pub struct IndexStore {
    root: PathBuf,
}

impl IndexStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn graph_path(&self) -> PathBuf {
        self.root.join(GRAPH_FILE)
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.root.join(METADATA_FILE)
    }

    /// Write both artifacts, replacing whatever was there.
    pub fn save(&self, graph: &Hnsw, item_ids: &[String]) -> Result<IndexMetadata, StoreError> {
        if graph.len() != item_ids.len() {
            return Err(StoreError::Inconsistent(format!(
                "{} item ids for {} graph nodes",
                item_ids.len(),
                graph.len()
            )));
        }

        fs::create_dir_all(&self.root).map_err(|e| StoreError::io(&self.root, e))?;

        let payload = bincode::serialize(graph).map_err(StoreError::Encode)?;
        let checksum = crc32fast::hash(&payload);
        let mut bytes = Vec::with_capacity(payload.len() + FOOTER_LEN);
        bytes.extend_from_slice(&payload);
        bytes.extend_from_slice(GRAPH_MAGIC);
        bytes.extend_from_slice(&checksum.to_be_bytes());

        let metadata = IndexMetadata {
            item_ids: item_ids.to_vec(),
            dimension: graph.dimension(),
            graph_checksum: checksum,
            saved_at: Utc::now(),
        };
        let metadata_bytes = serde_json::to_vec_pretty(&metadata)?;

        write_atomic(&self.graph_path(), &bytes)?;
        write_atomic(&self.metadata_path(), &metadata_bytes)?;

        log::info!(
            "Saved index to {} ({} items, dimension {}, {} graph bytes, CRC32={:#010x})",
            self.root.display(),
            metadata.item_ids.len(),
            metadata.dimension,
            payload.len(),
            checksum
        );
        Ok(metadata)
    }

    /// Read both artifacts back.
    ///
    /// Any problem yields [`LoadOutcome::Empty`] with the reason logged.
    pub fn load(&self) -> LoadOutcome {
        let graph_path = self.graph_path();
        let metadata_path = self.metadata_path();

        if !graph_path.exists() && !metadata_path.exists() {
            log::info!(
                "No index found at {}; starting empty",
                self.root.display()
            );
            return LoadOutcome::Empty(EmptyReason::Missing);
        }

        match self.read_both(&graph_path, &metadata_path) {
            Ok(index) => {
                log::info!(
                    "Loaded index from {} ({} items, dimension {})",
                    self.root.display(),
                    index.item_ids.len(),
                    index.graph.dimension()
                );
                LoadOutcome::Loaded(index)
            }
            Err(e) => {
                log::error!(
                    "Index at {} is unusable, starting empty: {}",
                    self.root.display(),
                    e
                );
                LoadOutcome::Empty(EmptyReason::Corrupt(e))
            }
        }
    }

    fn read_both(
        &self,
        graph_path: &Path,
        metadata_path: &Path,
    ) -> Result<PersistedIndex, StoreError> {
        for path in [graph_path, metadata_path] {
            if !path.exists() {
                return Err(StoreError::Missing(path.to_path_buf()));
            }
        }

        let metadata_bytes =
            fs::read(metadata_path).map_err(|e| StoreError::io(metadata_path, e))?;
        let metadata: IndexMetadata = serde_json::from_slice(&metadata_bytes)?;

        let raw = fs::read(graph_path).map_err(|e| StoreError::io(graph_path, e))?;
        let (payload, checksum) = split_footer(graph_path, &raw)?;

        if checksum != metadata.graph_checksum {
            return Err(StoreError::Inconsistent(format!(
                "metadata expects graph checksum {:#010x}, graph has {:#010x}",
                metadata.graph_checksum, checksum
            )));
        }

        let graph: Hnsw = bincode::deserialize(payload).map_err(StoreError::Decode)?;
        graph.validate().map_err(StoreError::Inconsistent)?;

        if graph.len() != metadata.item_ids.len() {
            return Err(StoreError::Inconsistent(format!(
                "{} item ids for {} graph nodes",
                metadata.item_ids.len(),
                graph.len()
            )));
        }
        if graph.dimension() != metadata.dimension {
            return Err(StoreError::Inconsistent(format!(
                "metadata dimension {} but graph dimension {}",
                metadata.dimension,
                graph.dimension()
            )));
        }

        Ok(PersistedIndex {
            graph,
            item_ids: metadata.item_ids,
            saved_at: metadata.saved_at,
        })
    }
}

/// Verify the magic and CRC footer, returning the payload and its checksum.
fn split_footer<'a>(path: &Path, raw: &'a [u8]) -> Result<(&'a [u8], u32), StoreError> {
    if raw.len() < FOOTER_LEN || &raw[raw.len() - FOOTER_LEN..raw.len() - 4] != GRAPH_MAGIC {
        return Err(StoreError::Inconsistent(format!(
            "{} has no checksum footer",
            path.display()
        )));
    }

    let (payload, footer) = raw.split_at(raw.len() - FOOTER_LEN);
    let expected = u32::from_be_bytes([footer[4], footer[5], footer[6], footer[7]]);
    let actual = crc32fast::hash(payload);
    if expected != actual {
        return Err(StoreError::Checksum {
            path: path.to_path_buf(),
            expected,
            actual,
        });
    }
    log::debug!("Graph CRC32 verified: {:#010x}", actual);
    Ok((payload, actual))
}

/// Write to a temporary sibling, then rename over the target.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, bytes).map_err(|e| StoreError::io(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| StoreError::io(path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hnsw::HnswConfig;
    use tempfile::TempDir;

    fn sample_graph() -> (Hnsw, Vec<String>) {
        let mut graph = Hnsw::new(3, HnswConfig::default());
        let mut ids = Vec::new();
        for i in 0..8 {
            let x = i as f32;
            graph.insert(&[x, x * 0.5, 1.0 - x * 0.1]);
            ids.push(format!("item_{i}"));
        }
        (graph, ids)
    }

    #[test]
    fn test_load_missing_root_is_empty() {
        let temp = TempDir::new().unwrap();
        let store = IndexStore::new(temp.path().join("nothing-here"));
        assert!(matches!(
            store.load(),
            LoadOutcome::Empty(EmptyReason::Missing)
        ));
    }

    #[test]
    fn test_save_then_load() {
        let temp = TempDir::new().unwrap();
        let store = IndexStore::new(temp.path());
        let (graph, ids) = sample_graph();

        let metadata = store.save(&graph, &ids).unwrap();
        assert_eq!(metadata.dimension, 3);
        assert!(store.graph_path().exists());
        assert!(store.metadata_path().exists());

        let loaded = store.load().into_loaded().unwrap();
        assert_eq!(loaded.item_ids, ids);
        assert_eq!(loaded.graph.dimension(), 3);
        assert_eq!(loaded.graph.len(), 8);
        assert_eq!(loaded.graph.vector(5), graph.vector(5));
    }

    #[test]
    fn test_save_leaves_no_temp_files() {
        let temp = TempDir::new().unwrap();
        let store = IndexStore::new(temp.path());
        let (graph, ids) = sample_graph();
        store.save(&graph, &ids).unwrap();

        let names: Vec<String> = fs::read_dir(temp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 2);
        assert!(names.iter().all(|n| !n.ends_with(".tmp")));
    }

    #[test]
    fn test_save_rejects_mismatched_ids() {
        let temp = TempDir::new().unwrap();
        let store = IndexStore::new(temp.path());
        let (graph, mut ids) = sample_graph();
        ids.pop();
        assert!(matches!(
            store.save(&graph, &ids),
            Err(StoreError::Inconsistent(_))
        ));
    }

    #[test]
    fn test_only_metadata_present_is_corrupt() {
        let temp = TempDir::new().unwrap();
        let store = IndexStore::new(temp.path());
        let (graph, ids) = sample_graph();
        store.save(&graph, &ids).unwrap();
        fs::remove_file(store.graph_path()).unwrap();

        assert!(matches!(
            store.load(),
            LoadOutcome::Empty(EmptyReason::Corrupt(StoreError::Missing(_)))
        ));
    }

    #[test]
    fn test_flipped_byte_fails_checksum() {
        let temp = TempDir::new().unwrap();
        let store = IndexStore::new(temp.path());
        let (graph, ids) = sample_graph();
        store.save(&graph, &ids).unwrap();

        let mut raw = fs::read(store.graph_path()).unwrap();
        raw[10] ^= 0xFF;
        fs::write(store.graph_path(), raw).unwrap();

        assert!(matches!(
            store.load(),
            LoadOutcome::Empty(EmptyReason::Corrupt(StoreError::Checksum { .. }))
        ));
    }

    #[test]
    fn test_graph_from_another_save_is_rejected() {
        let temp = TempDir::new().unwrap();
        let store = IndexStore::new(temp.path());
        let (graph, ids) = sample_graph();
        store.save(&graph, &ids).unwrap();
        let old_metadata = fs::read(store.metadata_path()).unwrap();

        let mut bigger = graph.clone();
        bigger.insert(&[9.0, 9.0, 9.0]);
        let mut more_ids = ids.clone();
        more_ids.push("item_8".to_string());
        store.save(&bigger, &more_ids).unwrap();
        fs::write(store.metadata_path(), old_metadata).unwrap();

        assert!(matches!(
            store.load(),
            LoadOutcome::Empty(EmptyReason::Corrupt(StoreError::Inconsistent(_)))
        ));
    }

    #[test]
    fn test_garbage_metadata_is_corrupt() {
        let temp = TempDir::new().unwrap();
        let store = IndexStore::new(temp.path());
        let (graph, ids) = sample_graph();
        store.save(&graph, &ids).unwrap();
        fs::write(store.metadata_path(), b"{not json").unwrap();

        assert!(matches!(
            store.load(),
            LoadOutcome::Empty(EmptyReason::Corrupt(StoreError::Metadata(_)))
        ));
    }
}
