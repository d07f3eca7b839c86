//! The shared similarity index.
//!
//! [`SimilarityIndex`] owns the HNSW graph, the item ids aligned with the
//! graph's internal ids, and the store it persists to. All state sits behind
//! one reader-writer lock: mutations hold the write lock while they change the
//! graph and downgrade to a read lock for the persistence write, so searches
//! resume as soon as the in-memory change is complete. Artifact writes are
//! serialized by a separate gate, since several holders of the read lock may
//! want to write at once.

use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, RwLock, RwLockWriteGuard};
use serde::{Deserialize, Serialize};

use crate::error::{IndexError, IndexResult};
use crate::hnsw::{knn_search, Hnsw, HnswConfig};
use crate::store::{IndexStore, LoadOutcome};

/// One ranked search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchMatch {
    pub item_id: String,
    /// Squared Euclidean distance to the query.
    pub distance: f32,
    /// `1 / (1 + distance)`, so an exact match scores `1.0`.
    pub similarity: f32,
}

impl SearchMatch {
    fn new(item_id: String, distance: f32) -> Self {
        Self {
            item_id,
            distance,
            similarity: 1.0 / (1.0 + distance),
        }
    }
}

/// Snapshot of the index lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStatus {
    pub built: bool,
    pub dimension: Option<usize>,
    pub item_count: usize,
}

#[derive(Debug, Default)]
struct IndexState {
    graph: Option<Hnsw>,
    item_ids: Vec<String>,
    known_ids: HashSet<String>,
}

impl IndexState {
    fn dimension(&self) -> Option<usize> {
        self.graph.as_ref().map(Hnsw::dimension)
    }
}

/// HNSW similarity index with synchronous persistence after each mutation.
#[derive(Debug)]
pub struct SimilarityIndex {
    store: IndexStore,
    config: HnswConfig,
    state: RwLock<IndexState>,
    write_gate: Mutex<()>,
    dirty: AtomicBool,
}

impl SimilarityIndex {
    /// Open the index stored under `root`, starting empty when nothing usable
    /// is there.
    pub fn open(root: impl AsRef<Path>) -> Self {
        Self::with_config(root, HnswConfig::default())
    }

    /// Like [`open`](Self::open), building new graphs with `config`.
    ///
    /// A graph loaded from disk keeps the parameters it was built with;
    /// `config` applies from the next [`build`](Self::build) onwards.
    pub fn with_config(root: impl AsRef<Path>, config: HnswConfig) -> Self {
        let store = IndexStore::new(root.as_ref());
        let state = match store.load() {
            LoadOutcome::Loaded(persisted) => IndexState {
                known_ids: persisted.item_ids.iter().cloned().collect(),
                graph: Some(persisted.graph),
                item_ids: persisted.item_ids,
            },
            LoadOutcome::Empty(_) => IndexState::default(),
        };

        Self {
            store,
            config,
            state: RwLock::new(state),
            write_gate: Mutex::new(()),
            dirty: AtomicBool::new(false),
        }
    }

    /// Replace the whole index with `vectors`, keyed by `ids`.
    ///
    /// Returns the number of items indexed. Validation failures leave the
    /// previous index untouched.
    pub fn build<V, S>(&self, vectors: &[V], ids: &[S]) -> IndexResult<usize>
    where
        V: AsRef<[f32]>,
        S: AsRef<str>,
    {
        let mut state = self.state.write();
        let count = self.rebuild(&mut state, vectors, ids)?;
        self.persist_downgraded(state)?;
        Ok(count)
    }

    /// Append items to a built index, or build it when there is none yet.
    ///
    /// Returns the total number of items in the index afterwards. An empty
    /// batch on a built index changes nothing and writes nothing.
    pub fn add_items<V, S>(&self, vectors: &[V], ids: &[S]) -> IndexResult<usize>
    where
        V: AsRef<[f32]>,
        S: AsRef<str>,
    {
        let mut state = self.state.write();

        let Some(dimension) = state.dimension() else {
            log::info!("Index not built yet; treating add as initial build");
            let count = self.rebuild(&mut state, vectors, ids)?;
            self.persist_downgraded(state)?;
            return Ok(count);
        };

        check_lengths(vectors.len(), ids.len())?;
        if vectors.is_empty() {
            return Ok(state.item_ids.len());
        }
        for vector in vectors {
            let vector = vector.as_ref();
            if vector.len() != dimension {
                return Err(IndexError::DimensionMismatch {
                    expected: dimension,
                    actual: vector.len(),
                });
            }
            check_finite(vector)?;
        }
        let fresh = check_unique(ids)?;
        if let Some(taken) = fresh.iter().find(|id| state.known_ids.contains(**id)) {
            return Err(IndexError::Validation(format!(
                "item id '{taken}' is already indexed"
            )));
        }

        let state_ref = &mut *state;
        if let Some(graph) = state_ref.graph.as_mut() {
            for (vector, id) in vectors.iter().zip(ids) {
                graph.insert(vector.as_ref());
                state_ref.item_ids.push(id.as_ref().to_string());
                state_ref.known_ids.insert(id.as_ref().to_string());
            }
        }
        let total = state.item_ids.len();
        log::info!(
            "Added {} items to index (now {} items, dimension {})",
            vectors.len(),
            total,
            dimension
        );

        self.persist_downgraded(state)?;
        Ok(total)
    }

    /// Up to `k` nearest items to `query`, nearest first.
    pub fn search(&self, query: &[f32], k: usize) -> IndexResult<Vec<SearchMatch>> {
        let state = self.state.read();
        let graph = state.graph.as_ref().ok_or(IndexError::NotBuilt)?;

        if query.len() != graph.dimension() {
            return Err(IndexError::DimensionMismatch {
                expected: graph.dimension(),
                actual: query.len(),
            });
        }
        check_finite(query)?;
        if k == 0 {
            return Ok(Vec::new());
        }

        let matches = knn_search(graph, query, k)
            .into_iter()
            .filter_map(|(distance, internal)| {
                state
                    .item_ids
                    .get(internal as usize)
                    .map(|id| SearchMatch::new(id.clone(), distance))
            })
            .collect();
        Ok(matches)
    }

    /// Rewrite both artifacts from the current in-memory index.
    ///
    /// Clears the dirty flag left by an earlier failed write.
    pub fn persist(&self) -> IndexResult<()> {
        let state = self.state.read();
        self.write_artifacts(&state)
    }

    /// True when the last persistence attempt failed.
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    pub fn is_built(&self) -> bool {
        self.state.read().graph.is_some()
    }

    pub fn len(&self) -> usize {
        self.state.read().item_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dimension(&self) -> Option<usize> {
        self.state.read().dimension()
    }

    /// Item ids in insertion order.
    pub fn item_ids(&self) -> Vec<String> {
        self.state.read().item_ids.clone()
    }

    pub fn status(&self) -> IndexStatus {
        let state = self.state.read();
        IndexStatus {
            built: state.graph.is_some(),
            dimension: state.dimension(),
            item_count: state.item_ids.len(),
        }
    }

    pub fn root(&self) -> &Path {
        self.store.root()
    }

    /// Validate, then swap in a freshly built graph.
    fn rebuild<V, S>(&self, state: &mut IndexState, vectors: &[V], ids: &[S]) -> IndexResult<usize>
    where
        V: AsRef<[f32]>,
        S: AsRef<str>,
    {
        check_lengths(vectors.len(), ids.len())?;
        let Some(first) = vectors.first() else {
            return Err(IndexError::Validation(
                "cannot build an index from zero vectors".to_string(),
            ));
        };
        let dimension = first.as_ref().len();
        if dimension == 0 {
            return Err(IndexError::Validation(
                "vectors must have at least one component".to_string(),
            ));
        }
        for (position, vector) in vectors.iter().enumerate() {
            let vector = vector.as_ref();
            if vector.len() != dimension {
                return Err(IndexError::Validation(format!(
                    "vector {position} has {} components, expected {dimension}",
                    vector.len()
                )));
            }
            check_finite(vector)?;
        }
        check_unique(ids)?;

        let mut graph = Hnsw::new(dimension, self.config.clone());
        for vector in vectors {
            graph.insert(vector.as_ref());
        }
        let item_ids: Vec<String> = ids.iter().map(|id| id.as_ref().to_string()).collect();

        *state = IndexState {
            known_ids: item_ids.iter().cloned().collect(),
            graph: Some(graph),
            item_ids,
        };

        log::info!(
            "Built index with {} items, dimension {}",
            vectors.len(),
            dimension
        );
        Ok(vectors.len())
    }

    fn persist_downgraded(&self, state: RwLockWriteGuard<'_, IndexState>) -> IndexResult<()> {
        let state = RwLockWriteGuard::downgrade(state);
        self.write_artifacts(&state)
    }

    fn write_artifacts(&self, state: &IndexState) -> IndexResult<()> {
        let Some(graph) = state.graph.as_ref() else {
            return Ok(());
        };
        let _gate = self.write_gate.lock();
        match self.store.save(graph, &state.item_ids) {
            Ok(_) => {
                self.dirty.store(false, Ordering::Release);
                Ok(())
            }
            Err(e) => {
                self.dirty.store(true, Ordering::Release);
                log::error!(
                    "Failed to persist index to {}: {}",
                    self.store.root().display(),
                    e
                );
                Err(e.into())
            }
        }
    }
}

fn check_lengths(vectors: usize, ids: usize) -> IndexResult<()> {
    if vectors == ids {
        Ok(())
    } else {
        Err(IndexError::Validation(format!(
            "{vectors} vectors but {ids} item ids"
        )))
    }
}

fn check_finite(vector: &[f32]) -> IndexResult<()> {
    match vector.iter().position(|x| !x.is_finite()) {
        Some(position) => Err(IndexError::Validation(format!(
            "component {position} is not a finite number"
        ))),
        None => Ok(()),
    }
}

fn check_unique<S: AsRef<str>>(ids: &[S]) -> IndexResult<HashSet<&str>> {
    let mut seen = HashSet::with_capacity(ids.len());
    for id in ids {
        let id = id.as_ref();
        if !seen.insert(id) {
            return Err(IndexError::Validation(format!(
                "item id '{id}' appears more than once"
            )));
        }
    }
    Ok(seen)
}
