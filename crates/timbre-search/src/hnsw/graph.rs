use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Links per node on layers above 0.
pub const DEFAULT_M: usize = 32;

/// Candidate list size while inserting ("construction breadth").
pub const DEFAULT_EF_CONSTRUCTION: usize = 40;

/// Candidate list size while searching; raised to `k` when `k` is larger.
pub const DEFAULT_EF_SEARCH: usize = 16;

/// Upper bound on the number of layers.
pub const DEFAULT_MAX_LAYERS: usize = 16;

/// Seed for layer assignment, so equal inputs build equal graphs.
pub const DEFAULT_SEED: u64 = 0x7469_6d62_7265_0001;

/// Tuning parameters for an [`Hnsw`] graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HnswConfig {
    pub m: usize,
    /// Links per node on layer 0, usually `2 * m`.
    pub m_max0: usize,
    pub ef_construction: usize,
    pub ef_search: usize,
    pub max_layers: usize,
    pub seed: u64,
}

impl Default for HnswConfig {
    fn default() -> Self {
        Self {
            m: DEFAULT_M,
            m_max0: DEFAULT_M * 2,
            ef_construction: DEFAULT_EF_CONSTRUCTION,
            ef_search: DEFAULT_EF_SEARCH,
            max_layers: DEFAULT_MAX_LAYERS,
            seed: DEFAULT_SEED,
        }
    }
}

/// An HNSW graph over vectors of one fixed dimension.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hnsw {
    pub(crate) config: HnswConfig,
    pub(crate) dimension: usize,
    /// All vectors, `dimension` floats per node, in internal id order.
    pub(crate) vectors: Vec<f32>,
    /// `neighbors[node][layer]` lists the node's links on that layer.
    pub(crate) neighbors: Vec<Vec<Vec<u32>>>,
    pub(crate) entry_point: Option<u32>,
    pub(crate) max_layer: usize,
}

impl Hnsw {
    #[must_use]
    pub fn new(dimension: usize, config: HnswConfig) -> Self {
        Self {
            config,
            dimension,
            vectors: Vec::new(),
            neighbors: Vec::new(),
            entry_point: None,
            max_layer: 0,
        }
    }

    #[must_use]
    pub const fn dimension(&self) -> usize {
        self.dimension
    }

    #[must_use]
    pub const fn config(&self) -> &HnswConfig {
        &self.config
    }

    /// Number of nodes in the graph.
    #[must_use]
    pub fn len(&self) -> usize {
        self.neighbors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.neighbors.is_empty()
    }

    /// The stored vector for an internal id.
    #[inline]
    #[must_use]
    pub fn vector(&self, id: u32) -> &[f32] {
        let start = id as usize * self.dimension;
        &self.vectors[start..start + self.dimension]
    }

    #[inline]
    pub(crate) fn max_links(&self, layer: usize) -> usize {
        if layer == 0 {
            self.config.m_max0
        } else {
            self.config.m
        }
    }

    /// Layer for a new node, drawn from an exponential distribution.
    ///
    /// The draw depends only on the seed and the node's id, so a reloaded
    /// graph keeps assigning the same layers an uninterrupted one would.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_precision_loss,
        clippy::cast_sign_loss
    )]
    pub(crate) fn random_level(&self, id: u32) -> usize {
        let ml = 1.0 / (self.config.m.max(2) as f64).ln();
        let mut rng = StdRng::seed_from_u64(
            self.config.seed ^ u64::from(id).wrapping_mul(0x9E37_79B9_7F4A_7C15),
        );
        // gen() yields [0, 1); flip it so ln() never sees zero.
        let r: f64 = 1.0 - rng.gen::<f64>();
        let level = (-r.ln() * ml).floor() as usize;
        level.min(self.config.max_layers.saturating_sub(1))
    }

    /// Check the structural invariants of a graph read from disk.
    pub fn validate(&self) -> Result<(), String> {
        let n = self.len();
        if self.dimension == 0 {
            return Err("graph dimension is zero".to_string());
        }
        if self.vectors.len() != n * self.dimension {
            return Err(format!(
                "vector arena holds {} floats, expected {} nodes x {} dimensions",
                self.vectors.len(),
                n,
                self.dimension
            ));
        }
        match self.entry_point {
            None if n > 0 => return Err("non-empty graph has no entry point".to_string()),
            Some(ep) if ep as usize >= n => {
                return Err(format!("entry point {ep} is outside {n} nodes"));
            }
            _ => {}
        }
        for (node, layers) in self.neighbors.iter().enumerate() {
            if layers.is_empty() {
                return Err(format!("node {node} has no layers"));
            }
            if let Some(bad) = layers.iter().flatten().find(|&&id| id as usize >= n) {
                return Err(format!("node {node} links to unknown node {bad}"));
            }
        }
        Ok(())
    }
}
