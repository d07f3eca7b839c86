use std::collections::HashSet;

use super::distance::squared_l2;
use super::graph::Hnsw;
use super::search::search_layer;
use super::visited::VisitedSet;

impl Hnsw {
    /// Insert a vector and return its internal id.
    ///
    /// The caller guarantees `vector.len() == self.dimension()`; the index
    /// layer validates this before any mutation.
    #[allow(clippy::cast_possible_truncation)]
    pub fn insert(&mut self, vector: &[f32]) -> u32 {
        debug_assert_eq!(vector.len(), self.dimension);

        let id = self.len() as u32;
        let level = self.random_level(id);

        let Some(entry_point) = self.entry_point else {
            self.vectors.extend_from_slice(vector);
            self.neighbors.push(vec![Vec::new(); level + 1]);
            self.entry_point = Some(id);
            self.max_layer = level;
            return id;
        };

        let mut visited = VisitedSet::new(self.len() + 1);
        let mut current = entry_point;

        // Greedy descent through the layers above the new node's level.
        for layer in (level + 1..=self.max_layer).rev() {
            let nearest = search_layer(
                self,
                vector,
                std::slice::from_ref(&current),
                1,
                layer,
                &mut visited,
            );
            if let Some(&(_, nearest_id)) = nearest.first() {
                current = nearest_id;
            }
        }

        // Collect the new node's links on every layer it shares with the graph.
        let top = level.min(self.max_layer);
        let mut links: Vec<Vec<u32>> = vec![Vec::new(); level + 1];
        let mut layer_entries = vec![current];
        for layer in (0..=top).rev() {
            let candidates = search_layer(
                self,
                vector,
                &layer_entries,
                self.config.ef_construction,
                layer,
                &mut visited,
            );
            let selected = select_neighbors(self, &candidates, self.max_links(layer));
            links[layer] = selected.iter().map(|&(_, n)| n).collect();

            layer_entries.clear();
            layer_entries.extend(candidates.iter().map(|&(_, n)| n));
            if layer_entries.is_empty() {
                layer_entries.push(entry_point);
            }
        }

        self.vectors.extend_from_slice(vector);
        self.neighbors.push(links);

        // Back-links, pruning any neighbor that goes over capacity.
        for layer in 0..=top {
            let max_links = self.max_links(layer);
            let own: Vec<u32> = self.neighbors[id as usize][layer].clone();
            for neighbor in own {
                let n = neighbor as usize;
                while self.neighbors[n].len() <= layer {
                    self.neighbors[n].push(Vec::new());
                }
                self.neighbors[n][layer].push(id);

                if self.neighbors[n][layer].len() > max_links {
                    let base = self.vector(neighbor);
                    let candidates: Vec<(f32, u32)> = self.neighbors[n][layer]
                        .iter()
                        .map(|&c| (squared_l2(base, self.vector(c)), c))
                        .collect();
                    let kept = select_neighbors(self, &candidates, max_links);
                    self.neighbors[n][layer] = kept.iter().map(|&(_, c)| c).collect();
                }
            }
        }

        if level > self.max_layer {
            self.max_layer = level;
            self.entry_point = Some(id);
        }

        id
    }
}

/// Pick up to `m` links from `candidates`, preferring spread-out neighbors.
///
/// A candidate is taken when it is at least as close to the base node as to
/// every neighbor already taken. Leftover slots are filled with the closest
/// remaining candidates.
fn select_neighbors(graph: &Hnsw, candidates: &[(f32, u32)], m: usize) -> Vec<(f32, u32)> {
    let mut sorted = candidates.to_vec();
    sorted.sort_unstable_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

    let mut selected: Vec<(f32, u32)> = Vec::with_capacity(m);
    for &(to_base, candidate) in &sorted {
        if selected.len() >= m {
            break;
        }
        let spread = selected.iter().all(|&(_, chosen)| {
            to_base <= squared_l2(graph.vector(candidate), graph.vector(chosen))
        });
        if spread {
            selected.push((to_base, candidate));
        }
    }

    if selected.len() < m {
        let taken: HashSet<u32> = selected.iter().map(|&(_, id)| id).collect();
        for &(distance, candidate) in &sorted {
            if selected.len() >= m {
                break;
            }
            if !taken.contains(&candidate) {
                selected.push((distance, candidate));
            }
        }
    }

    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hnsw::graph::HnswConfig;
    use crate::hnsw::search::knn_search;

    fn grid(n: usize) -> Vec<[f32; 2]> {
        (0..n)
            .map(|i| [(i % 10) as f32, (i / 10) as f32])
            .collect()
    }

    #[test]
    fn test_first_insert_becomes_entry_point() {
        let mut graph = Hnsw::new(2, HnswConfig::default());
        assert_eq!(graph.insert(&[0.5, 0.5]), 0);
        assert_eq!(graph.entry_point, Some(0));
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn test_ids_follow_insertion_order() {
        let mut graph = Hnsw::new(2, HnswConfig::default());
        let ids: Vec<u32> = grid(5).iter().map(|v| graph.insert(v)).collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
        assert_eq!(graph.vector(3), &[3.0, 0.0]);
    }

    #[test]
    fn test_graph_stays_valid_and_bounded() {
        let config = HnswConfig {
            m: 4,
            m_max0: 8,
            ..HnswConfig::default()
        };
        let mut graph = Hnsw::new(2, config);
        for v in grid(100) {
            graph.insert(&v);
        }
        assert!(graph.validate().is_ok());
        for layers in &graph.neighbors {
            for (layer, links) in layers.iter().enumerate() {
                assert!(links.len() <= graph.max_links(layer));
            }
        }
    }

    #[test]
    fn test_every_point_finds_itself() {
        let mut graph = Hnsw::new(2, HnswConfig::default());
        let points = grid(100);
        for v in &points {
            graph.insert(v);
        }
        for (i, v) in points.iter().enumerate() {
            let hits = knn_search(&graph, v, 1);
            assert_eq!(hits.first().map(|&(_, id)| id as usize), Some(i));
            assert_eq!(hits[0].0, 0.0);
        }
    }

    #[test]
    fn test_select_neighbors_fills_to_m() {
        let mut graph = Hnsw::new(1, HnswConfig::default());
        for i in 0..6 {
            graph.insert(&[i as f32]);
        }
        let candidates: Vec<(f32, u32)> = (1..6).map(|i| ((i * i) as f32, i)).collect();
        let picked = select_neighbors(&graph, &candidates, 3);
        assert_eq!(picked.len(), 3);
        assert_eq!(picked[0].1, 1);
    }
}
