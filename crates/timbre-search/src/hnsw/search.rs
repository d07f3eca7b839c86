use std::cmp::Ordering;
use std::collections::BinaryHeap;

use super::distance::squared_l2;
use super::graph::Hnsw;
use super::visited::VisitedSet;

/// Frontier entry, popped nearest first.
#[derive(Debug, Clone, Copy)]
struct Nearest {
    distance: f32,
    id: u32,
}

impl PartialEq for Nearest {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Nearest {}

impl Ord for Nearest {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so BinaryHeap (a max-heap) yields the smallest distance.
        other
            .distance
            .total_cmp(&self.distance)
            .then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for Nearest {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Result entry, popped farthest first so the worst can be evicted.
#[derive(Debug, Clone, Copy)]
struct Farthest {
    distance: f32,
    id: u32,
}

impl PartialEq for Farthest {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Farthest {}

impl Ord for Farthest {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl PartialOrd for Farthest {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Beam search on one layer.
///
/// Returns up to `ef` `(distance, id)` pairs sorted by ascending distance.
pub(crate) fn search_layer(
    graph: &Hnsw,
    query: &[f32],
    entry_points: &[u32],
    ef: usize,
    layer: usize,
    visited: &mut VisitedSet,
) -> Vec<(f32, u32)> {
    visited.clear();
    let mut frontier: BinaryHeap<Nearest> = BinaryHeap::with_capacity(ef * 2);
    let mut results: BinaryHeap<Farthest> = BinaryHeap::with_capacity(ef + 1);

    for &ep in entry_points {
        if visited.insert(ep) {
            let distance = squared_l2(query, graph.vector(ep));
            frontier.push(Nearest { distance, id: ep });
            results.push(Farthest { distance, id: ep });
            if results.len() > ef {
                results.pop();
            }
        }
    }

    while let Some(current) = frontier.pop() {
        let worst = results.peek().map_or(f32::MAX, |r| r.distance);
        if results.len() >= ef && current.distance > worst {
            break;
        }

        let Some(links) = graph.neighbors[current.id as usize].get(layer) else {
            continue;
        };

        for &neighbor in links {
            if !visited.insert(neighbor) {
                continue;
            }

            let distance = squared_l2(query, graph.vector(neighbor));
            let worst = results.peek().map_or(f32::MAX, |r| r.distance);
            if results.len() < ef || distance < worst {
                frontier.push(Nearest {
                    distance,
                    id: neighbor,
                });
                results.push(Farthest {
                    distance,
                    id: neighbor,
                });
                if results.len() > ef {
                    results.pop();
                }
            }
        }
    }

    results
        .into_sorted_vec()
        .into_iter()
        .map(|r| (r.distance, r.id))
        .collect()
}

/// Approximate k nearest neighbors of `query`.
///
/// Greedy descent through the upper layers, then a beam search of width
/// `max(ef_search, k)` on layer 0. Results are `(distance, id)` pairs in
/// ascending distance order; fewer than `k` come back when the graph is
/// smaller than `k`.
pub fn knn_search(graph: &Hnsw, query: &[f32], k: usize) -> Vec<(f32, u32)> {
    let Some(entry_point) = graph.entry_point else {
        return Vec::new();
    };
    if k == 0 {
        return Vec::new();
    }

    let mut visited = VisitedSet::new(graph.len());
    let mut current = entry_point;

    for layer in (1..=graph.max_layer).rev() {
        let nearest = search_layer(
            graph,
            query,
            std::slice::from_ref(&current),
            1,
            layer,
            &mut visited,
        );
        if let Some(&(_, id)) = nearest.first() {
            current = id;
        }
    }

    let ef = graph.config.ef_search.max(k);
    let mut results = search_layer(
        graph,
        query,
        std::slice::from_ref(&current),
        ef,
        0,
        &mut visited,
    );
    results.truncate(k);
    results
}
