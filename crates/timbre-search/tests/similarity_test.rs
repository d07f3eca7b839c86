//! Integration tests for the similarity index lifecycle

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tempfile::TempDir;
use timbre_core::{build_vector, DescriptorSet, FEATURE_DIM};
use timbre_search::{IndexError, IndexStore, LoadOutcome, SimilarityIndex};

fn random_vectors(count: usize, dim: usize, seed: u64) -> Vec<Vec<f32>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| (0..dim).map(|_| rng.gen::<f32>()).collect())
        .collect()
}

fn ids(prefix: &str, range: std::ops::Range<usize>) -> Vec<String> {
    range.map(|i| format!("{prefix}_{i}")).collect()
}

#[test]
fn test_exact_match_ranks_first() {
    let temp = TempDir::new().unwrap();
    let index = SimilarityIndex::open(temp.path());
    let vectors = random_vectors(10, FEATURE_DIM, 1);
    let item_ids = ids("item", 0..10);

    assert_eq!(index.build(&vectors, &item_ids).unwrap(), 10);

    let results = index.search(&vectors[0], 5).unwrap();
    assert_eq!(results.len(), 5);
    assert_eq!(results[0].item_id, "item_0");
    assert_eq!(results[0].distance, 0.0);
    assert_eq!(results[0].similarity, 1.0);
    assert!(results.windows(2).all(|w| w[0].distance <= w[1].distance));
}

#[test]
fn test_build_then_add_keeps_alignment() {
    let temp = TempDir::new().unwrap();
    let index = SimilarityIndex::open(temp.path());
    let first = random_vectors(50, FEATURE_DIM, 2);
    let second = random_vectors(50, FEATURE_DIM, 3);

    index.build(&first, &ids("a", 0..50)).unwrap();
    assert_eq!(index.add_items(&second, &ids("b", 0..50)).unwrap(), 100);
    assert_eq!(index.len(), 100);

    let expected: Vec<String> = ids("a", 0..50).into_iter().chain(ids("b", 0..50)).collect();
    assert_eq!(index.item_ids(), expected);

    for (vector, id) in first.iter().chain(&second).zip(&expected) {
        let results = index.search(vector, 5).unwrap();
        let own = results
            .iter()
            .find(|m| &m.item_id == id)
            .unwrap_or_else(|| panic!("{id} missing from its own neighbors"));
        assert!(own.distance < 1e-6);
    }
}

#[test]
fn test_mismatched_counts_leave_index_unchanged() {
    let temp = TempDir::new().unwrap();
    let index = SimilarityIndex::open(temp.path());
    let vectors = random_vectors(4, 8, 4);
    index.build(&vectors, &ids("item", 0..4)).unwrap();

    let more = random_vectors(3, 8, 5);
    let result = index.build(&more, &ids("other", 0..2));
    assert!(matches!(result, Err(IndexError::Validation(_))));
    assert_eq!(index.len(), 4);
    assert_eq!(index.item_ids(), ids("item", 0..4));
}

#[test]
fn test_add_wrong_dimension_is_rejected() {
    let temp = TempDir::new().unwrap();
    let index = SimilarityIndex::open(temp.path());
    index
        .build(&random_vectors(5, 16, 6), &ids("item", 0..5))
        .unwrap();

    let result = index.add_items(&random_vectors(1, 8, 7), &["odd"]);
    assert!(matches!(
        result,
        Err(IndexError::DimensionMismatch {
            expected: 16,
            actual: 8
        })
    ));
    assert_eq!(index.len(), 5);
}

#[test]
fn test_search_before_build_fails() {
    let temp = TempDir::new().unwrap();
    let index = SimilarityIndex::open(temp.path());
    assert!(matches!(
        index.search(&[0.0; FEATURE_DIM], 3),
        Err(IndexError::NotBuilt)
    ));
}

#[test]
fn test_search_wrong_dimension_fails() {
    let temp = TempDir::new().unwrap();
    let index = SimilarityIndex::open(temp.path());
    index
        .build(&random_vectors(3, 4, 8), &ids("item", 0..3))
        .unwrap();
    assert!(matches!(
        index.search(&[0.0; 5], 3),
        Err(IndexError::DimensionMismatch { .. })
    ));
}

#[test]
fn test_add_on_fresh_index_builds_it() {
    let temp = TempDir::new().unwrap();
    let index = SimilarityIndex::open(temp.path());
    let vectors = random_vectors(6, 4, 9);
    assert_eq!(index.add_items(&vectors, &ids("item", 0..6)).unwrap(), 6);
    assert!(index.is_built());
    assert_eq!(index.dimension(), Some(4));
}

#[test]
fn test_reload_gives_same_results() {
    let temp = TempDir::new().unwrap();
    let vectors = random_vectors(40, FEATURE_DIM, 10);
    let query = random_vectors(1, FEATURE_DIM, 11).remove(0);

    let before = {
        let index = SimilarityIndex::open(temp.path());
        index.build(&vectors[..30], &ids("item", 0..30)).unwrap();
        index.add_items(&vectors[30..], &ids("item", 30..40)).unwrap();
        assert!(!index.is_dirty());
        index.search(&query, 7).unwrap()
    };

    let reopened = SimilarityIndex::open(temp.path());
    assert_eq!(reopened.item_ids(), ids("item", 0..40));
    assert_eq!(reopened.dimension(), Some(FEATURE_DIM));
    assert_eq!(reopened.search(&query, 7).unwrap(), before);
}

#[test]
fn test_corrupt_artifacts_open_empty() {
    let temp = TempDir::new().unwrap();
    {
        let index = SimilarityIndex::open(temp.path());
        index
            .build(&random_vectors(5, 4, 12), &ids("item", 0..5))
            .unwrap();
    }
    let store = IndexStore::new(temp.path());
    std::fs::write(store.graph_path(), b"definitely not a graph").unwrap();

    assert!(matches!(store.load(), LoadOutcome::Empty(_)));
    let index = SimilarityIndex::open(temp.path());
    assert!(!index.is_built());
    assert!(matches!(
        index.search(&[0.0; 4], 1),
        Err(IndexError::NotBuilt)
    ));
}

#[test]
fn test_half_present_artifacts_open_empty() {
    let temp = TempDir::new().unwrap();
    {
        let index = SimilarityIndex::open(temp.path());
        index
            .build(&random_vectors(5, 4, 13), &ids("item", 0..5))
            .unwrap();
    }
    let store = IndexStore::new(temp.path());
    std::fs::remove_file(store.metadata_path()).unwrap();

    let index = SimilarityIndex::open(temp.path());
    assert!(!index.is_built());
    assert_eq!(index.len(), 0);
}

#[test]
fn test_feature_vectors_index_directly() {
    let temp = TempDir::new().unwrap();
    let index = SimilarityIndex::open(temp.path());

    let vectors: Vec<_> = [90.0, 120.0, 150.0, 180.0]
        .iter()
        .map(|&tempo| {
            build_vector(
                &DescriptorSet::new()
                    .with("tempo", tempo)
                    .with("energy", 0.5)
                    .with("key", "C#"),
            )
        })
        .collect();
    index.build(&vectors, &["slow", "mid", "brisk", "fast"]).unwrap();

    let results = index.search(vectors[1].as_slice(), 2).unwrap();
    assert_eq!(results[0].item_id, "mid");
}

#[test]
fn test_concurrent_searches_during_adds() {
    let temp = TempDir::new().unwrap();
    let index = Arc::new(SimilarityIndex::open(temp.path()));
    let seed_vectors = random_vectors(20, FEATURE_DIM, 14);
    index.build(&seed_vectors, &ids("seed", 0..20)).unwrap();

    let all_ids: Arc<HashSet<String>> = Arc::new(
        ids("seed", 0..20)
            .into_iter()
            .chain((0..5).flat_map(|batch| ids(&format!("batch{batch}"), 0..10)))
            .collect(),
    );

    let readers: Vec<_> = (0..4)
        .map(|r| {
            let index = Arc::clone(&index);
            let all_ids = Arc::clone(&all_ids);
            let query = seed_vectors[r].clone();
            thread::spawn(move || {
                for _ in 0..50 {
                    let results = index.search(&query, 10).unwrap();
                    assert_eq!(results.len(), 10);
                    let distinct: HashSet<&str> =
                        results.iter().map(|m| m.item_id.as_str()).collect();
                    assert_eq!(distinct.len(), results.len());
                    assert!(results.iter().all(|m| all_ids.contains(&m.item_id)));
                    assert!(results.windows(2).all(|w| w[0].distance <= w[1].distance));
                }
            })
        })
        .collect();

    for batch in 0..5 {
        let vectors = random_vectors(10, FEATURE_DIM, 100 + batch as u64);
        index
            .add_items(&vectors, &ids(&format!("batch{batch}"), 0..10))
            .unwrap();
    }

    for reader in readers {
        reader.join().unwrap();
    }
    assert_eq!(index.len(), 70);
}

#[test]
fn test_persist_rewrites_artifacts() {
    let temp = TempDir::new().unwrap();
    let index = SimilarityIndex::open(temp.path());
    index
        .build(&random_vectors(8, 4, 15), &ids("item", 0..8))
        .unwrap();

    let store = IndexStore::new(temp.path());
    std::fs::remove_file(store.graph_path()).unwrap();
    assert!(matches!(store.load(), LoadOutcome::Empty(_)));

    index.persist().unwrap();
    assert!(!index.is_dirty());
    let reloaded = store.load().into_loaded().unwrap();
    assert_eq!(reloaded.item_ids, ids("item", 0..8));
}

#[test]
fn test_concurrent_persists_are_serialized() {
    let temp = TempDir::new().unwrap();
    let index = Arc::new(SimilarityIndex::open(temp.path()));
    index
        .build(&random_vectors(500, FEATURE_DIM, 16), &ids("item", 0..500))
        .unwrap();

    let writers: Vec<_> = (0..8)
        .map(|_| {
            let index = Arc::clone(&index);
            thread::spawn(move || (0..20).filter(|_| index.persist().is_err()).count())
        })
        .collect();
    let failures: usize = writers.into_iter().map(|w| w.join().unwrap()).sum();

    assert_eq!(failures, 0);
    assert!(!index.is_dirty());
    let reopened = SimilarityIndex::open(temp.path());
    assert_eq!(reopened.len(), 500);
}

#[test]
fn test_concurrent_adds_stay_aligned() {
    let temp = TempDir::new().unwrap();
    let index = Arc::new(SimilarityIndex::open(temp.path()));
    index
        .build(&random_vectors(10, FEATURE_DIM, 17), &ids("seed", 0..10))
        .unwrap();

    let adders: Vec<_> = ["left", "right"]
        .into_iter()
        .enumerate()
        .map(|(n, prefix)| {
            let index = Arc::clone(&index);
            thread::spawn(move || {
                let vectors = random_vectors(40, FEATURE_DIM, 200 + n as u64);
                for (chunk, start) in vectors.chunks(10).zip((0..40).step_by(10)) {
                    index
                        .add_items(chunk, &ids(prefix, start..start + 10))
                        .unwrap();
                }
                vectors
            })
        })
        .collect();
    let added: Vec<Vec<Vec<f32>>> = adders.into_iter().map(|a| a.join().unwrap()).collect();

    assert_eq!(index.len(), 90);
    assert!(!index.is_dirty());
    for (prefix, vectors) in ["left", "right"].iter().zip(&added) {
        for (i, vector) in vectors.iter().enumerate() {
            let id = format!("{prefix}_{i}");
            let results = index.search(vector, 3).unwrap();
            assert!(
                results.iter().any(|m| m.item_id == id && m.distance < 1e-6),
                "{id} not found at its own vector"
            );
        }
    }

    let reopened = SimilarityIndex::open(temp.path());
    assert_eq!(reopened.item_ids(), index.item_ids());
}
