use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::path::PathBuf;
use timbre_service::{AnalyzeTrackRequest, FindSimilarRequest, TimbreService};

pub async fn run_similar(
    service: &TimbreService,
    track: Option<PathBuf>,
    vector: Option<String>,
    k: usize,
) -> Result<()> {
    let (label, query) = match (track, vector) {
        (Some(path), _) => {
            let response = service
                .analyze_track(AnalyzeTrackRequest {
                    path: path.clone(),
                    depth: None,
                    descriptors: Vec::new(),
                })
                .await
                .with_context(|| format!("Failed to analyse {}", path.display()))?;
            (path.display().to_string(), response.feature_vector)
        }
        (None, Some(encoded)) => {
            let bytes = STANDARD
                .decode(encoded.trim())
                .context("Query vector is not valid base64")?;
            ("query vector".to_string(), bytes)
        }
        (None, None) => anyhow::bail!("Pass either --track or --vector"),
    };

    let response = service
        .find_similar(FindSimilarRequest { query, k })
        .await
        .context("Similarity search failed")?;

    println!("\n🔎 Nearest to {}\n", label);
    if response.matches.is_empty() {
        println!("  No matches");
        return Ok(());
    }
    for (rank, m) in response.matches.iter().enumerate() {
        println!(
            "  {:>3}. {:<50} similarity {:.4}  distance {:.4}",
            rank + 1,
            m.item_id,
            m.similarity,
            m.distance
        );
    }
    Ok(())
}
