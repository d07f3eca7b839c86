use anyhow::{Context, Result};
use std::path::PathBuf;
use timbre_core::{decode_vector, AnalysisDepth};
use timbre_service::{AnalyzeTrackRequest, TimbreService};

pub async fn run_analyze(
    service: &TimbreService,
    path: PathBuf,
    depth: Option<AnalysisDepth>,
    descriptors: Vec<String>,
    json: bool,
) -> Result<()> {
    let response = service
        .analyze_track(AnalyzeTrackRequest {
            path: path.clone(),
            depth,
            descriptors,
        })
        .await
        .with_context(|| format!("Failed to analyse {}", path.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    println!("\n🎵 {}\n", path.display());
    println!("  Descriptors:");
    for (name, value) in &response.descriptors {
        println!("    {name:<20} {value}");
    }

    let vector = decode_vector(&response.feature_vector)?;
    println!("\n  Feature vector:");
    for (name, component) in timbre_core::FEATURE_ORDER.iter().zip(&vector) {
        println!("    {name:<20} {component:.4}");
    }

    Ok(())
}
