use anyhow::Result;
use std::path::Path;
use timbre_analysis::discover_audio_files;
use timbre_core::AnalysisDepth;
use timbre_service::{AnalyzeBatchRequest, TimbreService};

pub async fn run_batch(
    service: &TimbreService,
    dir: &Path,
    depth: Option<AnalysisDepth>,
    descriptors: Vec<String>,
) -> Result<()> {
    if !dir.is_dir() {
        anyhow::bail!("Not a directory: {}", dir.display());
    }

    let paths = discover_audio_files(dir);
    if paths.is_empty() {
        println!("No audio files found under {}", dir.display());
        return Ok(());
    }
    println!("Analysing {} files...\n", paths.len());

    let mut progress = service.analyze_batch(AnalyzeBatchRequest {
        paths,
        depth,
        descriptors,
    });

    let mut last = None;
    while let Some(update) = progress.recv().await {
        let done = update.completed + update.errors;
        match &update.error {
            None => println!(
                "  ✓ [{}/{}] {:5.1}% {}",
                done, update.total, update.percent_complete, update.current_file
            ),
            Some(error) => eprintln!(
                "  ✗ [{}/{}] {:5.1}% {}: {}",
                done, update.total, update.percent_complete, update.current_file, error
            ),
        }
        last = Some(update);
    }

    if let Some(last) = last {
        if last.completed + last.errors < last.total {
            println!("\n⚠ Batch stopped early");
        } else {
            println!("\n✓ Batch complete");
        }
        println!("  Analysed: {}", last.completed);
        println!("  Failed:   {}", last.errors);
    }
    Ok(())
}
