use anyhow::Result;
use std::path::Path;
use timbre_analysis::discover_audio_files;
use timbre_core::AnalysisDepth;
use timbre_service::{AnalyzeTrackRequest, IndexItem, IndexItemsRequest, TimbreService};

pub async fn run_index(
    service: &TimbreService,
    dir: &Path,
    depth: Option<AnalysisDepth>,
    rebuild: bool,
) -> Result<()> {
    if !dir.is_dir() {
        anyhow::bail!("Not a directory: {}", dir.display());
    }

    let paths = discover_audio_files(dir);
    if paths.is_empty() {
        println!("No audio files found under {}", dir.display());
        return Ok(());
    }

    let known: std::collections::HashSet<String> = if rebuild {
        std::collections::HashSet::new()
    } else {
        service.index().item_ids().into_iter().collect()
    };

    let total = paths.len();
    let mut items = Vec::new();
    let mut skipped = 0;
    let mut failed = 0;

    for (idx, path) in paths.into_iter().enumerate() {
        let id = path.display().to_string();
        let progress = format!("[{}/{}]", idx + 1, total);
        if known.contains(&id) {
            log::debug!("{} Already indexed: {}", progress, id);
            skipped += 1;
            continue;
        }

        print!("\r{} Analysing: {}", progress, id);
        std::io::Write::flush(&mut std::io::stdout())?;

        match service
            .analyze_track(AnalyzeTrackRequest {
                path,
                depth,
                descriptors: Vec::new(),
            })
            .await
        {
            Ok(response) => items.push(IndexItem {
                id,
                vector: response.feature_vector,
            }),
            Err(e) => {
                log::warn!("{} Failed to analyse {}: {}", progress, id, e);
                failed += 1;
            }
        }
    }
    println!("\r");

    if items.is_empty() {
        println!("Nothing new to index ({} already indexed, {} failed)", skipped, failed);
        return Ok(());
    }

    let added = items.len();
    let request = IndexItemsRequest { items };
    let response = if rebuild {
        service.build_index(request).await
    } else {
        service.add_items(request).await
    };
    if !response.success {
        anyhow::bail!(
            "Indexing failed: {}",
            response.error.as_deref().unwrap_or("unknown error")
        );
    }

    println!("✓ Indexing complete");
    println!("  Added:    {}", added);
    println!("  Skipped:  {} (already indexed)", skipped);
    println!("  Failed:   {}", failed);
    println!("  Total:    {}", response.item_count);

    if failed > 0 {
        println!("\nNote: {} files failed analysis. Check logs for details.", failed);
    }
    Ok(())
}
