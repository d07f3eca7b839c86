use anyhow::{Context, Result};
use std::path::Path;
use timbre_service::{IndexItem, IndexItemsRequest, TimbreService};

pub async fn run_build(service: &TimbreService, items_path: &Path, append: bool) -> Result<()> {
    let contents = std::fs::read_to_string(items_path)
        .with_context(|| format!("Failed to read {}", items_path.display()))?;
    let items: Vec<IndexItem> = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse items in {}", items_path.display()))?;

    let count = items.len();
    let request = IndexItemsRequest { items };
    let response = if append {
        service.add_items(request).await
    } else {
        service.build_index(request).await
    };

    if !response.success {
        anyhow::bail!(
            "Indexing {} items failed: {}",
            count,
            response.error.as_deref().unwrap_or("unknown error")
        );
    }

    println!("✓ Index now holds {} items", response.item_count);
    println!("  in {}", service.index().root().display());
    Ok(())
}
