use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::path::Path;
use timbre_core::{build_vector, DescriptorSet, FEATURE_ORDER};

pub fn run_vectorize(descriptors_path: &Path) -> Result<()> {
    let contents = std::fs::read_to_string(descriptors_path)
        .with_context(|| format!("Failed to read {}", descriptors_path.display()))?;
    let descriptors = DescriptorSet::from_json_str(&contents)
        .with_context(|| format!("Failed to parse descriptors in {}", descriptors_path.display()))?;

    let vector = build_vector(&descriptors);
    for (name, component) in FEATURE_ORDER.iter().zip(vector.as_slice()) {
        println!("{name:<20} {component:.6}");
    }
    println!("\n{}", STANDARD.encode(vector.to_bytes()));
    Ok(())
}
