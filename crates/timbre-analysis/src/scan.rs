use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Whether the file extension names an audio format we can decode.
pub fn is_audio_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| {
        matches!(
            ext.to_string_lossy().to_lowercase().as_ref(),
            "flac" | "mp3" | "ogg" | "oga" | "wav" | "m4a" | "aac"
        )
    })
}

/// Recursively collect audio files under `root`, sorted by path.
///
/// Unreadable entries are skipped with a warning; a missing root yields an
/// empty list.
pub fn discover_audio_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                log::warn!("Skipping unreadable entry under {}: {}", root.display(), e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file() && is_audio_file(entry.path()))
        .map(walkdir::DirEntry::into_path)
        .collect();

    files.sort();
    log::info!("Found {} audio files under {}", files.len(), root.display());
    files
}
