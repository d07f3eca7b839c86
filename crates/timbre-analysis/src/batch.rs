//! Batch analysis with streamed progress.

use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use timbre_core::{AnalysisDepth, DescriptorSet};
use tokio::sync::mpsc;

use crate::error::{panic_message, ExtractionError, ExtractionResult};
use crate::extract::{apply_allowlist, DescriptorExtractor};

/// Progress records buffered ahead of a slow consumer.
pub const PROGRESS_CHANNEL_CAPACITY: usize = 16;

/// State of a batch after one more file has been processed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchProgress {
    pub total: usize,
    pub completed: usize,
    pub errors: usize,
    pub current_file: String,
    /// `(completed + errors) / total * 100`.
    pub percent_complete: f32,
    /// Failure message for `current_file`, if it failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchProgress {
    #[allow(clippy::cast_precision_loss)]
    fn percent(done: usize, total: usize) -> f32 {
        if total == 0 {
            return 0.0;
        }
        done as f32 / total as f32 * 100.0
    }
}

/// Run one extraction, turning a panic into an engine error for that file.
fn extract_guarded(
    extractor: &dyn DescriptorExtractor,
    path: &Path,
    depth: AnalysisDepth,
) -> ExtractionResult<DescriptorSet> {
    panic::catch_unwind(AssertUnwindSafe(|| extractor.extract(path, depth))).unwrap_or_else(
        |payload| {
            let reason = panic_message(payload.as_ref());
            log::error!("Extractor panicked on {}: {}", path.display(), reason);
            Err(ExtractionError::Engine(format!("analysis panicked: {reason}")))
        },
    )
}

/// Analyze `paths` one after another on the blocking pool.
///
/// Yields one [`BatchProgress`] per file, in input order, and closes the
/// channel after the last. A file whose extraction panics is reported as a
/// failure and the batch moves on. An empty path list closes it immediately.
/// Dropping the receiver stops the batch before the next file. Must be called
/// from within a tokio runtime.
pub fn analyze_batch(
    extractor: Arc<dyn DescriptorExtractor>,
    paths: Vec<PathBuf>,
    depth: AnalysisDepth,
    allowlist: Vec<String>,
) -> mpsc::Receiver<BatchProgress> {
    let (tx, rx) = mpsc::channel(PROGRESS_CHANNEL_CAPACITY);
    if paths.is_empty() {
        return rx;
    }

    tokio::task::spawn_blocking(move || {
        let total = paths.len();
        let mut completed = 0;
        let mut errors = 0;

        log::info!("Starting batch analysis of {} files at {} depth", total, depth);

        for path in paths {
            let error = match extract_guarded(extractor.as_ref(), &path, depth) {
                Ok(descriptors) => {
                    let kept = apply_allowlist(descriptors, &allowlist);
                    log::debug!("Analysed {} ({} descriptors)", path.display(), kept.len());
                    completed += 1;
                    None
                }
                Err(e) => {
                    log::warn!("Failed to analyse {}: {}", path.display(), e);
                    errors += 1;
                    Some(e.to_string())
                }
            };

            let progress = BatchProgress {
                total,
                completed,
                errors,
                current_file: path.display().to_string(),
                percent_complete: BatchProgress::percent(completed + errors, total),
                error,
            };
            if tx.blocking_send(progress).is_err() {
                log::info!(
                    "Batch receiver dropped after {} of {} files; stopping",
                    completed + errors,
                    total
                );
                return;
            }
        }

        log::info!(
            "Batch analysis finished: {} succeeded, {} failed",
            completed,
            errors
        );
    });

    rx
}
