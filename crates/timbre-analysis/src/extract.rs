//! The extractor seam and the built-in time-domain extractor.

use std::path::Path;

use timbre_core::{AnalysisDepth, DescriptorSet};

use crate::audio::{decode_audio, SignalStats, ANALYSIS_SAMPLE_RATE};
use crate::error::{ExtractionError, ExtractionResult};

/// Turns one audio file into named descriptors.
///
/// Implementations are shared by every request handler, so they must be
/// `Send + Sync`. Unknown or unsupported descriptors are simply left out of
/// the returned set.
pub trait DescriptorExtractor: Send + Sync {
    fn extract(&self, path: &Path, depth: AnalysisDepth) -> ExtractionResult<DescriptorSet>;
}

/// Extractor computing time-domain statistics from decoded PCM.
///
/// Every depth yields `energy`, `loudness`, `zero_crossing_rate` and
/// `dynamic_complexity`. Comprehensive analysis adds an `acousticness`
/// estimate derived from the zero crossing rate. Rhythm, tonal and spectral
/// descriptors need a dedicated engine and are never produced here.
#[derive(Debug, Clone, Copy)]
pub struct SignalExtractor {
    sample_rate: u32,
}

impl Default for SignalExtractor {
    fn default() -> Self {
        Self {
            sample_rate: ANALYSIS_SAMPLE_RATE,
        }
    }
}

impl SignalExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Descriptors for already-decoded mono samples.
    pub fn describe(samples: &[f32], depth: AnalysisDepth) -> DescriptorSet {
        let stats = SignalStats::compute(samples);
        let mut descriptors = DescriptorSet::new()
            .with("energy", stats.energy)
            .with("loudness", stats.loudness)
            .with("zero_crossing_rate", stats.zero_crossing_rate)
            .with("dynamic_complexity", stats.dynamic_complexity);

        if depth == AnalysisDepth::Comprehensive {
            // Noisy, bright material crosses zero often; acoustic material rarely does.
            let acousticness = (1.0 - stats.zero_crossing_rate / 0.5).clamp(0.0, 1.0);
            descriptors.insert("acousticness", acousticness);
        }

        descriptors
    }
}

impl DescriptorExtractor for SignalExtractor {
    fn extract(&self, path: &Path, depth: AnalysisDepth) -> ExtractionResult<DescriptorSet> {
        let audio = decode_audio(path, self.sample_rate)?;
        if audio.samples.is_empty() {
            return Err(ExtractionError::Silent(path.to_path_buf()));
        }
        log::debug!(
            "Analysing {} ({:.1}s) at {} depth",
            path.display(),
            audio.duration_secs,
            depth
        );
        Ok(Self::describe(&audio.samples, depth))
    }
}

/// Keep only the descriptors named in `allowlist`.
///
/// An empty allowlist keeps everything.
pub fn apply_allowlist<S: AsRef<str>>(
    mut descriptors: DescriptorSet,
    allowlist: &[S],
) -> DescriptorSet {
    if !allowlist.is_empty() {
        descriptors.retain_names(allowlist);
    }
    descriptors
}
