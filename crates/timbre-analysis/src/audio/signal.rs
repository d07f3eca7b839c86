//! Time-domain statistics over mono PCM.

/// Frame length for short-term loudness, about 46 ms at 44.1 kHz.
const FRAME_SIZE: usize = 2048;

/// Frames quieter than this (dBFS) are ignored by dynamic complexity.
const SILENCE_DB: f32 = -90.0;

/// Exponent of Stevens' power law relating energy to perceived loudness.
const LOUDNESS_EXPONENT: f32 = 0.67;

/// Summary statistics of one decoded signal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalStats {
    /// Mean squared amplitude.
    pub energy: f32,
    /// `energy` raised to Stevens' power law exponent.
    pub loudness: f32,
    /// Fraction of adjacent samples whose sign differs.
    pub zero_crossing_rate: f32,
    /// Mean absolute deviation of short-term loudness in dB.
    pub dynamic_complexity: f32,
}

impl SignalStats {
    /// Compute all statistics in one pass over the frames.
    ///
    /// An empty signal yields all zeros.
    #[allow(clippy::cast_precision_loss)]
    pub fn compute(samples: &[f32]) -> Self {
        if samples.is_empty() {
            return Self {
                energy: 0.0,
                loudness: 0.0,
                zero_crossing_rate: 0.0,
                dynamic_complexity: 0.0,
            };
        }

        let energy = samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32;

        let crossings = samples
            .windows(2)
            .filter(|w| (w[0] >= 0.0) != (w[1] >= 0.0))
            .count();
        let zero_crossing_rate = if samples.len() > 1 {
            crossings as f32 / (samples.len() - 1) as f32
        } else {
            0.0
        };

        Self {
            energy,
            loudness: energy.powf(LOUDNESS_EXPONENT),
            zero_crossing_rate,
            dynamic_complexity: dynamic_complexity(samples),
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn dynamic_complexity(samples: &[f32]) -> f32 {
    let frame_db: Vec<f32> = samples
        .chunks(FRAME_SIZE)
        .map(|frame| {
            let ms = frame.iter().map(|s| s * s).sum::<f32>() / frame.len() as f32;
            10.0 * (ms + 1e-10).log10()
        })
        .filter(|&db| db > SILENCE_DB)
        .collect();

    if frame_db.is_empty() {
        return 0.0;
    }

    let mean = frame_db.iter().sum::<f32>() / frame_db.len() as f32;
    frame_db.iter().map(|db| (db - mean).abs()).sum::<f32>() / frame_db.len() as f32
}
