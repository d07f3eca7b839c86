pub mod decoder;
pub mod signal;

pub use decoder::{decode_audio, DecodedAudio, ANALYSIS_SAMPLE_RATE};
pub use signal::SignalStats;
