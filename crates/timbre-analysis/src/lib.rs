//! Descriptor extraction for timbre.
//!
//! Defines the extractor seam that turns an audio file into a
//! [`DescriptorSet`](timbre_core::DescriptorSet), a built-in time-domain
//! extractor on top of symphonia, the batch producer that streams progress
//! records, audio file discovery, and the shared configuration.

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod audio;
pub mod batch;
pub mod config;
pub mod error;
pub mod extract;
pub mod scan;

pub use batch::{analyze_batch, BatchProgress};
pub use config::Config;
pub use error::{ExtractionError, ExtractionResult};
pub use extract::{apply_allowlist, DescriptorExtractor, SignalExtractor};
pub use scan::{discover_audio_files, is_audio_file};
