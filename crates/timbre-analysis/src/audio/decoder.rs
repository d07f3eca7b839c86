use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSourceStream, MediaSourceStreamOptions};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::{panic_message, ExtractionError, ExtractionResult};

/// Sample rate every file is brought to before analysis.
pub const ANALYSIS_SAMPLE_RATE: u32 = 44_100;

/// Source sample rates accepted for analysis, in Hz.
pub const SOURCE_SAMPLE_RATES: std::ops::RangeInclusive<u32> = 4_000..=768_000;

/// Decoded audio as mono PCM samples at a specific sample rate.
#[derive(Debug)]
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub duration_secs: f64,
}

/// Decode an audio file to mono PCM samples at `target_sample_rate`.
///
/// Multi-channel audio is averaged down to one channel. Packets that fail to
/// decode are skipped; anything else aborts the file. Streams whose headers
/// make the decoder panic are reported as decode errors.
pub fn decode_audio(path: &Path, target_sample_rate: u32) -> ExtractionResult<DecodedAudio> {
    panic::catch_unwind(AssertUnwindSafe(|| decode_pcm(path, target_sample_rate))).unwrap_or_else(
        |payload| {
            let reason = panic_message(payload.as_ref());
            log::warn!("Decoder panicked on {}: {}", path.display(), reason);
            Err(ExtractionError::decode(path, format!("malformed stream: {reason}")))
        },
    )
}

fn decode_pcm(path: &Path, target_sample_rate: u32) -> ExtractionResult<DecodedAudio> {
    let file = std::fs::File::open(path).map_err(|source| ExtractionError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mss = MediaSourceStream::new(Box::new(file), MediaSourceStreamOptions::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|s| s.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| ExtractionError::decode(path, format!("unrecognised format: {e}")))?;
    let mut format = probed.format;

    let track = format
        .default_track()
        .ok_or_else(|| ExtractionError::decode(path, "no default audio track"))?;
    let track_id = track.id;
    let codec_params = track.codec_params.clone();

    let source_rate = codec_params.sample_rate.unwrap_or(ANALYSIS_SAMPLE_RATE);
    if !SOURCE_SAMPLE_RATES.contains(&source_rate) {
        return Err(ExtractionError::decode(
            path,
            format!("unsupported sample rate {source_rate} Hz"),
        ));
    }

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| ExtractionError::decode(path, format!("unsupported codec: {e}")))?;

    let mut sample_buf: Option<SampleBuffer<f32>> = None;
    let mut interleaved = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(e) => return Err(ExtractionError::decode(path, e)),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(audio_buf) => {
                let buf = sample_buf.get_or_insert_with(|| {
                    SampleBuffer::<f32>::new(audio_buf.capacity() as u64, *audio_buf.spec())
                });
                buf.copy_interleaved_ref(audio_buf);
                interleaved.extend_from_slice(buf.samples());
            }
            Err(SymphoniaError::DecodeError(e)) => {
                log::debug!("Skipping undecodable packet in {}: {}", path.display(), e);
            }
            Err(e) => return Err(ExtractionError::decode(path, e)),
        }
    }

    let channels = codec_params.channels.map_or(1, |c| c.count()).max(1);
    let mono = downmix(interleaved, channels);

    let samples = resample_linear(&mono, source_rate, target_sample_rate);

    #[allow(clippy::cast_precision_loss)]
    let duration_secs = samples.len() as f64 / f64::from(target_sample_rate);

    log::debug!(
        "Decoded {} ({} Hz, {} channels) to {} mono samples",
        path.display(),
        source_rate,
        channels,
        samples.len()
    );

    Ok(DecodedAudio {
        samples,
        sample_rate: target_sample_rate,
        duration_secs,
    })
}

/// Average interleaved frames down to one channel.
#[allow(clippy::cast_precision_loss)]
fn downmix(interleaved: Vec<f32>, channels: usize) -> Vec<f32> {
    if channels == 1 {
        return interleaved;
    }
    interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Linear-interpolation resampler; adequate for time-domain statistics.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]
fn resample_linear(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == 0 || to_rate == 0 {
        return Vec::new();
    }
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = f64::from(from_rate) / f64::from(to_rate);
    let output_len = (samples.len() as f64 / ratio) as usize;
    let mut output = Vec::with_capacity(output_len);

    for i in 0..output_len {
        let pos = i as f64 * ratio;
        let idx = pos as usize;
        if idx + 1 < samples.len() {
            let frac = (pos - idx as f64) as f32;
            output.push(samples[idx].mul_add(1.0 - frac, samples[idx + 1] * frac));
        } else if idx < samples.len() {
            output.push(samples[idx]);
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resample_identity() {
        let samples = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(resample_linear(&samples, 44_100, 44_100), samples);
    }

    #[test]
    fn test_resample_halves_length() {
        let samples = vec![1.0, 2.0, 3.0, 4.0];
        assert_eq!(resample_linear(&samples, 88_200, 44_100).len(), 2);
    }

    #[test]
    fn test_resample_interpolates() {
        let out = resample_linear(&[0.0, 1.0], 22_050, 44_100);
        assert_eq!(out.len(), 4);
        assert!((out[1] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_resample_zero_rate_is_empty() {
        assert!(resample_linear(&[0.1, 0.2], 0, 44_100).is_empty());
        assert!(resample_linear(&[0.1, 0.2], 44_100, 0).is_empty());
    }

    #[test]
    fn test_downmix_stereo() {
        let mono = downmix(vec![1.0, 0.0, 0.5, 0.5, -1.0, 1.0], 2);
        assert_eq!(mono, vec![0.5, 0.5, 0.0]);
    }

    #[test]
    fn test_decode_missing_file() {
        let err = decode_audio(Path::new("/nonexistent/track.flac"), ANALYSIS_SAMPLE_RATE)
            .unwrap_err();
        assert!(matches!(err, ExtractionError::Io { .. }));
    }

    #[test]
    fn test_decode_garbage_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("noise.wav");
        std::fs::write(&path, b"this is not a wave file").unwrap();
        let err = decode_audio(&path, ANALYSIS_SAMPLE_RATE).unwrap_err();
        assert!(matches!(err, ExtractionError::Decode { .. }));
    }
}
