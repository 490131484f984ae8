//! WAV decode and encode
//!
//! Decoding converts everything to mono f32 at a requested sample rate:
//! integer formats are scaled to [-1, 1], channels are averaged down to one,
//! and rate conversion uses linear interpolation.

use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

use crate::audio::clip::AudioClip;
use crate::error::{MixError, Result};

/// Decode a WAV file to a mono clip at `target_rate`
///
/// `max_secs` truncates the decoded audio before resampling, which keeps
/// analysis loads cheap for long samples.
pub fn load_wav_mono(path: &Path, target_rate: u32, max_secs: Option<f64>) -> Result<AudioClip> {
    if !path.exists() {
        return Err(MixError::DecodeFailed {
            path: path.to_path_buf(),
            reason: "file not found".to_string(),
            source: None,
        });
    }

    let reader = WavReader::open(path).map_err(|e| MixError::DecodeFailed {
        path: path.to_path_buf(),
        reason: format!("failed to open WAV file: {}", e),
        source: Some(Box::new(e)),
    })?;

    let spec = reader.spec();
    let source_rate = spec.sample_rate;
    let channels = spec.channels as usize;

    let interleaved = read_samples_as_f32(reader, path)?;

    let mut mono = downmix_mono(&interleaved, channels);

    if let Some(max_secs) = max_secs {
        let max_samples = (max_secs * source_rate as f64) as usize;
        mono.truncate(max_samples);
    }

    let resampled = if source_rate != target_rate {
        resample_linear(&mono, target_rate as f64 / source_rate as f64)
    } else {
        mono
    };

    if resampled.is_empty() {
        return Err(MixError::DecodeFailed {
            path: path.to_path_buf(),
            reason: "audio contains no samples".to_string(),
            source: None,
        });
    }

    Ok(AudioClip::new(resampled, target_rate))
}

/// Write a clip as 16-bit PCM WAV
///
/// Samples are clamped to full scale at quantization time; overdriven mixes
/// clip here rather than wrapping.
pub fn export_wav(clip: &AudioClip, path: &Path) -> Result<()> {
    let spec = WavSpec {
        channels: 1,
        sample_rate: clip.sample_rate(),
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut writer = WavWriter::create(path, spec).map_err(io_err)?;
    for &sample in clip.samples() {
        let scaled = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
        writer.write_sample(scaled).map_err(io_err)?;
    }
    writer.finalize().map_err(io_err)?;

    Ok(())
}

fn io_err(e: hound::Error) -> MixError {
    MixError::Io(std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))
}

/// Read samples from a WAV reader and convert to f32
fn read_samples_as_f32<R: std::io::Read>(mut reader: WavReader<R>, path: &Path) -> Result<Vec<f32>> {
    let spec = reader.spec();
    let decode_err = |e: hound::Error| MixError::DecodeFailed {
        path: path.to_path_buf(),
        reason: format!("failed to read samples: {}", e),
        source: Some(Box::new(e)),
    };

    match spec.sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<Vec<f32>, _>>()
            .map_err(decode_err),
        SampleFormat::Int => match spec.bits_per_sample {
            8 => reader
                .samples::<i8>()
                .map(|s| s.map(|v| v as f32 / 128.0))
                .collect::<std::result::Result<Vec<f32>, _>>()
                .map_err(decode_err),
            16 => reader
                .samples::<i16>()
                .map(|s| s.map(|v| v as f32 / 32768.0))
                .collect::<std::result::Result<Vec<f32>, _>>()
                .map_err(decode_err),
            24 => reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / 8388608.0))
                .collect::<std::result::Result<Vec<f32>, _>>()
                .map_err(decode_err),
            32 => reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / 2147483648.0))
                .collect::<std::result::Result<Vec<f32>, _>>()
                .map_err(decode_err),
            other => Err(MixError::UnsupportedFormat {
                format: format!("{}-bit integer audio", other),
            }),
        },
    }
}

/// Average interleaved channels down to mono
fn downmix_mono(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Linear interpolation resampling
///
/// `ratio` is output length over input length. Linear interpolation is
/// audible on large ratio changes but adequate for loop material.
pub(crate) fn resample_linear(samples: &[f32], ratio: f64) -> Vec<f32> {
    if samples.is_empty() {
        return Vec::new();
    }

    let source_len = samples.len();
    let target_len = ((source_len as f64) * ratio).ceil() as usize;
    let mut output = Vec::with_capacity(target_len);

    for i in 0..target_len {
        let src_pos = i as f64 / ratio;
        let src_idx = src_pos.floor() as usize;
        let frac = (src_pos - src_idx as f64) as f32;

        let sample = if src_idx + 1 < source_len {
            samples[src_idx] * (1.0 - frac) + samples[src_idx + 1] * frac
        } else if src_idx < source_len {
            samples[src_idx]
        } else {
            0.0
        };

        output.push(sample);
    }

    output
}
