//! Audio capability: clips, WAV I/O, tempo analysis, and the backend seam
//!
//! The [`AudioBackend`] trait is the contract the decision engine needs from
//! audio processing: decode, tempo analysis, tempo conversion, and export.
//! [`WavBackend`] is the default implementation; tests can swap in their own.

pub mod clip;
pub mod io;
pub mod tempo;

use std::path::Path;

use crate::error::{MixError, Result};

pub use clip::{db_to_linear, AudioClip, INTERNAL_SAMPLE_RATE};
pub use tempo::{ANALYSIS_SAMPLE_RATE, ANALYSIS_WINDOW_SECS};

/// External audio-processing capability required by the engine
///
/// All calls are blocking; there is no timeout or cancellation support, so a
/// caller needing responsiveness must impose an external deadline.
pub trait AudioBackend {
    /// Decode a sample to a mono clip at the internal mixing rate
    fn load(&self, path: &Path) -> Result<AudioClip>;

    /// Decode at most [`ANALYSIS_WINDOW_SECS`] of mono audio at the analysis
    /// rate, for tempo estimation
    fn load_analysis_window(&self, path: &Path) -> Result<AudioClip>;

    /// Estimate the tempo of a clip
    ///
    /// Runs the primary estimator and falls back to the secondary; when both
    /// fail the result is [`MixError::AnalysisFailed`] for `path`.
    fn estimate_tempo(&self, path: &Path, clip: &AudioClip) -> Result<f64>;

    /// Convert a clip from `source_bpm` to `target_bpm`
    ///
    /// Speed-ratio based: the default implementation resamples, so pitch
    /// shifts together with tempo. Non-positive or equal tempos pass the clip
    /// through unchanged.
    fn change_tempo(&self, clip: &AudioClip, source_bpm: f64, target_bpm: f64)
        -> Result<AudioClip>;

    /// Write a clip to `path` as a WAV artifact
    fn export(&self, clip: &AudioClip, path: &Path) -> Result<()>;
}

/// Default backend: hound-based WAV decode/encode plus the built-in
/// onset-strength tempo estimators
#[derive(Debug, Default, Clone, Copy)]
pub struct WavBackend;

impl AudioBackend for WavBackend {
    fn load(&self, path: &Path) -> Result<AudioClip> {
        io::load_wav_mono(path, INTERNAL_SAMPLE_RATE, None)
    }

    fn load_analysis_window(&self, path: &Path) -> Result<AudioClip> {
        io::load_wav_mono(path, ANALYSIS_SAMPLE_RATE, Some(ANALYSIS_WINDOW_SECS))
    }

    fn estimate_tempo(&self, path: &Path, clip: &AudioClip) -> Result<f64> {
        tempo::estimate_tempo(clip).ok_or_else(|| MixError::AnalysisFailed {
            path: path.to_path_buf(),
        })
    }

    fn change_tempo(
        &self,
        clip: &AudioClip,
        source_bpm: f64,
        target_bpm: f64,
    ) -> Result<AudioClip> {
        if source_bpm <= 0.0 || (source_bpm - target_bpm).abs() < f64::EPSILON {
            return Ok(clip.clone());
        }

        // Playing faster shortens the clip: output length scales by the
        // inverse of the speed factor.
        let ratio = source_bpm / target_bpm;
        let samples = io::resample_linear(clip.samples(), ratio);
        Ok(AudioClip::new(samples, clip.sample_rate()))
    }

    fn export(&self, clip: &AudioClip, path: &Path) -> Result<()> {
        io::export_wav(clip, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_tempo_scales_duration() {
        let clip = AudioClip::silent(1_000, INTERNAL_SAMPLE_RATE);
        let backend = WavBackend;

        // 100 -> 128 BPM plays faster, so the clip gets shorter
        let faster = backend.change_tempo(&clip, 100.0, 128.0).unwrap();
        let expected = (clip.len() as f64 * 100.0 / 128.0).ceil() as usize;
        assert_eq!(faster.len(), expected);

        // 128 -> 100 BPM plays slower, so it gets longer
        let slower = backend.change_tempo(&clip, 128.0, 100.0).unwrap();
        assert!(slower.len() > clip.len());
    }

    #[test]
    fn test_change_tempo_skips_degenerate_source() {
        let clip = AudioClip::silent(500, INTERNAL_SAMPLE_RATE);
        let backend = WavBackend;

        let unchanged = backend.change_tempo(&clip, 0.0, 128.0).unwrap();
        assert_eq!(unchanged.len(), clip.len());

        let unchanged = backend.change_tempo(&clip, -10.0, 128.0).unwrap();
        assert_eq!(unchanged.len(), clip.len());
    }
}
