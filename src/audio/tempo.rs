//! Tempo estimation from audio
//!
//! Two-tier estimator over an onset-strength envelope: the primary tier is an
//! autocorrelation beat tracker that demands a clear periodic peak and enough
//! onsets to trust it; the secondary tier accepts the strongest periodicity it
//! can find. Both fail on silence or steady-state material, in which case the
//! caller substitutes its configured target tempo.

use log::debug;

use crate::audio::clip::AudioClip;

/// Sample rate used for analysis loads
pub const ANALYSIS_SAMPLE_RATE: u32 = 22_050;

/// Analysis window length; longer samples are truncated before analysis
pub const ANALYSIS_WINDOW_SECS: f64 = 15.0;

/// Hop size of the onset-strength envelope, in samples
const HOP: usize = 256;

/// Frame size for energy measurement, in samples
const FRAME: usize = 1024;

/// Search range for the periodicity lag, in BPM
const SEARCH_MIN_BPM: f64 = 40.0;
const SEARCH_MAX_BPM: f64 = 200.0;

/// Minimum onset count for the primary estimator to trust its result
const MIN_ONSETS: usize = 8;

/// Minimum normalized autocorrelation for the primary estimator
const MIN_CONFIDENCE: f32 = 0.2;

/// Estimate the tempo of a clip in BPM
///
/// Runs the primary beat tracker, falling back to the secondary
/// onset-strength periodicity pick. Returns `None` when both tiers fail; the
/// result is a raw estimate and may need octave correction.
pub fn estimate_tempo(clip: &AudioClip) -> Option<f64> {
    let envelope = onset_envelope(clip.samples());
    let fps = clip.sample_rate() as f64 / HOP as f64;

    if let Some(bpm) = primary_estimate(&envelope, fps) {
        debug!("primary tempo estimate: {:.1} BPM", bpm);
        return Some(bpm);
    }

    let bpm = secondary_estimate(&envelope, fps);
    if let Some(bpm) = bpm {
        debug!("secondary tempo estimate: {:.1} BPM", bpm);
    }
    bpm
}

/// Onset-strength envelope: half-wave rectified frame-energy flux
fn onset_envelope(samples: &[f32]) -> Vec<f32> {
    if samples.len() < FRAME {
        return Vec::new();
    }

    let mut energies = Vec::with_capacity(samples.len() / HOP);
    let mut start = 0;
    while start + FRAME <= samples.len() {
        let frame = &samples[start..start + FRAME];
        let energy: f32 = frame.iter().map(|s| s * s).sum::<f32>() / FRAME as f32;
        energies.push(energy.sqrt());
        start += HOP;
    }

    energies
        .windows(2)
        .map(|pair| (pair[1] - pair[0]).max(0.0))
        .collect()
}

/// Primary estimator: autocorrelation with onset-count and confidence gates
fn primary_estimate(envelope: &[f32], fps: f64) -> Option<f64> {
    if count_onsets(envelope) < MIN_ONSETS {
        return None;
    }

    let (bpm, confidence) = best_periodicity(envelope, fps)?;
    if confidence < MIN_CONFIDENCE {
        return None;
    }
    Some(bpm)
}

/// Secondary estimator: strongest periodicity, no gates beyond positivity
fn secondary_estimate(envelope: &[f32], fps: f64) -> Option<f64> {
    best_periodicity(envelope, fps).map(|(bpm, _)| bpm)
}

/// Count envelope peaks that rise clearly above the mean
fn count_onsets(envelope: &[f32]) -> usize {
    if envelope.len() < 3 {
        return 0;
    }
    let mean = envelope.iter().sum::<f32>() / envelope.len() as f32;
    let variance =
        envelope.iter().map(|v| (v - mean) * (v - mean)).sum::<f32>() / envelope.len() as f32;
    let threshold = mean + 0.5 * variance.sqrt();

    envelope
        .windows(3)
        .filter(|w| w[1] > threshold && w[1] > w[0] && w[1] >= w[2])
        .count()
}

/// Strongest periodicity of the envelope within the BPM search range
///
/// Returns the refined BPM and a normalized confidence in [0, 1]. Ascending
/// lag iteration with strict improvement means octave ties resolve towards
/// the faster tempo.
fn best_periodicity(envelope: &[f32], fps: f64) -> Option<(f64, f32)> {
    if envelope.is_empty() {
        return None;
    }

    let mean = envelope.iter().sum::<f32>() / envelope.len() as f32;
    let centered: Vec<f32> = envelope.iter().map(|v| v - mean).collect();

    let energy: f32 = centered.iter().map(|v| v * v).sum::<f32>() / centered.len() as f32;
    if energy <= f32::EPSILON {
        return None;
    }

    let min_lag = ((60.0 * fps) / SEARCH_MAX_BPM).floor().max(1.0) as usize;
    let max_lag = ((60.0 * fps) / SEARCH_MIN_BPM).ceil() as usize;
    if max_lag + 1 >= centered.len() {
        return None;
    }

    let autocorr = |lag: usize| -> f32 {
        let n = centered.len() - lag;
        let sum: f32 = (0..n).map(|i| centered[i] * centered[i + lag]).sum();
        sum / n as f32
    };

    let mut best_lag = 0;
    let mut best_score = 0.0f32;
    for lag in min_lag..=max_lag {
        let score = autocorr(lag);
        if score > best_score {
            best_score = score;
            best_lag = lag;
        }
    }

    if best_lag == 0 || best_score <= 0.0 {
        return None;
    }

    // Parabolic refinement around the peak lag to beat hop quantization
    let refined_lag = if best_lag > min_lag && best_lag < max_lag {
        let prev = autocorr(best_lag - 1);
        let next = autocorr(best_lag + 1);
        let denom = prev - 2.0 * best_score + next;
        if denom.abs() > f32::EPSILON {
            best_lag as f64 + (0.5 * (prev - next) / denom) as f64
        } else {
            best_lag as f64
        }
    } else {
        best_lag as f64
    };

    let bpm = 60.0 * fps / refined_lag;
    let confidence = (best_score / energy).clamp(0.0, 1.0);
    Some((bpm, confidence))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Click track: short decaying bursts at the given tempo
    fn click_track(bpm: f64, duration_secs: f64, sample_rate: u32) -> AudioClip {
        let total = (duration_secs * sample_rate as f64) as usize;
        let period = (60.0 / bpm * sample_rate as f64) as usize;
        let click_len = sample_rate as usize / 100; // 10 ms
        let mut samples = vec![0.0f32; total];
        let mut pos = 0;
        while pos < total {
            for i in 0..click_len.min(total - pos) {
                let decay = 1.0 - i as f32 / click_len as f32;
                samples[pos + i] = decay * (i as f32 * 0.9).sin();
            }
            pos += period;
        }
        AudioClip::new(samples, sample_rate)
    }

    #[test]
    fn test_estimates_click_track_tempo() {
        let clip = click_track(120.0, 10.0, ANALYSIS_SAMPLE_RATE);
        let bpm = estimate_tempo(&clip).expect("click track should have a tempo");
        assert!((bpm - 120.0).abs() < 8.0, "estimated {:.1} BPM", bpm);
    }

    #[test]
    fn test_slow_click_track() {
        let clip = click_track(70.0, 12.0, ANALYSIS_SAMPLE_RATE);
        let bpm = estimate_tempo(&clip).expect("click track should have a tempo");
        // 70 BPM or its double are both acceptable raw estimates; octave
        // correction happens in the resolver.
        let near_70 = (bpm - 70.0).abs() < 6.0;
        let near_140 = (bpm - 140.0).abs() < 10.0;
        assert!(near_70 || near_140, "estimated {:.1} BPM", bpm);
    }

    #[test]
    fn test_silence_has_no_tempo() {
        let clip = AudioClip::silent(5_000, ANALYSIS_SAMPLE_RATE);
        assert_eq!(estimate_tempo(&clip), None);
    }

    #[test]
    fn test_too_short_for_analysis() {
        let clip = AudioClip::new(vec![0.5; 256], ANALYSIS_SAMPLE_RATE);
        assert_eq!(estimate_tempo(&clip), None);
    }
}
