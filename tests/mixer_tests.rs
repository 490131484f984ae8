//! End-to-end tests for the mix generation pipeline
//!
//! These exercise the real WAV backend over a temporary sample library:
//! scan, metadata resolution from filenames, classification, selection, and
//! assembly into an artifact of the exact requested duration.

use std::fs;
use std::path::Path;

use hound::{SampleFormat, WavSpec, WavWriter};
use rand::rngs::StdRng;
use rand::SeedableRng;

use layermix::select::SelectionPolicy;
use layermix::{MixError, MixSettings, MixerEngine};

const SAMPLE_RATE: u32 = 44_100;

/// Write a short mono sine WAV
fn write_wav(path: &Path, frequency: f32, duration_secs: f32) {
    let spec = WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec).unwrap();
    let count = (duration_secs * SAMPLE_RATE as f32) as usize;
    let step = 2.0 * std::f32::consts::PI * frequency / SAMPLE_RATE as f32;
    for i in 0..count {
        let sample = (step * i as f32).sin() * 0.4;
        writer.write_sample((sample * 32767.0) as i16).unwrap();
    }
    writer.finalize().unwrap();
}

fn settings(duration_ms: u64, num_layers: usize) -> MixSettings {
    MixSettings {
        mix_duration_ms: duration_ms,
        num_layers,
        ..MixSettings::default()
    }
}

#[test]
fn test_empty_library_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let mut engine = MixerEngine::new(dir.path(), MixSettings::default()).unwrap();

    let result = engine.generate_mix();
    match result {
        Err(MixError::NoSamplesFound { .. }) => {}
        other => panic!("expected NoSamplesFound, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_end_to_end_mix_generation() {
    let dir = tempfile::tempdir().unwrap();
    write_wav(&dir.path().join("kick_128bpm.wav"), 60.0, 0.5);
    write_wav(&dir.path().join("bass_sub_124bpm_amin.wav"), 55.0, 1.0);
    write_wav(&dir.path().join("lead_synth_128bpm_8a.wav"), 440.0, 1.0);

    let mut engine = MixerEngine::new(dir.path(), settings(10_000, 3))
        .unwrap()
        .with_seed(42);

    let output = engine.generate_mix().unwrap();

    assert!(output.audio_path.exists());
    assert!(!output.info.layers.is_empty());
    assert_eq!(output.info.bpm, 128);
    assert!(output.summary.contains("bpm: 128"));

    // Every resolved layer tempo is in range and the descriptor orders match
    // the summary.
    for layer in &output.info.layers {
        assert!((80..=180).contains(&layer.original_bpm));
        assert!(layer.volume > 0.0 && layer.volume <= 1.0);
        assert!(output.summary.contains(&layer.sample));
    }

    // The rendered artifact has exactly the requested duration.
    let reader = hound::WavReader::open(&output.audio_path).unwrap();
    assert_eq!(reader.spec().sample_rate, SAMPLE_RATE);
    assert_eq!(reader.duration(), 10 * SAMPLE_RATE);
}

#[test]
fn test_seeded_runs_are_identical() {
    let dir = tempfile::tempdir().unwrap();
    write_wav(&dir.path().join("kick_128bpm.wav"), 60.0, 0.5);

    let generate = |seed: u64| {
        let mut engine = MixerEngine::new(dir.path(), settings(2_000, 1))
            .unwrap()
            .with_seed(seed);
        engine.generate_mix().unwrap()
    };

    let first = generate(7);
    let second = generate(7);

    assert_eq!(first.info.layers.len(), 1);
    assert_eq!(first.info.layers[0].sample, second.info.layers[0].sample);
    assert_eq!(first.info.layers[0].volume, second.info.layers[0].volume);
}

#[test]
fn test_undecodable_sample_degrades_gracefully() {
    let dir = tempfile::tempdir().unwrap();
    write_wav(&dir.path().join("kick_128bpm.wav"), 60.0, 0.5);
    write_wav(&dir.path().join("bass_128bpm.wav"), 55.0, 0.5);
    // Scanned (audio extension) but not decodable by the WAV backend.
    fs::write(dir.path().join("sweep_fx_128bpm.mp3"), b"not audio").unwrap();

    // Force every populated category to become a candidate so the bad
    // sample is guaranteed to be attempted.
    let policy = SelectionPolicy {
        probabilities: [1.0; 8],
        ..SelectionPolicy::standard()
    };

    let mut engine = MixerEngine::new(dir.path(), settings(2_000, 8)).unwrap();
    let mut rng = StdRng::seed_from_u64(1);
    let output = engine.generate_mix_with(&policy, None, &mut rng).unwrap();

    // The fx layer was dropped; drums and bass survived.
    assert_eq!(output.info.layers.len(), 2);
    assert!(output
        .info
        .layers
        .iter()
        .all(|layer| layer.sample.ends_with(".wav")));
}

#[test]
fn test_descriptor_serializes_to_json() {
    let dir = tempfile::tempdir().unwrap();
    write_wav(&dir.path().join("kick_128bpm.wav"), 60.0, 0.5);

    let mut engine = MixerEngine::new(dir.path(), settings(2_000, 1))
        .unwrap()
        .with_seed(3);
    let output = engine.generate_mix().unwrap();

    let json = serde_json::to_string(&output.info).unwrap();
    assert!(json.contains("\"category\":\"drums\""));
    assert!(json.contains("\"bpm\":128"));
    assert!(json.contains("\"key\":\"8A\""));
    assert!(json.contains("\"mode\":\"standard\""));
}

#[test]
fn test_workdir_is_scoped_to_engine() {
    let dir = tempfile::tempdir().unwrap();
    write_wav(&dir.path().join("kick_128bpm.wav"), 60.0, 0.5);

    let workdir;
    let artifact;
    {
        let mut engine = MixerEngine::new(dir.path(), settings(2_000, 1))
            .unwrap()
            .with_seed(5);
        workdir = engine.workdir().to_path_buf();
        artifact = engine.generate_mix().unwrap().audio_path;
        assert!(artifact.exists());
    }
    // Dropping the engine releases the working area and everything in it.
    assert!(!workdir.exists());
    assert!(!artifact.exists());
}
