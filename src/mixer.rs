//! Mix generation engine
//!
//! [`MixerEngine`] owns everything one generation needs: the metadata
//! resolver and its caches, the audio backend, a scoped temporary working
//! directory, and the random stream. A generation runs strictly
//! Scan -> Classify -> Select -> Assemble; per-sample failures degrade by
//! omission, and only "nothing to select from" or "nothing selected" abort.
//!
//! The engine is single-threaded and not synchronized: concurrent
//! generations against one shared instance require external mutual
//! exclusion. The working directory is released when the engine drops, on
//! every exit path; callers keeping the artifact copy it out first.

use std::path::{Path, PathBuf};

use chrono::Local;
use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tempfile::TempDir;

use crate::audio::{AudioBackend, AudioClip, WavBackend, INTERNAL_SAMPLE_RATE};
use crate::camelot::{CamelotKey, Ring};
use crate::classify::classify_samples;
use crate::error::{MixError, Result};
use crate::metadata::MetadataResolver;
use crate::scan;
use crate::select::{
    compose, Composition, CompositionInfo, CompositionRequest, Layer, MixMode, SelectionPolicy,
};

/// Default mix duration in milliseconds
pub const DEFAULT_MIX_DURATION_MS: u64 = 30_000;

/// Default number of layers to request
pub const DEFAULT_NUM_LAYERS: usize = 3;

/// Target parameters for generated mixes
#[derive(Debug, Clone, Copy)]
pub struct MixSettings {
    pub target_bpm: u32,
    pub target_key: CamelotKey,
    pub mode: MixMode,
    pub num_layers: usize,
    pub mix_duration_ms: u64,
}

impl Default for MixSettings {
    fn default() -> Self {
        Self {
            target_bpm: 128,
            target_key: CamelotKey::new(8, Ring::A).expect("8A is on the wheel"),
            mode: MixMode::Standard,
            num_layers: DEFAULT_NUM_LAYERS,
            mix_duration_ms: DEFAULT_MIX_DURATION_MS,
        }
    }
}

/// Everything one generation produces
pub struct MixOutput {
    /// Rendered WAV under the engine's working directory
    pub audio_path: PathBuf,
    /// Structured composition descriptor
    pub info: CompositionInfo,
    /// Formatted human-readable summary
    pub summary: String,
}

/// The mix generation engine
pub struct MixerEngine {
    samples_dir: PathBuf,
    settings: MixSettings,
    resolver: MetadataResolver,
    backend: Box<dyn AudioBackend>,
    workdir: TempDir,
    rng: StdRng,
}

impl MixerEngine {
    /// Create an engine over a sample library with the default WAV backend
    pub fn new(samples_dir: impl Into<PathBuf>, settings: MixSettings) -> Result<Self> {
        let workdir = tempfile::Builder::new().prefix("layermix_").tempdir()?;
        Ok(Self {
            samples_dir: samples_dir.into(),
            resolver: MetadataResolver::new(settings.target_bpm),
            settings,
            backend: Box::new(WavBackend),
            workdir,
            rng: StdRng::from_entropy(),
        })
    }

    /// Replace the audio backend
    pub fn with_backend(mut self, backend: Box<dyn AudioBackend>) -> Self {
        self.backend = backend;
        self
    }

    /// Seed the engine's random stream for reproducible runs
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// The engine's scoped working directory
    pub fn workdir(&self) -> &Path {
        self.workdir.path()
    }

    pub fn settings(&self) -> &MixSettings {
        &self.settings
    }

    /// Generate a complete mix with the mode's built-in policy and the
    /// engine's own random stream
    pub fn generate_mix(&mut self) -> Result<MixOutput> {
        let policy = SelectionPolicy::for_mode(self.settings.mode);
        let mut rng = self.rng.clone();
        let output = self.generate_mix_with(&policy, None, &mut rng);
        self.rng = rng;
        output
    }

    /// Generate a complete mix with an explicit policy, sample directory
    /// override, and random source
    pub fn generate_mix_with<R: Rng>(
        &mut self,
        policy: &SelectionPolicy,
        custom_dir: Option<&Path>,
        rng: &mut R,
    ) -> Result<MixOutput> {
        let dir = custom_dir.unwrap_or(&self.samples_dir);
        let samples = scan::collect_samples(dir);
        if samples.is_empty() {
            return Err(MixError::NoSamplesFound {
                dir: dir.display().to_string(),
            });
        }

        let buckets = classify_samples(&samples, &mut self.resolver, self.backend.as_ref());

        let request = CompositionRequest {
            num_layers: self.settings.num_layers,
            target_bpm: self.settings.target_bpm,
            target_key: self.settings.target_key,
            mode: self.settings.mode,
        };
        let composition = compose(&buckets, &request, policy, self.backend.as_ref(), rng)?;

        let audio_path = self.render(&composition)?;
        let summary = format_summary(&composition.info);

        Ok(MixOutput {
            audio_path,
            info: composition.info,
            summary,
        })
    }

    /// Assemble and export the composition's layers
    fn render(&self, composition: &Composition) -> Result<PathBuf> {
        let canvas = assemble_mix(&composition.layers, self.settings.mix_duration_ms)?;

        let filename = format!("mix_{}.wav", Local::now().format("%H%M%S%3f"));
        let audio_path = self.workdir.path().join(filename);
        self.backend.export(&canvas, &audio_path)?;

        info!(
            "rendered {} layer(s) into {}",
            composition.layers.len(),
            audio_path.display()
        );
        Ok(audio_path)
    }
}

/// Render layers onto a silent canvas of exactly `duration_ms`
///
/// Each layer's volume fraction becomes a gain of `20 * log10(v)` dB, the
/// gained clip loops-and-truncates to the canvas duration, and the result is
/// additively overlaid at 0 ms. No normalization or limiting follows;
/// clipping is possible and accepted.
pub fn assemble_mix(layers: &[Layer], duration_ms: u64) -> Result<AudioClip> {
    if layers.is_empty() {
        return Err(MixError::EmptyLayerList);
    }

    let mut canvas = AudioClip::silent(duration_ms, INTERNAL_SAMPLE_RATE);

    for layer in layers {
        // A zero volume would produce an unbounded negative gain.
        if layer.volume <= 0.0 {
            return Err(MixError::InvalidVolume {
                volume: layer.volume,
            });
        }
        let gain_db = 20.0 * layer.volume.log10();

        let mut gained = layer.clip.clone();
        gained.apply_gain_db(gain_db as f32);

        let looped = gained.looped_to_ms(duration_ms);
        canvas.overlay(&looped, 0);
    }

    Ok(canvas)
}

/// Format the descriptor into the human-readable summary text
pub fn format_summary(info: &CompositionInfo) -> String {
    let mut text = format!(
        "Generated mix\n\
         \n\
         Parameters:\n\
         - layers: {}\n\
         - bpm: {}\n\
         - key: {}\n\
         - mode: {}\n\
         \n\
         Composition:\n",
        info.layers.len(),
        info.bpm,
        info.key,
        info.mode
    );

    for (i, layer) in info.layers.iter().enumerate() {
        let key_info = layer
            .key
            .map(|key| format!(", key: {}", key))
            .unwrap_or_default();
        text.push_str(&format!(
            "{}. {}: {} (BPM: {}, volume: {:.2}{})\n",
            i + 1,
            layer.category,
            layer.sample,
            layer.original_bpm,
            layer.volume,
            key_info
        ));
    }

    text
}
