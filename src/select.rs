//! Stochastic composition selection
//!
//! Turns classified sample buckets into an ordered list of layers: categories
//! are included probabilistically, one harmonically and rhythmically
//! compatible sample is drawn per category, each chosen clip is normalized to
//! a four-bar loop at the target tempo, tempo-converted when needed, and
//! assigned a volume from the category's range.
//!
//! The probability tables and volume ranges travel inside a
//! [`SelectionPolicy`] value passed per invocation, and all randomness comes
//! from an injected RNG, so callers control both variation sources.

use std::fmt;
use std::path::PathBuf;

use chrono::Local;
use log::{info, warn};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::audio::{AudioBackend, AudioClip};
use crate::camelot::CamelotKey;
use crate::classify::{sample_name, Category, ClassifiedSample, SampleBuckets};
use crate::error::{MixError, Result};

/// Selection mode, picking one of the two built-in probability tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MixMode {
    Standard,
    Experimental,
}

impl fmt::Display for MixMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MixMode::Standard => f.write_str("standard"),
            MixMode::Experimental => f.write_str("experimental"),
        }
    }
}

/// Per-category inclusion probabilities and volume ranges
///
/// A plain value: build one from a [`MixMode`] or construct a custom one and
/// pass it per generation call. Tables are indexed by [`Category::index`].
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionPolicy {
    /// Probability of including each non-empty category as a candidate
    pub probabilities: [f64; 8],
    /// Closed `[min, max]` volume sub-ranges of (0, 1]
    pub volume_ranges: [(f64, f64); 8],
}

/// Volume ranges shared by both built-in modes
const VOLUME_RANGES: [(f64, f64); 8] = [
    (0.4, 0.9), // drums
    (0.3, 0.8), // bass
    (0.2, 0.7), // melody
    (0.2, 0.6), // harmony
    (0.1, 0.8), // fx
    (0.3, 0.8), // vocals
    (0.2, 0.7), // loops
    (0.1, 0.9), // other
];

impl SelectionPolicy {
    /// The standard table: rhythm-section heavy
    pub fn standard() -> Self {
        Self {
            // drums, bass, melody, harmony, fx, vocals, loops, other
            probabilities: [0.9, 0.8, 0.7, 0.6, 0.3, 0.4, 0.5, 0.2],
            volume_ranges: VOLUME_RANGES,
        }
    }

    /// The experimental table: favors texture and odd material
    pub fn experimental() -> Self {
        Self {
            probabilities: [0.6, 0.5, 0.8, 0.7, 0.8, 0.6, 0.4, 0.9],
            volume_ranges: VOLUME_RANGES,
        }
    }

    /// The built-in policy for a mode
    pub fn for_mode(mode: MixMode) -> Self {
        match mode {
            MixMode::Standard => Self::standard(),
            MixMode::Experimental => Self::experimental(),
        }
    }

    /// Inclusion probability for a category
    pub fn probability(&self, category: Category) -> f64 {
        self.probabilities[category.index()]
    }

    /// Volume range for a category
    pub fn volume_range(&self, category: Category) -> (f64, f64) {
        self.volume_ranges[category.index()]
    }
}

/// One selected, processed sample contributing to a composition
pub struct Layer {
    pub category: Category,
    pub path: PathBuf,
    pub clip: AudioClip,
    pub original_bpm: u32,
    pub key: Option<CamelotKey>,
    pub volume: f64,
}

/// Human-readable per-layer descriptor entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerInfo {
    pub category: Category,
    pub sample: String,
    pub original_bpm: u32,
    pub key: Option<CamelotKey>,
    pub volume: f64,
}

/// Composition-level descriptor: ordered layer entries plus aggregates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompositionInfo {
    pub layers: Vec<LayerInfo>,
    pub bpm: u32,
    pub key: CamelotKey,
    pub mode: MixMode,
    pub timestamp: String,
}

/// An ordered set of layers plus its descriptor, alive for one generation
pub struct Composition {
    pub layers: Vec<Layer>,
    pub info: CompositionInfo,
}

/// Parameters of one composition request
#[derive(Debug, Clone, Copy)]
pub struct CompositionRequest {
    pub num_layers: usize,
    pub target_bpm: u32,
    pub target_key: CamelotKey,
    pub mode: MixMode,
}

/// Build a composition from classified buckets
///
/// Per-sample decode and conversion failures are logged and drop only that
/// layer; the composition fails only when nothing survives
/// ([`MixError::NoLayersSelected`]).
pub fn compose<R: Rng>(
    buckets: &SampleBuckets,
    request: &CompositionRequest,
    policy: &SelectionPolicy,
    backend: &dyn AudioBackend,
    rng: &mut R,
) -> Result<Composition> {
    let selected = select_categories(buckets, request.num_layers, policy, rng);
    let compatible = request.target_key.compatible_keys();

    let mut layers = Vec::new();
    let mut entries = Vec::new();

    for category in selected {
        let bucket = match buckets.get(&category) {
            Some(bucket) if !bucket.is_empty() => bucket,
            _ => continue,
        };

        let pool = compatible_pool(category, bucket, &compatible);
        let Some(&sample) = pool.choose(rng) else {
            continue;
        };

        match build_layer(sample, category, request, policy, backend, rng) {
            Ok(layer) => {
                entries.push(LayerInfo {
                    category,
                    sample: sample_name(&layer.path),
                    original_bpm: layer.original_bpm,
                    key: layer.key,
                    volume: layer.volume,
                });
                layers.push(layer);
            }
            Err(e) if e.is_recoverable() => {
                warn!("skipping layer for {}: {}", category, e);
            }
            Err(e) => return Err(e),
        }
    }

    if layers.is_empty() {
        return Err(MixError::NoLayersSelected);
    }

    info!(
        "composed {} layer(s) at {} BPM in {}",
        layers.len(),
        request.target_bpm,
        request.target_key
    );

    Ok(Composition {
        layers,
        info: CompositionInfo {
            layers: entries,
            bpm: request.target_bpm,
            key: request.target_key,
            mode: request.mode,
            timestamp: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        },
    })
}

/// Stochastic category inclusion, fallback, and uniform draw
///
/// Non-empty categories are included independently with the policy's
/// probability, walking [`Category::SELECTION_ORDER`]. If nothing is
/// included, every non-empty category becomes a candidate, so any library
/// with samples always makes progress. `min(requested, candidates)`
/// categories are then drawn uniformly without replacement: a run may
/// legitimately yield fewer layers than requested.
fn select_categories<R: Rng>(
    buckets: &SampleBuckets,
    num_layers: usize,
    policy: &SelectionPolicy,
    rng: &mut R,
) -> Vec<Category> {
    let non_empty = |category: &Category| {
        buckets
            .get(category)
            .map(|bucket| !bucket.is_empty())
            .unwrap_or(false)
    };

    let mut candidates: Vec<Category> = Category::SELECTION_ORDER
        .into_iter()
        .filter(|category| non_empty(category) && rng.gen::<f64>() < policy.probability(*category))
        .collect();

    if candidates.is_empty() {
        candidates = Category::SELECTION_ORDER
            .into_iter()
            .filter(non_empty)
            .collect();
    }

    let count = num_layers.min(candidates.len());
    candidates.choose_multiple(rng, count).copied().collect()
}

/// Samples eligible for a category under the harmonic filter
///
/// Percussive/unpitched categories bypass the filter entirely. A pitched
/// sample qualifies when its key is unknown or compatible with the target.
/// If no sample qualifies, the whole bucket is used instead, so a non-empty
/// category always offers a choice.
fn compatible_pool<'a>(
    category: Category,
    bucket: &'a [ClassifiedSample],
    compatible: &[CamelotKey; 4],
) -> Vec<&'a ClassifiedSample> {
    let filtered: Vec<&ClassifiedSample> = bucket
        .iter()
        .filter(|sample| {
            category.is_unpitched()
                || sample
                    .key
                    .map(|key| compatible.contains(&key))
                    .unwrap_or(true)
        })
        .collect();

    if filtered.is_empty() {
        bucket.iter().collect()
    } else {
        filtered
    }
}

/// Load, normalize, tempo-convert, and volume-assign one chosen sample
fn build_layer<R: Rng>(
    sample: &ClassifiedSample,
    category: Category,
    request: &CompositionRequest,
    policy: &SelectionPolicy,
    backend: &dyn AudioBackend,
    rng: &mut R,
) -> Result<Layer> {
    let clip = backend.load(&sample.path)?;
    let mut clip = normalize_loop_length(clip, request.target_bpm);

    let bpm_delta = sample.bpm as i64 - request.target_bpm as i64;
    if sample.bpm > 0 && bpm_delta.abs() > 1 {
        clip = backend.change_tempo(&clip, sample.bpm as f64, request.target_bpm as f64)?;
    }

    let (min_vol, max_vol) = policy.volume_range(category);
    let volume = rng.gen_range(min_vol..=max_vol);

    Ok(Layer {
        category,
        path: sample.path.clone(),
        clip,
        original_bpm: sample.bpm,
        key: sample.key,
        volume,
    })
}

/// Extend a clip to a seamless four-bar loop at the target tempo
///
/// One beat is `60000 / bpm` ms, one bar four beats, the ideal unit four
/// bars. Shorter clips repeat-and-truncate to exactly that length; longer or
/// equal clips pass through unchanged.
fn normalize_loop_length(clip: AudioClip, target_bpm: u32) -> AudioClip {
    let beat_ms = 60_000.0 / target_bpm as f64;
    let ideal_ms = (beat_ms * 4.0 * 4.0) as u64;

    if clip.duration_ms() < ideal_ms {
        clip.looped_to_ms(ideal_ms)
    } else {
        clip
    }
}
