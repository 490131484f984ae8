//! Keyword-based sample classification
//!
//! Each sample lands in exactly one of eight instrument-role categories,
//! decided by the first keyword set its filename matches. The match order is
//! an order-sensitive heuristic: a kick named `kick_808.wav` is drums, never
//! bass, because drums are checked first.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::audio::AudioBackend;
use crate::camelot::CamelotKey;
use crate::metadata::MetadataResolver;

/// Instrument-role category of a sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Drums,
    Bass,
    Melody,
    Harmony,
    Fx,
    Vocals,
    Loops,
    Other,
}

impl Category {
    /// Keyword match order during classification
    ///
    /// `Other` is absent: it is the fallback for filenames matching nothing.
    pub const MATCH_ORDER: [Category; 7] = [
        Category::Drums,
        Category::Bass,
        Category::Melody,
        Category::Harmony,
        Category::Fx,
        Category::Vocals,
        Category::Loops,
    ];

    /// Iteration order during composition selection
    ///
    /// Differs from the match order (vocals before fx); both orders are
    /// load-bearing and kept separate.
    pub const SELECTION_ORDER: [Category; 8] = [
        Category::Drums,
        Category::Bass,
        Category::Melody,
        Category::Harmony,
        Category::Vocals,
        Category::Fx,
        Category::Loops,
        Category::Other,
    ];

    /// Keywords whose presence in a filename assigns this category
    pub fn keywords(self) -> &'static [&'static str] {
        match self {
            Category::Drums => &["kick", "drum", "bd", "sd", "snare", "hat"],
            Category::Bass => &["bass", "sub", "808", "low", "bassline"],
            Category::Melody => &["melody", "lead", "synth", "pluck", "arp"],
            Category::Harmony => &["chord", "pad", "string", "harmony", "stabs"],
            Category::Fx => &["fx", "effect", "impact", "sweep", "rise"],
            Category::Vocals => &["vocal", "voice", "chant", "sing", "vox"],
            Category::Loops => &["loop", "groove", "full", "mix"],
            Category::Other => &[],
        }
    }

    /// Whether this category is percussive/unpitched and bypasses the
    /// harmonic-compatibility filter
    pub fn is_unpitched(self) -> bool {
        matches!(self, Category::Drums | Category::Fx | Category::Other)
    }

    /// Stable index for policy tables
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Category::Drums => "drums",
            Category::Bass => "bass",
            Category::Melody => "melody",
            Category::Harmony => "harmony",
            Category::Fx => "fx",
            Category::Vocals => "vocals",
            Category::Loops => "loops",
            Category::Other => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A sample with resolved metadata, bucketed under its category
#[derive(Debug, Clone)]
pub struct ClassifiedSample {
    pub path: PathBuf,
    pub bpm: u32,
    pub key: Option<CamelotKey>,
}

/// Category buckets produced by classification
pub type SampleBuckets = HashMap<Category, Vec<ClassifiedSample>>;

/// Classify a filename into a category
///
/// First matching category in [`Category::MATCH_ORDER`] wins; a filename
/// containing keywords from several categories is never double-counted.
pub fn classify_filename(name: &str) -> Category {
    let name = name.to_lowercase();
    for category in Category::MATCH_ORDER {
        if category
            .keywords()
            .iter()
            .any(|keyword| name.contains(keyword))
        {
            return category;
        }
    }
    Category::Other
}

/// Resolve and bucket a list of sample paths
///
/// A single pass: each sample's tempo and key are resolved (and cached)
/// through the resolver, then the sample is placed in exactly one bucket.
pub fn classify_samples(
    paths: &[PathBuf],
    resolver: &mut MetadataResolver,
    backend: &dyn AudioBackend,
) -> SampleBuckets {
    let mut buckets: SampleBuckets = HashMap::new();

    for path in paths {
        let bpm = resolver.resolve_bpm(path, backend);
        let key = resolver.resolve_key(path);
        let category = path
            .file_name()
            .map(|n| classify_filename(&n.to_string_lossy()))
            .unwrap_or(Category::Other);

        buckets.entry(category).or_default().push(ClassifiedSample {
            path: path.clone(),
            bpm,
            key,
        });
    }

    buckets
}

/// File name helper used when building descriptors
pub fn sample_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("kick_128bpm.wav", Category::Drums)]
    #[test_case("deep_sub_bass.wav", Category::Bass)]
    #[test_case("synth_pluck_8A.wav", Category::Melody)]
    #[test_case("warm_pad_cmaj.wav", Category::Harmony)]
    #[test_case("riser_sweep.wav", Category::Fx)]
    #[test_case("vox_chop.wav", Category::Vocals)]
    #[test_case("full_groove_124.wav", Category::Loops)]
    #[test_case("texture_granular.wav", Category::Other)]
    fn test_classify_filename(name: &str, expected: Category) {
        assert_eq!(classify_filename(name), expected);
    }

    #[test]
    fn test_priority_order_beats_later_keywords() {
        // "kick" (drums) appears alongside "808" (bass); drums are matched
        // first and win.
        assert_eq!(classify_filename("kick_808_128bpm.wav"), Category::Drums);
        // "bass" (bass) vs "loop" (loops): bass is earlier.
        assert_eq!(classify_filename("bassline_loop.wav"), Category::Bass);
    }

    #[test]
    fn test_unpitched_categories() {
        assert!(Category::Drums.is_unpitched());
        assert!(Category::Fx.is_unpitched());
        assert!(Category::Other.is_unpitched());
        assert!(!Category::Bass.is_unpitched());
        assert!(!Category::Vocals.is_unpitched());
    }

    #[test]
    fn test_orders_cover_all_categories() {
        assert_eq!(Category::SELECTION_ORDER.len(), 8);
        for category in Category::MATCH_ORDER {
            assert!(Category::SELECTION_ORDER.contains(&category));
        }
        assert!(Category::SELECTION_ORDER.contains(&Category::Other));
    }

    #[test]
    fn test_display_matches_serde() {
        let json = serde_json::to_string(&Category::Drums).unwrap();
        assert_eq!(json, "\"drums\"");
        assert_eq!(Category::Drums.to_string(), "drums");
    }
}
