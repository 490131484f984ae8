//! Sample metadata resolution: tempo and key
//!
//! Both resolve through a fallback chain where the first success wins:
//! filename patterns, then the parent directory name, then (tempo only)
//! audio analysis, then the configured target tempo. Results are cached on
//! the sample path for the lifetime of the resolver; a "no key" outcome is
//! cached too, so a keyless sample is analyzed at most once.
//!
//! The pattern lists and the descriptive-name table are order-sensitive
//! heuristics: the first entry to match wins, and re-ordering silently
//! changes extraction outcomes.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use log::{debug, warn};
use regex::Regex;

use crate::audio::AudioBackend;
use crate::camelot::CamelotKey;

/// Tempos a resolved BPM may take; noisy analysis results snap to the
/// nearest entry. Multiples of five plus the common DJ tempos in between.
pub const CANONICAL_BPM_GRID: [u32; 26] = [
    80, 85, 90, 95, 100, 105, 110, 115, 120, 122, 124, 126, 128, 130, 132, 135, 138, 140, 145,
    150, 155, 160, 165, 170, 175, 180,
];

/// Lowest BPM a resolved tempo may have
pub const MIN_BPM: u32 = 80;

/// Highest BPM a resolved tempo may have
pub const MAX_BPM: u32 = 180;

/// Ordered BPM token patterns, most explicit first
fn bpm_patterns() -> &'static Vec<Regex> {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"(\d{2,3})bpm",
            r"bpm[\s_-]*(\d{2,3})",
            r"[\s_-](\d{2,3})[\s_-]bpm",
            r"^(\d{2,3})[\s_-]",
            r"[\s_-](\d{2,3})$",
            r"\((\d{2,3})\)",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("BPM pattern must compile"))
        .collect()
    })
}

/// Ordered Camelot notation patterns
fn camelot_patterns() -> &'static Vec<Regex> {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        // Separators ("_", "-", " ", ".") bound a bare Camelot token; a plain
        // \b misses "_8a" because underscore is a word character.
        [
            r"(?:^|[^0-9a-z])(?P<key>\d{1,2}[ab])(?:[^0-9a-z]|$)",
            r"key[\s_-]*(?P<key>\d{1,2}[ab])",
            r"(?P<key>\d{1,2}[ab])[\s_-]*key",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("Camelot pattern must compile"))
        .collect()
    })
}

/// Descriptive key names mapped to Camelot codes, in match order
const KEY_NAME_TABLE: [(&str, &str); 48] = [
    ("cmaj", "8B"),
    ("c major", "8B"),
    ("c#maj", "3B"),
    ("c# major", "3B"),
    ("dmaj", "10B"),
    ("d major", "10B"),
    ("d#maj", "5B"),
    ("d# major", "5B"),
    ("emaj", "12B"),
    ("e major", "12B"),
    ("fmaj", "7B"),
    ("f major", "7B"),
    ("f#maj", "2B"),
    ("f# major", "2B"),
    ("gmaj", "9B"),
    ("g major", "9B"),
    ("g#maj", "4B"),
    ("g# major", "4B"),
    ("amaj", "11B"),
    ("a major", "11B"),
    ("a#maj", "6B"),
    ("a# major", "6B"),
    ("bmaj", "1B"),
    ("b major", "1B"),
    ("cmin", "5A"),
    ("c minor", "5A"),
    ("c#min", "12A"),
    ("c# minor", "12A"),
    ("dmin", "7A"),
    ("d minor", "7A"),
    ("d#min", "2A"),
    ("d# minor", "2A"),
    ("emin", "9A"),
    ("e minor", "9A"),
    ("fmin", "4A"),
    ("f minor", "4A"),
    ("f#min", "11A"),
    ("f# minor", "11A"),
    ("gmin", "6A"),
    ("g minor", "6A"),
    ("g#min", "1A"),
    ("g# minor", "1A"),
    ("amin", "8A"),
    ("a minor", "8A"),
    ("a#min", "3A"),
    ("a# minor", "3A"),
    ("bmin", "10A"),
    ("b minor", "10A"),
];

/// Extract an explicit BPM token from a file or directory name
///
/// Only 2-3 digit values within [[`MIN_BPM`], [`MAX_BPM`]] are accepted;
/// anything else falls through to the next pattern.
pub fn extract_bpm(name: &str) -> Option<u32> {
    let name = name.to_lowercase();
    for pattern in bpm_patterns() {
        if let Some(caps) = pattern.captures(&name) {
            if let Ok(bpm) = caps[1].parse::<u32>() {
                if (MIN_BPM..=MAX_BPM).contains(&bpm) {
                    return Some(bpm);
                }
            }
        }
    }
    None
}

/// Extract a Camelot key from a file or directory name
///
/// Tries explicit Camelot notation first (`8a`, `key 8a`, `8a key`), then
/// the descriptive-name table (`cmaj`, `a minor`, ...). Case-insensitive.
pub fn extract_key(name: &str) -> Option<CamelotKey> {
    let name = name.to_lowercase();

    for pattern in camelot_patterns() {
        if let Some(token) = pattern.captures(&name).and_then(|caps| caps.name("key")) {
            if let Ok(key) = token.as_str().parse::<CamelotKey>() {
                return Some(key);
            }
        }
    }

    for (token, code) in KEY_NAME_TABLE {
        if name.contains(token) {
            return code.parse().ok();
        }
    }

    None
}

/// Double sub-range tempos and halve super-range ones
///
/// A single correction step, matching how analysis results land at half or
/// double the perceived tempo.
pub fn octave_correct(bpm: f64) -> f64 {
    if bpm < MIN_BPM as f64 {
        bpm * 2.0
    } else if bpm > MAX_BPM as f64 {
        bpm / 2.0
    } else {
        bpm
    }
}

/// Snap a raw tempo to the nearest canonical grid value
pub fn snap_to_grid(bpm: f64) -> u32 {
    let mut best = CANONICAL_BPM_GRID[0];
    let mut best_dist = f64::MAX;
    for &candidate in &CANONICAL_BPM_GRID {
        let dist = (candidate as f64 - bpm).abs();
        if dist < best_dist {
            best_dist = dist;
            best = candidate;
        }
    }
    best
}

/// Per-run tempo/key resolver with permanent caches
///
/// Caches are write-once per path and never invalidated: sample files are
/// assumed stable for the duration of a run. Not synchronized; concurrent use
/// of one resolver requires external mutual exclusion.
pub struct MetadataResolver {
    target_bpm: u32,
    bpm_cache: HashMap<PathBuf, u32>,
    key_cache: HashMap<PathBuf, Option<CamelotKey>>,
}

impl MetadataResolver {
    /// Create a resolver that defaults failed tempo resolution to
    /// `target_bpm`
    pub fn new(target_bpm: u32) -> Self {
        Self {
            target_bpm,
            bpm_cache: HashMap::new(),
            key_cache: HashMap::new(),
        }
    }

    /// Resolve the tempo for a sample
    ///
    /// Fallback chain: cache, filename, parent directory name, audio
    /// analysis (octave-corrected and grid-snapped), target tempo. Never
    /// fails; analysis problems are logged and substituted.
    pub fn resolve_bpm(&mut self, path: &Path, backend: &dyn AudioBackend) -> u32 {
        if let Some(&bpm) = self.bpm_cache.get(path) {
            return bpm;
        }

        let bpm = self.resolve_bpm_uncached(path, backend);
        self.bpm_cache.insert(path.to_path_buf(), bpm);
        bpm
    }

    fn resolve_bpm_uncached(&self, path: &Path, backend: &dyn AudioBackend) -> u32 {
        if let Some(bpm) = file_name_str(path).and_then(|name| extract_bpm(&name)) {
            return bpm;
        }

        if let Some(bpm) = parent_name_str(path).and_then(|name| extract_bpm(&name)) {
            return bpm;
        }

        let clip = match backend.load_analysis_window(path) {
            Ok(clip) => clip,
            Err(e) => {
                warn!("tempo analysis load failed, using target tempo: {}", e);
                return self.target_bpm;
            }
        };

        match backend.estimate_tempo(path, &clip) {
            Ok(raw) => {
                let snapped = snap_to_grid(octave_correct(raw));
                debug!(
                    "analyzed {} at {:.1} BPM, snapped to {}",
                    path.display(),
                    raw,
                    snapped
                );
                snapped
            }
            Err(e) => {
                warn!("{}, using target tempo", e);
                self.target_bpm
            }
        }
    }

    /// Resolve the key for a sample
    ///
    /// Filename first, then the parent directory name. There is no audio
    /// fallback for key: an unresolved key stays `None`, and that outcome is
    /// cached so the lookup runs at most once per path.
    pub fn resolve_key(&mut self, path: &Path) -> Option<CamelotKey> {
        if let Some(&key) = self.key_cache.get(path) {
            return key;
        }

        let key = file_name_str(path)
            .and_then(|name| extract_key(&name))
            .or_else(|| parent_name_str(path).and_then(|name| extract_key(&name)));

        self.key_cache.insert(path.to_path_buf(), key);
        key
    }

    /// Number of cached tempo entries
    pub fn bpm_cache_len(&self) -> usize {
        self.bpm_cache.len()
    }

    /// Number of cached key entries (including "no key" outcomes)
    pub fn key_cache_len(&self) -> usize {
        self.key_cache.len()
    }
}

fn file_name_str(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().to_lowercase())
}

fn parent_name_str(path: &Path) -> Option<String> {
    path.parent()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{AudioClip, INTERNAL_SAMPLE_RATE};
    use crate::error::{MixError, Result};
    use test_case::test_case;

    #[test_case("track_128bpm.wav", Some(128); "suffix token")]
    #[test_case("128bpm_groove.wav", Some(128); "prefix token")]
    #[test_case("bpm 140 loop.wav", Some(140); "bpm then number")]
    #[test_case("140-percussion", Some(140); "leading number")]
    #[test_case("melody_174", Some(174); "trailing number")]
    #[test_case("pads (122)", Some(122); "parenthesized")]
    #[test_case("track.wav", None; "no token")]
    #[test_case("song_200bpm.wav", None; "out of range high")]
    #[test_case("song_60bpm.wav", None; "out of range low")]
    fn test_extract_bpm(name: &str, expected: Option<u32>) {
        assert_eq!(extract_bpm(name), expected);
    }

    #[test_case("lead_8A.wav", "8A"; "camelot token")]
    #[test_case("key 12b pad.wav", "12B"; "key prefix")]
    #[test_case("bass_Cmin.wav", "5A"; "descriptive minor")]
    #[test_case("strings c major take3.wav", "8B"; "descriptive major")]
    #[test_case("arp_f#min.wav", "11A"; "sharp minor")]
    fn test_extract_key(name: &str, expected: &str) {
        assert_eq!(extract_key(name), Some(expected.parse().unwrap()));
    }

    #[test]
    fn test_extract_key_absent() {
        assert_eq!(extract_key("plain_drum_loop.wav"), None);
        // 13A is off the wheel and must not parse
        assert_eq!(extract_key("take 13a.wav"), None);
    }

    #[test]
    fn test_octave_correction() {
        assert_eq!(octave_correct(64.0), 128.0);
        assert_eq!(octave_correct(200.0), 100.0);
        assert_eq!(octave_correct(128.0), 128.0);
    }

    #[test]
    fn test_snap_to_grid() {
        assert_eq!(snap_to_grid(127.0), 126);
        assert_eq!(snap_to_grid(129.2), 130);
        assert_eq!(snap_to_grid(300.0), 180);
        assert_eq!(snap_to_grid(10.0), 80);
    }

    #[test]
    fn test_grid_is_within_bounds() {
        for &bpm in &CANONICAL_BPM_GRID {
            assert!((MIN_BPM..=MAX_BPM).contains(&bpm));
        }
    }

    /// Backend that counts analysis calls and always reports one tempo
    struct CountingBackend {
        calls: std::cell::Cell<usize>,
        bpm: Option<f64>,
    }

    impl AudioBackend for CountingBackend {
        fn load(&self, _path: &Path) -> Result<AudioClip> {
            Ok(AudioClip::silent(100, INTERNAL_SAMPLE_RATE))
        }

        fn load_analysis_window(&self, _path: &Path) -> Result<AudioClip> {
            Ok(AudioClip::silent(100, INTERNAL_SAMPLE_RATE))
        }

        fn estimate_tempo(&self, path: &Path, _clip: &AudioClip) -> Result<f64> {
            self.calls.set(self.calls.get() + 1);
            self.bpm.ok_or_else(|| MixError::AnalysisFailed {
                path: path.to_path_buf(),
            })
        }

        fn change_tempo(&self, clip: &AudioClip, _src: f64, _dst: f64) -> Result<AudioClip> {
            Ok(clip.clone())
        }

        fn export(&self, _clip: &AudioClip, _path: &Path) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_filename_wins_over_analysis() {
        let backend = CountingBackend {
            calls: std::cell::Cell::new(0),
            bpm: Some(95.0),
        };
        let mut resolver = MetadataResolver::new(128);
        let bpm = resolver.resolve_bpm(Path::new("loops/kick_140bpm.wav"), &backend);
        assert_eq!(bpm, 140);
        assert_eq!(backend.calls.get(), 0);
    }

    #[test]
    fn test_parent_directory_fallback() {
        let backend = CountingBackend {
            calls: std::cell::Cell::new(0),
            bpm: Some(95.0),
        };
        let mut resolver = MetadataResolver::new(128);
        let bpm = resolver.resolve_bpm(Path::new("samples/128bpm_house/kick.wav"), &backend);
        assert_eq!(bpm, 128);
        assert_eq!(backend.calls.get(), 0);
    }

    #[test]
    fn test_analysis_result_is_corrected_and_snapped() {
        let backend = CountingBackend {
            calls: std::cell::Cell::new(0),
            // Below range: octave correction doubles 63.4 to 126.8, grid
            // snaps to 126.
            bpm: Some(63.4),
        };
        let mut resolver = MetadataResolver::new(128);
        let bpm = resolver.resolve_bpm(Path::new("samples/kick.wav"), &backend);
        assert_eq!(bpm, 126);
    }

    #[test]
    fn test_analysis_failure_defaults_to_target() {
        let backend = CountingBackend {
            calls: std::cell::Cell::new(0),
            bpm: None,
        };
        let mut resolver = MetadataResolver::new(124);
        let bpm = resolver.resolve_bpm(Path::new("samples/kick.wav"), &backend);
        assert_eq!(bpm, 124);
    }

    #[test]
    fn test_bpm_cache_prevents_reanalysis() {
        let backend = CountingBackend {
            calls: std::cell::Cell::new(0),
            bpm: Some(120.0),
        };
        let mut resolver = MetadataResolver::new(128);
        let path = Path::new("samples/kick.wav");
        assert_eq!(resolver.resolve_bpm(path, &backend), 120);
        assert_eq!(resolver.resolve_bpm(path, &backend), 120);
        assert_eq!(backend.calls.get(), 1);
        assert_eq!(resolver.bpm_cache_len(), 1);
    }

    #[test]
    fn test_negative_key_result_is_cached() {
        let mut resolver = MetadataResolver::new(128);
        let path = Path::new("samples/unkeyed.wav");
        assert_eq!(resolver.resolve_key(path), None);
        assert_eq!(resolver.key_cache_len(), 1);
        assert_eq!(resolver.resolve_key(path), None);
        assert_eq!(resolver.key_cache_len(), 1);
    }

    #[test]
    fn test_resolved_bpm_always_in_range() {
        for raw in [20.0, 79.9, 80.0, 133.7, 180.0, 359.0] {
            let snapped = snap_to_grid(octave_correct(raw));
            assert!((MIN_BPM..=MAX_BPM).contains(&snapped), "raw {}", raw);
        }
    }
}
