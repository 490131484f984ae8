//! Sample library scanning

use std::path::{Path, PathBuf};

use log::debug;
use walkdir::WalkDir;

/// Extensions treated as audio samples, matched case-insensitively
pub const AUDIO_EXTENSIONS: [&str; 4] = ["wav", "mp3", "flac", "aiff"];

/// Recursively collect audio files under a directory
///
/// Results are sorted, so a seeded run over an unchanged library draws the
/// same samples regardless of filesystem iteration order.
pub fn collect_samples(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| is_audio_file(path))
        .collect();

    files.sort();
    debug!("found {} audio file(s) under {}", files.len(), dir.display());
    files
}

fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_lowercase();
            AUDIO_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}
