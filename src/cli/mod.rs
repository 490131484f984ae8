//! CLI Module
//!
//! Command-line interface for generating mixes from a sample library.

use std::path::PathBuf;

use clap::Parser;

use crate::camelot::CamelotKey;

/// Layermix - probabilistic multi-layer sample mixer
#[derive(Parser, Debug)]
#[command(name = "layermix")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Directory containing the sample library
    pub samples_dir: PathBuf,

    /// Target tempo in BPM
    #[arg(long, default_value_t = 128)]
    pub bpm: u32,

    /// Target Camelot key, e.g. 8A
    #[arg(long, default_value = "8A")]
    pub key: CamelotKey,

    /// Number of layers to request
    #[arg(short, long, default_value_t = 3)]
    pub layers: usize,

    /// Use the experimental probability table
    #[arg(long)]
    pub experimental: bool,

    /// Mix duration in milliseconds
    #[arg(long, default_value_t = 30000)]
    pub duration_ms: u64,

    /// Where to copy the rendered mix (defaults to ./mix.wav)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Seed the random stream for a reproducible mix
    #[arg(long)]
    pub seed: Option<u64>,

    /// Print the composition descriptor as JSON instead of the summary
    #[arg(long)]
    pub json: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}
