//! Layermix CLI - generate a mix from a sample library

use std::fs;
use std::path::PathBuf;

use clap::Parser;
use env_logger::Env;
use log::info;

use layermix::cli::Cli;
use layermix::{MixMode, MixSettings, MixerEngine, Result};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).init();

    info!("Layermix v{}", env!("CARGO_PKG_VERSION"));

    let settings = MixSettings {
        target_bpm: cli.bpm,
        target_key: cli.key,
        mode: if cli.experimental {
            MixMode::Experimental
        } else {
            MixMode::Standard
        },
        num_layers: cli.layers,
        mix_duration_ms: cli.duration_ms,
    };

    let mut engine = MixerEngine::new(&cli.samples_dir, settings)?;
    if let Some(seed) = cli.seed {
        engine = engine.with_seed(seed);
    }

    let output = engine.generate_mix()?;

    // The working directory goes away with the engine; keep the artifact.
    let destination = cli.output.unwrap_or_else(|| PathBuf::from("mix.wav"));
    fs::copy(&output.audio_path, &destination)?;
    info!("mix written to {}", destination.display());

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&output.info)?);
    } else {
        println!("{}", output.summary);
    }

    Ok(())
}
