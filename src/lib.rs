//! Layermix - probabilistic multi-layer sample mixer
//!
//! Layermix assembles short multi-layer mixes from a library of audio
//! samples, choosing samples whose tempo and harmonic key fit a target and
//! probabilistically varying which instrument categories appear.
//!
//! # Architecture
//!
//! The decision engine runs a strictly linear pipeline:
//! - scan: collect audio files from the library
//! - classify: bucket samples into instrument-role categories
//! - select: stochastic category/sample choice with harmonic filtering
//!   (tempo/key resolved lazily with per-run caching)
//! - assemble: loop, gain, and overlay the chosen layers onto a
//!   fixed-duration canvas

pub mod audio;
pub mod camelot;
pub mod classify;
pub mod error;
pub mod metadata;
pub mod mixer;
pub mod scan;
pub mod select;

pub mod cli;

pub use camelot::CamelotKey;
pub use classify::Category;
pub use error::{MixError, Result};
pub use mixer::{MixOutput, MixSettings, MixerEngine};
pub use select::{CompositionInfo, MixMode, SelectionPolicy};
