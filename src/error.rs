//! Error handling for layermix
//!
//! The taxonomy mirrors the recovery policy: configuration errors are fatal
//! and surface to the caller, per-sample errors drop a single layer, and
//! analysis failures fall back to the configured target tempo.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for layermix operations
pub type Result<T> = std::result::Result<T, MixError>;

/// Main error type for layermix operations
#[derive(Error, Debug)]
pub enum MixError {
    // Configuration errors (fatal)
    #[error("No audio files found under {dir}")]
    NoSamplesFound { dir: String },

    #[error("No layers survived selection")]
    NoLayersSelected,

    #[error("Cannot assemble a mix from an empty layer list")]
    EmptyLayerList,

    #[error("Layer volume must be positive, got {volume}")]
    InvalidVolume { volume: f64 },

    // Per-sample errors (recoverable: the layer is dropped)
    #[error("Failed to decode {path}: {reason}")]
    DecodeFailed {
        path: PathBuf,
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Tempo conversion failed for {path}: {reason}")]
    TempoConversionFailed { path: PathBuf, reason: String },

    // Analysis errors (recoverable: target tempo substituted)
    #[error("Both tempo estimators failed for {path}")]
    AnalysisFailed { path: PathBuf },

    #[error("Unsupported audio format: {format}")]
    UnsupportedFormat { format: String },

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl MixError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            MixError::NoSamplesFound { .. } => "NO_SAMPLES_FOUND",
            MixError::NoLayersSelected => "NO_LAYERS_SELECTED",
            MixError::EmptyLayerList => "EMPTY_LAYER_LIST",
            MixError::InvalidVolume { .. } => "INVALID_VOLUME",
            MixError::DecodeFailed { .. } => "DECODE_FAILED",
            MixError::TempoConversionFailed { .. } => "TEMPO_CONVERSION_FAILED",
            MixError::AnalysisFailed { .. } => "ANALYSIS_FAILED",
            MixError::UnsupportedFormat { .. } => "UNSUPPORTED_FORMAT",
            MixError::Io(_) => "IO_ERROR",
            MixError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Check if this error is recoverable within a generation run
    ///
    /// Recoverable errors never abort the run: a failed sample is skipped and
    /// a failed analysis is replaced by the target tempo. Everything else is
    /// fatal to the current generation.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            MixError::DecodeFailed { .. }
                | MixError::TempoConversionFailed { .. }
                | MixError::AnalysisFailed { .. }
                | MixError::UnsupportedFormat { .. }
        )
    }
}
