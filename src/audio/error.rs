//! Error type shared by the audio building blocks.
//!
//! Construction-time validation failures and the few per-call failures
//! (WAV parsing, finalizing an empty stream, window length mismatches) are
//! all reported through [`AudioError`].

use thiserror::Error;

// ---------------------------------------------------------------------------
// AudioError
// ---------------------------------------------------------------------------

/// Errors raised by the resampler, converter, window, interpolator and WAV
/// components.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AudioError {
    /// A configuration value is outside its accepted range or spelling.
    #[error("invalid {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// The converter was asked for a direction it cannot perform.
    #[error("unsupported conversion: {from} -> {to}")]
    UnsupportedConversion { from: String, to: String },

    /// Two buffers that must have equal length did not.
    #[error("length mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    /// A buffer could not be parsed as a canonical WAV file.
    #[error("invalid WAV data: {0}")]
    InvalidWav(String),

    /// `finalize` was called on a streaming encoder with nothing added.
    #[error("no chunks to finalize")]
    NoChunks,
}

impl AudioError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        AudioError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}
