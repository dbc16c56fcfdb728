//! Audio preparation for speech-recognition services.
//!
//! Turns raw capture buffers (typically 48 kHz stereo float32) into the
//! shape an ASR backend expects, usually 16 kHz mono int16, optionally
//! framed as WAV.
//!
//! - [`audio`]: the individual DSP and container components.
//! - [`pipeline`]: presets and the stage chain that composes them.
//! - [`config`]: TOML-backed settings for the command-line tool.

pub mod audio;
pub mod config;
pub mod pipeline;
