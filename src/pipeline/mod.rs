//! Pipeline module: presets and the stage chain that turns capture buffers
//! into ASR-ready audio.
//!
//! # Architecture
//!
//! ```text
//! Preset ──▶ PipelineConfig ──▶ AudioProcessingPipeline::new
//!                                      │  builds only the needed stages
//!                                      ▼
//!                     Vec<Box<dyn Stage>>: convert → resample → wav
//!
//! process(&[u8], &mut BufferPool) ─▶ Some(pcm)   (pcm container)
//!                                 └▶ None        (wav container, see finalize)
//! ```
//!
//! # Quick start
//!
//! ```rust
//! use asr_prep::audio::BufferPool;
//! use asr_prep::pipeline::{AudioProcessingPipeline, Preset};
//!
//! let mut pipeline = AudioProcessingPipeline::from_preset(Preset::ChinaAsr).unwrap();
//! let mut pool = BufferPool::default();
//!
//! // one second of 48 kHz stereo float32 silence
//! let input = vec![0u8; 384_000];
//! let output = pipeline.process(&input, &mut pool).unwrap().unwrap();
//! assert_eq!(output.len(), 32_000);
//! pipeline.release_buffer(&mut pool, output);
//! ```

pub mod preset;
pub mod runner;
pub mod stage;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use preset::{Container, PipelineConfig, Preset, StreamFormat};
pub use runner::{AudioProcessingPipeline, PipelineError, PipelineInfo, PipelineStats};
pub use stage::{ConvertStage, ResampleStage, Stage, WavStage};
