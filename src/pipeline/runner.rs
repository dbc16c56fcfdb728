//! Pipeline orchestrator: runs raw capture buffers through the configured
//! stage chain.
//!
//! [`AudioProcessingPipeline`] decides once, at construction, which stages a
//! [`PipelineConfig`] needs and keeps only those:
//!
//! ```text
//! input ─▶ [convert] ─▶ [resample] ─▶ [wav] ─▶ output
//!          formats or    rates          container
//!          channels      differ         is wav
//!          differ
//! ```
//!
//! Each call to [`process`](AudioProcessingPipeline::process) is synchronous.
//! Intermediate buffers are acquired from the caller's [`BufferPool`] and
//! released back to it as soon as the next stage has consumed them.  The
//! resampler keeps no fractional position between calls, so successive
//! buffers are resampled independently.

use std::fmt;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::audio::{
    AudioError, AudioFormatConverter, AudioResampler, BufferPool, ResampleQuality,
    ResamplerConfig, WavEncoder, WavSpec,
};

use super::preset::{Container, PipelineConfig, Preset, StreamFormat};
use super::stage::{ConvertStage, ResampleStage, Stage, WavStage};

// ---------------------------------------------------------------------------
// PipelineError
// ---------------------------------------------------------------------------

/// Errors that can surface from the pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The configuration was rejected while building a stage.
    #[error("pipeline configuration rejected: {0}")]
    Config(#[from] AudioError),

    /// A stage failed while processing or finalizing.
    #[error("pipeline stage '{stage}' failed: {source}")]
    Stage {
        stage: &'static str,
        #[source]
        source: AudioError,
    },
}

// ---------------------------------------------------------------------------
// PipelineStats
// ---------------------------------------------------------------------------

/// Running totals over successful `process` calls.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PipelineStats {
    pub total_input_bytes: u64,
    /// PCM bytes produced by the last sample-level stage (in WAV mode, the
    /// bytes handed to the encoder).
    pub total_output_bytes: u64,
    pub total_processing_time: Duration,
    pub chunks_processed: u64,
}

impl PipelineStats {
    /// `(1 − output / input) · 100`, or `0.0` before any input.
    pub fn size_reduction_percent(&self) -> f64 {
        if self.total_input_bytes == 0 {
            return 0.0;
        }
        (1.0 - self.total_output_bytes as f64 / self.total_input_bytes as f64) * 100.0
    }

    pub fn average_ms_per_chunk(&self) -> f64 {
        if self.chunks_processed == 0 {
            return 0.0;
        }
        self.total_processing_time.as_secs_f64() * 1_000.0 / self.chunks_processed as f64
    }

    /// `input : output`, `None` until some output exists.
    pub fn compression_ratio(&self) -> Option<f64> {
        if self.total_input_bytes == 0 || self.total_output_bytes == 0 {
            return None;
        }
        Some(self.total_input_bytes as f64 / self.total_output_bytes as f64)
    }
}

impl fmt::Display for PipelineStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} chunks, {} -> {} bytes ({:.1}% smaller",
            self.chunks_processed,
            self.total_input_bytes,
            self.total_output_bytes,
            self.size_reduction_percent(),
        )?;
        if let Some(ratio) = self.compression_ratio() {
            write!(f, ", {ratio:.2}:1")?;
        }
        write!(f, "), {:.2} ms/chunk", self.average_ms_per_chunk())
    }
}

// ---------------------------------------------------------------------------
// PipelineInfo
// ---------------------------------------------------------------------------

/// Static description of a built pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineInfo {
    pub input: StreamFormat,
    pub output: StreamFormat,
    pub container: Container,
    /// One entry per active stage, in execution order.
    pub steps: Vec<String>,
    /// `None` when no resampling stage is present.
    pub quality: Option<ResampleQuality>,
}

impl fmt::Display for PipelineInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "input:  {}", self.input)?;
        writeln!(f, "output: {} ({})", self.output, self.container)?;
        if self.steps.is_empty() {
            return write!(f, "steps:  passthrough");
        }
        write!(f, "steps:")?;
        for (i, step) in self.steps.iter().enumerate() {
            write!(f, "\n  {}. {step}", i + 1)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// AudioProcessingPipeline
// ---------------------------------------------------------------------------

/// Converter, resampler and WAV encoder composed for one output profile.
pub struct AudioProcessingPipeline {
    config: PipelineConfig,
    stages: Vec<Box<dyn Stage>>,
    stats: PipelineStats,
}

impl fmt::Debug for AudioProcessingPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioProcessingPipeline")
            .field("config", &self.config)
            .field("stages", &self.stage_names())
            .field("stats", &self.stats)
            .finish()
    }
}

impl AudioProcessingPipeline {
    /// Build the stage chain for `config`.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Config`] when a rate is zero, a channel count is not
    /// 1 or 2, or the conversion direction is unsupported (mono → stereo,
    /// int16 → float32).
    pub fn new(config: PipelineConfig) -> Result<Self, PipelineError> {
        config.validate()?;

        let mut stages: Vec<Box<dyn Stage>> = Vec::new();

        if config.needs_conversion() {
            let converter = AudioFormatConverter::new(
                config.input.channels,
                config.output.channels,
                config.input.format,
                config.output.format,
            )?;
            stages.push(Box::new(ConvertStage::new(converter)));
        }

        if config.needs_resampling() {
            // Runs after conversion, so both sides use the output shape.
            let resampler = AudioResampler::new(ResamplerConfig {
                input_rate: config.input.sample_rate,
                output_rate: config.output.sample_rate,
                channels: config.output.channels,
                quality: config.quality,
                input_format: config.output.format,
                output_format: config.output.format,
            })?;
            stages.push(Box::new(ResampleStage::new(resampler)));
        }

        if config.container == Container::Wav {
            let encoder = WavEncoder::new(WavSpec::new(
                config.output.sample_rate,
                config.output.channels,
                config.output.format,
            ))?;
            stages.push(Box::new(WavStage::new(encoder)));
        }

        let pipeline = Self {
            config,
            stages,
            stats: PipelineStats::default(),
        };
        log::debug!(
            "audio pipeline built: {} -> {} ({}), stages: {:?}",
            config.input,
            config.output,
            config.container,
            pipeline.stage_names()
        );
        Ok(pipeline)
    }

    /// Build from a named preset with the default 48 kHz stereo float32 input.
    pub fn from_preset(preset: Preset) -> Result<Self, PipelineError> {
        Self::new(PipelineConfig::from(preset))
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Names of the active stages in execution order.
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Run `input` through every stage.
    ///
    /// Returns `Ok(None)` in WAV mode, where output is withheld until
    /// [`finalize`](Self::finalize).  With no active stages the input is
    /// copied into a pool buffer unchanged.
    ///
    /// Statistics are only updated when every stage succeeds.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Stage`] naming the stage that failed.
    pub fn process(
        &mut self,
        input: &[u8],
        pool: &mut BufferPool,
    ) -> Result<Option<Vec<u8>>, PipelineError> {
        let started = Instant::now();
        let mut current: Option<Vec<u8>> = None;
        let mut withheld_bytes = None;

        for stage in &mut self.stages {
            let src = current.as_deref().unwrap_or(input);
            let src_len = src.len();

            match stage.process(src, pool) {
                Ok(Some(next)) => {
                    if let Some(consumed) = current.replace(next) {
                        pool.release(consumed);
                    }
                }
                Ok(None) => {
                    withheld_bytes = Some(src_len);
                    break;
                }
                Err(source) => {
                    if let Some(consumed) = current.take() {
                        pool.release(consumed);
                    }
                    return Err(PipelineError::Stage {
                        stage: stage.name(),
                        source,
                    });
                }
            }
        }

        let (output, output_len) = match withheld_bytes {
            Some(len) => {
                if let Some(consumed) = current.take() {
                    pool.release(consumed);
                }
                (None, len)
            }
            None => {
                let out = current.unwrap_or_else(|| {
                    let mut copy = pool.acquire(input.len());
                    copy.clear();
                    copy.extend_from_slice(input);
                    copy
                });
                let len = out.len();
                (Some(out), len)
            }
        };

        self.stats.total_input_bytes += input.len() as u64;
        self.stats.total_output_bytes += output_len as u64;
        self.stats.total_processing_time += started.elapsed();
        self.stats.chunks_processed += 1;

        Ok(output)
    }

    /// Emit whatever the stages withheld: the complete WAV file in WAV mode,
    /// `None` otherwise.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Stage`] wrapping [`AudioError::NoChunks`] when WAV
    /// mode saw no input since the last finalize.
    pub fn finalize(&mut self) -> Result<Option<Vec<u8>>, PipelineError> {
        let mut result = None;
        for stage in &mut self.stages {
            let flushed = stage.finalize().map_err(|source| PipelineError::Stage {
                stage: stage.name(),
                source,
            })?;
            if flushed.is_some() {
                result = flushed;
            }
        }
        Ok(result)
    }

    /// Hand a buffer returned by [`process`](Self::process) back to `pool`.
    pub fn release_buffer(&self, pool: &mut BufferPool, buffer: Vec<u8>) -> bool {
        pool.release(buffer)
    }

    pub fn info(&self) -> PipelineInfo {
        let quality = self
            .config
            .needs_resampling()
            .then_some(self.config.quality);
        PipelineInfo {
            input: self.config.input,
            output: self.config.output,
            container: self.config.container,
            steps: self.stages.iter().map(|s| s.describe()).collect(),
            quality,
        }
    }

    pub fn stats(&self) -> &PipelineStats {
        &self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = PipelineStats::default();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
