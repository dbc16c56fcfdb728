//! Quality-tiered sample-rate conversion over raw PCM byte buffers.
//!
//! [`AudioResampler`] decodes the input bytes into normalised `f32` samples,
//! runs one of three interpolators and re-encodes into the output format:
//!
//! | Quality  | Method                                   | Cost / sample   |
//! |----------|------------------------------------------|-----------------|
//! | `simple` | nearest earlier sample, `in[⌊i·r⌋]`      | O(1)            |
//! | `linear` | linear blend of `⌊i·r⌋` and `⌊i·r⌋ + 1`  | O(1) (default)  |
//! | `sinc`   | Kaiser-windowed sinc, [`SincInterpolator`] | O(filter length) |
//!
//! `r = input_rate / output_rate` is fixed when the resampler is built.  Each
//! call is independent: no fractional position or history is carried from one
//! buffer into the next, so streamed output restarts its phase at every
//! buffer boundary.
//!
//! # Example
//!
//! ```rust
//! use asr_prep::audio::{AudioResampler, ResamplerConfig, SampleFormat};
//!
//! let mut resampler = AudioResampler::new(ResamplerConfig {
//!     input_rate: 48_000,
//!     output_rate: 16_000,
//!     input_format: SampleFormat::Float32,
//!     output_format: SampleFormat::Int16,
//!     ..ResamplerConfig::default()
//! })
//! .unwrap();
//!
//! let input = SampleFormat::Float32.encode(&vec![0.25; 480]); // 10 ms mono
//! let output = resampler.resample(&input);
//! assert_eq!(output.len(), resampler.estimate_output_size(input.len()));
//! assert_eq!(output.len(), 160 * 2);
//! ```

use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use super::error::AudioError;
use super::sample::{validate_channels, validate_rate, SampleFormat};
use super::sinc::{SincConfig, SincInterpolator};

// ---------------------------------------------------------------------------
// ResampleQuality
// ---------------------------------------------------------------------------

/// Interpolation tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResampleQuality {
    Simple,
    #[default]
    Linear,
    Sinc,
}

impl ResampleQuality {
    pub const fn as_str(self) -> &'static str {
        match self {
            ResampleQuality::Simple => "simple",
            ResampleQuality::Linear => "linear",
            ResampleQuality::Sinc => "sinc",
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            ResampleQuality::Simple => "fast, lower quality (direct sample dropping)",
            ResampleQuality::Linear => "balanced quality and performance (linear interpolation)",
            ResampleQuality::Sinc => "best quality (Kaiser-windowed sinc)",
        }
    }
}

impl fmt::Display for ResampleQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResampleQuality {
    type Err = AudioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "simple" => Ok(ResampleQuality::Simple),
            "linear" => Ok(ResampleQuality::Linear),
            "sinc" => Ok(ResampleQuality::Sinc),
            other => Err(AudioError::invalid(
                "resampling quality",
                format!("{other:?} (expected one of: simple, linear, sinc)"),
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// ResamplerConfig
// ---------------------------------------------------------------------------

/// Construction parameters for [`AudioResampler`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResamplerConfig {
    pub input_rate: u32,
    pub output_rate: u32,
    /// 1 (mono) or 2 (interleaved stereo).
    pub channels: u16,
    pub quality: ResampleQuality,
    pub input_format: SampleFormat,
    pub output_format: SampleFormat,
}

impl Default for ResamplerConfig {
    /// 48 kHz float32 mono → 16 kHz int16, linear.
    fn default() -> Self {
        Self {
            input_rate: 48_000,
            output_rate: 16_000,
            channels: 1,
            quality: ResampleQuality::default(),
            input_format: SampleFormat::Float32,
            output_format: SampleFormat::Int16,
        }
    }
}

// ---------------------------------------------------------------------------
// ResamplerStats
// ---------------------------------------------------------------------------

/// Counters accumulated across [`AudioResampler::resample`] calls.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResamplerStats {
    /// Decoded input samples (frames × channels).
    pub total_input_samples: u64,
    /// Produced output samples (frames × channels).
    pub total_output_samples: u64,
    pub total_processing_time: Duration,
    pub calls: u64,
    /// Time spent building the sinc table, when the sinc tier is active.
    pub sinc_init_time: Option<Duration>,
}

/// Human-readable description of a resampler's configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ResamplerInfo {
    pub config: ResamplerConfig,
    pub ratio: f64,
    pub quality_description: &'static str,
    /// Sinc table shape, when the sinc tier is active.
    pub sinc: Option<SincConfig>,
}

impl fmt::Display for ResamplerInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} Hz -> {} Hz, {} ch, {} -> {}, ratio {:.2}, {} ({})",
            self.config.input_rate,
            self.config.output_rate,
            self.config.channels,
            self.config.input_format,
            self.config.output_format,
            self.ratio,
            self.config.quality,
            self.quality_description,
        )
    }
}

// ---------------------------------------------------------------------------
// AudioResampler
// ---------------------------------------------------------------------------

/// Byte-level resampling facade.  Not internally synchronised; use one
/// instance per stream.
#[derive(Debug)]
pub struct AudioResampler {
    config: ResamplerConfig,
    ratio: f64,
    sinc: Option<SincInterpolator>,
    stats: ResamplerStats,
    scratch_in: Vec<f32>,
    scratch_out: Vec<f32>,
}

impl AudioResampler {
    /// Validate `config` and build the resampler.  The sinc table is only
    /// generated when `quality` is [`ResampleQuality::Sinc`].
    ///
    /// # Errors
    ///
    /// [`AudioError::InvalidParameter`] for a zero sample rate or a channel
    /// count other than 1 or 2.
    pub fn new(config: ResamplerConfig) -> Result<Self, AudioError> {
        Self::validate(&config)?;

        let (sinc, init_time) = if config.quality == ResampleQuality::Sinc {
            let started = Instant::now();
            let interp = SincInterpolator::new(SincConfig::default())?;
            (Some(interp), Some(started.elapsed()))
        } else {
            (None, None)
        };

        Ok(Self::assemble(config, sinc, init_time))
    }

    /// Build a sinc-tier resampler around an existing interpolator, sharing
    /// its coefficient table.  `config.quality` is forced to `Sinc`.
    pub fn with_interpolator(
        mut config: ResamplerConfig,
        interpolator: SincInterpolator,
    ) -> Result<Self, AudioError> {
        config.quality = ResampleQuality::Sinc;
        Self::validate(&config)?;
        Ok(Self::assemble(config, Some(interpolator), None))
    }

    fn validate(config: &ResamplerConfig) -> Result<(), AudioError> {
        validate_rate("input sample rate", config.input_rate)?;
        validate_rate("output sample rate", config.output_rate)?;
        validate_channels(config.channels)?;
        Ok(())
    }

    fn assemble(
        config: ResamplerConfig,
        sinc: Option<SincInterpolator>,
        sinc_init_time: Option<Duration>,
    ) -> Self {
        Self {
            ratio: config.input_rate as f64 / config.output_rate as f64,
            config,
            sinc,
            stats: ResamplerStats {
                sinc_init_time,
                ..ResamplerStats::default()
            },
            scratch_in: Vec::new(),
            scratch_out: Vec::new(),
        }
    }

    pub fn config(&self) -> &ResamplerConfig {
        &self.config
    }

    /// `input_rate / output_rate`.
    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    /// Output frames produced for `input_frames`, `⌊frames · out / in⌋`.
    pub fn output_frames(&self, input_frames: usize) -> usize {
        (input_frames as u64 * self.config.output_rate as u64 / self.config.input_rate as u64)
            as usize
    }

    /// Exact byte length [`resample`](Self::resample) returns for an input of
    /// `input_bytes` bytes.
    pub fn estimate_output_size(&self, input_bytes: usize) -> usize {
        let frames = self
            .config
            .input_format
            .frames_in(input_bytes, self.config.channels);
        self.output_frames(frames)
            * self.config.channels as usize
            * self.config.output_format.bytes_per_sample()
    }

    /// Resample `input` into a newly allocated buffer.
    pub fn resample(&mut self, input: &[u8]) -> Vec<u8> {
        let mut output = Vec::with_capacity(self.estimate_output_size(input.len()));
        self.resample_into(input, &mut output);
        output
    }

    /// Resample `input`, replacing the contents of `output`.
    ///
    /// `output` keeps its allocation, so a buffer obtained from a
    /// [`BufferPool`](super::BufferPool) can be reused across calls.
    pub fn resample_into(&mut self, input: &[u8], output: &mut Vec<u8>) {
        let started = Instant::now();

        let mut samples = std::mem::take(&mut self.scratch_in);
        let mut resampled = std::mem::take(&mut self.scratch_out);

        self.config
            .input_format
            .decode_into(input, self.config.channels, &mut samples);
        self.resample_samples(&samples, &mut resampled);

        output.clear();
        self.config.output_format.encode_into(&resampled, output);

        self.stats.total_input_samples += samples.len() as u64;
        self.stats.total_output_samples += resampled.len() as u64;
        self.stats.total_processing_time += started.elapsed();
        self.stats.calls += 1;

        self.scratch_in = samples;
        self.scratch_out = resampled;
    }

    /// Resample already-decoded interleaved samples, replacing `output`.
    pub fn resample_samples(&self, input: &[f32], output: &mut Vec<f32>) {
        let channels = self.config.channels as usize;
        let input_frames = input.len() / channels;
        let output_frames = self.output_frames(input_frames);

        output.clear();
        output.resize(output_frames * channels, 0.0);
        if input_frames == 0 {
            return;
        }
        let input = &input[..input_frames * channels];

        match (self.config.quality, &self.sinc) {
            (ResampleQuality::Simple, _) => self.simple(input, output, channels),
            (ResampleQuality::Linear, _) => self.linear(input, output, channels),
            (ResampleQuality::Sinc, Some(sinc)) if channels == 1 => {
                sinc.resample(input, output, self.ratio)
            }
            (ResampleQuality::Sinc, Some(sinc)) => sinc.resample_stereo(input, output, self.ratio),
            // not constructed: the sinc tier always builds an interpolator
            (ResampleQuality::Sinc, None) => self.linear(input, output, channels),
        }
    }

    fn simple(&self, input: &[f32], output: &mut [f32], channels: usize) {
        let last = input.len() / channels - 1;
        for (i, frame) in output.chunks_exact_mut(channels).enumerate() {
            let src = ((i as f64 * self.ratio) as usize).min(last) * channels;
            frame.copy_from_slice(&input[src..src + channels]);
        }
    }

    fn linear(&self, input: &[f32], output: &mut [f32], channels: usize) {
        let input_frames = input.len() / channels;
        for (i, frame) in output.chunks_exact_mut(channels).enumerate() {
            let position = i as f64 * self.ratio;
            let idx = (position as usize).min(input_frames - 1);
            let fraction = (position - idx as f64) as f32;

            for (ch, out) in frame.iter_mut().enumerate() {
                let a = input[idx * channels + ch];
                let b = if idx + 1 < input_frames {
                    input[(idx + 1) * channels + ch]
                } else {
                    a
                };
                *out = a + (b - a) * fraction;
            }
        }
    }

    pub fn stats(&self) -> &ResamplerStats {
        &self.stats
    }

    /// Zero the counters.  The recorded sinc build time is kept.
    pub fn reset_stats(&mut self) {
        self.stats = ResamplerStats {
            sinc_init_time: self.stats.sinc_init_time,
            ..ResamplerStats::default()
        };
    }

    /// Milliseconds of processing per second of produced audio, or `None`
    /// before any output has been produced.
    pub fn average_processing_ms_per_sec(&self) -> Option<f64> {
        let frames = self.stats.total_output_samples / self.config.channels as u64;
        if frames == 0 {
            return None;
        }
        let audio_secs = frames as f64 / self.config.output_rate as f64;
        Some(self.stats.total_processing_time.as_secs_f64() * 1_000.0 / audio_secs)
    }

    pub fn info(&self) -> ResamplerInfo {
        ResamplerInfo {
            config: self.config,
            ratio: self.ratio,
            quality_description: self.config.quality.description(),
            sinc: self.sinc.as_ref().map(|s| *s.config()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
