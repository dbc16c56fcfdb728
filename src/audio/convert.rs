//! Channel mixdown and sample-width conversion.
//!
//! Two directions are supported, applied in a fixed order:
//!
//! 1. **stereo → mono**: each frame becomes `(L + R) / 2`, halving the length.
//! 2. **float32 → int16**: clamp to `[-1.0, 1.0]`, then `round(v · 32767)`,
//!    halving the bytes per sample.
//!
//! Mixdown runs before quantisation so the average is taken at full float
//! precision and the signal is rounded only once.
//!
//! # Example
//!
//! ```rust
//! use asr_prep::audio::{AudioFormatConverter, SampleFormat};
//!
//! let converter = AudioFormatConverter::new(2, 1, SampleFormat::Float32, SampleFormat::Int16).unwrap();
//! let stereo = SampleFormat::Float32.encode(&[0.5, -0.5, 1.0, 0.0]);
//! let mono = converter.convert(&stereo);
//! assert_eq!(mono.len(), stereo.len() / 4);
//! ```

use byteorder::{ByteOrder, LittleEndian};

use super::error::AudioError;
use super::sample::{validate_channels, SampleFormat};

/// Clamp to `[-1.0, 1.0]` and scale to `i16`.
pub fn quantize_i16(v: f32) -> i16 {
    (v.clamp(-1.0, 1.0) * 32_767.0).round() as i16
}

/// Average interleaved stereo frames into mono, keeping the sample format.
///
/// A trailing partial frame is dropped.
pub fn stereo_to_mono(bytes: &[u8], format: SampleFormat) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len() / 2);
    mix_frames(bytes, format, &mut out);
    out
}

/// Quantise little-endian `f32` samples to little-endian `i16`.
pub fn float32_to_int16(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len() / 2);
    out.extend(
        bytes
            .chunks_exact(4)
            .flat_map(|b| quantize_i16(LittleEndian::read_f32(b)).to_le_bytes()),
    );
    out
}

fn mix_frames(bytes: &[u8], format: SampleFormat, out: &mut Vec<u8>) {
    match format {
        SampleFormat::Float32 => out.extend(bytes.chunks_exact(8).flat_map(|frame| {
            let left = LittleEndian::read_f32(&frame[0..4]);
            let right = LittleEndian::read_f32(&frame[4..8]);
            ((left + right) / 2.0).to_le_bytes()
        })),
        SampleFormat::Int16 => out.extend(bytes.chunks_exact(4).flat_map(|frame| {
            let left = LittleEndian::read_i16(&frame[0..2]) as i32;
            let right = LittleEndian::read_i16(&frame[2..4]) as i32;
            (((left + right) / 2) as i16).to_le_bytes()
        })),
    }
}

// ---------------------------------------------------------------------------
// AudioFormatConverter
// ---------------------------------------------------------------------------

/// Stateless converter for one fixed input → output shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormatConverter {
    input_channels: u16,
    output_channels: u16,
    input_format: SampleFormat,
    output_format: SampleFormat,
}

impl AudioFormatConverter {
    /// # Errors
    ///
    /// - [`AudioError::InvalidParameter`] for channel counts other than 1 or 2.
    /// - [`AudioError::UnsupportedConversion`] for mono → stereo or
    ///   int16 → float32.
    pub fn new(
        input_channels: u16,
        output_channels: u16,
        input_format: SampleFormat,
        output_format: SampleFormat,
    ) -> Result<Self, AudioError> {
        validate_channels(input_channels)?;
        validate_channels(output_channels)?;

        if input_channels < output_channels {
            return Err(AudioError::UnsupportedConversion {
                from: format!("{input_channels} channel(s)"),
                to: format!("{output_channels} channels"),
            });
        }
        if input_format == SampleFormat::Int16 && output_format == SampleFormat::Float32 {
            return Err(AudioError::UnsupportedConversion {
                from: input_format.to_string(),
                to: output_format.to_string(),
            });
        }

        Ok(Self {
            input_channels,
            output_channels,
            input_format,
            output_format,
        })
    }

    pub fn needs_mixdown(&self) -> bool {
        self.input_channels == 2 && self.output_channels == 1
    }

    pub fn needs_quantize(&self) -> bool {
        self.input_format == SampleFormat::Float32 && self.output_format == SampleFormat::Int16
    }

    pub fn input_format(&self) -> SampleFormat {
        self.input_format
    }

    pub fn output_format(&self) -> SampleFormat {
        self.output_format
    }

    pub fn input_channels(&self) -> u16 {
        self.input_channels
    }

    pub fn output_channels(&self) -> u16 {
        self.output_channels
    }

    /// Convert into a newly allocated buffer.
    pub fn convert(&self, input: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.estimate_output_size(input.len()));
        self.convert_into(input, &mut out);
        out
    }

    /// Convert `input`, replacing the contents of `output` (its allocation is
    /// kept).
    pub fn convert_into(&self, input: &[u8], output: &mut Vec<u8>) {
        output.clear();
        let frame = self.input_format.bytes_per_sample() * self.input_channels as usize;
        let input = &input[..input.len() / frame * frame];

        match (self.needs_mixdown(), self.needs_quantize()) {
            (false, false) => output.extend_from_slice(input),
            (true, false) => mix_frames(input, self.input_format, output),
            (false, true) => output.extend(
                input
                    .chunks_exact(4)
                    .flat_map(|b| quantize_i16(LittleEndian::read_f32(b)).to_le_bytes()),
            ),
            (true, true) => output.extend(input.chunks_exact(8).flat_map(|frame| {
                let left = LittleEndian::read_f32(&frame[0..4]);
                let right = LittleEndian::read_f32(&frame[4..8]);
                quantize_i16((left + right) / 2.0).to_le_bytes()
            })),
        }
    }

    /// Exact output length for `input_bytes` of input.
    pub fn estimate_output_size(&self, input_bytes: usize) -> usize {
        self.input_format.frames_in(input_bytes, self.input_channels)
            * self.output_channels as usize
            * self.output_format.bytes_per_sample()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
