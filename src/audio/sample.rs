//! Sample encodings and the byte ⇄ `f32` sample view.
//!
//! Buffers crossing the crate boundary are raw interleaved little-endian PCM
//! with no self-describing metadata.  The helpers here decode such a buffer
//! into normalised `f32` samples once, so the DSP code can work on native
//! float slices, and encode the result back at the other end.
//!
//! | Encoding  | Bytes | Decode            | Encode                                  |
//! |-----------|-------|-------------------|-----------------------------------------|
//! | `float32` | 4     | passthrough       | passthrough                             |
//! | `int16`   | 2     | `v / 32768`       | `round(v * 32767)` clamped to `i16`     |

use std::fmt;
use std::str::FromStr;

use byteorder::{ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};

use super::error::AudioError;

// ---------------------------------------------------------------------------
// SampleFormat
// ---------------------------------------------------------------------------

/// On-the-wire sample encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleFormat {
    /// IEEE-754 single precision, nominal range `[-1.0, 1.0]`.
    #[default]
    Float32,
    /// Signed 16-bit integer.
    Int16,
}

impl SampleFormat {
    /// Size of one sample in bytes.
    pub const fn bytes_per_sample(self) -> usize {
        match self {
            SampleFormat::Float32 => 4,
            SampleFormat::Int16 => 2,
        }
    }

    /// Bit depth written to container headers.
    pub const fn bit_depth(self) -> u16 {
        match self {
            SampleFormat::Float32 => 32,
            SampleFormat::Int16 => 16,
        }
    }

    /// The lowercase spelling used in configuration files.
    pub const fn as_str(self) -> &'static str {
        match self {
            SampleFormat::Float32 => "float32",
            SampleFormat::Int16 => "int16",
        }
    }

    /// Number of whole frames contained in `byte_len` bytes.
    ///
    /// Trailing partial frames are ignored.
    pub fn frames_in(self, byte_len: usize, channels: u16) -> usize {
        let frame = self.bytes_per_sample() * channels as usize;
        if frame == 0 {
            0
        } else {
            byte_len / frame
        }
    }

    /// Decode whole frames of `bytes` into normalised samples, replacing the
    /// contents of `out`.
    pub fn decode_into(self, bytes: &[u8], channels: u16, out: &mut Vec<f32>) {
        let samples = self.frames_in(bytes.len(), channels) * channels as usize;
        let width = self.bytes_per_sample();
        let bytes = &bytes[..samples * width];

        out.clear();
        out.reserve(samples);
        match self {
            SampleFormat::Float32 => {
                out.extend(bytes.chunks_exact(4).map(LittleEndian::read_f32));
            }
            SampleFormat::Int16 => {
                out.extend(
                    bytes
                        .chunks_exact(2)
                        .map(|b| LittleEndian::read_i16(b) as f32 / 32_768.0),
                );
            }
        }
    }

    /// Convenience wrapper around [`decode_into`](Self::decode_into).
    ///
    /// ```rust
    /// use asr_prep::audio::SampleFormat;
    ///
    /// let bytes = [0x00, 0x40, 0x00, 0xC0]; // 16384, -16384
    /// let samples = SampleFormat::Int16.decode(&bytes, 1);
    /// assert_eq!(samples, vec![0.5, -0.5]);
    /// ```
    pub fn decode(self, bytes: &[u8], channels: u16) -> Vec<f32> {
        let mut out = Vec::new();
        self.decode_into(bytes, channels, &mut out);
        out
    }

    /// Encode `samples`, appending to `out`.
    ///
    /// `int16` output is `round(v * 32767)` clamped to `[-32768, 32767]`, so
    /// out-of-range floats saturate instead of wrapping.
    pub fn encode_into(self, samples: &[f32], out: &mut Vec<u8>) {
        let start = out.len();
        out.resize(start + samples.len() * self.bytes_per_sample(), 0);
        let dst = &mut out[start..];

        match self {
            SampleFormat::Float32 => {
                for (chunk, &v) in dst.chunks_exact_mut(4).zip(samples) {
                    LittleEndian::write_f32(chunk, v);
                }
            }
            SampleFormat::Int16 => {
                for (chunk, &v) in dst.chunks_exact_mut(2).zip(samples) {
                    LittleEndian::write_i16(chunk, denormalize_i16(v));
                }
            }
        }
    }

    /// Convenience wrapper around [`encode_into`](Self::encode_into).
    pub fn encode(self, samples: &[f32]) -> Vec<u8> {
        let mut out = Vec::with_capacity(samples.len() * self.bytes_per_sample());
        self.encode_into(samples, &mut out);
        out
    }
}

/// `round(v * 32767)` saturated to the `i16` range.
pub(crate) fn denormalize_i16(v: f32) -> i16 {
    let scaled = (v * 32_767.0).round();
    scaled.clamp(i16::MIN as f32, i16::MAX as f32) as i16
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SampleFormat {
    type Err = AudioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "float32" => Ok(SampleFormat::Float32),
            "int16" => Ok(SampleFormat::Int16),
            other => Err(AudioError::invalid(
                "sample format",
                format!("{other:?} (expected one of: float32, int16)"),
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Channel validation
// ---------------------------------------------------------------------------

/// Accepts mono or stereo, rejects anything else.
pub(crate) fn validate_channels(channels: u16) -> Result<u16, AudioError> {
    match channels {
        1 | 2 => Ok(channels),
        n => Err(AudioError::invalid(
            "channel count",
            format!("only mono (1) and stereo (2) are supported, got {n}"),
        )),
    }
}

/// Rejects a zero sample rate.
pub(crate) fn validate_rate(name: &'static str, rate: u32) -> Result<u32, AudioError> {
    if rate == 0 {
        Err(AudioError::invalid(name, "must be a positive number, got 0"))
    } else {
        Ok(rate)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
