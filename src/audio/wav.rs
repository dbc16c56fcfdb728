//! Canonical 44-byte RIFF/WAVE framing.
//!
//! Layout written by [`WavEncoder::generate_header`] (all integers
//! little-endian):
//!
//! | Offset | Size | Field                                   |
//! |--------|------|-----------------------------------------|
//! | 0      | 4    | `"RIFF"`                                |
//! | 4      | 4    | `36 + data_size`                        |
//! | 8      | 4    | `"WAVE"`                                |
//! | 12     | 4    | `"fmt "`                                |
//! | 16     | 4    | `16`                                    |
//! | 20     | 2    | audio format (1 = PCM, 3 = IEEE float)  |
//! | 22     | 2    | channels                                |
//! | 24     | 4    | sample rate                             |
//! | 28     | 4    | byte rate                               |
//! | 32     | 2    | block align                             |
//! | 34     | 2    | bits per sample                         |
//! | 36     | 4    | `"data"`                                |
//! | 40     | 4    | `data_size`                             |
//!
//! [`parse_header`] reads the same fixed offsets back.  Files with extra
//! sub-chunks between `fmt ` and `data` are not understood.
//!
//! ```rust
//! use asr_prep::audio::{parse_header, WavEncoder};
//!
//! let mut encoder = WavEncoder::for_china_asr();
//! let wav = encoder.encode(&[0u8; 3_200]).unwrap();
//! let header = parse_header(&wav).unwrap();
//! assert_eq!(header.sample_rate, 16_000);
//! assert_eq!(header.data_size, 3_200);
//! ```

use std::fmt;
use std::time::Duration;

use byteorder::{ByteOrder, LittleEndian};

use super::error::AudioError;
use super::sample::{validate_channels, validate_rate, SampleFormat};

/// Size of the canonical header.
pub const HEADER_LEN: usize = 44;

const FORMAT_PCM: u16 = 1;
const FORMAT_IEEE_FLOAT: u16 = 3;

// ---------------------------------------------------------------------------
// WavSpec
// ---------------------------------------------------------------------------

/// Stream parameters written into the `fmt ` chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavSpec {
    pub sample_rate: u32,
    pub channels: u16,
    pub format: SampleFormat,
    /// Must agree with `format`: 16 for int16, 32 for float32.
    pub bit_depth: u16,
}

impl WavSpec {
    /// Spec with the bit depth implied by `format`.
    pub fn new(sample_rate: u32, channels: u16, format: SampleFormat) -> Self {
        Self {
            sample_rate,
            channels,
            format,
            bit_depth: format.bit_depth(),
        }
    }

    fn validate(&self) -> Result<(), AudioError> {
        validate_rate("WAV sample rate", self.sample_rate)?;
        validate_channels(self.channels)?;
        if self.bit_depth != self.format.bit_depth() {
            return Err(AudioError::invalid(
                "WAV bit depth",
                format!(
                    "{} format requires {}-bit depth, got {}",
                    self.format,
                    self.format.bit_depth(),
                    self.bit_depth
                ),
            ));
        }
        Ok(())
    }

    pub fn audio_format(&self) -> u16 {
        match self.format {
            SampleFormat::Int16 => FORMAT_PCM,
            SampleFormat::Float32 => FORMAT_IEEE_FLOAT,
        }
    }

    pub fn block_align(&self) -> u16 {
        self.channels * (self.bit_depth / 8)
    }

    pub fn byte_rate(&self) -> u32 {
        self.sample_rate * self.block_align() as u32
    }
}

impl Default for WavSpec {
    /// 16 kHz mono int16.
    fn default() -> Self {
        Self::new(16_000, 1, SampleFormat::Int16)
    }
}

// ---------------------------------------------------------------------------
// WavStats
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WavStats {
    pub headers_generated: u64,
    pub total_data_size: u64,
    pub total_output_size: u64,
}

impl WavStats {
    /// Mean PCM payload per encoded file, rounded.
    pub fn average_data_size(&self) -> u64 {
        if self.headers_generated == 0 {
            0
        } else {
            (self.total_data_size as f64 / self.headers_generated as f64).round() as u64
        }
    }

    /// Header bytes as a percentage of all output bytes.
    pub fn header_overhead_percent(&self) -> f64 {
        if self.total_data_size == 0 {
            0.0
        } else {
            (self.total_output_size - self.total_data_size) as f64 / self.total_output_size as f64
                * 100.0
        }
    }
}

// ---------------------------------------------------------------------------
// WavEncoder
// ---------------------------------------------------------------------------

/// Wraps raw PCM in a WAV header, either one buffer at a time or by
/// accumulating a stream of chunks.
#[derive(Debug, Clone)]
pub struct WavEncoder {
    spec: WavSpec,
    pending: Vec<u8>,
    pending_chunks: usize,
    stats: WavStats,
}

impl WavEncoder {
    /// # Errors
    ///
    /// [`AudioError::InvalidParameter`] for a zero sample rate, a channel count
    /// other than 1 or 2, or a bit depth that does not match the format.
    pub fn new(spec: WavSpec) -> Result<Self, AudioError> {
        spec.validate()?;
        Ok(Self {
            spec,
            pending: Vec::new(),
            pending_chunks: 0,
            stats: WavStats::default(),
        })
    }

    /// 16 kHz int16, as accepted by OpenAI Whisper.
    pub fn for_whisper(channels: u16) -> Result<Self, AudioError> {
        Self::new(WavSpec::new(16_000, channels, SampleFormat::Int16))
    }

    /// 16 kHz mono int16.
    pub fn for_china_asr() -> Self {
        Self {
            spec: WavSpec::default(),
            pending: Vec::new(),
            pending_chunks: 0,
            stats: WavStats::default(),
        }
    }

    pub fn spec(&self) -> &WavSpec {
        &self.spec
    }

    /// The 44-byte header for a payload of `data_size` bytes.
    pub fn generate_header(&self, data_size: u32) -> [u8; HEADER_LEN] {
        let spec = &self.spec;
        let mut h = [0u8; HEADER_LEN];

        h[0..4].copy_from_slice(b"RIFF");
        LittleEndian::write_u32(&mut h[4..8], 36u32.saturating_add(data_size));
        h[8..12].copy_from_slice(b"WAVE");

        h[12..16].copy_from_slice(b"fmt ");
        LittleEndian::write_u32(&mut h[16..20], 16);
        LittleEndian::write_u16(&mut h[20..22], spec.audio_format());
        LittleEndian::write_u16(&mut h[22..24], spec.channels);
        LittleEndian::write_u32(&mut h[24..28], spec.sample_rate);
        LittleEndian::write_u32(&mut h[28..32], spec.byte_rate());
        LittleEndian::write_u16(&mut h[32..34], spec.block_align());
        LittleEndian::write_u16(&mut h[34..36], spec.bit_depth);

        h[36..40].copy_from_slice(b"data");
        LittleEndian::write_u32(&mut h[40..44], data_size);
        h
    }

    /// Header followed by `pcm`.
    ///
    /// # Errors
    ///
    /// [`AudioError::InvalidWav`] if `pcm` is too large for the 32-bit RIFF
    /// size fields.
    pub fn encode(&mut self, pcm: &[u8]) -> Result<Vec<u8>, AudioError> {
        let data_size = payload_size(pcm.len())?;
        let mut out = Vec::with_capacity(HEADER_LEN + pcm.len());
        out.extend_from_slice(&self.generate_header(data_size));
        out.extend_from_slice(pcm);

        self.stats.headers_generated += 1;
        self.stats.total_data_size += pcm.len() as u64;
        self.stats.total_output_size += out.len() as u64;
        Ok(out)
    }

    /// Buffer a chunk for the next [`finalize`](Self::finalize).
    pub fn add_chunk(&mut self, chunk: &[u8]) {
        self.pending.extend_from_slice(chunk);
        self.pending_chunks += 1;
    }

    /// Number of chunks added since the last finalize.
    pub fn pending_chunks(&self) -> usize {
        self.pending_chunks
    }

    /// Bytes accumulated since the last finalize.
    pub fn pending_bytes(&self) -> usize {
        self.pending.len()
    }

    /// Encode everything added so far as one file and start over.
    ///
    /// # Errors
    ///
    /// [`AudioError::NoChunks`] if nothing was added, and
    /// [`AudioError::InvalidWav`] if the accumulated data no longer fits a
    /// WAV file.  The pending data is kept in the second case.
    pub fn finalize(&mut self) -> Result<Vec<u8>, AudioError> {
        if self.pending_chunks == 0 {
            return Err(AudioError::NoChunks);
        }
        payload_size(self.pending.len())?;
        let pcm = std::mem::take(&mut self.pending);
        self.pending_chunks = 0;
        self.encode(&pcm)
    }

    pub fn stats(&self) -> &WavStats {
        &self.stats
    }
}

/// Largest payload whose RIFF chunk size (`36 + data_size`) fits in 32 bits.
pub const MAX_DATA_SIZE: u32 = u32::MAX - 36;

fn payload_size(len: usize) -> Result<u32, AudioError> {
    u32::try_from(len)
        .ok()
        .filter(|&n| n <= MAX_DATA_SIZE)
        .ok_or_else(|| {
            AudioError::InvalidWav(format!(
                "{len} bytes of audio exceed the {MAX_DATA_SIZE}-byte WAV limit"
            ))
        })
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Fields read back from a canonical header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavHeader {
    /// Raw format code; see [`format_name`](Self::format_name).
    pub audio_format: u16,
    pub channels: u16,
    pub sample_rate: u32,
    pub byte_rate: u32,
    pub block_align: u16,
    pub bit_depth: u16,
    pub data_size: u32,
}

impl WavHeader {
    pub fn format_name(&self) -> String {
        match self.audio_format {
            FORMAT_PCM => "PCM".to_string(),
            FORMAT_IEEE_FLOAT => "IEEE Float".to_string(),
            other => format!("Unknown ({other})"),
        }
    }

    /// Sample encoding implied by the format code and bit depth.
    pub fn sample_format(&self) -> Option<SampleFormat> {
        match (self.audio_format, self.bit_depth) {
            (FORMAT_PCM, 16) => Some(SampleFormat::Int16),
            (FORMAT_IEEE_FLOAT, 32) => Some(SampleFormat::Float32),
            _ => None,
        }
    }

    /// The encoder spec this header describes.
    ///
    /// # Errors
    ///
    /// [`AudioError::InvalidWav`] for format/bit-depth pairs this crate does
    /// not write.
    pub fn spec(&self) -> Result<WavSpec, AudioError> {
        let format = self.sample_format().ok_or_else(|| {
            AudioError::InvalidWav(format!(
                "unsupported encoding: {} at {} bits",
                self.format_name(),
                self.bit_depth
            ))
        })?;
        Ok(WavSpec {
            sample_rate: self.sample_rate,
            channels: self.channels,
            format,
            bit_depth: self.bit_depth,
        })
    }

    /// Playback length of the payload, `None` when the byte rate is zero.
    pub fn duration(&self) -> Option<Duration> {
        if self.byte_rate == 0 {
            return None;
        }
        Some(Duration::from_secs_f64(
            self.data_size as f64 / self.byte_rate as f64,
        ))
    }
}

impl fmt::Display for WavHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} Hz, {} ch, {}-bit, {} data bytes",
            self.format_name(),
            self.sample_rate,
            self.channels,
            self.bit_depth,
            self.data_size
        )?;
        if let Some(d) = self.duration() {
            write!(f, " ({:.2} seconds)", d.as_secs_f64())?;
        }
        Ok(())
    }
}

/// Read the fixed-offset fields of a canonical 44-byte header.
///
/// # Errors
///
/// [`AudioError::InvalidWav`] when `bytes` is shorter than 44 bytes or the
/// `RIFF`/`WAVE` magic is missing.
pub fn parse_header(bytes: &[u8]) -> Result<WavHeader, AudioError> {
    if bytes.len() < HEADER_LEN {
        return Err(AudioError::InvalidWav(format!(
            "buffer too small to contain WAV header ({} < {HEADER_LEN} bytes)",
            bytes.len()
        )));
    }
    if &bytes[0..4] != b"RIFF" {
        return Err(AudioError::InvalidWav("missing RIFF signature".into()));
    }
    if &bytes[8..12] != b"WAVE" {
        return Err(AudioError::InvalidWav("missing WAVE format".into()));
    }

    Ok(WavHeader {
        audio_format: LittleEndian::read_u16(&bytes[20..22]),
        channels: LittleEndian::read_u16(&bytes[22..24]),
        sample_rate: LittleEndian::read_u32(&bytes[24..28]),
        byte_rate: LittleEndian::read_u32(&bytes[28..32]),
        block_align: LittleEndian::read_u16(&bytes[32..34]),
        bit_depth: LittleEndian::read_u16(&bytes[34..36]),
        data_size: LittleEndian::read_u32(&bytes[40..44]),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
