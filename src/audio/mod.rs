//! Audio building blocks: sample encodings, windowed-sinc resampling, channel
//! and sample-width conversion, WAV framing and buffer recycling.
//!
//! # Data flow
//!
//! ```text
//! raw PCM bytes ─▶ AudioFormatConverter ─▶ AudioResampler ─▶ WavEncoder ─▶ bytes
//!                   (mixdown, quantise)     (rate change)     (RIFF header)
//!
//! BufferPool supplies and recycles the intermediate byte buffers.
//! ```
//!
//! Every stage works on interleaved little-endian PCM.  Internally the
//! resampler decodes to normalised `f32` (see [`SampleFormat`]) and encodes
//! back on the way out.
//!
//! # Quick Start
//!
//! ```rust
//! use asr_prep::audio::{AudioResampler, ResampleQuality, ResamplerConfig, SampleFormat};
//!
//! let mut resampler = AudioResampler::new(ResamplerConfig {
//!     input_rate: 48_000,
//!     output_rate: 16_000,
//!     channels: 1,
//!     quality: ResampleQuality::Sinc,
//!     input_format: SampleFormat::Float32,
//!     output_format: SampleFormat::Int16,
//! })
//! .unwrap();
//!
//! // 10 ms of mono float32 silence at 48 kHz
//! let input = vec![0u8; 480 * 4];
//! let output = resampler.resample(&input);
//! assert_eq!(output.len(), 160 * 2);
//! ```

pub mod convert;
pub mod error;
pub mod kaiser;
pub mod pool;
pub mod resample;
pub mod sample;
pub mod sinc;
pub mod wav;

pub use convert::{float32_to_int16, quantize_i16, stereo_to_mono, AudioFormatConverter};
pub use error::AudioError;
pub use kaiser::{bessel_i0, KaiserWindow, WindowStats};
pub use pool::{BufferPool, PoolStats, SIZE_CLASSES};
pub use resample::{
    AudioResampler, ResampleQuality, ResamplerConfig, ResamplerInfo, ResamplerStats,
};
pub use sample::SampleFormat;
pub use sinc::{sinc, SincConfig, SincInterpolator};
pub use wav::{
    parse_header, WavEncoder, WavHeader, WavSpec, WavStats, HEADER_LEN, MAX_DATA_SIZE,
};
