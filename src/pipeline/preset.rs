//! Named output profiles and the resolved pipeline configuration.
//!
//! | Preset           | Rate      | Channels  | Format  | Container |
//! |------------------|-----------|-----------|---------|-----------|
//! | `raw`            | unchanged | unchanged | float32 | pcm       |
//! | `china-asr`      | 16000     | 1         | int16   | pcm       |
//! | `openai-whisper` | 16000     | 1         | int16   | wav       |
//! | `global-asr-48k` | 48000     | 1         | int16   | pcm       |
//! | `azure`          | 16000     | 1         | int16   | pcm       |
//! | `google`         | 16000     | 1         | int16   | pcm       |
//!
//! A preset fixes the output side only.  [`PipelineConfig::for_preset`] pairs
//! it with an input description; [`PipelineConfig::from`] assumes the usual
//! capture shape of 48 kHz stereo float32.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::audio::sample::{validate_channels, validate_rate};
use crate::audio::{AudioError, ResampleQuality, SampleFormat};

// ---------------------------------------------------------------------------
// Container
// ---------------------------------------------------------------------------

/// How processed audio leaves the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Container {
    /// Headerless PCM, one output buffer per input buffer.
    #[default]
    Pcm,
    /// A single WAV file, produced by `finalize`.
    Wav,
}

impl Container {
    pub const fn as_str(self) -> &'static str {
        match self {
            Container::Pcm => "pcm",
            Container::Wav => "wav",
        }
    }
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Container {
    type Err = AudioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pcm" => Ok(Container::Pcm),
            "wav" => Ok(Container::Wav),
            other => Err(AudioError::invalid(
                "container",
                format!("{other:?} (expected one of: pcm, wav)"),
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// StreamFormat
// ---------------------------------------------------------------------------

/// Shape of an interleaved PCM stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub format: SampleFormat,
}

impl StreamFormat {
    pub const fn new(sample_rate: u32, channels: u16, format: SampleFormat) -> Self {
        Self {
            sample_rate,
            channels,
            format,
        }
    }

    /// Bytes per interleaved frame.
    pub fn frame_bytes(&self) -> usize {
        self.format.bytes_per_sample() * self.channels as usize
    }

    /// Bytes per second of audio.
    pub fn byte_rate(&self) -> usize {
        self.frame_bytes() * self.sample_rate as usize
    }

    fn validate(&self, side: &'static str) -> Result<(), AudioError> {
        validate_rate(side, self.sample_rate)?;
        validate_channels(self.channels)?;
        Ok(())
    }
}

impl Default for StreamFormat {
    /// 48 kHz stereo float32, the usual system-audio capture shape.
    fn default() -> Self {
        Self::new(48_000, 2, SampleFormat::Float32)
    }
}

impl fmt::Display for StreamFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} Hz, {} ch, {}",
            self.sample_rate, self.channels, self.format
        )
    }
}

// ---------------------------------------------------------------------------
// Preset
// ---------------------------------------------------------------------------

/// Named output profile for a speech-recognition backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Preset {
    Raw,
    #[default]
    ChinaAsr,
    OpenaiWhisper,
    #[serde(rename = "global-asr-48k")]
    GlobalAsr48k,
    Azure,
    Google,
}

impl Preset {
    pub const ALL: [Preset; 6] = [
        Preset::Raw,
        Preset::ChinaAsr,
        Preset::OpenaiWhisper,
        Preset::GlobalAsr48k,
        Preset::Azure,
        Preset::Google,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Preset::Raw => "raw",
            Preset::ChinaAsr => "china-asr",
            Preset::OpenaiWhisper => "openai-whisper",
            Preset::GlobalAsr48k => "global-asr-48k",
            Preset::Azure => "azure",
            Preset::Google => "google",
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            Preset::Raw => "Unprocessed capture output (float32, input rate and channels)",
            Preset::ChinaAsr => {
                "Baidu, Tencent, Xunfei and Aliyun speech services (int16, 16 kHz, mono)"
            }
            Preset::OpenaiWhisper => "OpenAI Whisper (WAV, int16, 16 kHz, mono)",
            Preset::GlobalAsr48k => "Services accepting 48 kHz input (int16, 48 kHz, mono)",
            Preset::Azure => "Azure Speech Service (int16, 16 kHz, mono)",
            Preset::Google => "Google Cloud Speech-to-Text (int16, 16 kHz, mono)",
        }
    }

    /// Output stream shape for `input`.
    pub fn output_for(self, input: StreamFormat) -> StreamFormat {
        match self {
            Preset::Raw => StreamFormat {
                format: SampleFormat::Float32,
                ..input
            },
            Preset::GlobalAsr48k => StreamFormat::new(48_000, 1, SampleFormat::Int16),
            Preset::ChinaAsr | Preset::OpenaiWhisper | Preset::Azure | Preset::Google => {
                StreamFormat::new(16_000, 1, SampleFormat::Int16)
            }
        }
    }

    pub const fn container(self) -> Container {
        match self {
            Preset::OpenaiWhisper => Container::Wav,
            _ => Container::Pcm,
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Preset {
    type Err = AudioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Preset::ALL
            .into_iter()
            .find(|p| p.name() == s)
            .ok_or_else(|| {
                let names: Vec<&str> = Preset::ALL.iter().map(|p| p.name()).collect();
                AudioError::invalid(
                    "preset",
                    format!("unknown preset {s:?}; available: {}", names.join(", ")),
                )
            })
    }
}

// ---------------------------------------------------------------------------
// PipelineConfig
// ---------------------------------------------------------------------------

/// Fully resolved pipeline parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    pub input: StreamFormat,
    pub output: StreamFormat,
    pub container: Container,
    /// Only consulted when the rates differ.
    pub quality: ResampleQuality,
}

impl PipelineConfig {
    /// Resolve `preset` against a concrete input shape.
    pub fn for_preset(preset: Preset, input: StreamFormat) -> Self {
        Self {
            input,
            output: preset.output_for(input),
            container: preset.container(),
            quality: ResampleQuality::Linear,
        }
    }

    pub fn needs_conversion(&self) -> bool {
        self.input.format != self.output.format || self.input.channels != self.output.channels
    }

    pub fn needs_resampling(&self) -> bool {
        self.input.sample_rate != self.output.sample_rate
    }

    pub(crate) fn validate(&self) -> Result<(), AudioError> {
        self.input.validate("input sample rate")?;
        self.output.validate("output sample rate")?;
        Ok(())
    }
}

impl From<Preset> for PipelineConfig {
    fn from(preset: Preset) -> Self {
        Self::for_preset(preset, StreamFormat::default())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Preset::default().into()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // ---- Preset ------------------------------------------------------------

    #[test]
    fn names_round_trip_through_from_str() {
        for preset in Preset::ALL {
            assert_eq!(preset.name().parse::<Preset>().unwrap(), preset);
            assert!(!preset.description().is_empty());
        }
    }

    #[test]
    fn unknown_preset_lists_available_names() {
        let err = "whisper".parse::<Preset>().unwrap_err().to_string();
        assert!(err.contains("whisper"), "{err}");
        assert!(err.contains("global-asr-48k"), "{err}");
    }

    #[test]
    fn serde_spellings_match_names() {
        #[derive(Serialize, Deserialize)]
        struct Wrapper {
            preset: Preset,
        }
        for preset in Preset::ALL {
            let text = toml::to_string(&Wrapper { preset }).unwrap();
            assert_eq!(text.trim(), format!("preset = \"{}\"", preset.name()));
            let back: Wrapper = toml::from_str(&text).unwrap();
            assert_eq!(back.preset, preset);
        }
    }

    // ---- resolution --------------------------------------------------------

    #[test]
    fn asr_presets_target_16k_mono_int16() {
        for preset in [Preset::ChinaAsr, Preset::Azure, Preset::Google, Preset::OpenaiWhisper] {
            let cfg = PipelineConfig::from(preset);
            assert_eq!(cfg.output, StreamFormat::new(16_000, 1, SampleFormat::Int16));
            assert!(cfg.needs_conversion());
            assert!(cfg.needs_resampling());
        }
        assert_eq!(PipelineConfig::from(Preset::OpenaiWhisper).container, Container::Wav);
        assert_eq!(PipelineConfig::from(Preset::ChinaAsr).container, Container::Pcm);
    }

    #[test]
    fn global_48k_skips_resampling() {
        let cfg = PipelineConfig::from(Preset::GlobalAsr48k);
        assert!(cfg.needs_conversion());
        assert!(!cfg.needs_resampling());
    }

    #[test]
    fn raw_keeps_input_shape() {
        let cfg = PipelineConfig::from(Preset::Raw);
        assert_eq!(cfg.output, cfg.input);
        assert!(!cfg.needs_conversion());
        assert!(!cfg.needs_resampling());

        let mono = StreamFormat::new(44_100, 1, SampleFormat::Float32);
        assert_eq!(Preset::Raw.output_for(mono), mono);
    }

    #[test]
    fn default_is_china_asr() {
        assert_eq!(PipelineConfig::default(), PipelineConfig::from(Preset::ChinaAsr));
    }

    // ---- StreamFormat ------------------------------------------------------

    #[test]
    fn stream_format_sizes() {
        let capture = StreamFormat::default();
        assert_eq!(capture.frame_bytes(), 8);
        assert_eq!(capture.byte_rate(), 384_000);
        assert_eq!(capture.to_string(), "48000 Hz, 2 ch, float32");
    }

    #[test]
    fn container_parsing() {
        assert_eq!("wav".parse::<Container>().unwrap(), Container::Wav);
        assert!("mp3".parse::<Container>().is_err());
    }
}
