//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`.
//! Every section is `#[serde(default)]`, so a file only needs the keys it
//! changes:
//!
//! ```toml
//! [input]
//! sample_rate = 44100
//!
//! [pipeline]
//! preset = "openai-whisper"
//! ```

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::audio::{BufferPool, ResampleQuality, SampleFormat};
use crate::pipeline::{Container, PipelineConfig, Preset, StreamFormat};

use super::AppPaths;

// ---------------------------------------------------------------------------
// InputConfig
// ---------------------------------------------------------------------------

/// Shape of the PCM arriving on stdin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub sample_rate: u32,
    /// 1 (mono) or 2 (interleaved stereo).
    pub channels: u16,
    pub format: SampleFormat,
    /// Bytes read per `process` call.  3840 is 10 ms of 48 kHz stereo
    /// float32.
    pub packet_bytes: usize,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            channels: 2,
            format: SampleFormat::Float32,
            packet_bytes: 3_840,
        }
    }
}

impl InputConfig {
    pub fn stream_format(&self) -> StreamFormat {
        StreamFormat::new(self.sample_rate, self.channels, self.format)
    }
}

// ---------------------------------------------------------------------------
// PipelineSettings
// ---------------------------------------------------------------------------

/// Output profile.  A `preset` wins over the explicit `output_*` fields.
///
/// A file without a `preset` key selects the explicit fields; only
/// [`PipelineSettings::default`] starts out on china-asr.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset: Option<Preset>,
    pub output_sample_rate: u32,
    pub output_channels: u16,
    pub output_format: SampleFormat,
    pub container: Container,
    /// Resampling tier, applied with or without a preset.
    pub quality: ResampleQuality,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            preset: Some(Preset::ChinaAsr),
            output_sample_rate: 16_000,
            output_channels: 1,
            output_format: SampleFormat::Int16,
            container: Container::Pcm,
            quality: ResampleQuality::Linear,
        }
    }
}

// ---------------------------------------------------------------------------
// PoolConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Free-list bound per size class.
    pub max_buffers_per_size: usize,
    /// Buffers pre-allocated per size class at startup.
    pub warmup: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_buffers_per_size: 50,
            warmup: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use asr_prep::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
/// let pipeline = config.pipeline_config();
///
/// // Modify and save
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub input: InputConfig,
    pub pipeline: PipelineSettings,
    pub pool: PoolConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path.
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path.
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns `true` when no `settings.toml` file exists yet.
    pub fn is_first_run() -> bool {
        !AppPaths::new().settings_file.exists()
    }

    /// Resolve the `[input]` and `[pipeline]` sections.
    pub fn pipeline_config(&self) -> PipelineConfig {
        let input = self.input.stream_format();
        let p = &self.pipeline;
        let mut config = match p.preset {
            Some(preset) => PipelineConfig::for_preset(preset, input),
            None => PipelineConfig {
                input,
                output: StreamFormat::new(
                    p.output_sample_rate,
                    p.output_channels,
                    p.output_format,
                ),
                container: p.container,
                quality: p.quality,
            },
        };
        config.quality = p.quality;
        config
    }

    /// A pool built and warmed up per the `[pool]` section.
    pub fn buffer_pool(&self) -> Result<BufferPool> {
        let mut pool = BufferPool::new(self.pool.max_buffers_per_size)?;
        if self.pool.warmup > 0 {
            pool.warmup(self.pool.warmup);
        }
        Ok(pool)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
