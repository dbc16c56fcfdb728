//! The [`Stage`] seam and its three implementations.
//!
//! A pipeline is an ordered `Vec<Box<dyn Stage>>` built once.  Stages that a
//! configuration does not need are never constructed, so `process` has no
//! per-call branching on optional components.

use crate::audio::{AudioError, AudioFormatConverter, AudioResampler, BufferPool, WavEncoder};

/// One step of the processing chain.
pub trait Stage: Send {
    /// Short identifier used in logs and error context.
    fn name(&self) -> &'static str;

    /// Human-readable description of what this stage does.
    fn describe(&self) -> String;

    /// Transform `input`.
    ///
    /// `Ok(None)` means the stage consumed the data without producing output
    /// yet (see [`finalize`](Self::finalize)).  Returned buffers are drawn
    /// from `pool`.
    fn process(
        &mut self,
        input: &[u8],
        pool: &mut BufferPool,
    ) -> Result<Option<Vec<u8>>, AudioError>;

    /// Flush anything withheld by `process`.
    fn finalize(&mut self) -> Result<Option<Vec<u8>>, AudioError> {
        Ok(None)
    }
}

// ---------------------------------------------------------------------------
// ConvertStage
// ---------------------------------------------------------------------------

/// Channel mixdown and/or float → int quantisation.
#[derive(Debug)]
pub struct ConvertStage {
    converter: AudioFormatConverter,
}

impl ConvertStage {
    pub fn new(converter: AudioFormatConverter) -> Self {
        Self { converter }
    }
}

impl Stage for ConvertStage {
    fn name(&self) -> &'static str {
        "convert"
    }

    fn describe(&self) -> String {
        let c = &self.converter;
        let mut parts = Vec::new();
        if c.input_format() != c.output_format() {
            parts.push(format!("format {} -> {}", c.input_format(), c.output_format()));
        }
        if c.input_channels() != c.output_channels() {
            parts.push(format!(
                "channels {} -> {}",
                c.input_channels(),
                c.output_channels()
            ));
        }
        parts.join(", ")
    }

    fn process(
        &mut self,
        input: &[u8],
        pool: &mut BufferPool,
    ) -> Result<Option<Vec<u8>>, AudioError> {
        let mut out = pool.acquire(self.converter.estimate_output_size(input.len()));
        self.converter.convert_into(input, &mut out);
        Ok(Some(out))
    }
}

// ---------------------------------------------------------------------------
// ResampleStage
// ---------------------------------------------------------------------------

/// Sample-rate conversion.
#[derive(Debug)]
pub struct ResampleStage {
    resampler: AudioResampler,
}

impl ResampleStage {
    pub fn new(resampler: AudioResampler) -> Self {
        Self { resampler }
    }

    pub fn resampler(&self) -> &AudioResampler {
        &self.resampler
    }
}

impl Stage for ResampleStage {
    fn name(&self) -> &'static str {
        "resample"
    }

    fn describe(&self) -> String {
        let cfg = self.resampler.config();
        format!(
            "sample rate {} Hz -> {} Hz ({})",
            cfg.input_rate, cfg.output_rate, cfg.quality
        )
    }

    fn process(
        &mut self,
        input: &[u8],
        pool: &mut BufferPool,
    ) -> Result<Option<Vec<u8>>, AudioError> {
        let mut out = pool.acquire(self.resampler.estimate_output_size(input.len()));
        self.resampler.resample_into(input, &mut out);
        Ok(Some(out))
    }
}

// ---------------------------------------------------------------------------
// WavStage
// ---------------------------------------------------------------------------

/// Accumulates PCM and emits one WAV file on finalize.
#[derive(Debug)]
pub struct WavStage {
    encoder: WavEncoder,
}

impl WavStage {
    pub fn new(encoder: WavEncoder) -> Self {
        Self { encoder }
    }
}

impl Stage for WavStage {
    fn name(&self) -> &'static str {
        "wav"
    }

    fn describe(&self) -> String {
        let spec = self.encoder.spec();
        format!(
            "WAV container ({} Hz, {} ch, {}-bit {})",
            spec.sample_rate, spec.channels, spec.bit_depth, spec.format
        )
    }

    fn process(
        &mut self,
        input: &[u8],
        _pool: &mut BufferPool,
    ) -> Result<Option<Vec<u8>>, AudioError> {
        self.encoder.add_chunk(input);
        Ok(None)
    }

    fn finalize(&mut self) -> Result<Option<Vec<u8>>, AudioError> {
        self.encoder.finalize().map(Some)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{ResamplerConfig, SampleFormat};

    #[test]
    fn convert_stage_output_comes_from_pool() {
        let converter =
            AudioFormatConverter::new(2, 1, SampleFormat::Float32, SampleFormat::Int16).unwrap();
        let mut stage = ConvertStage::new(converter);
        let mut pool = BufferPool::default();
        pool.warmup(1);

        let input = vec![0u8; 3_840];
        let out = stage.process(&input, &mut pool).unwrap().unwrap();
        assert_eq!(out.len(), 960);
        assert_eq!(out.capacity(), 4_096);
        assert_eq!(pool.stats().hits, 1);
        assert_eq!(stage.describe(), "format float32 -> int16, channels 2 -> 1");
    }

    #[test]
    fn resample_stage_shrinks_by_ratio() {
        let resampler = AudioResampler::new(ResamplerConfig {
            input_format: SampleFormat::Int16,
            ..ResamplerConfig::default()
        })
        .unwrap();
        let mut stage = ResampleStage::new(resampler);
        let mut pool = BufferPool::default();

        let out = stage.process(&[0u8; 960], &mut pool).unwrap().unwrap();
        assert_eq!(out.len(), 320);
        assert!(stage.describe().contains("48000 Hz -> 16000 Hz"));
    }

    #[test]
    fn wav_stage_withholds_until_finalize() {
        let mut stage = WavStage::new(WavEncoder::for_china_asr());
        let mut pool = BufferPool::default();

        assert_eq!(stage.process(&[1, 2], &mut pool).unwrap(), None);
        assert_eq!(stage.process(&[3, 4], &mut pool).unwrap(), None);
        let wav = stage.finalize().unwrap().unwrap();
        assert_eq!(&wav[44..], &[1, 2, 3, 4]);
        assert_eq!(stage.finalize().unwrap_err(), AudioError::NoChunks);
    }

    #[test]
    fn default_finalize_is_empty() {
        let converter =
            AudioFormatConverter::new(1, 1, SampleFormat::Float32, SampleFormat::Int16).unwrap();
        assert_eq!(ConvertStage::new(converter).finalize().unwrap(), None);
    }
}
