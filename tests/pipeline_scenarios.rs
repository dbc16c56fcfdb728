//! End-to-end scenarios over the public API.

use std::f32::consts::PI;
use std::io::Cursor;

use asr_prep::audio::{
    parse_header, AudioResampler, BufferPool, ResampleQuality, ResamplerConfig, SampleFormat,
};
use asr_prep::pipeline::{AudioProcessingPipeline, Preset};

fn read_i16s(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|b| i16::from_le_bytes([b[0], b[1]]))
        .collect()
}

fn sine(freq: f32, rate: u32, frames: usize) -> Vec<f32> {
    (0..frames)
        .map(|i| (2.0 * PI * freq * i as f32 / rate as f32).sin())
        .collect()
}

// ---- one second of capture silence -----------------------------------------

#[test]
fn china_asr_turns_one_second_of_silence_into_32000_zero_bytes() {
    let mut pipeline = AudioProcessingPipeline::from_preset(Preset::ChinaAsr).unwrap();
    let mut pool = BufferPool::default();

    let input = vec![0u8; 48_000 * 2 * 4];
    assert_eq!(input.len(), 384_000);

    let output = pipeline.process(&input, &mut pool).unwrap().unwrap();
    assert_eq!(output.len(), 32_000);
    assert!(output.iter().all(|&b| b == 0));
}

// ---- sinc downsampling of a tone ------------------------------------------

#[test]
fn sinc_downsampling_preserves_tone_peak() {
    let input = sine(440.0, 48_000, 4_800);
    let input_peak = input.iter().fold(0.0_f32, |m, v| m.max(v.abs()));

    let mut resampler = AudioResampler::new(ResamplerConfig {
        input_rate: 48_000,
        output_rate: 16_000,
        channels: 1,
        quality: ResampleQuality::Sinc,
        input_format: SampleFormat::Float32,
        output_format: SampleFormat::Float32,
    })
    .unwrap();

    let output = resampler.resample(&SampleFormat::Float32.encode(&input));
    let samples = SampleFormat::Float32.decode(&output, 1);
    assert_eq!(samples.len(), 1_600);
    assert!(samples.iter().all(|v| v.is_finite()));

    let peak = samples.iter().fold(0.0_f32, |m, v| m.max(v.abs()));
    let ratio = peak / input_peak;
    assert!((0.95..=1.05).contains(&ratio), "peak ratio {ratio}");
}

#[test]
fn every_quality_keeps_interior_of_constant_signal() {
    for quality in [ResampleQuality::Simple, ResampleQuality::Linear, ResampleQuality::Sinc] {
        let mut resampler = AudioResampler::new(ResamplerConfig {
            input_rate: 44_100,
            output_rate: 16_000,
            channels: 1,
            quality,
            input_format: SampleFormat::Float32,
            output_format: SampleFormat::Float32,
        })
        .unwrap();

        let output = resampler.resample(&SampleFormat::Float32.encode(&[0.25; 4_410]));
        let samples = SampleFormat::Float32.decode(&output, 1);
        assert_eq!(samples.len(), 1_600);
        // stay clear of the zero-padded edges
        for &v in &samples[20..1_580] {
            assert!((v - 0.25).abs() < 1e-2, "{quality}: {v}");
        }
    }
}

// ---- clamping --------------------------------------------------------------

#[test]
fn out_of_range_floats_saturate_without_wrapping() {
    let mut pipeline = AudioProcessingPipeline::from_preset(Preset::GlobalAsr48k).unwrap();
    let mut pool = BufferPool::default();

    let input = SampleFormat::Float32.encode(&[2.0, 2.0, -2.0, -2.0, 1.0, 1.0]);
    let output = pipeline.process(&input, &mut pool).unwrap().unwrap();
    assert_eq!(read_i16s(&output), vec![32_767, -32_767, 32_767]);
}

// ---- WAV output ------------------------------------------------------------

#[test]
fn whisper_preset_emits_wav_readable_by_hound() {
    let mut pipeline = AudioProcessingPipeline::from_preset(Preset::OpenaiWhisper).unwrap();
    let mut pool = BufferPool::default();

    let mono = sine(440.0, 48_000, 4_800);
    let stereo: Vec<f32> = mono.iter().flat_map(|&v| [v * 0.5, v * 0.5]).collect();
    let packet_frames = 480;
    for chunk in stereo.chunks(packet_frames * 2) {
        let out = pipeline
            .process(&SampleFormat::Float32.encode(chunk), &mut pool)
            .unwrap();
        assert!(out.is_none());
    }
    let wav = pipeline.finalize().unwrap().unwrap();

    let header = parse_header(&wav).unwrap();
    assert_eq!(header.sample_rate, 16_000);
    assert_eq!(header.channels, 1);
    assert_eq!(header.bit_depth, 16);
    assert_eq!(header.data_size as usize, wav.len() - 44);
    assert_eq!(header.data_size, 1_600 * 2);

    let mut reader = hound::WavReader::new(Cursor::new(&wav)).unwrap();
    let spec = reader.spec();
    assert_eq!(spec.sample_rate, 16_000);
    assert_eq!(spec.channels, 1);
    assert_eq!(spec.bits_per_sample, 16);
    assert_eq!(spec.sample_format, hound::SampleFormat::Int);

    let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
    assert_eq!(samples, read_i16s(&wav[44..]));
    let peak = samples.iter().map(|s| s.unsigned_abs()).max().unwrap();
    assert!(peak > 15_000 && peak <= 16_384, "peak {peak}");
}

#[test]
fn hound_written_wav_parses() {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: 44_100,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for i in 0..200 {
            writer.write_sample(i as i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    let header = parse_header(cursor.get_ref()).unwrap();
    assert_eq!(header.format_name(), "PCM");
    assert_eq!(header.channels, 2);
    assert_eq!(header.sample_rate, 44_100);
    assert_eq!(header.block_align, 4);
    assert_eq!(header.data_size, 400);
}

// ---- presets ---------------------------------------------------------------

#[test]
fn every_preset_builds_and_processes_a_packet() {
    let mut pool = BufferPool::default();
    let packet = vec![0u8; 3_840];

    for preset in Preset::ALL {
        let mut pipeline = AudioProcessingPipeline::from_preset(preset).unwrap();
        let out = pipeline.process(&packet, &mut pool).unwrap();
        let expected = match preset {
            Preset::Raw => Some(3_840),
            Preset::GlobalAsr48k => Some(960),
            Preset::OpenaiWhisper => None,
            Preset::ChinaAsr | Preset::Azure | Preset::Google => Some(320),
        };
        assert_eq!(out.as_ref().map(Vec::len), expected, "{preset}");
        if let Some(buf) = out {
            pipeline.release_buffer(&mut pool, buf);
        }
    }
}
