//! Kaiser-windowed sinc interpolation with a precomputed polyphase table.
//!
//! The table holds `phase_count` rows of `filter_length = 2 × lobe_count`
//! taps, laid out flat as `[phase * filter_length + tap]`:
//!
//! ```text
//! offset = phase / phase_count
//! x      = (tap − lobe_count) + offset
//! coeff  = sinc(x) · kaiser[tap]          then each row is divided by its sum
//! ```
//!
//! Row normalisation gives every phase unity DC gain.  The table is built once
//! and shared behind an `Arc`, so clones of an interpolator are cheap and may
//! be handed to other threads.
//!
//! Interpolation zero-pads outside the input slice.  Output near either edge
//! of a buffer therefore sees fewer taps and is biased towards zero; in
//! streaming use this is the accepted cost of not carrying history across
//! calls.

use std::f64::consts::PI;
use std::sync::Arc;
use std::time::Instant;

use super::error::AudioError;
use super::kaiser::KaiserWindow;

/// Number of leading phases re-summed after the table is built.
const VERIFY_PHASES: usize = 5;
/// Allowed deviation of a phase's coefficient sum from 1.0.
const GAIN_TOLERANCE: f64 = 1e-3;

/// Normalised sinc, `sin(πx) / (πx)` with `sinc(0) = 1`.
pub fn sinc(x: f64) -> f64 {
    if x.abs() < 1e-10 {
        1.0
    } else {
        let pix = PI * x;
        pix.sin() / pix
    }
}

// ---------------------------------------------------------------------------
// SincConfig
// ---------------------------------------------------------------------------

/// Shape of the polyphase table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SincConfig {
    /// Sinc lobes on each side of the centre tap, `[4, 64]`.
    pub lobe_count: usize,
    /// Fractional-delay resolution, `[64, 8192]`.
    pub phase_count: usize,
    /// Kaiser shape parameter, `[0, 20]`.
    pub beta: f64,
}

impl Default for SincConfig {
    /// 16 lobes, 1024 phases, β = 7 (about −70 dB stopband).
    fn default() -> Self {
        Self {
            lobe_count: 16,
            phase_count: 1024,
            beta: 7.0,
        }
    }
}

impl SincConfig {
    fn validate(&self) -> Result<(), AudioError> {
        if !(4..=64).contains(&self.lobe_count) {
            return Err(AudioError::invalid(
                "lobe count",
                format!("must be in [4, 64], got {}", self.lobe_count),
            ));
        }
        if !(64..=8192).contains(&self.phase_count) {
            return Err(AudioError::invalid(
                "phase count",
                format!("must be in [64, 8192], got {}", self.phase_count),
            ));
        }
        if !(0.0..=20.0).contains(&self.beta) {
            return Err(AudioError::invalid(
                "sinc beta",
                format!("must be in [0, 20], got {}", self.beta),
            ));
        }
        Ok(())
    }

    /// Taps per phase.
    pub fn filter_length(&self) -> usize {
        self.lobe_count * 2
    }

    /// Total number of coefficients in the table.
    pub fn table_size(&self) -> usize {
        self.phase_count * self.filter_length()
    }
}

// ---------------------------------------------------------------------------
// SincInterpolator
// ---------------------------------------------------------------------------

/// Fractional-delay FIR interpolator over a shared coefficient table.
#[derive(Debug, Clone)]
pub struct SincInterpolator {
    config: SincConfig,
    filter_length: usize,
    coefficients: Arc<[f32]>,
}

impl SincInterpolator {
    /// Build the coefficient table for `config`.
    ///
    /// # Errors
    ///
    /// [`AudioError::InvalidParameter`] when `lobe_count ∉ [4, 64]`,
    /// `phase_count ∉ [64, 8192]` or `beta ∉ [0, 20]`.
    pub fn new(config: SincConfig) -> Result<Self, AudioError> {
        config.validate()?;

        let started = Instant::now();
        let coefficients = build_table(&config)?;
        verify_table(&coefficients, &config);

        log::debug!(
            "sinc table built in {:?}: {} phases x {} taps ({:.2} KiB)",
            started.elapsed(),
            config.phase_count,
            config.filter_length(),
            (config.table_size() * std::mem::size_of::<f32>()) as f64 / 1024.0,
        );

        Ok(Self {
            config,
            filter_length: config.filter_length(),
            coefficients: coefficients.into(),
        })
    }

    pub fn config(&self) -> &SincConfig {
        &self.config
    }

    pub fn filter_length(&self) -> usize {
        self.filter_length
    }

    /// The flat coefficient table, `phase_count × filter_length` entries.
    pub fn coefficients(&self) -> &[f32] {
        &self.coefficients
    }

    /// Taps of a single phase.
    ///
    /// # Errors
    ///
    /// [`AudioError::InvalidParameter`] if `phase >= phase_count`.
    pub fn phase(&self, phase: usize) -> Result<&[f32], AudioError> {
        if phase >= self.config.phase_count {
            return Err(AudioError::invalid(
                "phase",
                format!("{phase} out of bounds [0, {})", self.config.phase_count),
            ));
        }
        Ok(self.row(phase))
    }

    /// `phase` must come from [`locate`](Self::locate).
    fn row(&self, phase: usize) -> &[f32] {
        let base = phase * self.filter_length;
        &self.coefficients[base..base + self.filter_length]
    }

    /// Split a read position into its integer part and table phase.
    fn locate(&self, position: f64) -> (i64, usize) {
        let int_part = position.floor();
        let frac = position - int_part;
        let phase = ((frac * self.config.phase_count as f64) as usize)
            .min(self.config.phase_count - 1);
        (int_part as i64, phase)
    }

    /// Taps `[lo, hi)` whose source frame `start + tap` lies in `[0, frames)`.
    fn tap_range(&self, start: i64, frames: usize) -> (usize, usize) {
        let lo = (-start).clamp(0, self.filter_length as i64) as usize;
        let hi = (frames as i64 - start).clamp(0, self.filter_length as i64) as usize;
        (lo, hi.max(lo))
    }

    /// Interpolate one sample of `input` at fractional `position`.
    ///
    /// Taps falling outside `input` contribute nothing.
    pub fn interpolate(&self, input: &[f32], position: f64) -> f32 {
        let (int_part, phase) = self.locate(position);
        let start = int_part - self.config.lobe_count as i64;
        let (lo, hi) = self.tap_range(start, input.len());
        let coeffs = self.row(phase);

        let mut sum = 0.0_f32;
        for tap in lo..hi {
            sum += input[(start + tap as i64) as usize] * coeffs[tap];
        }
        sum
    }

    /// Fill `output` with `output[i] = interpolate(input, i · ratio)`.
    pub fn resample(&self, input: &[f32], output: &mut [f32], ratio: f64) {
        for (i, out) in output.iter_mut().enumerate() {
            *out = self.interpolate(input, i as f64 * ratio);
        }
    }

    /// Interleaved-stereo variant of [`resample`](Self::resample).
    ///
    /// Both channels share one phase lookup per output frame.  A trailing odd
    /// sample in `output` is left untouched.
    pub fn resample_stereo(&self, input: &[f32], output: &mut [f32], ratio: f64) {
        let input_frames = input.len() / 2;

        for (frame, out) in output.chunks_exact_mut(2).enumerate() {
            let (int_part, phase) = self.locate(frame as f64 * ratio);
            let start = int_part - self.config.lobe_count as i64;
            let (lo, hi) = self.tap_range(start, input_frames);
            let coeffs = self.row(phase);

            let mut left = 0.0_f32;
            let mut right = 0.0_f32;
            for tap in lo..hi {
                let idx = (start + tap as i64) as usize * 2;
                left += input[idx] * coeffs[tap];
                right += input[idx + 1] * coeffs[tap];
            }
            out[0] = left;
            out[1] = right;
        }
    }
}

fn build_table(config: &SincConfig) -> Result<Vec<f32>, AudioError> {
    let filter_length = config.filter_length();
    let window = KaiserWindow::new(config.beta, filter_length)?;
    let window = window.coefficients();

    let mut table = Vec::with_capacity(config.table_size());
    let mut row = vec![0.0_f64; filter_length];

    for phase in 0..config.phase_count {
        let offset = phase as f64 / config.phase_count as f64;

        for (tap, coeff) in row.iter_mut().enumerate() {
            let x = (tap as f64 - config.lobe_count as f64) + offset;
            *coeff = sinc(x) * window[tap];
        }

        let sum: f64 = row.iter().sum();
        let norm = if sum.abs() > 1e-10 { sum } else { 1.0 };
        table.extend(row.iter().map(|&c| (c / norm) as f32));
    }

    Ok(table)
}

fn verify_table(table: &[f32], config: &SincConfig) {
    let filter_length = config.filter_length();
    for phase in 0..VERIFY_PHASES.min(config.phase_count) {
        let row = &table[phase * filter_length..(phase + 1) * filter_length];
        let sum: f64 = row.iter().map(|&c| c as f64).sum();
        if (sum - 1.0).abs() > GAIN_TOLERANCE {
            log::warn!("sinc phase {phase} coefficient sum = {sum:.6} (expected ~1.0)");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> SincInterpolator {
        SincInterpolator::new(SincConfig {
            lobe_count: 8,
            phase_count: 256,
            beta: 7.0,
        })
        .unwrap()
    }

    // ---- construction ------------------------------------------------------

    #[test]
    fn default_table_dimensions() {
        let interp = SincInterpolator::new(SincConfig::default()).unwrap();
        assert_eq!(interp.filter_length(), 32);
        assert_eq!(interp.coefficients().len(), 1024 * 32);
    }

    #[test]
    fn rejects_out_of_range_parameters() {
        let bad = [
            SincConfig { lobe_count: 3, ..SincConfig::default() },
            SincConfig { lobe_count: 65, ..SincConfig::default() },
            SincConfig { phase_count: 63, ..SincConfig::default() },
            SincConfig { phase_count: 8193, ..SincConfig::default() },
            SincConfig { beta: -0.1, ..SincConfig::default() },
            SincConfig { beta: 20.5, ..SincConfig::default() },
        ];
        for config in bad {
            assert!(
                matches!(SincInterpolator::new(config), Err(AudioError::InvalidParameter { .. })),
                "{config:?} should be rejected"
            );
        }
    }

    #[test]
    fn clones_share_the_table() {
        let a = small();
        let b = a.clone();
        assert!(std::ptr::eq(a.coefficients(), b.coefficients()));
    }

    // ---- table properties --------------------------------------------------

    #[test]
    fn every_phase_has_unity_gain() {
        let interp = SincInterpolator::new(SincConfig::default()).unwrap();
        for p in 0..interp.config().phase_count {
            let sum: f64 = interp.phase(p).unwrap().iter().map(|&c| c as f64).sum();
            assert!((sum - 1.0).abs() < 1e-3, "phase {p} sums to {sum}");
        }
    }

    #[test]
    fn phase_out_of_range_is_an_error() {
        let interp = small();
        let last = interp.config().phase_count - 1;
        assert_eq!(interp.phase(last).unwrap().len(), interp.filter_length());
        assert!(matches!(
            interp.phase(last + 1),
            Err(AudioError::InvalidParameter { name: "phase", .. })
        ));
    }

    #[test]
    fn phase_zero_is_a_unit_impulse() {
        let interp = small();
        let row = interp.phase(0).unwrap();
        for (tap, &c) in row.iter().enumerate() {
            if tap == 8 {
                assert!((c - 1.0).abs() < 1e-6);
            } else {
                assert!(c.abs() < 1e-6, "tap {tap} = {c}");
            }
        }
    }

    #[test]
    fn sinc_values() {
        assert_eq!(sinc(0.0), 1.0);
        assert!(sinc(1.0).abs() < 1e-12);
        assert!((sinc(0.5) - 2.0 / PI).abs() < 1e-12);
    }

    // ---- interpolation -----------------------------------------------------

    #[test]
    fn integer_positions_return_input_samples() {
        let interp = small();
        let input: Vec<f32> = (0..64).map(|i| (i as f32 * 0.3).sin()).collect();
        for i in 0..input.len() {
            let v = interp.interpolate(&input, i as f64);
            assert!((v - input[i]).abs() < 1e-2, "i={i}: {v} vs {}", input[i]);
        }
    }

    #[test]
    fn unit_ratio_is_identity() {
        let interp = small();
        let input: Vec<f32> = (0..100).map(|i| ((i % 7) as f32 - 3.0) / 4.0).collect();
        let mut output = vec![0.0; input.len()];
        interp.resample(&input, &mut output, 1.0);
        for (a, b) in input.iter().zip(&output) {
            assert!((a - b).abs() < 1e-2);
        }
    }

    #[test]
    fn constant_signal_preserved_away_from_edges() {
        let interp = small();
        let input = vec![0.6_f32; 400];
        for ratio in [0.37, 1.0, 2.75625, 3.0] {
            let frames = (400.0 / ratio) as usize;
            let mut output = vec![0.0; frames];
            interp.resample(&input, &mut output, ratio);
            for (i, &v) in output.iter().enumerate() {
                let pos = i as f64 * ratio;
                if pos >= 16.0 && pos <= 400.0 - 16.0 {
                    assert!((v - 0.6).abs() < 1e-3, "ratio={ratio} i={i}: {v}");
                }
            }
        }
    }

    #[test]
    fn positions_outside_input_yield_silence() {
        let interp = small();
        let input = vec![1.0_f32; 4];
        assert_eq!(interp.interpolate(&input, 100.0), 0.0);
        assert_eq!(interp.interpolate(&[], 0.0), 0.0);
    }

    #[test]
    fn stereo_channels_are_independent() {
        let interp = small();
        let frames = 200;
        let mut input = Vec::with_capacity(frames * 2);
        for _ in 0..frames {
            input.push(0.5_f32);
            input.push(-0.25_f32);
        }
        let mut output = vec![0.0; (frames / 2) * 2];
        interp.resample_stereo(&input, &mut output, 2.0);

        for (frame, pair) in output.chunks_exact(2).enumerate() {
            let pos = frame as f64 * 2.0;
            if pos >= 16.0 && pos <= (frames - 16) as f64 {
                assert!((pair[0] - 0.5).abs() < 1e-3);
                assert!((pair[1] + 0.25).abs() < 1e-3);
            }
        }
    }

    #[test]
    fn stereo_matches_mono_per_channel() {
        let interp = small();
        let left: Vec<f32> = (0..120).map(|i| (i as f32 * 0.05).sin()).collect();
        let right: Vec<f32> = (0..120).map(|i| (i as f32 * 0.11).cos()).collect();
        let interleaved: Vec<f32> = left.iter().zip(&right).flat_map(|(&l, &r)| [l, r]).collect();

        let ratio = 1.5;
        let out_frames = 80;
        let mut stereo = vec![0.0; out_frames * 2];
        interp.resample_stereo(&interleaved, &mut stereo, ratio);
        let mut mono_l = vec![0.0; out_frames];
        let mut mono_r = vec![0.0; out_frames];
        interp.resample(&left, &mut mono_l, ratio);
        interp.resample(&right, &mut mono_r, ratio);

        for f in 0..out_frames {
            assert!((stereo[2 * f] - mono_l[f]).abs() < 1e-6);
            assert!((stereo[2 * f + 1] - mono_r[f]).abs() < 1e-6);
        }
    }
}
