//! Resonant low-pass filter
//!
//! RBJ cookbook biquad low-pass processed per channel in Direct Form II
//! Transposed, with a dry/wet mix. Coefficients are recomputed only when the
//! cutoff, resonance, or sample rate actually change.

use std::f32::consts::PI;

/// Minimum cutoff frequency in Hz.
const MIN_CUTOFF_HZ: f32 = 20.0;
/// Maximum cutoff as a fraction of the Nyquist frequency.
const MAX_CUTOFF_RATIO: f32 = 0.45;
/// Resonance (Q) range.
const MIN_Q: f32 = 0.1;
const MAX_Q: f32 = 10.0;
/// Lowest sample rate the filter will accept.
const MIN_SAMPLE_RATE: f32 = 100.0;

/// Per-channel filter memory (DF-II-T).
#[derive(Debug, Clone, Copy, Default)]
struct ChannelState {
    z1: f32,
    z2: f32,
}

use super::EffectId;

/// Resonant low-pass biquad with dry/wet mix.
#[derive(Debug, Clone)]
pub struct LowPassEffect {
    pub(super) id: EffectId,
    cutoff_hz: f32,
    sample_rate: f32,
    q: f32,
    mix: f32,

    // Normalized coefficients
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,

    left: ChannelState,
    right: ChannelState,
}

impl LowPassEffect {
    pub fn new(cutoff_hz: f32, sample_rate: f32, resonance: f32, mix: f32) -> Self {
        let mut filter = Self {
            id: EffectId::next(),
            cutoff_hz: MIN_CUTOFF_HZ,
            sample_rate: sample_rate.max(MIN_SAMPLE_RATE),
            q: if resonance.is_finite() {
                resonance.clamp(MIN_Q, MAX_Q)
            } else {
                0.707
            },
            mix: mix.clamp(0.0, 1.0),
            b0: 0.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            left: ChannelState::default(),
            right: ChannelState::default(),
        };
        // Force the initial coefficient update through the normal path
        filter.cutoff_hz = f32::NAN;
        filter.set_cutoff(cutoff_hz);
        filter
    }

    /// Process one stereo frame.
    pub fn process(&mut self, frame: (f32, f32)) -> (f32, f32) {
        let (dry_left, dry_right) = frame;

        let wet_left = self.b0 * dry_left + self.left.z1;
        self.left.z1 = self.b1 * dry_left + self.left.z2 - self.a1 * wet_left;
        self.left.z2 = self.b2 * dry_left - self.a2 * wet_left;

        let wet_right = self.b0 * dry_right + self.right.z1;
        self.right.z1 = self.b1 * dry_right + self.right.z2 - self.a1 * wet_right;
        self.right.z2 = self.b2 * dry_right - self.a2 * wet_right;

        (
            (1.0 - self.mix) * dry_left + self.mix * wet_left,
            (1.0 - self.mix) * dry_right + self.mix * wet_right,
        )
    }

    /// Clear the per-channel filter memory.
    pub fn reset(&mut self) {
        self.left = ChannelState::default();
        self.right = ChannelState::default();
    }

    pub fn cutoff(&self) -> f32 {
        self.cutoff_hz
    }

    pub fn resonance(&self) -> f32 {
        self.q
    }

    pub fn mix(&self) -> f32 {
        self.mix
    }

    /// Set the cutoff, clamped into [20 Hz, 0.45 * Nyquist]. Non-finite
    /// values are rejected before they can poison the coefficients.
    pub fn set_cutoff(&mut self, cutoff_hz: f32) {
        if !cutoff_hz.is_finite() {
            return;
        }
        let max_cutoff = (self.sample_rate * 0.5) * MAX_CUTOFF_RATIO;
        let clamped = cutoff_hz.clamp(MIN_CUTOFF_HZ, max_cutoff.max(MIN_CUTOFF_HZ));
        if (clamped - self.cutoff_hz).abs() < 1e-3 {
            return;
        }
        self.cutoff_hz = clamped;
        self.update_coefficients();
    }

    /// Set the resonance (Q), clamped into [0.1, 10].
    pub fn set_resonance(&mut self, resonance: f32) {
        if !resonance.is_finite() {
            return;
        }
        let clamped = resonance.clamp(MIN_Q, MAX_Q);
        if (clamped - self.q).abs() < 1e-3 {
            return;
        }
        self.q = clamped;
        self.update_coefficients();
    }

    pub fn set_mix(&mut self, mix: f32) {
        self.mix = mix.clamp(0.0, 1.0);
    }

    /// Change the sample rate, re-clamping the cutoff against the new Nyquist.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        let clamped_rate = sample_rate.max(MIN_SAMPLE_RATE);
        if (clamped_rate - self.sample_rate).abs() < 1e-3 {
            return;
        }
        self.sample_rate = clamped_rate;
        let max_cutoff = (self.sample_rate * 0.5) * MAX_CUTOFF_RATIO;
        self.cutoff_hz = self.cutoff_hz.clamp(MIN_CUTOFF_HZ, max_cutoff.max(MIN_CUTOFF_HZ));
        self.update_coefficients();
    }

    /// RBJ cookbook low-pass coefficients, normalized by 1/a0. Collapses to
    /// pass-through when the Nyquist frequency sits at or below the minimum
    /// cutoff.
    fn update_coefficients(&mut self) {
        let nyquist = self.sample_rate * 0.5;
        if nyquist <= MIN_CUTOFF_HZ {
            self.b0 = 1.0;
            self.b1 = 0.0;
            self.b2 = 0.0;
            self.a1 = 0.0;
            self.a2 = 0.0;
            return;
        }

        let max_cutoff = nyquist * MAX_CUTOFF_RATIO;
        let cutoff = self.cutoff_hz.clamp(MIN_CUTOFF_HZ, max_cutoff.max(MIN_CUTOFF_HZ));
        let omega = 2.0 * PI * cutoff / self.sample_rate;
        let sinw = omega.sin();
        let cosw = omega.cos();
        let alpha = sinw / (2.0 * self.q);

        let b0 = (1.0 - cosw) * 0.5;
        let b1 = 1.0 - cosw;
        let b2 = (1.0 - cosw) * 0.5;
        let a0 = 1.0 + alpha;
        let a1 = -2.0 * cosw;
        let a2 = 1.0 - alpha;

        let inv_a0 = 1.0 / a0;
        self.b0 = b0 * inv_a0;
        self.b1 = b1 * inv_a0;
        self.b2 = b2 * inv_a0;
        self.a1 = a1 * inv_a0;
        self.a2 = a2 * inv_a0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    const SAMPLE_RATE: f32 = 44100.0;

    /// RMS of the filter output for a mono sine pushed through both channels,
    /// skipping the first `settle` samples.
    fn filtered_rms(filter: &mut LowPassEffect, freq: f32, total: usize, settle: usize) -> f32 {
        let mut sum_sq = 0.0;
        for n in 0..total {
            let x = (2.0 * PI * freq * n as f32 / SAMPLE_RATE).sin();
            let (left, _) = filter.process((x, x));
            if n >= settle {
                sum_sq += left * left;
            }
        }
        (sum_sq / (total - settle) as f32).sqrt()
    }

    #[test]
    fn test_passband_is_transparent() {
        // Cutoff far above the signal: output ~= input
        let mut filter = LowPassEffect::new(8000.0, SAMPLE_RATE, 0.707, 1.0);
        let rms = filtered_rms(&mut filter, 200.0, 8192, 1024);
        let input_rms = (0.5f32).sqrt();

        // Within -1 dB of the input level
        assert!(
            rms > input_rms * 0.89,
            "Passband attenuated too much: {} vs {}",
            rms,
            input_rms
        );
    }

    #[test]
    fn test_stopband_attenuates_at_least_24_db() {
        // Cutoff far below the signal: 2nd-order rolloff gives > 24 dB
        let mut filter = LowPassEffect::new(100.0, SAMPLE_RATE, 0.707, 1.0);
        let rms = filtered_rms(&mut filter, 4000.0, 16384, 4096);
        let input_rms = (0.5f32).sqrt();

        let attenuation_db = 20.0 * (rms / input_rms).log10();
        assert!(
            attenuation_db < -24.0,
            "Stopband attenuation only {} dB",
            attenuation_db
        );
    }

    #[test]
    fn test_mix_zero_is_dry() {
        let mut filter = LowPassEffect::new(100.0, SAMPLE_RATE, 0.707, 0.0);
        for n in 0..256 {
            let x = (2.0 * PI * 5000.0 * n as f32 / SAMPLE_RATE).sin();
            let (left, right) = filter.process((x, x));
            assert!((left - x).abs() < 1e-6);
            assert!((right - x).abs() < 1e-6);
        }
    }

    #[test]
    fn test_cutoff_clamps_to_valid_range() {
        let mut filter = LowPassEffect::new(1000.0, SAMPLE_RATE, 0.707, 1.0);

        filter.set_cutoff(5.0);
        assert_eq!(filter.cutoff(), 20.0);

        filter.set_cutoff(1.0e6);
        let max = SAMPLE_RATE * 0.5 * 0.45;
        assert!((filter.cutoff() - max).abs() < 1.0);
    }

    #[test]
    fn test_resonance_clamps() {
        let mut filter = LowPassEffect::new(1000.0, SAMPLE_RATE, 100.0, 1.0);
        assert_eq!(filter.resonance(), 10.0);
        filter.set_resonance(0.0);
        assert_eq!(filter.resonance(), 0.1);
    }

    #[test]
    fn test_coefficients_stay_finite() {
        for &(cutoff, q, sr) in &[
            (20.0, 0.1, 100.0),
            (20000.0, 10.0, 192000.0),
            (-5.0, -5.0, 44100.0),
            (1.0e9, 1.0e9, 48000.0),
        ] {
            let mut filter = LowPassEffect::new(cutoff, sr, q, 1.0);
            let (left, right) = filter.process((1.0, -1.0));
            assert!(left.is_finite() && right.is_finite());
            assert!(filter.b0.is_finite());
            assert!(filter.a1.is_finite());
            assert!(filter.a2.is_finite());
        }
    }

    #[test]
    fn test_reset_clears_state() {
        let mut filter = LowPassEffect::new(500.0, SAMPLE_RATE, 0.707, 1.0);
        for _ in 0..100 {
            filter.process((1.0, 1.0));
        }
        filter.reset();

        // With zero input after reset the output is exactly zero
        let (left, right) = filter.process((0.0, 0.0));
        assert_eq!(left, 0.0);
        assert_eq!(right, 0.0);
    }

    #[test]
    fn test_sample_rate_change_reclamps_cutoff() {
        let mut filter = LowPassEffect::new(9000.0, SAMPLE_RATE, 0.707, 1.0);
        filter.set_sample_rate(8000.0);
        // New max cutoff = 8000/2 * 0.45 = 1800
        assert!(filter.cutoff() <= 1800.0 + 1.0);
    }
}
