//! Dual-oscillator voice core
//!
//! Renders the mono pre-effect signal for the current note: a primary
//! oscillator, an optional detuned/octave-shifted secondary oscillator, and
//! a slow drift LFO that nudges the pitch by a few cents for analog-style
//! movement. Pitch bend and per-note random detune feed the same cents sum.

use crate::wave::Waveform;

/// One cent is 2^(1/1200) in frequency; this converts a cents sum to a ratio.
#[inline]
fn cents_to_ratio(cents: f32) -> f32 {
    (cents / 1200.0).exp2()
}

/// Secondary oscillator settings.
#[derive(Debug, Clone, Copy)]
pub struct SecondaryOscillator {
    pub enabled: bool,
    /// Wet amount in [0, 1]; the primary is scaled by `1 - mix`.
    pub mix: f32,
    /// Upward detune in cents (negative values are treated as 0).
    pub detune_cents: f32,
    /// Octave shift in [-2, +2].
    pub octave_offset: i32,
}

impl Default for SecondaryOscillator {
    fn default() -> Self {
        Self {
            enabled: false,
            mix: 0.0,
            detune_cents: 0.0,
            octave_offset: 0,
        }
    }
}

/// Drift LFO parameters and phase.
#[derive(Debug, Clone, Copy)]
pub struct DriftLfo {
    pub phase: f32,
    pub rate_hz: f32,
    pub amount_cents: f32,
    /// Per-note random detune range (uniform in +/- this many cents).
    pub jitter_cents: f32,
}

impl Default for DriftLfo {
    fn default() -> Self {
        Self {
            phase: 0.0,
            rate_hz: 0.35,
            amount_cents: 4.0,
            jitter_cents: 3.0,
        }
    }
}

/// Oscillator state for the currently sounding note.
#[derive(Debug, Clone)]
pub struct Voice {
    pub primary_wave: Waveform,
    pub secondary_wave: Waveform,
    pub secondary: SecondaryOscillator,
    pub drift: DriftLfo,

    /// Frequency of the current note in Hz (0 when nothing has sounded yet).
    pub frequency: f32,
    /// Random detune assigned to the current note, in cents.
    pub note_detune_cents: f32,
    /// Pitch bend offset in cents (+/- one semitone).
    pub pitch_bend_cents: f32,

    primary_phase: f32,
    secondary_phase: f32,
}

impl Voice {
    pub fn new() -> Self {
        Self {
            primary_wave: Waveform::Square,
            secondary_wave: Waveform::Square,
            secondary: SecondaryOscillator::default(),
            drift: DriftLfo::default(),
            frequency: 0.0,
            note_detune_cents: 0.0,
            pitch_bend_cents: 0.0,
            primary_phase: 0.0,
            secondary_phase: 0.0,
        }
    }

    /// Restart both oscillator phases. Called on the first note of a phrase;
    /// held-note retriggers keep phases continuous.
    pub fn reset_phases(&mut self) {
        self.primary_phase = 0.0;
        self.secondary_phase = 0.0;
    }

    /// Restart only the secondary oscillator's phase (used when the
    /// secondary is switched off so re-enabling starts clean).
    pub fn reset_secondary_phase(&mut self) {
        self.secondary_phase = 0.0;
    }

    /// Render one mono sample scaled by `envelope_level`.
    ///
    /// Returns 0 without touching oscillator state when the envelope is
    /// silent or no note frequency is set.
    pub fn render(&mut self, envelope_level: f32, sample_rate: f32) -> f32 {
        if envelope_level <= 0.0 || self.frequency <= 0.0 {
            return 0.0;
        }

        // Drift LFO in cents, plus the per-note jitter and pitch bend
        let lfo_value = (self.drift.phase * 2.0 * std::f32::consts::PI).sin();
        let total_cents =
            self.note_detune_cents + lfo_value * self.drift.amount_cents + self.pitch_bend_cents;
        let modulated_freq = self.frequency * cents_to_ratio(total_cents);

        self.drift.phase += self.drift.rate_hz / sample_rate;
        if self.drift.phase >= 1.0 {
            self.drift.phase -= self.drift.phase.floor();
        }

        let primary =
            self.primary_wave
                .generate(modulated_freq, sample_rate, &mut self.primary_phase);

        let mut secondary = 0.0;
        if self.secondary.enabled && self.secondary.mix > 0.0 {
            let detune_ratio = cents_to_ratio(self.secondary.detune_cents.max(0.0));
            let octave_ratio = (self.secondary.octave_offset as f32).exp2();
            let secondary_freq = modulated_freq * detune_ratio * octave_ratio;
            secondary = self.secondary_wave.generate(
                secondary_freq,
                sample_rate,
                &mut self.secondary_phase,
            );
        }

        let dry_amount = (1.0 - self.secondary.mix).max(0.0);
        (primary * dry_amount + secondary * self.secondary.mix) * envelope_level
    }
}

impl Default for Voice {
    fn default() -> Self {
        Self::new()
    }
}
