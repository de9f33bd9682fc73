//! Synthesizer engine
//!
//! Owns the voice, envelope, effect chain, note bookkeeping, and the
//! optional waveform tap. The audio callback pulls [`Engine::next_sample`]
//! once per frame; every other method is a control-surface operation. All
//! numeric inputs are sanitized at the boundary by clamping or ignoring, so
//! nothing on the sample path can fail.
//!
//! Notes are monophonic with last-note priority: the most recently triggered
//! note sounds, while the full stack is tracked so releasing an inner note of
//! a held chord falls back to the right pitch.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::effects::{DelayEffect, Effect, EffectKind, EffectParams, LowPassEffect, OctaveEffect};
use crate::envelope::AdsrEnvelope;
use crate::ring_buffer::StereoRingBuffer;
use crate::voice::Voice;
use crate::wave::Waveform;

/// Frequencies above this are rejected by `trigger_note`.
const MAX_NOTE_FREQUENCY_HZ: f32 = 20000.0;
/// Two note-off frequencies within this distance match.
const NOTE_MATCH_EPSILON_HZ: f32 = 1e-3;
/// Lowest sample rate the engine accepts; below this we fall back to 44100.
const MIN_SAMPLE_RATE: f32 = 100.0;

/// A triggered note: its frequency and the random detune it was assigned.
#[derive(Debug, Clone, Copy)]
struct ActiveNote {
    frequency: f32,
    detune_cents: f32,
}

/// Realtime subtractive synthesizer engine.
pub struct Engine {
    sample_rate: f32,
    voice: Voice,
    envelope: AdsrEnvelope,
    note_on: bool,
    active_notes: Vec<ActiveNote>,

    effects: Vec<Effect>,
    low_pass_active: bool,
    last_low_pass_cutoff: f32,

    waveform_tap: Option<Arc<StereoRingBuffer>>,

    // Control-thread randomness only: note jitter and first-note LFO phase
    rng: StdRng,
}

impl Engine {
    /// Create an engine at the given sample rate. Rates below 100 Hz fall
    /// back to 44100 with a warning.
    pub fn new(sample_rate: f32) -> Self {
        Self::with_rng(sample_rate, StdRng::from_entropy())
    }

    /// Create an engine with a deterministic jitter/LFO seed.
    pub fn with_seed(sample_rate: f32, seed: u64) -> Self {
        Self::with_rng(sample_rate, StdRng::seed_from_u64(seed))
    }

    fn with_rng(sample_rate: f32, rng: StdRng) -> Self {
        let sample_rate = if sample_rate >= MIN_SAMPLE_RATE {
            sample_rate
        } else {
            warn!(sample_rate, "invalid sample rate, falling back to 44100");
            44100.0
        };

        Self {
            sample_rate,
            voice: Voice::new(),
            envelope: AdsrEnvelope::default(),
            note_on: false,
            active_notes: Vec::new(),
            effects: Vec::new(),
            low_pass_active: false,
            last_low_pass_cutoff: 0.0,
            waveform_tap: None,
            rng,
        }
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// True while any note is held.
    pub fn note_on(&self) -> bool {
        self.note_on
    }

    pub fn active_note_count(&self) -> usize {
        self.active_notes.len()
    }

    /// Frequency of the currently sounding note in Hz.
    pub fn frequency(&self) -> f32 {
        self.voice.frequency
    }

    // ------------------------------------------------------------------
    // Note triggering
    // ------------------------------------------------------------------

    /// Start a note. Frequencies outside (0, 20000] Hz are ignored.
    ///
    /// The first note of a phrase restarts oscillator phases, randomizes the
    /// drift LFO phase, and resets the envelope; overlapping notes keep
    /// phases continuous for legato.
    pub fn trigger_note(&mut self, frequency: f32) {
        // Written so NaN also fails the check
        if !(frequency > 0.0 && frequency <= MAX_NOTE_FREQUENCY_HZ) {
            return;
        }

        let had_active_notes = !self.active_notes.is_empty();

        let jitter = self.voice.drift.jitter_cents;
        let detune = if jitter > 0.0 {
            self.rng.gen_range(-jitter..=jitter)
        } else {
            0.0
        };

        self.active_notes.push(ActiveNote {
            frequency,
            detune_cents: detune,
        });
        self.voice.frequency = frequency;
        self.voice.note_detune_cents = detune;
        self.note_on = true;

        if !had_active_notes {
            self.voice.reset_phases();
            self.voice.drift.phase = self.rng.gen_range(0.0..1.0);
            self.envelope.reset();
        }

        // Refresh effects that depend on the note frequency or sample rate.
        // Effect state is intentionally kept so delay tails ring across notes.
        for effect in &mut self.effects {
            match effect {
                Effect::Octave(octave) => {
                    octave.set_frequency(frequency);
                    octave.set_sample_rate(self.sample_rate);
                }
                Effect::Delay(delay) => delay.set_sample_rate(self.sample_rate),
                Effect::LowPass(low_pass) => low_pass.set_sample_rate(self.sample_rate),
            }
        }
    }

    /// Release a note. `Some(frequency)` removes the most recent matching
    /// note (within 1 mHz); `None` releases everything.
    pub fn trigger_note_off(&mut self, frequency: Option<f32>) {
        let Some(frequency) = frequency else {
            self.active_notes.clear();
            self.note_on = false;
            return;
        };

        if let Some(pos) = self
            .active_notes
            .iter()
            .rposition(|note| (note.frequency - frequency).abs() < NOTE_MATCH_EPSILON_HZ)
        {
            self.active_notes.remove(pos);
        }

        match self.active_notes.last() {
            Some(note) => {
                self.voice.frequency = note.frequency;
                self.voice.note_detune_cents = note.detune_cents;
                self.note_on = true;
            }
            None => {
                self.note_on = false;
            }
        }
    }

    // ------------------------------------------------------------------
    // Realtime path
    // ------------------------------------------------------------------

    /// Generate the next stereo sample. Never blocks, never allocates.
    pub fn next_sample(&mut self) -> (f32, f32) {
        let envelope_level = self.envelope.process(self.note_on, self.sample_rate);
        let mono = self.voice.render(envelope_level, self.sample_rate);

        let frame = self.apply_effects((mono, mono));

        if let Some(tap) = &self.waveform_tap {
            tap.push(frame.0, frame.1);
        }

        frame
    }

    /// Run one stereo frame through the effect chain in insertion order.
    pub fn apply_effects(&mut self, mut frame: (f32, f32)) -> (f32, f32) {
        for effect in &mut self.effects {
            frame = effect.process(frame);
        }
        frame
    }

    // ------------------------------------------------------------------
    // Oscillator and modulation parameters
    // ------------------------------------------------------------------

    /// Set both the primary and secondary waveform.
    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.voice.primary_wave = waveform;
        self.voice.secondary_wave = waveform;
    }

    /// Set only the secondary oscillator's waveform.
    pub fn set_secondary_waveform(&mut self, waveform: Waveform) {
        self.voice.secondary_wave = waveform;
    }

    /// Configure the secondary oscillator. Disabling zeroes its state; when
    /// enabled, mix clamps into [0, 1], detune to >= 0, octave into [-2, +2].
    pub fn configure_secondary(
        &mut self,
        enabled: bool,
        mix: f32,
        detune_cents: f32,
        octave_offset: i32,
    ) {
        let secondary = &mut self.voice.secondary;
        secondary.enabled = enabled;
        if !enabled {
            secondary.mix = 0.0;
            secondary.detune_cents = 0.0;
            secondary.octave_offset = 0;
            self.voice.reset_secondary_phase();
            return;
        }

        secondary.mix = mix.clamp(0.0, 1.0);
        secondary.detune_cents = detune_cents.max(0.0);
        secondary.octave_offset = octave_offset.clamp(-2, 2);
    }

    /// Set pitch bend from a raw 14-bit controller value in [-8192, +8191],
    /// mapped to +/- 100 cents (one semitone).
    pub fn set_pitch_bend(&mut self, raw: i32) {
        let clamped = raw.clamp(-8192, 8191);
        let normalized = if clamped >= 0 {
            clamped as f32 / 8191.0
        } else {
            clamped as f32 / 8192.0
        };
        self.voice.pitch_bend_cents = normalized * 100.0;
    }

    /// Replace the envelope parameters. Negative times clamp to zero; the
    /// envelope keeps its current phase and level.
    pub fn update_adsr(&mut self, attack: f32, decay: f32, sustain: f32, release: f32) {
        self.envelope.set_parameters(attack, decay, sustain, release);
    }

    /// Set drift LFO rate (Hz), depth (cents), and per-note jitter (cents).
    /// Each clamps to >= 0.
    pub fn set_drift(&mut self, rate_hz: f32, amount_cents: f32, jitter_cents: f32) {
        self.voice.drift.rate_hz = rate_hz.max(0.0);
        self.voice.drift.amount_cents = amount_cents.max(0.0);
        self.voice.drift.jitter_cents = jitter_cents.max(0.0);
    }

    // ------------------------------------------------------------------
    // Effect chain
    // ------------------------------------------------------------------

    /// Append an effect to the chain. An effect already present by identity
    /// (the same instance, e.g. a clone of a chained effect) is ignored.
    pub fn add_effect(&mut self, effect: Effect) {
        if self.effects.iter().any(|existing| existing.id() == effect.id()) {
            return;
        }
        if let Effect::LowPass(low_pass) = &effect {
            self.low_pass_active = true;
            self.last_low_pass_cutoff = low_pass.cutoff();
        }
        self.effects.push(effect);
    }

    /// Reset then remove every effect.
    pub fn clear_effects(&mut self) {
        self.reset_effects();
        self.effects.clear();
        self.low_pass_active = false;
        self.last_low_pass_cutoff = 0.0;
    }

    /// Reset the internal state of every effect, keeping the chain.
    pub fn reset_effects(&mut self) {
        for effect in &mut self.effects {
            effect.reset();
        }
    }

    pub fn effect_count(&self) -> usize {
        self.effects.len()
    }

    /// Update the cutoff of every low-pass effect in the chain. With no
    /// low-pass present, the tracked cutoff is cleared instead.
    pub fn set_low_pass_cutoff(&mut self, cutoff_hz: f32) {
        let mut updated = false;
        for effect in &mut self.effects {
            if let Effect::LowPass(low_pass) = effect {
                low_pass.set_cutoff(cutoff_hz);
                updated = true;
            }
        }

        if updated {
            self.low_pass_active = true;
            self.last_low_pass_cutoff = cutoff_hz;
        } else {
            self.low_pass_active = false;
            self.last_low_pass_cutoff = 0.0;
        }
    }

    /// The most recently applied low-pass cutoff, or 0 with no active filter.
    pub fn low_pass_cutoff(&self) -> f32 {
        if self.low_pass_active {
            self.last_low_pass_cutoff
        } else {
            0.0
        }
    }

    /// True while a low-pass effect is present in the chain.
    pub fn has_low_pass_effect(&self) -> bool {
        self.low_pass_active
    }

    /// Update the first effect matching `name` (case-insensitive synonyms:
    /// `delay`/`echo`, `lowpass`/`lpf`/`filter`, `octave`). Returns false if
    /// the name is unknown, the parameters address a different effect type,
    /// or no such effect is in the chain.
    pub fn update_effect_parameters(&mut self, name: &str, params: &EffectParams) -> bool {
        let Some(kind) = EffectKind::from_name(name) else {
            return false;
        };
        if params.kind() != kind {
            return false;
        }

        for effect in &mut self.effects {
            if effect.kind() == kind && effect.apply_params(params) {
                if let EffectParams::LowPass { cutoff, .. } = params {
                    self.low_pass_active = true;
                    self.last_low_pass_cutoff = *cutoff;
                }
                return true;
            }
        }
        false
    }

    // ------------------------------------------------------------------
    // Configuration and host wiring
    // ------------------------------------------------------------------

    /// Rebuild the waveform selection, effect chain, and envelope from a
    /// configuration record. Unrecognized effect names are silently ignored.
    pub fn configure(&mut self, config: &EngineConfig) {
        let waveform = Waveform::from_name(&config.waveform);
        self.voice.primary_wave = waveform;
        self.voice.secondary_wave = waveform;

        self.effects.clear();
        self.low_pass_active = false;
        self.last_low_pass_cutoff = 0.0;

        for name in &config.effects {
            match EffectKind::from_name(name) {
                Some(EffectKind::Octave) => {
                    self.effects.push(Effect::Octave(OctaveEffect::default()));
                }
                Some(EffectKind::Delay) => {
                    self.effects
                        .push(Effect::Delay(DelayEffect::new(0.3, 0.5, 0.5, self.sample_rate)));
                }
                Some(EffectKind::LowPass) => {
                    let low_pass = LowPassEffect::new(1000.0, self.sample_rate, 0.707, 1.0);
                    self.low_pass_active = true;
                    self.last_low_pass_cutoff = low_pass.cutoff();
                    self.effects.push(Effect::LowPass(low_pass));
                }
                None => {}
            }
        }

        self.envelope.set_parameters(
            config.attack_time,
            config.decay_time,
            config.sustain_level,
            config.release_time,
        );
        self.envelope.reset();

        info!(
            waveform = ?waveform,
            effects = self.effects.len(),
            "engine configured"
        );
    }

    /// Attach or detach the waveform tap the audio path pushes into.
    pub fn set_waveform_tap(&mut self, tap: Option<Arc<StereoRingBuffer>>) {
        self.waveform_tap = tap;
    }
}
