//! ADSR amplitude envelope
//!
//! Gate-driven envelope with four active phases:
//! - Attack: linear ramp from the current level to 1.0
//! - Decay: linear ramp from 1.0 to the sustain level
//! - Sustain: hold at the sustain level while the gate is high
//! - Release: linear ramp from the level at release down to 0.0
//!
//! Retriggering during release resumes the attack from the current level, so
//! overlapping notes never click back to zero.

/// Minimum segment time in seconds. Zero-length attack/decay/release behave
/// as near-instant ramps without dividing by zero.
const MIN_SEGMENT_SECONDS: f32 = 0.0001;

/// Envelope phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EnvelopePhase {
    Idle,
    Attack,
    Decay,
    Sustain,
    Release,
}

/// ADSR envelope state machine.
///
/// `process` is called once per sample with the current gate state and
/// returns the amplitude level in [0.0, 1.0]. Parameter updates take effect
/// immediately: if a change makes the current level unreachable for the
/// current phase, the envelope retargets at the new rate without resetting.
#[derive(Debug, Clone)]
pub struct AdsrEnvelope {
    attack_secs: f32,
    decay_secs: f32,
    sustain_level: f32,
    release_secs: f32,

    phase: EnvelopePhase,
    level: f32,
    gate_was_high: bool,
    release_start_level: f32,
}

impl AdsrEnvelope {
    /// Create an envelope with the given parameters (seconds, seconds,
    /// level in [0,1], seconds). Negative times are clamped to zero.
    pub fn new(attack: f32, decay: f32, sustain: f32, release: f32) -> Self {
        let mut env = Self {
            attack_secs: 0.0,
            decay_secs: 0.0,
            sustain_level: 0.0,
            release_secs: 0.0,
            phase: EnvelopePhase::Idle,
            level: 0.0,
            gate_was_high: false,
            release_start_level: 0.0,
        };
        env.set_parameters(attack, decay, sustain, release);
        env
    }

    /// Replace the envelope parameters without disturbing the current phase
    /// or level. Negative times clamp to 0, sustain clamps into [0, 1].
    pub fn set_parameters(&mut self, attack: f32, decay: f32, sustain: f32, release: f32) {
        self.attack_secs = attack.max(0.0);
        self.decay_secs = decay.max(0.0);
        self.sustain_level = sustain.clamp(0.0, 1.0);
        self.release_secs = release.max(0.0);
    }

    /// Current output level in [0.0, 1.0].
    pub fn level(&self) -> f32 {
        self.level
    }

    /// True once the envelope has fully released.
    pub fn is_idle(&self) -> bool {
        self.phase == EnvelopePhase::Idle
    }

    /// Return to idle at level 0.
    pub fn reset(&mut self) {
        self.phase = EnvelopePhase::Idle;
        self.level = 0.0;
        self.gate_was_high = false;
        self.release_start_level = 0.0;
    }

    /// Advance one sample and return the amplitude level.
    pub fn process(&mut self, note_on: bool, sample_rate: f32) -> f32 {
        let gate_rising = note_on && !self.gate_was_high;
        let gate_falling = !note_on && self.gate_was_high;
        self.gate_was_high = note_on;

        if gate_rising {
            // Attack resumes from the current level (smooth retrigger)
            self.phase = EnvelopePhase::Attack;
        }
        if gate_falling && self.phase != EnvelopePhase::Idle {
            self.phase = EnvelopePhase::Release;
            self.release_start_level = self.level;
        }

        match self.phase {
            EnvelopePhase::Idle => {
                self.level = 0.0;
            }

            EnvelopePhase::Attack => {
                let attack = self.attack_secs.max(MIN_SEGMENT_SECONDS);
                self.level += 1.0 / (attack * sample_rate);
                if self.level >= 1.0 {
                    self.level = 1.0;
                    self.phase = EnvelopePhase::Decay;
                }
            }

            EnvelopePhase::Decay => {
                let decay = self.decay_secs.max(MIN_SEGMENT_SECONDS);
                let target = self.sustain_level;
                self.level -= (1.0 - target) / (decay * sample_rate);
                if self.level <= target {
                    self.level = target;
                    self.phase = EnvelopePhase::Sustain;
                }
            }

            EnvelopePhase::Sustain => {
                // Tracks sustain-level changes made while holding
                self.level = self.sustain_level;
            }

            EnvelopePhase::Release => {
                let release = self.release_secs.max(MIN_SEGMENT_SECONDS);
                let total_samples = (release * sample_rate).max(1.0);
                self.level -= self.release_start_level / total_samples;
                if self.level <= 0.0 {
                    self.level = 0.0;
                    self.phase = EnvelopePhase::Idle;
                }
            }
        }

        self.level
    }
}

impl Default for AdsrEnvelope {
    fn default() -> Self {
        Self::new(0.1, 0.2, 0.7, 0.3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f32 = 44100.0;

    fn run(env: &mut AdsrEnvelope, note_on: bool, samples: usize) -> f32 {
        let mut last = 0.0;
        for _ in 0..samples {
            last = env.process(note_on, SAMPLE_RATE);
        }
        last
    }

    #[test]
    fn test_idle_outputs_zero() {
        let mut env = AdsrEnvelope::new(0.01, 0.1, 0.7, 0.2);
        for _ in 0..512 {
            assert_eq!(env.process(false, SAMPLE_RATE), 0.0);
        }
        assert!(env.is_idle());
    }

    #[test]
    fn test_attack_ramps_to_one() {
        let mut env = AdsrEnvelope::new(0.01, 0.1, 0.7, 0.2);

        let early = run(&mut env, true, 100);
        let later = run(&mut env, true, 100);
        assert!(early > 0.0, "Attack should start rising");
        assert!(later > early, "Attack should keep rising");

        // 0.01s attack = 441 samples; should have peaked by then
        run(&mut env, true, 300);
        assert!(env.level() >= 0.99);
    }

    #[test]
    fn test_decays_to_sustain_and_holds() {
        let mut env = AdsrEnvelope::new(0.001, 0.01, 0.5, 0.2);

        // Attack (44 samples) + decay (441 samples) both complete here
        run(&mut env, true, 2000);
        assert!(
            (env.level() - 0.5).abs() < 0.01,
            "Should be holding at sustain, got {}",
            env.level()
        );

        // Sustain holds indefinitely while the gate stays high
        let held = run(&mut env, true, 5000);
        assert!((held - 0.5).abs() < 0.01);
    }

    #[test]
    fn test_release_reaches_zero_within_release_time() {
        let mut env = AdsrEnvelope::new(0.001, 0.01, 0.7, 0.05);
        run(&mut env, true, 2000); // Reach sustain

        // 0.05s release = 2205 samples, allow one extra sample
        run(&mut env, false, 2206);
        assert_eq!(env.level(), 0.0);
        assert!(env.is_idle());
    }

    #[test]
    fn test_sustain_reached_within_attack_plus_decay() {
        let attack = 0.02;
        let decay = 0.03;
        let sustain = 0.6;
        let mut env = AdsrEnvelope::new(attack, decay, sustain, 0.1);

        let budget = ((attack + decay) * SAMPLE_RATE) as usize + 2;
        run(&mut env, true, budget);
        assert!(
            (env.level() - sustain).abs() < 0.01,
            "Expected sustain {} within attack+decay, got {}",
            sustain,
            env.level()
        );
    }

    #[test]
    fn test_retrigger_during_release_resumes_from_current_level() {
        let mut env = AdsrEnvelope::new(0.01, 0.05, 0.8, 0.5);
        run(&mut env, true, 5000); // Sustain at 0.8

        // Release partway down
        run(&mut env, false, 4000);
        let mid_release = env.level();
        assert!(mid_release > 0.0 && mid_release < 0.8);

        // Retrigger: no discontinuity, level continues upward from here
        let first = env.process(true, SAMPLE_RATE);
        assert!(
            first >= mid_release,
            "Retrigger should resume from current level: {} -> {}",
            mid_release,
            first
        );
    }

    #[test]
    fn test_sustain_drop_retargets_immediately() {
        let mut env = AdsrEnvelope::new(0.001, 0.01, 0.9, 0.2);
        run(&mut env, true, 2000); // Sustaining at 0.9

        // Dropping sustain retargets the held level on the next sample
        env.set_parameters(0.001, 0.01, 0.4, 0.2);
        let level = env.process(true, SAMPLE_RATE);
        assert!((level - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_zero_attack_is_near_instant() {
        let mut env = AdsrEnvelope::new(0.0, 0.1, 0.7, 0.2);
        // The 0.1ms floor means full level within a handful of samples
        run(&mut env, true, 10);
        assert!(env.level() > 0.9, "Zero attack should jump, got {}", env.level());
    }

    #[test]
    fn test_negative_parameters_clamp() {
        let mut env = AdsrEnvelope::new(-1.0, -1.0, -0.5, -1.0);
        run(&mut env, true, 10);
        // Negative sustain clamps to 0, negative times to near-instant
        assert!(env.level() <= 1.0);
        run(&mut env, false, 10);
        assert_eq!(env.level(), 0.0);
    }

    #[test]
    fn test_reset_returns_to_idle() {
        let mut env = AdsrEnvelope::new(0.01, 0.1, 0.7, 0.2);
        run(&mut env, true, 1000);
        assert!(env.level() > 0.0);

        env.reset();
        assert!(env.is_idle());
        assert_eq!(env.level(), 0.0);
    }
}
