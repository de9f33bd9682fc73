//! Audio effect chain
//!
//! A closed set of stereo effects processed in insertion order. The set is
//! fixed, so the chain is an enum matched in the hot loop rather than a trait
//! object; parameter updates address effects by case-insensitive name with
//! the synonyms the configuration layer accepts.

use std::sync::atomic::{AtomicU64, Ordering};

pub mod delay;
pub mod low_pass;
pub mod octave;

pub use delay::DelayEffect;
pub use low_pass::LowPassEffect;
pub use octave::OctaveEffect;

/// Opaque per-instance identity. Constructing an effect allocates a fresh
/// id; clones share it, so a clone refers to the same effect instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectId(u64);

impl EffectId {
    fn next() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        EffectId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Identifies an effect type for name lookup and parameter routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectKind {
    Delay,
    LowPass,
    Octave,
}

impl EffectKind {
    /// Parse an effect name (case-insensitive synonyms):
    /// `delay`/`echo`, `lowpass`/`lpf`/`filter`, `octave`.
    pub fn from_name(name: &str) -> Option<EffectKind> {
        match name.to_lowercase().as_str() {
            "delay" | "echo" => Some(EffectKind::Delay),
            "lowpass" | "lpf" | "filter" => Some(EffectKind::LowPass),
            "octave" => Some(EffectKind::Octave),
            _ => None,
        }
    }
}

/// One effect in the processing chain.
#[derive(Debug, Clone)]
pub enum Effect {
    Delay(DelayEffect),
    LowPass(LowPassEffect),
    Octave(OctaveEffect),
}

impl Effect {
    /// Identity of this effect instance.
    pub fn id(&self) -> EffectId {
        match self {
            Effect::Delay(delay) => delay.id,
            Effect::LowPass(low_pass) => low_pass.id,
            Effect::Octave(octave) => octave.id,
        }
    }

    /// Process one stereo frame through this effect.
    pub fn process(&mut self, frame: (f32, f32)) -> (f32, f32) {
        match self {
            Effect::Delay(delay) => delay.process(frame),
            Effect::LowPass(low_pass) => low_pass.process(frame),
            Effect::Octave(octave) => octave.process(frame),
        }
    }

    /// Clear internal state (delay buffers, filter memory) without touching
    /// parameters.
    pub fn reset(&mut self) {
        match self {
            Effect::Delay(delay) => delay.reset(),
            Effect::LowPass(low_pass) => low_pass.reset(),
            Effect::Octave(octave) => octave.reset(),
        }
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        match self {
            Effect::Delay(delay) => delay.set_sample_rate(sample_rate),
            Effect::LowPass(low_pass) => low_pass.set_sample_rate(sample_rate),
            Effect::Octave(octave) => octave.set_sample_rate(sample_rate),
        }
    }

    pub fn kind(&self) -> EffectKind {
        match self {
            Effect::Delay(_) => EffectKind::Delay,
            Effect::LowPass(_) => EffectKind::LowPass,
            Effect::Octave(_) => EffectKind::Octave,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Effect::Delay(_) => "delay",
            Effect::LowPass(_) => "lowpass",
            Effect::Octave(_) => "octave",
        }
    }

    /// Apply a parameter set if it matches this effect's type.
    /// Returns false on a type mismatch.
    pub fn apply_params(&mut self, params: &EffectParams) -> bool {
        match (self, params) {
            (Effect::Delay(delay), EffectParams::Delay { delay_time, feedback, mix }) => {
                delay.set_delay_time(*delay_time);
                delay.set_feedback(*feedback);
                delay.set_mix(*mix);
                true
            }
            (Effect::LowPass(low_pass), EffectParams::LowPass { cutoff, resonance }) => {
                low_pass.set_cutoff(*cutoff);
                low_pass.set_resonance(*resonance);
                true
            }
            (Effect::Octave(octave), EffectParams::Octave { octave_shift, mix }) => {
                // Shift above 1.0 selects the upper (soft-clip) branch
                octave.set_higher(*octave_shift > 1.0);
                octave.set_blend(*mix);
                true
            }
            _ => false,
        }
    }
}

/// Parameter sets for in-place effect updates.
#[derive(Debug, Clone, PartialEq)]
pub enum EffectParams {
    Delay { delay_time: f32, feedback: f32, mix: f32 },
    LowPass { cutoff: f32, resonance: f32 },
    Octave { octave_shift: f32, mix: f32 },
}

impl EffectParams {
    /// The effect type these parameters address.
    pub fn kind(&self) -> EffectKind {
        match self {
            EffectParams::Delay { .. } => EffectKind::Delay,
            EffectParams::LowPass { .. } => EffectKind::LowPass,
            EffectParams::Octave { .. } => EffectKind::Octave,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effect_name_synonyms() {
        assert_eq!(EffectKind::from_name("delay"), Some(EffectKind::Delay));
        assert_eq!(EffectKind::from_name("Echo"), Some(EffectKind::Delay));
        assert_eq!(EffectKind::from_name("LOWPASS"), Some(EffectKind::LowPass));
        assert_eq!(EffectKind::from_name("lpf"), Some(EffectKind::LowPass));
        assert_eq!(EffectKind::from_name("filter"), Some(EffectKind::LowPass));
        assert_eq!(EffectKind::from_name("octave"), Some(EffectKind::Octave));
        assert_eq!(EffectKind::from_name("reverb"), None);
        assert_eq!(EffectKind::from_name(""), None);
    }

    #[test]
    fn test_each_construction_gets_a_fresh_identity() {
        let a = Effect::Delay(DelayEffect::new(0.3, 0.5, 0.5, 44100.0));
        let b = Effect::Delay(DelayEffect::new(0.3, 0.5, 0.5, 44100.0));
        assert_ne!(a.id(), b.id(), "Separate constructions are distinct effects");
        assert_eq!(a.id(), a.clone().id(), "A clone keeps the instance identity");

        let filter = Effect::LowPass(LowPassEffect::new(1000.0, 44100.0, 0.707, 1.0));
        let shaper = Effect::Octave(OctaveEffect::default());
        assert_ne!(filter.id(), shaper.id());
    }

    #[test]
    fn test_apply_params_matches_by_type() {
        let mut effect = Effect::Delay(DelayEffect::new(0.3, 0.5, 0.5, 44100.0));

        let applied = effect.apply_params(&EffectParams::Delay {
            delay_time: 0.25,
            feedback: 0.6,
            mix: 0.4,
        });
        assert!(applied);
        if let Effect::Delay(delay) = &effect {
            assert!((delay.delay_time() - 0.25).abs() < 1e-6);
            assert!((delay.feedback() - 0.6).abs() < 1e-6);
            assert!((delay.mix() - 0.4).abs() < 1e-6);
        }

        // Mismatched parameter type is rejected
        let applied = effect.apply_params(&EffectParams::LowPass {
            cutoff: 500.0,
            resonance: 1.0,
        });
        assert!(!applied);
    }

    #[test]
    fn test_octave_shift_selects_branch() {
        let mut effect = Effect::Octave(OctaveEffect::default());
        effect.apply_params(&EffectParams::Octave { octave_shift: 0.5, mix: 1.0 });
        if let Effect::Octave(octave) = &effect {
            assert!(!octave.higher());
        }
        effect.apply_params(&EffectParams::Octave { octave_shift: 2.0, mix: 1.0 });
        if let Effect::Octave(octave) = &effect {
            assert!(octave.higher());
        }
    }

    #[test]
    fn test_chain_order_matters() {
        // The shaper is nonlinear, so clipping before or after the filter
        // gives audibly different output
        let make_chain = |order: [EffectKind; 2]| -> Vec<Effect> {
            order
                .iter()
                .map(|kind| match kind {
                    EffectKind::Delay => Effect::Delay(DelayEffect::new(0.01, 0.5, 0.5, 44100.0)),
                    EffectKind::LowPass => {
                        Effect::LowPass(LowPassEffect::new(400.0, 44100.0, 0.707, 1.0))
                    }
                    EffectKind::Octave => Effect::Octave(OctaveEffect::new(true, 1.0)),
                })
                .collect()
        };

        let mut chain_a = make_chain([EffectKind::LowPass, EffectKind::Octave]);
        let mut chain_b = make_chain([EffectKind::Octave, EffectKind::LowPass]);

        let mut out_a = Vec::new();
        let mut out_b = Vec::new();
        let mut phase: f32 = 0.0;
        for _ in 0..2000 {
            phase += 3000.0 / 44100.0;
            let x = if phase.fract() < 0.5 { 1.0 } else { -1.0 };
            let mut frame_a = (x, x);
            for effect in &mut chain_a {
                frame_a = effect.process(frame_a);
            }
            let mut frame_b = (x, x);
            for effect in &mut chain_b {
                frame_b = effect.process(frame_b);
            }
            out_a.push(frame_a.0);
            out_b.push(frame_b.0);
        }

        let differs = out_a
            .iter()
            .zip(&out_b)
            .any(|(a, b)| (a - b).abs() > 1e-4);
        assert!(differs, "Chain order should affect the output");
    }
}
