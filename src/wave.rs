//! Waveform generators
//!
//! Stateless sample-from-phase functions for the four classic analog shapes.
//! No band-limiting is applied; the aliasing of the naive shapes is part of
//! the engine's vintage character.

use std::f32::consts::PI;

/// Waveform types for the primary and secondary oscillators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Waveform {
    Sine,
    #[default]
    Square,
    Saw,
    Triangle,
}

impl Waveform {
    /// Parse a waveform name (case-insensitive, with synonyms).
    ///
    /// Recognized names: `sine`, `square`, `saw`/`sawtooth`, `triangle`/`tri`.
    /// Unrecognized or empty names fall back to `Square`.
    pub fn from_name(name: &str) -> Waveform {
        match name.to_lowercase().as_str() {
            "sine" => Waveform::Sine,
            "saw" | "sawtooth" => Waveform::Saw,
            "triangle" | "tri" => Waveform::Triangle,
            // Empty and unrecognized names both select the square wave
            _ => Waveform::Square,
        }
    }

    /// Generate one sample and advance `phase` by `freq / sample_rate`.
    ///
    /// `phase` stays in [0.0, 1.0); the returned sample is in [-1.0, 1.0].
    pub fn generate(self, freq: f32, sample_rate: f32, phase: &mut f32) -> f32 {
        let sample = match self {
            Waveform::Sine => (*phase * 2.0 * PI).sin(),

            Waveform::Square => {
                if *phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }

            Waveform::Saw => 2.0 * *phase - 1.0,

            Waveform::Triangle => 4.0 * (*phase - 0.5).abs() - 1.0,
        };

        // Advance and wrap phase to [0.0, 1.0)
        *phase += freq / sample_rate;
        while *phase >= 1.0 {
            *phase -= 1.0;
        }
        while *phase < 0.0 {
            *phase += 1.0;
        }

        sample
    }
}
