//! "Octave" colorant effect
//!
//! Despite the name this is not a pitch shifter. In the upward setting it
//! adds harmonics by tanh soft-clipping; in the downward setting it darkens
//! the signal with a one-pole low-pass. Either branch is crossfaded with the
//! dry signal by `blend`.

use super::EffectId;

/// Waveshaper / one-pole colorant with dry/wet blend.
#[derive(Debug, Clone)]
pub struct OctaveEffect {
    pub(super) id: EffectId,
    higher: bool,
    blend: f32,
    frequency: f32,
    sample_rate: f32,
    state_left: f32,
    state_right: f32,
}

impl OctaveEffect {
    pub fn new(higher: bool, blend: f32) -> Self {
        Self {
            id: EffectId::next(),
            higher,
            blend: blend.clamp(0.0, 1.0),
            frequency: 0.0,
            sample_rate: 44100.0,
            state_left: 0.0,
            state_right: 0.0,
        }
    }

    pub fn process(&mut self, frame: (f32, f32)) -> (f32, f32) {
        if self.blend <= 0.0 {
            return frame;
        }

        let (mut left, mut right) = frame;

        if self.higher {
            // Soft clipping adds odd harmonics above the fundamental
            let shaped_left = (left * 2.0).tanh() * 0.8;
            let shaped_right = (right * 2.0).tanh() * 0.8;
            left = (1.0 - self.blend) * left + self.blend * shaped_left;
            right = (1.0 - self.blend) * right + self.blend * shaped_right;
        } else {
            // One-pole low-pass darkens toward a sub-octave feel
            self.state_left = self.state_left * 0.8 + left * 0.2;
            self.state_right = self.state_right * 0.8 + right * 0.2;
            left = (1.0 - self.blend) * left + self.blend * self.state_left;
            right = (1.0 - self.blend) * right + self.blend * self.state_right;
        }

        (left, right)
    }

    pub fn reset(&mut self) {
        self.state_left = 0.0;
        self.state_right = 0.0;
    }

    pub fn higher(&self) -> bool {
        self.higher
    }

    pub fn blend(&self) -> f32 {
        self.blend
    }

    pub fn set_higher(&mut self, higher: bool) {
        self.higher = higher;
    }

    pub fn set_blend(&mut self, blend: f32) {
        self.blend = blend.clamp(0.0, 1.0);
    }

    /// Track the current note frequency (set on each trigger).
    pub fn set_frequency(&mut self, frequency: f32) {
        if frequency > 0.0 && frequency <= 20000.0 {
            self.frequency = frequency;
        }
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        if sample_rate > 0.0 {
            self.sample_rate = sample_rate;
        }
    }
}

impl Default for OctaveEffect {
    fn default() -> Self {
        Self::new(true, 0.5)
    }
}
