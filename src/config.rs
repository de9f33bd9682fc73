//! Engine configuration record
//!
//! Plain data handed to [`Engine::configure`](crate::engine::Engine) (and to
//! the audio glue) by the host. The engine itself never reads files or
//! environment variables; hosts deserialize this from wherever they keep
//! settings.

use serde::{Deserialize, Serialize};

/// Waveform choice, effect chain, envelope, and host-facing audio/MIDI
/// parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Oscillator name: `sine`, `square`, `saw`/`sawtooth`, `triangle`/`tri`
    /// (case-insensitive; unknown names select square).
    pub waveform: String,
    /// Ordered effect names: `octave`, `delay`/`echo`, `lowpass`/`lpf`/`filter`.
    /// Unrecognized names are silently ignored.
    pub effects: Vec<String>,

    /// Audio sample rate in Hz.
    pub sample_rate: f32,
    /// Frames per audio buffer requested from the device.
    pub buffer_frames: u32,
    /// MIDI port number for hosts that select by index.
    pub midi_port: i32,
    /// Default frequency for testing in Hz.
    pub default_frequency: f32,
    /// Input mode: `midi` or `sequencer`.
    pub input_mode: String,
    /// Sequence type for sequencer mode.
    pub sequence_type: String,

    /// ADSR attack time in seconds.
    pub attack_time: f32,
    /// ADSR decay time in seconds.
    pub decay_time: f32,
    /// ADSR sustain level in [0, 1].
    pub sustain_level: f32,
    /// ADSR release time in seconds.
    pub release_time: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            waveform: "sine".to_string(),
            effects: Vec::new(),
            sample_rate: 44100.0,
            buffer_frames: 512,
            midi_port: 1,
            default_frequency: 440.0,
            input_mode: "midi".to_string(),
            sequence_type: "demo".to_string(),
            attack_time: 0.1,
            decay_time: 0.2,
            sustain_level: 0.7,
            release_time: 0.3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_engine_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.waveform, "sine");
        assert!(config.effects.is_empty());
        assert_eq!(config.sample_rate, 44100.0);
        assert_eq!(config.buffer_frames, 512);
        assert_eq!(config.attack_time, 0.1);
        assert_eq!(config.decay_time, 0.2);
        assert_eq!(config.sustain_level, 0.7);
        assert_eq!(config.release_time, 0.3);
    }

    #[test]
    fn test_partial_deserialization_fills_defaults() {
        let json = r#"{"waveform": "saw", "effects": ["delay", "lowpass"]}"#;
        let config: EngineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.waveform, "saw");
        assert_eq!(config.effects, vec!["delay", "lowpass"]);
        assert_eq!(config.sample_rate, 44100.0);
        assert_eq!(config.sustain_level, 0.7);
    }
}
