//! # Oscine - Realtime Subtractive Synthesizer Engine
//!
//! Oscine is a realtime polyphonic subtractive synthesizer engine: feed it
//! note on/off events and continuous controls, and it produces a stereo
//! sample stream ready for an OS audio callback. Two oscillators, an ADSR
//! amplitude envelope, a slow drift LFO for analog-style pitch movement, and
//! a chain of stereo effects (resonant low-pass, feedback delay, shaper).
//!
//! ## Core Features
//!
//! - **Dual oscillators**: four classic waveforms, detune in cents, octave
//!   shifting, and free mix between the pair
//! - **ADSR envelope**: piecewise-linear amplitude state machine with smooth
//!   legato retriggering
//! - **Analog drift**: a slow LFO plus per-note random detune keeps pitches
//!   from being digitally sterile
//! - **Effect chain**: resonant biquad low-pass, stereo feedback delay, and
//!   a waveshaping colorant, processed in insertion order
//! - **Lock-free waveform tap**: an SPSC ring buffer exposes recent output
//!   frames to a UI without ever blocking the audio thread
//! - **MIDI input**: note, pitch-bend, and CC7 translation with midir device
//!   handling
//! - **Realtime discipline**: the sample path never locks, allocates, or
//!   fails; control changes land at audio-buffer boundaries
//!
//! ## Quick Start
//!
//! Render half a second of a 440 Hz sine note offline:
//!
//! ```rust
//! use oscine::{Engine, Waveform};
//!
//! let mut engine = Engine::new(44100.0);
//! engine.set_waveform(Waveform::Sine);
//! engine.update_adsr(0.01, 0.1, 0.7, 0.2);
//! engine.trigger_note(440.0);
//!
//! let samples: Vec<(f32, f32)> = (0..22050).map(|_| engine.next_sample()).collect();
//! assert!(samples.iter().any(|(left, _)| left.abs() > 0.5));
//!
//! engine.trigger_note_off(Some(440.0));
//! ```
//!
//! ## Live output
//!
//! For a live device stream, [`audio::AudioOutput`] owns the engine inside
//! the cpal callback and hands back an [`EngineHandle`] whose commands are
//! applied between buffers:
//!
//! ```rust,no_run
//! use oscine::{AudioOutput, EngineConfig};
//!
//! let config = EngineConfig {
//!     waveform: "saw".into(),
//!     effects: vec!["delay".into(), "lowpass".into()],
//!     ..EngineConfig::default()
//! };
//! let output = AudioOutput::new(&config).expect("audio device");
//! let handle = output.handle();
//! handle.trigger_note(220.0);
//! ```

pub mod audio;
pub mod config;
pub mod control;
pub mod effects;
pub mod engine;
pub mod envelope;
pub mod midi;
pub mod ring_buffer;
pub mod voice;
pub mod wave;

pub use audio::AudioOutput;
pub use config::EngineConfig;
pub use control::{command_queue, EngineCommand, EngineHandle};
pub use effects::{
    DelayEffect, Effect, EffectId, EffectKind, EffectParams, LowPassEffect, OctaveEffect,
};
pub use engine::Engine;
pub use envelope::AdsrEnvelope;
pub use midi::{note_frequency, translate, MidiEvent, MidiInputHandler, MidiMessageType};
pub use ring_buffer::StereoRingBuffer;
pub use voice::{DriftLfo, SecondaryOscillator, Voice};
pub use wave::Waveform;
