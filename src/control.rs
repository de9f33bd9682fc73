//! Control-side command queue
//!
//! Control and MIDI threads never touch the engine directly: they enqueue
//! [`EngineCommand`] values through a cloneable [`EngineHandle`], and the
//! audio callback drains the queue between buffers before pulling samples.
//! The queue is bounded and lock-free on both sides; the audio thread never
//! takes a mutex and the senders never block. Structural changes (effect
//! chain rebuilds) therefore land exactly at buffer boundaries.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use tracing::warn;

use crate::config::EngineConfig;
use crate::effects::{Effect, EffectParams};
use crate::engine::Engine;
use crate::wave::Waveform;

/// Commands pending between two audio buffers. Sized generously: a buffer at
/// 512 frames / 44.1 kHz is ~12 ms, and even a dense MIDI stream stays far
/// below this.
const COMMAND_QUEUE_CAPACITY: usize = 1024;

/// A control-surface operation, applied on the audio thread between buffers.
#[derive(Debug)]
pub enum EngineCommand {
    TriggerNote(f32),
    TriggerNoteOff(Option<f32>),
    SetWaveform(Waveform),
    SetSecondaryWaveform(Waveform),
    ConfigureSecondary {
        enabled: bool,
        mix: f32,
        detune_cents: f32,
        octave_offset: i32,
    },
    SetPitchBend(i32),
    UpdateAdsr {
        attack: f32,
        decay: f32,
        sustain: f32,
        release: f32,
    },
    SetDrift {
        rate_hz: f32,
        amount_cents: f32,
        jitter_cents: f32,
    },
    AddEffect(Effect),
    ClearEffects,
    ResetEffects,
    SetLowPassCutoff(f32),
    UpdateEffectParameters {
        name: String,
        params: EffectParams,
    },
    Configure(EngineConfig),
}

impl EngineCommand {
    /// Short name for logging (the full Debug form can embed effect buffers).
    fn describe(&self) -> &'static str {
        match self {
            EngineCommand::TriggerNote(_) => "trigger_note",
            EngineCommand::TriggerNoteOff(_) => "trigger_note_off",
            EngineCommand::SetWaveform(_) => "set_waveform",
            EngineCommand::SetSecondaryWaveform(_) => "set_secondary_waveform",
            EngineCommand::ConfigureSecondary { .. } => "configure_secondary",
            EngineCommand::SetPitchBend(_) => "set_pitch_bend",
            EngineCommand::UpdateAdsr { .. } => "update_adsr",
            EngineCommand::SetDrift { .. } => "set_drift",
            EngineCommand::AddEffect(_) => "add_effect",
            EngineCommand::ClearEffects => "clear_effects",
            EngineCommand::ResetEffects => "reset_effects",
            EngineCommand::SetLowPassCutoff(_) => "set_low_pass_cutoff",
            EngineCommand::UpdateEffectParameters { .. } => "update_effect_parameters",
            EngineCommand::Configure(_) => "configure",
        }
    }
}

impl Engine {
    /// Apply one queued control command.
    pub fn apply_command(&mut self, command: EngineCommand) {
        match command {
            EngineCommand::TriggerNote(frequency) => self.trigger_note(frequency),
            EngineCommand::TriggerNoteOff(frequency) => self.trigger_note_off(frequency),
            EngineCommand::SetWaveform(waveform) => self.set_waveform(waveform),
            EngineCommand::SetSecondaryWaveform(waveform) => {
                self.set_secondary_waveform(waveform)
            }
            EngineCommand::ConfigureSecondary {
                enabled,
                mix,
                detune_cents,
                octave_offset,
            } => self.configure_secondary(enabled, mix, detune_cents, octave_offset),
            EngineCommand::SetPitchBend(raw) => self.set_pitch_bend(raw),
            EngineCommand::UpdateAdsr {
                attack,
                decay,
                sustain,
                release,
            } => self.update_adsr(attack, decay, sustain, release),
            EngineCommand::SetDrift {
                rate_hz,
                amount_cents,
                jitter_cents,
            } => self.set_drift(rate_hz, amount_cents, jitter_cents),
            EngineCommand::AddEffect(effect) => self.add_effect(effect),
            EngineCommand::ClearEffects => self.clear_effects(),
            EngineCommand::ResetEffects => self.reset_effects(),
            EngineCommand::SetLowPassCutoff(cutoff) => self.set_low_pass_cutoff(cutoff),
            EngineCommand::UpdateEffectParameters { name, params } => {
                self.update_effect_parameters(&name, &params);
            }
            EngineCommand::Configure(config) => self.configure(&config),
        }
    }
}

/// Create the command queue. The receiver goes to the audio callback; the
/// handle is cloned across control and MIDI threads.
pub fn command_queue() -> (EngineHandle, Receiver<EngineCommand>) {
    let (tx, rx) = bounded(COMMAND_QUEUE_CAPACITY);
    (EngineHandle { tx }, rx)
}

/// Cloneable sender for control-surface operations.
#[derive(Clone)]
pub struct EngineHandle {
    tx: Sender<EngineCommand>,
}

impl EngineHandle {
    /// Enqueue a command without blocking. A full queue drops the command
    /// with a warning; the next parameter update supersedes it anyway.
    pub fn send(&self, command: EngineCommand) {
        match self.tx.try_send(command) {
            Ok(()) => {}
            Err(TrySendError::Full(command)) => {
                warn!(
                    command = command.describe(),
                    "engine command queue full, dropping command"
                );
            }
            Err(TrySendError::Disconnected(_)) => {
                warn!("engine command queue disconnected");
            }
        }
    }

    pub fn trigger_note(&self, frequency: f32) {
        self.send(EngineCommand::TriggerNote(frequency));
    }

    pub fn trigger_note_off(&self, frequency: Option<f32>) {
        self.send(EngineCommand::TriggerNoteOff(frequency));
    }

    pub fn set_waveform(&self, waveform: Waveform) {
        self.send(EngineCommand::SetWaveform(waveform));
    }

    pub fn set_pitch_bend(&self, raw: i32) {
        self.send(EngineCommand::SetPitchBend(raw));
    }

    pub fn update_adsr(&self, attack: f32, decay: f32, sustain: f32, release: f32) {
        self.send(EngineCommand::UpdateAdsr {
            attack,
            decay,
            sustain,
            release,
        });
    }

    pub fn set_drift(&self, rate_hz: f32, amount_cents: f32, jitter_cents: f32) {
        self.send(EngineCommand::SetDrift {
            rate_hz,
            amount_cents,
            jitter_cents,
        });
    }

    pub fn set_low_pass_cutoff(&self, cutoff_hz: f32) {
        self.send(EngineCommand::SetLowPassCutoff(cutoff_hz));
    }
}
