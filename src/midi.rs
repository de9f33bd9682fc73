//! MIDI input and event translation
//!
//! Parses raw MIDI bytes into typed events, maps them onto engine commands
//! (note on/off, pitch bend, CC7 volume as filter cutoff), and connects to
//! hardware input devices via midir. The device callback only parses and
//! enqueues; the engine applies the resulting commands between audio
//! buffers.

use midir::{Ignore, MidiInput, MidiInputConnection, MidiInputPort};
use tracing::{info, warn};

use crate::control::{EngineCommand, EngineHandle};

/// CC7 sweeps the low-pass cutoff exponentially across this range.
const VOLUME_CUTOFF_MIN_HZ: f32 = 80.0;
const VOLUME_CUTOFF_MAX_HZ: f32 = 12000.0;

/// Type of MIDI message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiMessageType {
    NoteOn { note: u8, velocity: u8 },
    NoteOff { note: u8, velocity: u8 },
    ControlChange { controller: u8, value: u8 },
    ProgramChange { program: u8 },
    PitchBend { value: i16 },
    Other,
}

/// Parsed MIDI event with channel and arrival timestamp.
#[derive(Debug, Clone)]
pub struct MidiEvent {
    /// Timestamp when received (microseconds from stream start)
    pub timestamp_us: u64,
    /// Channel (0-15)
    pub channel: u8,
    /// Message type
    pub message_type: MidiMessageType,
}

impl MidiEvent {
    /// Parse raw MIDI bytes into a MidiEvent. A note-on with velocity 0 is a
    /// note-off.
    pub fn from_bytes(bytes: &[u8], timestamp_us: u64) -> Option<Self> {
        if bytes.is_empty() {
            return None;
        }

        let status = bytes[0];
        let channel = status & 0x0F;
        let message_type = match status & 0xF0 {
            0x90 if bytes.len() >= 3 && bytes[2] > 0 => MidiMessageType::NoteOn {
                note: bytes[1],
                velocity: bytes[2],
            },
            0x90 if bytes.len() >= 3 => MidiMessageType::NoteOff {
                note: bytes[1],
                velocity: 0,
            },
            0x80 if bytes.len() >= 3 => MidiMessageType::NoteOff {
                note: bytes[1],
                velocity: bytes[2],
            },
            0xB0 if bytes.len() >= 3 => MidiMessageType::ControlChange {
                controller: bytes[1],
                value: bytes[2],
            },
            0xC0 if bytes.len() >= 2 => MidiMessageType::ProgramChange { program: bytes[1] },
            0xE0 if bytes.len() >= 3 => {
                let lsb = bytes[1] as i16;
                let msb = bytes[2] as i16;
                let value = ((msb << 7) | lsb) - 8192;
                MidiMessageType::PitchBend { value }
            }
            _ => MidiMessageType::Other,
        };

        Some(Self {
            timestamp_us,
            channel,
            message_type,
        })
    }
}

/// Equal-temperament frequency for a MIDI note number, A4 = 440 Hz at 69.
pub fn note_frequency(note: u8) -> f32 {
    440.0 * (((note as f32) - 69.0) / 12.0).exp2()
}

/// The exponential CC7 volume-to-cutoff curve: 0 -> 80 Hz, 127 -> 12 kHz.
pub fn volume_to_cutoff(value: u8) -> f32 {
    let normalized = (value.min(127)) as f32 / 127.0;
    let ratio = VOLUME_CUTOFF_MAX_HZ / VOLUME_CUTOFF_MIN_HZ;
    VOLUME_CUTOFF_MIN_HZ * ratio.powf(normalized)
}

/// Map a MIDI event onto an engine command. Events the engine has no use
/// for (program changes, other controllers, system messages) map to `None`.
pub fn translate(event: &MidiEvent) -> Option<EngineCommand> {
    match event.message_type {
        MidiMessageType::NoteOn { note, velocity } if velocity > 0 => {
            if note > 127 {
                return None;
            }
            Some(EngineCommand::TriggerNote(note_frequency(note)))
        }
        MidiMessageType::NoteOn { note, .. } => {
            // Velocity 0 is a release (running-status convention)
            if note > 127 {
                return Some(EngineCommand::TriggerNoteOff(None));
            }
            Some(EngineCommand::TriggerNoteOff(Some(note_frequency(note))))
        }
        MidiMessageType::NoteOff { note, .. } => {
            if note > 127 {
                // Unknown note number releases everything
                return Some(EngineCommand::TriggerNoteOff(None));
            }
            Some(EngineCommand::TriggerNoteOff(Some(note_frequency(note))))
        }
        MidiMessageType::PitchBend { value } => Some(EngineCommand::SetPitchBend(value as i32)),
        MidiMessageType::ControlChange { controller: 7, value } => {
            Some(EngineCommand::SetLowPassCutoff(volume_to_cutoff(value)))
        }
        _ => None,
    }
}

/// MIDI input device info
#[derive(Debug, Clone)]
pub struct MidiInputDevice {
    pub name: String,
    pub index: usize,
}

/// Port names that are virtual loopback/timing ports rather than hardware
/// controllers; automatic selection skips them.
const VIRTUAL_PORT_MARKERS: [&str; 4] = ["Midi Through", "Announce", "Timer", "PipeWire"];

/// Connects a MIDI input port and forwards translated events to the engine's
/// command queue.
pub struct MidiInputHandler {
    connection: Option<MidiInputConnection<()>>,
}

impl MidiInputHandler {
    pub fn new() -> Self {
        Self { connection: None }
    }

    /// List available MIDI input devices.
    pub fn list_devices() -> Result<Vec<MidiInputDevice>, Box<dyn std::error::Error>> {
        let midi_in = MidiInput::new("oscine MIDI scanner")?;
        let ports = midi_in.ports();

        let devices = ports
            .iter()
            .enumerate()
            .filter_map(|(i, port)| {
                midi_in
                    .port_name(port)
                    .ok()
                    .map(|name| MidiInputDevice { name, index: i })
            })
            .collect();

        Ok(devices)
    }

    /// Connect to the first hardware controller, skipping virtual loopback
    /// ports; falls back to port 0 when only virtual ports exist.
    pub fn connect_auto(
        &mut self,
        handle: EngineHandle,
    ) -> Result<String, Box<dyn std::error::Error>> {
        let midi_in = MidiInput::new("oscine MIDI input")?;
        let ports = midi_in.ports();
        if ports.is_empty() {
            return Err("no MIDI input ports found".into());
        }

        let mut selected = 0;
        for (i, port) in ports.iter().enumerate() {
            let Ok(name) = midi_in.port_name(port) else {
                continue;
            };
            if !VIRTUAL_PORT_MARKERS.iter().any(|marker| name.contains(marker)) {
                selected = i;
                info!(port = %name, "selected hardware MIDI controller");
                break;
            }
        }

        let port = ports[selected].clone();
        let name = midi_in.port_name(&port).unwrap_or_default();
        self.connect_port(midi_in, port, handle)?;
        Ok(name)
    }

    /// Connect to a MIDI input device by name substring.
    pub fn connect(
        &mut self,
        device_name: &str,
        handle: EngineHandle,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let midi_in = MidiInput::new("oscine MIDI input")?;
        let ports = midi_in.ports();

        let port = ports
            .iter()
            .find(|p| {
                midi_in
                    .port_name(p)
                    .map_or(false, |n| n.contains(device_name))
            })
            .ok_or_else(|| format!("MIDI device '{}' not found", device_name))?
            .clone();

        self.connect_port(midi_in, port, handle)
    }

    /// Connect to a MIDI input device by port index.
    pub fn connect_by_index(
        &mut self,
        index: usize,
        handle: EngineHandle,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let midi_in = MidiInput::new("oscine MIDI input")?;
        let ports = midi_in.ports();

        let port = ports
            .get(index)
            .ok_or_else(|| format!("MIDI device index {} not found", index))?
            .clone();

        self.connect_port(midi_in, port, handle)
    }

    fn connect_port(
        &mut self,
        mut midi_in: MidiInput,
        port: MidiInputPort,
        handle: EngineHandle,
    ) -> Result<(), Box<dyn std::error::Error>> {
        // Sysex and timing messages are noise for a synth input
        midi_in.ignore(Ignore::Sysex | Ignore::Time);

        let connection = midi_in.connect(
            &port,
            "oscine-input",
            move |timestamp_us, bytes, _| {
                if let Some(event) = MidiEvent::from_bytes(bytes, timestamp_us) {
                    if let Some(command) = translate(&event) {
                        handle.send(command);
                    }
                }
            },
            (),
        )?;

        self.connection = Some(connection);
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Disconnect from the current device.
    pub fn disconnect(&mut self) {
        if self.connection.take().is_some() {
            warn!("MIDI input disconnected");
        }
    }
}

impl Default for MidiInputHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Engine;

    fn apply(engine: &mut Engine, event: &MidiEvent) {
        if let Some(command) = translate(event) {
            engine.apply_command(command);
        }
    }

    #[test]
    fn test_note_frequency_table() {
        assert!((note_frequency(69) - 440.0).abs() < 1e-3);
        assert!((note_frequency(57) - 220.0).abs() < 1e-3);
        assert!((note_frequency(81) - 880.0).abs() < 1e-3);
        assert!((note_frequency(60) - 261.6256).abs() < 0.01);
        assert!((note_frequency(0) - 8.1758).abs() < 0.001);
    }

    #[test]
    fn test_parse_note_on() {
        let event = MidiEvent::from_bytes(&[0x90, 69, 100], 0).unwrap();
        assert_eq!(event.channel, 0);
        assert_eq!(
            event.message_type,
            MidiMessageType::NoteOn {
                note: 69,
                velocity: 100
            }
        );
    }

    #[test]
    fn test_parse_note_on_zero_velocity_is_note_off() {
        let event = MidiEvent::from_bytes(&[0x90, 69, 0], 0).unwrap();
        assert_eq!(
            event.message_type,
            MidiMessageType::NoteOff {
                note: 69,
                velocity: 0
            }
        );
    }

    #[test]
    fn test_parse_pitch_bend_range() {
        // lsb=0, msb=0 -> -8192; lsb=127, msb=127 -> +8191; center = 0
        let event = MidiEvent::from_bytes(&[0xE0, 0, 0], 0).unwrap();
        assert_eq!(event.message_type, MidiMessageType::PitchBend { value: -8192 });

        let event = MidiEvent::from_bytes(&[0xE0, 127, 127], 0).unwrap();
        assert_eq!(event.message_type, MidiMessageType::PitchBend { value: 8191 });

        let event = MidiEvent::from_bytes(&[0xE0, 0, 64], 0).unwrap();
        assert_eq!(event.message_type, MidiMessageType::PitchBend { value: 0 });
    }

    #[test]
    fn test_parse_channel_and_truncated_messages() {
        let event = MidiEvent::from_bytes(&[0x93, 60, 80], 0).unwrap();
        assert_eq!(event.channel, 3);

        assert!(MidiEvent::from_bytes(&[], 0).is_none());
        // Truncated note-on parses as Other rather than a bogus note
        let event = MidiEvent::from_bytes(&[0x90, 60], 0).unwrap();
        assert_eq!(event.message_type, MidiMessageType::Other);
    }

    #[test]
    fn test_volume_curve_endpoints() {
        assert!((volume_to_cutoff(0) - 80.0).abs() < 0.5);
        assert!((volume_to_cutoff(127) - 12000.0).abs() < 50.0);
        // Midpoint of an exponential sweep is the geometric mean
        let mid = volume_to_cutoff(64);
        let geometric_mean = (80.0f32 * 12000.0).sqrt();
        assert!((mid - geometric_mean).abs() / geometric_mean < 0.05);
    }

    #[test]
    fn test_note_on_off_drives_engine() {
        let mut engine = Engine::with_seed(44100.0, 3);

        apply(
            &mut engine,
            &MidiEvent::from_bytes(&[0x90, 69, 100], 0).unwrap(),
        );
        assert!(engine.note_on());
        assert!((engine.frequency() - 440.0).abs() < 1e-3);

        apply(
            &mut engine,
            &MidiEvent::from_bytes(&[0x80, 69, 0], 0).unwrap(),
        );
        assert!(!engine.note_on());
        assert_eq!(engine.active_note_count(), 0);
    }

    #[test]
    fn test_ignored_events_produce_no_command() {
        let program_change = MidiEvent::from_bytes(&[0xC0, 5], 0).unwrap();
        assert!(translate(&program_change).is_none());

        // CC other than 7 is ignored
        let cc_mod_wheel = MidiEvent::from_bytes(&[0xB0, 1, 64], 0).unwrap();
        assert!(translate(&cc_mod_wheel).is_none());

        let other = MidiEvent::from_bytes(&[0xF8], 0).unwrap();
        assert!(translate(&other).is_none());
    }
}
