//! Real-time audio output using cpal
//!
//! Thin adapter between the engine and the OS audio callback. The engine
//! lives inside the callback closure; each callback first drains the pending
//! control commands, then pulls one stereo sample per frame. Works with
//! JACK, ALSA, CoreAudio, WASAPI, OpenSL ES, etc.

use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::Receiver;
use tracing::{error, info};

use crate::config::EngineConfig;
use crate::control::{command_queue, EngineCommand, EngineHandle};
use crate::engine::Engine;
use crate::ring_buffer::StereoRingBuffer;

/// Engine plus waveform tap running inside a live output stream.
pub struct AudioOutput {
    sample_rate: f32,
    handle: EngineHandle,
    waveform_tap: Arc<StereoRingBuffer>,
    _stream: cpal::Stream,
}

impl AudioOutput {
    /// Open the default output device, build an engine from `config`, and
    /// start the stream.
    pub fn new(config: &EngineConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let host = cpal::default_host();
        info!("audio host: {:?}", host.id());

        let device = host
            .default_output_device()
            .ok_or("no audio output device found")?;
        info!("audio device: {}", device.name()?);

        let default_config = device.default_output_config()?;
        let sample_rate = default_config.sample_rate().0 as f32;
        let channels = default_config.channels() as usize;
        let sample_format = default_config.sample_format();

        let mut stream_config: cpal::StreamConfig = default_config.into();
        if config.buffer_frames > 0 {
            stream_config.buffer_size = cpal::BufferSize::Fixed(config.buffer_frames);
        }

        // Tap sized for half a second of audio, at least 2048 frames
        let waveform_tap = Arc::new(StereoRingBuffer::new(
            (sample_rate * 0.5).max(2048.0) as usize,
        ));

        let mut engine = Engine::new(sample_rate);
        engine.configure(config);
        engine.set_waveform_tap(Some(Arc::clone(&waveform_tap)));

        let (handle, command_rx) = command_queue();

        let stream = match sample_format {
            cpal::SampleFormat::F32 => {
                build_stream::<f32>(&device, &stream_config, engine, command_rx, channels)
            }
            cpal::SampleFormat::I16 => {
                build_stream::<i16>(&device, &stream_config, engine, command_rx, channels)
            }
            cpal::SampleFormat::U16 => {
                build_stream::<u16>(&device, &stream_config, engine, command_rx, channels)
            }
            other => return Err(format!("unsupported sample format {:?}", other).into()),
        }?;

        stream.play()?;
        info!("audio stream started at {} Hz", sample_rate as u32);

        Ok(Self {
            sample_rate,
            handle,
            waveform_tap,
            _stream: stream,
        })
    }

    /// The device's sample rate in Hz.
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Cloneable control handle for UI and MIDI threads.
    pub fn handle(&self) -> EngineHandle {
        self.handle.clone()
    }

    /// Shared tap for readers that want to manage their own copies.
    pub fn waveform_tap(&self) -> Arc<StereoRingBuffer> {
        Arc::clone(&self.waveform_tap)
    }

    /// Copy the most recent post-effect frames for display. Returns an
    /// interleaved L/R buffer of length `2 * frames_copied`. Allocates on
    /// the caller's thread, never on the audio thread.
    pub fn copy_recent_waveform(&self, max_frames: usize) -> Vec<f32> {
        let frames = max_frames.min(self.waveform_tap.capacity_frames());
        let mut dest = vec![0.0; frames * 2];
        let copied = self.waveform_tap.copy_latest_interleaved(&mut dest, frames);
        dest.truncate(copied * 2);
        dest
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut engine: Engine,
    command_rx: Receiver<EngineCommand>,
    channels: usize,
) -> Result<cpal::Stream, Box<dyn std::error::Error>>
where
    T: cpal::SizedSample + cpal::FromSample<f32>,
{
    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            // Structural and parameter changes land between buffers
            while let Ok(command) = command_rx.try_recv() {
                engine.apply_command(command);
            }

            for frame in data.chunks_mut(channels) {
                let (left, right) = engine.next_sample();
                write_frame(frame, left, right);
            }
        },
        |err| error!("audio stream error: {}", err),
        None,
    )?;

    Ok(stream)
}

/// Write a stereo sample into a device frame of any channel count: mono
/// devices get the average, extra channels stay silent.
fn write_frame<T>(frame: &mut [T], left: f32, right: f32)
where
    T: cpal::SizedSample + cpal::FromSample<f32>,
{
    match frame.len() {
        0 => {}
        1 => frame[0] = T::from_sample((left + right) * 0.5),
        _ => {
            frame[0] = T::from_sample(left);
            frame[1] = T::from_sample(right);
            for channel in frame.iter_mut().skip(2) {
                *channel = T::from_sample(0.0);
            }
        }
    }
}
