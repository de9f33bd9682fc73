//! Lock-free stereo sample tap
//!
//! Fixed-capacity ring buffer that captures recent stereo frames for
//! visualization. Single producer (the audio callback) and single consumer
//! (a UI reader): the producer publishes its write position with release
//! stores, the consumer snapshots it with acquire loads, and no side ever
//! blocks. Samples are stored as `AtomicU32` bit patterns so the concurrent
//! access is well defined; the reader may observe at most one torn frame on
//! wrap, which visualization tolerates.

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

/// Lock-free SPSC ring buffer of interleaved stereo frames.
pub struct StereoRingBuffer {
    capacity_frames: usize,
    /// Interleaved L/R samples, stored as f32 bit patterns.
    buffer: Vec<AtomicU32>,
    write_index: AtomicUsize,
    total_frames_written: AtomicUsize,
}

impl StereoRingBuffer {
    /// Create a buffer holding up to `capacity_frames` stereo frames.
    pub fn new(capacity_frames: usize) -> Self {
        let capacity_frames = capacity_frames.max(1);
        let mut buffer = Vec::with_capacity(capacity_frames * 2);
        for _ in 0..capacity_frames * 2 {
            buffer.push(AtomicU32::new(0.0f32.to_bits()));
        }
        Self {
            capacity_frames,
            buffer,
            write_index: AtomicUsize::new(0),
            total_frames_written: AtomicUsize::new(0),
        }
    }

    /// Maximum number of frames the buffer can hold.
    pub fn capacity_frames(&self) -> usize {
        self.capacity_frames
    }

    /// Number of frames currently available to copy.
    pub fn available_frames(&self) -> usize {
        let written = self.total_frames_written.load(Ordering::Acquire);
        written.min(self.capacity_frames)
    }

    /// Append a stereo frame. Producer side only; never allocates or blocks.
    pub fn push(&self, left: f32, right: f32) {
        let mut frame_index = self.write_index.load(Ordering::Relaxed);
        let sample_index = frame_index * 2;
        self.buffer[sample_index].store(left.to_bits(), Ordering::Relaxed);
        self.buffer[sample_index + 1].store(right.to_bits(), Ordering::Relaxed);

        frame_index += 1;
        if frame_index >= self.capacity_frames {
            frame_index = 0;
        }

        // Publish the samples before the new position becomes visible
        self.write_index.store(frame_index, Ordering::Release);
        self.total_frames_written.fetch_add(1, Ordering::Release);
    }

    /// Copy the most recent frames into `dest` (interleaved L/R) and return
    /// the number of frames copied. Consumer side only.
    pub fn copy_latest_interleaved(&self, dest: &mut [f32], max_frames: usize) -> usize {
        let max_frames = max_frames.min(dest.len() / 2);
        if max_frames == 0 {
            return 0;
        }

        let frames_to_copy = max_frames.min(self.available_frames());
        if frames_to_copy == 0 {
            return 0;
        }

        let write_index = self.write_index.load(Ordering::Acquire);
        let mut start_frame = write_index + self.capacity_frames - frames_to_copy;
        if start_frame >= self.capacity_frames {
            start_frame %= self.capacity_frames;
        }

        for i in 0..frames_to_copy {
            let mut frame_index = start_frame + i;
            if frame_index >= self.capacity_frames {
                frame_index -= self.capacity_frames;
            }
            let sample_index = frame_index * 2;
            dest[i * 2] = f32::from_bits(self.buffer[sample_index].load(Ordering::Relaxed));
            dest[i * 2 + 1] = f32::from_bits(self.buffer[sample_index + 1].load(Ordering::Relaxed));
        }

        frames_to_copy
    }
}
