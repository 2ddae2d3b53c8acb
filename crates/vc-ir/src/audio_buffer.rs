//! Multichannel f32 audio buffer with planar layout.

use alloc::vec;
use alloc::vec::Vec;

/// A multichannel f32 audio buffer in planar layout.
///
/// Storage is `channels` contiguous planes of `capacity` samples each; only
/// the first `frames` samples of each plane are valid.
/// `data[ch * capacity + frame]` gives the sample for channel `ch` at `frame`.
#[derive(Clone, Debug)]
pub struct AudioBuffer {
    data: Vec<f32>,
    channels: u16,
    capacity: usize,
    frames: usize,
}

impl AudioBuffer {
    /// Create a new silent buffer with room for `capacity` frames.
    ///
    /// The buffer starts with `capacity` valid frames.
    pub fn new(channels: u16, capacity: usize) -> Self {
        Self {
            data: vec![0.0; channels as usize * capacity],
            channels,
            capacity,
            frames: capacity,
        }
    }

    /// Fill all samples with zero.
    pub fn silence(&mut self) {
        self.data.fill(0.0);
    }

    /// Number of channels.
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Number of valid frames.
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Maximum number of frames the buffer can hold.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Set the number of valid frames, clamped to the capacity.
    pub fn set_frames(&mut self, frames: usize) {
        self.frames = frames.min(self.capacity);
    }

    /// Read-only access to one channel's valid samples.
    pub fn channel(&self, ch: u16) -> &[f32] {
        let start = ch as usize * self.capacity;
        &self.data[start..start + self.frames]
    }

    /// Mutable access to one channel's valid samples.
    pub fn channel_mut(&mut self, ch: u16) -> &mut [f32] {
        let start = ch as usize * self.capacity;
        let len = self.frames;
        &mut self.data[start..start + len]
    }
}
