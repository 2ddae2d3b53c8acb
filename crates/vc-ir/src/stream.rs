//! Playback stream description and transport state.

use core::time::Duration;

/// Bytes per decoded sample. Playback always runs on signed 16-bit PCM.
pub const PLAYBACK_SAMPLE_BYTES: usize = 2;

/// Layout of the decoded PCM stream handed to the audio device.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreamSpec {
    pub channels: u16,
    pub sample_rate: u32,
}

impl StreamSpec {
    pub const fn new(channels: u16, sample_rate: u32) -> Self {
        Self { channels, sample_rate }
    }

    /// Bytes per interleaved 16-bit frame.
    pub const fn bytes_per_frame(&self) -> usize {
        self.channels as usize * PLAYBACK_SAMPLE_BYTES
    }

    /// Byte count covering `millis` of audio, rounded down to whole frames
    /// and never smaller than one frame.
    pub fn bytes_for_millis(&self, millis: u32) -> usize {
        let frames = (self.sample_rate as u64 * millis as u64 / 1000).max(1);
        frames as usize * self.bytes_per_frame()
    }

    /// Convert a frame count to a duration.
    pub fn frames_to_duration(&self, frames: u64) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        let secs = frames / self.sample_rate as u64;
        let rem = frames % self.sample_rate as u64;
        Duration::from_secs(secs)
            + Duration::from_nanos(rem * 1_000_000_000 / self.sample_rate as u64)
    }

    /// Convert a duration to a frame count, rounding down.
    pub fn duration_to_frames(&self, duration: Duration) -> u64 {
        (duration.as_nanos() * self.sample_rate as u128 / 1_000_000_000) as u64
    }
}

/// Transport state of a playback session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Transport {
    Paused = 0,
    Playing = 1,
    Stopped = 2,
}

impl Transport {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Transport::Paused,
            1 => Transport::Playing,
            _ => Transport::Stopped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_hundred_ms_of_stereo() {
        let spec = StreamSpec::new(2, 44100);
        assert_eq!(spec.bytes_for_millis(200), 8820 * 4);
    }

    #[test]
    fn tiny_buffers_hold_one_frame() {
        let spec = StreamSpec::new(1, 10);
        assert_eq!(spec.bytes_for_millis(1), 2);
    }

    #[test]
    fn frame_duration_conversions_agree() {
        let spec = StreamSpec::new(1, 48000);
        assert_eq!(spec.frames_to_duration(72000), Duration::from_millis(1500));
        assert_eq!(spec.duration_to_frames(Duration::from_millis(1500)), 72000);
    }

    #[test]
    fn transport_from_raw() {
        assert_eq!(Transport::from_u8(Transport::Playing as u8), Transport::Playing);
        assert_eq!(Transport::from_u8(9), Transport::Stopped);
    }
}
