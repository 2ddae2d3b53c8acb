//! Real-time drain of the ring buffer into device buffers.
//!
//! Runs on the audio callback thread: no locks, no allocation, no logging.

use std::sync::Arc;

use vc_ir::PLAYBACK_SAMPLE_BYTES;

use crate::ring_buffer::RingReader;
use crate::state::PlaybackState;

pub struct PlaybackConsumer {
    reader: RingReader,
    state: Arc<PlaybackState>,
    channels: usize,
}

impl PlaybackConsumer {
    /// `channels` is the interleaved channel count of the ring contents.
    pub fn new(reader: RingReader, state: Arc<PlaybackState>, channels: u16) -> Self {
        Self {
            reader,
            state,
            channels: usize::from(channels.max(1)),
        }
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn state(&self) -> &Arc<PlaybackState> {
        &self.state
    }

    pub fn fill_len(&self) -> usize {
        self.reader.fill_len()
    }

    /// Fill `out`, a device buffer with `out_channels` samples per frame.
    ///
    /// Copies as many buffered frames as are available, scaled by the
    /// current volume, and zero-fills the rest. Device channels beyond the
    /// stream's are silent; stream channels beyond the device's are
    /// dropped. Returns frames taken from the ring.
    pub fn drain(&mut self, out: &mut [f32], out_channels: usize) -> usize {
        if out_channels == 0 {
            return 0;
        }
        if !self.state.is_playing() {
            out.fill(0.0);
            return 0;
        }

        let frame_bytes = self.channels * PLAYBACK_SAMPLE_BYTES;
        let requested = out.len() / out_channels;
        let gain = self.state.volume() / 32768.0;
        let mut done = 0;

        while done < requested {
            let region = self.reader.read_region();
            let available = region.len() / frame_bytes;
            if available == 0 {
                break;
            }
            let n = available.min(requested - done);

            let dst = &mut out[done * out_channels..(done + n) * out_channels];
            for (frame, src) in dst
                .chunks_exact_mut(out_channels)
                .zip(region.chunks_exact(frame_bytes))
            {
                for (ch, sample) in frame.iter_mut().enumerate() {
                    *sample = match src.get(ch * PLAYBACK_SAMPLE_BYTES..(ch + 1) * PLAYBACK_SAMPLE_BYTES) {
                        Some(&[lo, hi]) => f32::from(i16::from_le_bytes([lo, hi])) * gain,
                        _ => 0.0,
                    };
                }
            }

            self.reader.release(n * frame_bytes);
            done += n;
        }

        out[done * out_channels..].fill(0.0);
        self.state.add_frames_played(done as u64);
        done
    }
}
