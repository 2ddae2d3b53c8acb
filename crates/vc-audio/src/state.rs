//! Playback state shared by the controller, decode worker and audio callback.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicU8, Ordering};

use vc_ir::Transport;

const CMD_NONE: u8 = 0;
const CMD_RESET: u8 = 1;
const CMD_SEEK: u8 = 2;

/// Request handed from the controller to the decode worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    /// Rewind to the origin and pause
    Reset,
    /// Reposition to the given frame, keeping the transport as is
    Seek(u64),
}

/// Lock-free playback state.
///
/// Transport and end-of-stream are explicit atomics rather than packed flag
/// bits. Reset and seek travel through a single command slot: a newer
/// request replaces an unconsumed older one.
pub struct PlaybackState {
    transport: AtomicU8,
    eos: AtomicBool,
    volume: AtomicU32,
    frames_played: AtomicU64,
    command: AtomicU8,
    seek_target: AtomicU64,
}

impl PlaybackState {
    pub fn new(volume: f32) -> Self {
        Self {
            transport: AtomicU8::new(Transport::Paused as u8),
            eos: AtomicBool::new(false),
            volume: AtomicU32::new(volume.clamp(0.0, 1.0).to_bits()),
            frames_played: AtomicU64::new(0),
            command: AtomicU8::new(CMD_NONE),
            seek_target: AtomicU64::new(0),
        }
    }

    pub fn transport(&self) -> Transport {
        Transport::from_u8(self.transport.load(Ordering::Acquire))
    }

    pub fn is_playing(&self) -> bool {
        self.transport() == Transport::Playing
    }

    pub fn is_stopped(&self) -> bool {
        self.transport() == Transport::Stopped
    }

    /// Flip Paused and Playing. Returns whether playback is now running.
    /// A stopped session stays stopped.
    pub fn toggle(&self) -> bool {
        let mut current = self.transport.load(Ordering::Acquire);
        loop {
            let next = match Transport::from_u8(current) {
                Transport::Paused => Transport::Playing,
                Transport::Playing => Transport::Paused,
                Transport::Stopped => return false,
            };
            match self.transport.compare_exchange_weak(
                current,
                next as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return next == Transport::Playing,
                Err(actual) => current = actual,
            }
        }
    }

    /// Move to Paused unless already stopped.
    pub fn pause(&self) {
        let _ = self.transport.compare_exchange(
            Transport::Playing as u8,
            Transport::Paused as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    /// Terminal. Observed by every worker loop at its next iteration.
    pub fn stop(&self) {
        self.transport
            .store(Transport::Stopped as u8, Ordering::Release);
    }

    pub fn is_eos(&self) -> bool {
        self.eos.load(Ordering::Acquire)
    }

    pub fn set_eos(&self, eos: bool) {
        self.eos.store(eos, Ordering::Release);
    }

    pub fn volume(&self) -> f32 {
        f32::from_bits(self.volume.load(Ordering::Relaxed))
    }

    /// Clamped to 0.0..=1.0.
    pub fn set_volume(&self, volume: f32) {
        self.volume
            .store(volume.clamp(0.0, 1.0).to_bits(), Ordering::Relaxed);
    }

    pub fn frames_played(&self) -> u64 {
        self.frames_played.load(Ordering::Relaxed)
    }

    pub fn add_frames_played(&self, frames: u64) {
        self.frames_played.fetch_add(frames, Ordering::Relaxed);
    }

    pub fn set_frames_played(&self, frames: u64) {
        self.frames_played.store(frames, Ordering::Relaxed);
    }

    pub fn request_reset(&self) {
        self.command.store(CMD_RESET, Ordering::Release);
    }

    pub fn request_seek(&self, frame: u64) {
        self.seek_target.store(frame, Ordering::Relaxed);
        self.command.store(CMD_SEEK, Ordering::Release);
    }

    /// Consume the pending command, if any.
    pub fn take_command(&self) -> Option<Command> {
        match self.command.swap(CMD_NONE, Ordering::AcqRel) {
            CMD_RESET => Some(Command::Reset),
            CMD_SEEK => Some(Command::Seek(self.seek_target.load(Ordering::Relaxed))),
            _ => None,
        }
    }
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self::new(1.0)
    }
}
