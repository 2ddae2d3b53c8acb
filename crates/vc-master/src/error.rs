//! Playback controller errors.

use thiserror::Error;
use vc_audio::AudioError;

#[derive(Error, Debug)]
pub enum PlaybackError {
    #[error(transparent)]
    Audio(#[from] AudioError),

    #[error("Playback is not initialized")]
    NotInitialized,

    #[error("Volume {0} outside 0.0..=1.0")]
    InvalidVolume(f32),

    #[error("{0} worker panicked")]
    WorkerPanicked(&'static str),
}
