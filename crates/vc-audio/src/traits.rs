//! Audio output seam and error types.

use thiserror::Error;
use vc_ir::StreamSpec;

use crate::consumer::PlaybackConsumer;

/// Error type for audio operations.
#[derive(Error, Debug)]
pub enum AudioError {
    /// No audio device available
    #[error("No audio device available")]
    NoDevice,

    /// Failed to initialize audio device
    #[error("Device init error: {0}")]
    DeviceInit(String),

    /// Failed to create audio stream
    #[error("Stream create error: {0}")]
    StreamCreate(String),

    /// Playback error
    #[error("Playback error: {0}")]
    Playback(String),

    /// Device cannot carry the stream's channel layout
    #[error("Unsupported channel layout: {0} channels")]
    UnsupportedLayout(u16),

    /// Compressed stream could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// I/O error from the compressed source
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// An opened output stream. Dropping it releases the device.
pub trait OutputStream {
    /// Resume issuing audio.
    fn play(&self) -> Result<(), AudioError>;

    /// Stop issuing audio. The stream stays open.
    fn pause(&self) -> Result<(), AudioError>;
}

/// Factory for output streams driven by a [`PlaybackConsumer`].
pub trait AudioBackend {
    type Stream: OutputStream;

    /// Open a stream for `spec` whose real-time callback drains `consumer`.
    /// The stream starts paused.
    fn open(self, spec: StreamSpec, consumer: PlaybackConsumer) -> Result<Self::Stream, AudioError>;
}
