//! Headless controller for the vorbis converter.
//!
//! Provides a unified API for encoding WAVE files and playing Ogg/Vorbis
//! files that any front end can share.

mod config;
mod controller;
mod encode;
mod error;

pub use config::{EncodeOptions, PlaybackConfig};
pub use controller::PlaybackController;
pub use encode::{
    encode_file, encode_stream, spawn_encode, EncodeHandle, EncodeObserver, EncodeSummary,
    LogObserver, ENCODER_TAG,
};
pub use error::PlaybackError;

// Re-export common types so callers don't need the lower crates directly.
pub use vc_audio::AudioError;
pub use vc_engine::{EncodeError, EncodeErrorKind};
pub use vc_formats::{read_header, FormatError, WaveHeader};
pub use vc_ir::{StreamSpec, Transport, WaveFormat, WaveFormatTag};
