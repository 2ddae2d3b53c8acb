//! Encode engine for the vorbis converter.
//!
//! Drives the libvorbis analysis, bitrate and packet stages and pages the
//! packets into an Ogg stream. [`EncodeSession`] ties a WAVE input to a
//! [`VorbisEncodePipeline`] for one conversion.

mod codec;
mod error;
mod ogg;
mod pipeline;
mod session;

pub use error::{EncodeError, EncodeErrorKind, OV_EINVAL};
pub use ogg::{ContainerStats, OggContainerWriter};
pub use pipeline::{EncodeStats, EncoderSettings, PipelineState, VorbisEncodePipeline};
pub use session::{EncodeSession, DEFAULT_FRAMES_PER_BLOCK};
