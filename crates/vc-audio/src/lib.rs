//! Playback plumbing for the vorbis converter.
//!
//! A [`DecodeProducer`] decodes into a lock-free byte ring on its own
//! thread; a [`PlaybackConsumer`] drains the ring from the device's
//! real-time callback. Both observe the shared [`PlaybackState`].

mod consumer;
mod cpal_backend;
mod null_backend;
mod producer;
mod ring_buffer;
mod source;
mod state;
mod traits;

pub use consumer::PlaybackConsumer;
pub use cpal_backend::{CpalBackend, CpalStream};
pub use null_backend::{NullBackend, NullStream};
pub use producer::{DecodeProducer, StepOutcome};
pub use ring_buffer::{ring_buffer, RingReader, RingWriter};
pub use source::{last_granule, PcmSource, VorbisSource};
pub use state::{Command, PlaybackState};
pub use traits::{AudioBackend, AudioError, OutputStream};
