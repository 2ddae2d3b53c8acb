//! Shared data model for the vorbis converter.
//!
//! Describes WAVE input streams, planar sample buffers handed to the
//! encoder, and the decoded stream layout used by playback.
//!
//! Designed to be `no_std` compatible with the `alloc` crate.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod audio_buffer;
mod stream;
mod wave_format;

pub use audio_buffer::AudioBuffer;
pub use stream::{StreamSpec, Transport, PLAYBACK_SAMPLE_BYTES};
pub use wave_format::{DataRegion, WaveFormat, WaveFormatTag};
