//! Encode and playback configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use vc_engine::DEFAULT_FRAMES_PER_BLOCK;

/// Parameters of one encode job.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodeOptions {
    pub input: PathBuf,
    pub output: PathBuf,
    /// VBR quality, 0.0..=1.0
    pub quality: f32,
    /// Ogg serial number. Random when absent.
    pub serial: Option<i32>,
    /// Frames per read block
    pub frames_per_block: usize,
    /// Extra Vorbis user comments
    pub comments: Vec<(String, String)>,
}

impl EncodeOptions {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            ..Default::default()
        }
    }
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            input: PathBuf::new(),
            output: PathBuf::new(),
            quality: 0.5,
            serial: None,
            frames_per_block: DEFAULT_FRAMES_PER_BLOCK,
            comments: Vec::new(),
        }
    }
}

/// Playback session tuning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Ring buffer length in milliseconds of audio
    pub buffer_ms: u32,
    /// Bytes requested from the decoder per iteration
    pub decode_chunk_bytes: usize,
    /// Decoder back-off when the ring is full or the stream is exhausted
    pub idle_sleep_ms: u64,
    /// Audio-io worker polling period
    pub control_poll_ms: u64,
    pub initial_volume: f32,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            buffer_ms: 200,
            decode_chunk_bytes: 4092,
            idle_sleep_ms: 2,
            control_poll_ms: 5,
            initial_volume: 1.0,
        }
    }
}
