//! Vorbis encode pipeline.
//!
//! `Init -> HeaderEmit -> Streaming -> Finalized`. The three header packets
//! are always paged and written before any audio block is analysed. Every
//! error path runs [`VorbisEncodePipeline::finalize`] before returning.

use std::io::Write;
use std::mem;

use ogg_next_sys::ogg_packet;
use vc_ir::AudioBuffer;

use crate::codec::VorbisCodec;
use crate::error::EncodeError;
use crate::ogg::OggContainerWriter;

/// Position of a pipeline in its session lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineState {
    /// Codec initialised, nothing written yet
    Init,
    /// Header packets being paged out
    HeaderEmit,
    /// Accepting sample blocks
    Streaming,
    /// Terminal. All codec and container state released
    Finalized,
}

/// Per-session encoder parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct EncoderSettings {
    /// VBR quality, 0.0..=1.0
    pub quality: f32,
    /// Ogg logical stream serial number
    pub serial: i32,
    /// User comments written to the comment header
    pub comments: Vec<(String, String)>,
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            quality: 0.5,
            serial: 0,
            comments: Vec::new(),
        }
    }
}

/// Totals reported when a pipeline completes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EncodeStats {
    pub frames: u64,
    pub packets: u64,
    pub pages: u64,
    pub bytes: u64,
    pub eos: bool,
}

/// Drives libvorbis analysis and feeds the resulting packets to an Ogg
/// container writing into `W`.
pub struct VorbisEncodePipeline<W: Write> {
    // Declared before `codec` so the stream state is released first on drop.
    container: OggContainerWriter<W>,
    codec: VorbisCodec,
    packet: ogg_packet,
    state: PipelineState,
    frames: u64,
    packets: u64,
}

// `packet` points into codec memory owned by the pipeline.
unsafe impl<W: Write + Send> Send for VorbisEncodePipeline<W> {}

impl<W: Write> VorbisEncodePipeline<W> {
    /// Initialise the codec and container. Nothing is written to `sink` yet.
    pub fn new(
        channels: u16,
        sample_rate: u32,
        settings: &EncoderSettings,
        sink: W,
    ) -> Result<Self, EncodeError> {
        let mut codec = VorbisCodec::new(channels, sample_rate, settings.quality)?;
        for (tag, value) in &settings.comments {
            codec.add_comment(tag, value);
        }
        let container = OggContainerWriter::new(settings.serial, sink)?;

        log::debug!(
            "Vorbis encoder: {} ch, {} Hz, quality {:.2}, serial {:#010x}",
            channels,
            sample_rate,
            settings.quality,
            settings.serial
        );

        Ok(Self {
            container,
            codec,
            // SAFETY: plain C struct, filled by flushpacket before use.
            packet: unsafe { mem::zeroed() },
            state: PipelineState::Init,
            frames: 0,
            packets: 0,
        })
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Emit identification, comment and setup headers as their own pages.
    pub fn write_headers(&mut self) -> Result<(), EncodeError> {
        match self.state {
            PipelineState::Init => {}
            PipelineState::Finalized => return Err(EncodeError::AlreadyFinalized),
            _ => return Ok(()),
        }
        self.state = PipelineState::HeaderEmit;
        let result = self.emit_headers();
        self.guard(result)?;
        self.state = PipelineState::Streaming;
        Ok(())
    }

    fn emit_headers(&mut self) -> Result<(), EncodeError> {
        let mut headers = self.codec.header_packets()?;
        for header in headers.iter_mut() {
            self.container.packet_in(header)?;
        }
        self.container.flush()
    }

    /// Submit one block of normalised samples.
    ///
    /// An empty block signals end of input and completes the stream.
    pub fn submit(&mut self, block: &AudioBuffer) -> Result<(), EncodeError> {
        if block.frames() == 0 {
            return self.end_of_input();
        }
        self.write_headers()?;
        self.codec.write_frames(block);
        self.frames += block.frames() as u64;
        let result = self.drain();
        self.guard(result)
    }

    /// Flush the analysis tail, write the end-of-stream page and finalize.
    pub fn end_of_input(&mut self) -> Result<(), EncodeError> {
        self.write_headers()?;
        self.codec.end_of_input();
        let result = self.drain().and_then(|_| self.container.flush());
        self.guard(result)?;
        if !self.container.stats().eos {
            log::warn!("Stream ended without an end-of-stream page");
        }
        self.finalize();
        Ok(())
    }

    /// Pull blocks through analysis and bitrate management, then packets
    /// into the container, then ready pages to the sink.
    fn drain(&mut self) -> Result<(), EncodeError> {
        while self.codec.blockout()? {
            self.codec.analyze_block()?;
            while self.codec.flush_packet(&mut self.packet)? {
                self.container.packet_in(&mut self.packet)?;
                self.packets += 1;
                self.container.write_ready_pages()?;
            }
        }
        Ok(())
    }

    fn guard(&mut self, result: Result<(), EncodeError>) -> Result<(), EncodeError> {
        if result.is_err() {
            self.finalize();
        }
        result
    }

    /// Release container and codec state. Runs at most once; later calls
    /// return `false`.
    pub fn finalize(&mut self) -> bool {
        if self.state == PipelineState::Finalized {
            return false;
        }
        self.container.clear();
        self.codec.clear();
        if let Err(e) = self.container.sink_mut().flush() {
            log::warn!("Failed to flush output: {e}");
        }
        self.state = PipelineState::Finalized;
        true
    }

    pub fn stats(&self) -> EncodeStats {
        let container = self.container.stats();
        EncodeStats {
            frames: self.frames,
            packets: self.packets,
            pages: container.pages,
            bytes: container.bytes,
            eos: container.eos,
        }
    }

    /// Finalize if needed and hand back the sink.
    pub fn into_sink(mut self) -> W {
        self.finalize();
        self.container.into_sink()
    }
}
