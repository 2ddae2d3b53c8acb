//! One WAVE to Ogg/Vorbis conversion.

use std::io::{self, Read, Seek, Take, Write};

use vc_formats::{normalize, read_header, WaveHeader};
use vc_ir::{AudioBuffer, WaveFormatTag};

use crate::error::EncodeError;
use crate::pipeline::{EncodeStats, EncoderSettings, PipelineState, VorbisEncodePipeline};

/// Default read block, in frames.
pub const DEFAULT_FRAMES_PER_BLOCK: usize = 1024;

/// Owns the input and output handles, the parsed format and the encode
/// pipeline for a single conversion.
///
/// The input is bounded to the data chunk, so trailing RIFF chunks never
/// reach the codec.
pub struct EncodeSession<R: Read, W: Write> {
    input: Take<R>,
    header: WaveHeader,
    pipeline: VorbisEncodePipeline<W>,
    read_buf: Vec<u8>,
    block: AudioBuffer,
    data_read: u64,
}

impl<R: Read + Seek, W: Write> EncodeSession<R, W> {
    /// Parse the WAVE header and initialise the codec.
    ///
    /// Fails with [`EncodeError::UnsupportedFormat`] for encodings that have
    /// no sample conversion.
    pub fn open(
        mut input: R,
        output: W,
        settings: &EncoderSettings,
        frames_per_block: usize,
    ) -> Result<Self, EncodeError> {
        let header = read_header(&mut input)?;
        let format = header.format;
        if format.tag != WaveFormatTag::Pcm {
            return Err(EncodeError::UnsupportedFormat(format.tag));
        }

        let pipeline =
            VorbisEncodePipeline::new(format.channels, format.sample_rate, settings, output)?;

        let frames = frames_per_block.max(1);
        Ok(Self {
            input: input.take(u64::from(header.data.len)),
            header,
            pipeline,
            read_buf: vec![0; frames * format.frame_size()],
            block: AudioBuffer::new(format.channels, frames),
            data_read: 0,
        })
    }
}

impl<R: Read, W: Write> EncodeSession<R, W> {
    pub fn header(&self) -> &WaveHeader {
        &self.header
    }

    pub fn state(&self) -> PipelineState {
        self.pipeline.state()
    }

    /// Input data bytes consumed so far.
    pub fn data_read(&self) -> u64 {
        self.data_read
    }

    pub fn stats(&self) -> EncodeStats {
        self.pipeline.stats()
    }

    pub fn write_headers(&mut self) -> Result<(), EncodeError> {
        self.pipeline.write_headers()
    }

    /// Read, normalise and encode one block. Returns `true` once the
    /// end-of-stream page has been written and the session is finalized.
    pub fn step(&mut self) -> Result<bool, EncodeError> {
        let n = match read_block(&mut self.input, &mut self.read_buf) {
            Ok(n) => n,
            Err(e) => {
                self.pipeline.finalize();
                return Err(e.into());
            }
        };
        self.data_read += n as u64;

        let frames = if n == 0 {
            0
        } else {
            let format = self.header.format;
            match normalize(&self.read_buf[..n], &format, &mut self.block) {
                Ok(frames) => frames,
                Err(_) => {
                    self.pipeline.finalize();
                    return Err(EncodeError::UnsupportedFormat(format.tag));
                }
            }
        };

        // A truncated final frame normalises to nothing and ends the stream.
        if frames == 0 {
            self.pipeline.end_of_input()?;
            return Ok(true);
        }
        self.pipeline.submit(&self.block)?;
        Ok(false)
    }

    /// Encode everything that remains.
    pub fn run(&mut self) -> Result<EncodeStats, EncodeError> {
        self.write_headers()?;
        while !self.step()? {}
        Ok(self.stats())
    }

    /// Release codec state if still live. Returns `false` if already done.
    pub fn finalize(&mut self) -> bool {
        self.pipeline.finalize()
    }

    /// Finalize and return the output sink.
    pub fn into_output(self) -> W {
        self.pipeline.into_sink()
    }
}

/// Fill `buf` unless the source runs dry first. Returns bytes read.
fn read_block<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
