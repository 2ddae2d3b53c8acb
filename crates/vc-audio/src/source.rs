//! Compressed sources feeding the decode worker.

use std::io::{Read, Seek, SeekFrom};
use std::time::Duration;

use lewton::inside_ogg::OggStreamReader;
use vc_ir::StreamSpec;

use crate::traits::AudioError;

/// Bytes scanned from the end of the file for the final page header.
const TAIL_SCAN: u64 = 64 * 1024;

/// Decoded interleaved signed 16-bit little-endian PCM.
pub trait PcmSource: Send {
    fn spec(&self) -> StreamSpec;

    /// Fill `out` with whole frames. Returns bytes written; zero means the
    /// stream is exhausted.
    fn read_pcm(&mut self, out: &mut [u8]) -> Result<usize, AudioError>;

    /// Reposition as close to `frame` as the stream allows. Returns the
    /// frame the next [`read_pcm`](PcmSource::read_pcm) starts from.
    fn seek_frame(&mut self, frame: u64) -> Result<u64, AudioError>;

    fn duration(&self) -> Option<Duration>;
}

/// Ogg/Vorbis file decoded with lewton.
pub struct VorbisSource<R: Read + Seek> {
    reader: OggStreamReader<R>,
    spec: StreamSpec,
    total_frames: Option<u64>,
    pending: Vec<i16>,
    pending_pos: usize,
    /// Frame the next read starts at.
    position: u64,
}

impl<R: Read + Seek> VorbisSource<R> {
    pub fn new(mut inner: R) -> Result<Self, AudioError> {
        let total_frames = last_granule(&mut inner)?;
        inner.seek(SeekFrom::Start(0))?;
        let reader = OggStreamReader::new(inner).map_err(|e| AudioError::Decode(e.to_string()))?;
        let spec = StreamSpec::new(
            u16::from(reader.ident_hdr.audio_channels),
            reader.ident_hdr.audio_sample_rate,
        );
        log::info!(
            "Vorbis stream: {} ch, {} Hz, {} frames",
            spec.channels,
            spec.sample_rate,
            total_frames.map_or_else(|| "unknown".to_string(), |f| f.to_string())
        );
        Ok(Self {
            reader,
            spec,
            total_frames,
            pending: Vec::new(),
            pending_pos: 0,
            position: 0,
        })
    }

    pub fn total_frames(&self) -> Option<u64> {
        self.total_frames
    }
}

impl<R: Read + Seek + Send> PcmSource for VorbisSource<R> {
    fn spec(&self) -> StreamSpec {
        self.spec
    }

    fn read_pcm(&mut self, out: &mut [u8]) -> Result<usize, AudioError> {
        let channels = self.spec.channels as usize;
        let mut frames = (out.len() / self.spec.bytes_per_frame()) as u64;
        if let Some(total) = self.total_frames {
            // trailing padding past the last granule is not audio
            frames = frames.min(total.saturating_sub(self.position));
        }
        let want = frames as usize * channels;
        let mut written = 0;
        while written < want {
            if self.pending_pos >= self.pending.len() {
                match self
                    .reader
                    .read_dec_packet_itl()
                    .map_err(|e| AudioError::Decode(e.to_string()))?
                {
                    Some(packet) => {
                        self.pending = packet;
                        self.pending_pos = 0;
                    }
                    None => break,
                }
                continue;
            }
            let n = (self.pending.len() - self.pending_pos).min(want - written);
            let src = &self.pending[self.pending_pos..self.pending_pos + n];
            for (dst, s) in out[written * 2..(written + n) * 2].chunks_exact_mut(2).zip(src) {
                dst.copy_from_slice(&s.to_le_bytes());
            }
            self.pending_pos += n;
            written += n;
        }
        self.position += (written / channels) as u64;
        Ok(written * 2)
    }

    /// Page-granular seek, then decode forward to `frame`.
    ///
    /// The reader forgets its granule position on a seek, so packets are
    /// decoded until one closes a page. That page's granule, less the frames
    /// decoded so far, is where the buffered audio starts. Frames before
    /// `frame` are dropped from the buffer.
    fn seek_frame(&mut self, frame: u64) -> Result<u64, AudioError> {
        let target = self.total_frames.map_or(frame, |total| frame.min(total));
        self.reader
            .seek_absgp_pg(target)
            .map_err(|e| AudioError::Decode(e.to_string()))?;
        self.pending.clear();
        self.pending_pos = 0;

        let channels = usize::from(self.spec.channels);
        let page_end = loop {
            match self
                .reader
                .read_dec_packet_itl()
                .map_err(|e| AudioError::Decode(e.to_string()))?
            {
                Some(packet) => {
                    self.pending.extend_from_slice(&packet);
                    if let Some(granule) = self.reader.get_last_absgp() {
                        break granule;
                    }
                }
                None => break self.total_frames.unwrap_or(target),
            }
        };

        let buffered = (self.pending.len() / channels) as u64;
        let start = page_end.saturating_sub(buffered);
        let skip = target.saturating_sub(start).min(buffered);
        self.pending_pos = skip as usize * channels;
        log::debug!("Seek to frame {target}: page starts at {start}, dropped {skip}");
        self.position = start + skip;
        Ok(self.position)
    }

    fn duration(&self) -> Option<Duration> {
        self.total_frames
            .map(|frames| self.spec.frames_to_duration(frames))
    }
}

/// Granule position of the last Ogg page, read from the file tail.
/// The reader position is left unspecified.
pub fn last_granule<R: Read + Seek>(reader: &mut R) -> Result<Option<u64>, AudioError> {
    let len = reader.seek(SeekFrom::End(0))?;
    let start = len.saturating_sub(TAIL_SCAN);
    reader.seek(SeekFrom::Start(start))?;
    let mut tail = Vec::with_capacity((len - start) as usize);
    reader.take(len - start).read_to_end(&mut tail)?;

    let mut end = tail.len();
    while let Some(pos) = tail[..end].windows(4).rposition(|w| w == b"OggS") {
        if let Some(bytes) = tail.get(pos + 6..pos + 14) {
            let mut granule = [0u8; 8];
            granule.copy_from_slice(bytes);
            let granule = i64::from_le_bytes(granule);
            // -1 marks a page on which no packet completes
            if granule >= 0 {
                return Ok(Some(granule as u64));
            }
        }
        end = pos;
    }
    Ok(None)
}
