//! Decode worker: compressed source into the ring buffer.

use std::sync::Arc;
use std::time::Duration;

use crate::ring_buffer::RingWriter;
use crate::source::PcmSource;
use crate::state::{Command, PlaybackState};
use crate::traits::AudioError;

/// What a single [`DecodeProducer::step`] did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    /// Bytes pushed into the ring
    Decoded(usize),
    /// Ring full or stream already exhausted
    Idle,
    /// A reset or seek was applied
    Repositioned(u64),
    /// The source returned no data. The end-of-stream flag is now set
    EndOfStream,
}

pub struct DecodeProducer<S: PcmSource> {
    source: S,
    writer: RingWriter,
    state: Arc<PlaybackState>,
    scratch: Vec<u8>,
    frame_bytes: usize,
    idle_sleep: Duration,
}

impl<S: PcmSource> DecodeProducer<S> {
    pub fn new(
        source: S,
        writer: RingWriter,
        state: Arc<PlaybackState>,
        chunk_bytes: usize,
        idle_sleep: Duration,
    ) -> Self {
        let frame_bytes = source.spec().bytes_per_frame().max(1);
        // whole frames, at least one
        let chunk_bytes = chunk_bytes.max(frame_bytes) / frame_bytes * frame_bytes;
        Self {
            source,
            writer,
            state,
            scratch: vec![0; chunk_bytes],
            frame_bytes,
            idle_sleep,
        }
    }

    pub fn state(&self) -> &Arc<PlaybackState> {
        &self.state
    }

    /// One iteration of the worker loop.
    pub fn step(&mut self) -> Result<StepOutcome, AudioError> {
        if let Some(command) = self.state.take_command() {
            return self.reposition(command);
        }
        if self.state.is_eos() {
            return Ok(StepOutcome::Idle);
        }

        let frame_bytes = self.frame_bytes;
        let want = self.writer.free_len().min(self.scratch.len()) / frame_bytes * frame_bytes;
        if want == 0 {
            return Ok(StepOutcome::Idle);
        }

        let n = self.source.read_pcm(&mut self.scratch[..want])?;
        if n == 0 {
            self.state.set_eos(true);
            log::debug!("Decoder reached end of stream");
            return Ok(StepOutcome::EndOfStream);
        }
        let pushed = self.writer.push(&self.scratch[..n]);
        Ok(StepOutcome::Decoded(pushed))
    }

    /// Apply a reset or seek. Everything already in the ring is discarded
    /// so stale audio never plays after the jump.
    fn reposition(&mut self, command: Command) -> Result<StepOutcome, AudioError> {
        let target = match command {
            Command::Reset => {
                self.state.pause();
                0
            }
            Command::Seek(frame) => frame,
        };
        let position = self.source.seek_frame(target)?;
        self.writer.clear();
        self.state.set_eos(false);
        self.state.set_frames_played(position);
        log::debug!("Decoder repositioned to frame {position} ({command:?})");
        Ok(StepOutcome::Repositioned(position))
    }

    /// Run until the session is stopped. Decode errors end the worker.
    pub fn run(mut self) -> Result<(), AudioError> {
        while !self.state.is_stopped() {
            match self.step() {
                Ok(StepOutcome::Idle) | Ok(StepOutcome::EndOfStream) => {
                    std::thread::sleep(self.idle_sleep)
                }
                Ok(_) => {}
                Err(e) => {
                    log::error!("Decoder stopped: {e}");
                    self.state.set_eos(true);
                    return Err(e);
                }
            }
        }
        log::debug!("Decoder exiting");
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::ring_buffer::{ring_buffer, RingReader};
    use vc_ir::{StreamSpec, Transport};

    /// Counts up from `pos` as mono 16-bit samples.
    pub(crate) struct RampSource {
        pub spec: StreamSpec,
        pub pos: u64,
        pub len: u64,
        pub fail: bool,
    }

    impl RampSource {
        pub fn new(channels: u16, len: u64) -> Self {
            Self {
                spec: StreamSpec::new(channels, 8000),
                pos: 0,
                len,
                fail: false,
            }
        }
    }

    impl PcmSource for RampSource {
        fn spec(&self) -> StreamSpec {
            self.spec
        }

        fn read_pcm(&mut self, out: &mut [u8]) -> Result<usize, AudioError> {
            if self.fail {
                return Err(AudioError::Decode("corrupt packet".into()));
            }
            let frame_bytes = self.spec.bytes_per_frame();
            let frames = ((out.len() / frame_bytes) as u64).min(self.len - self.pos) as usize;
            for f in 0..frames {
                for c in 0..self.spec.channels as usize {
                    let v = (self.pos + f as u64) as i16;
                    let at = f * frame_bytes + c * 2;
                    out[at..at + 2].copy_from_slice(&v.to_le_bytes());
                }
            }
            self.pos += frames as u64;
            Ok(frames * frame_bytes)
        }

        fn seek_frame(&mut self, frame: u64) -> Result<u64, AudioError> {
            self.pos = frame.min(self.len);
            Ok(self.pos)
        }

        fn duration(&self) -> Option<Duration> {
            Some(self.spec.frames_to_duration(self.len))
        }
    }

    fn producer(len: u64, capacity: usize) -> (DecodeProducer<RampSource>, RingReader) {
        let (writer, reader) = ring_buffer(capacity);
        let state = Arc::new(PlaybackState::default());
        (
            DecodeProducer::new(RampSource::new(1, len), writer, state, 8, Duration::ZERO),
            reader,
        )
    }

    #[test]
    fn decodes_in_chunks() {
        let (mut p, mut reader) = producer(100, 32);
        assert_eq!(p.step().unwrap(), StepOutcome::Decoded(8));
        assert_eq!(reader.fill_len(), 8);
        assert_eq!(&reader.read_region()[..4], &[0, 0, 1, 0]);
    }

    #[test]
    fn full_ring_idles() {
        let (mut p, reader) = producer(100, 16);
        assert_eq!(p.step().unwrap(), StepOutcome::Decoded(8));
        assert_eq!(p.step().unwrap(), StepOutcome::Decoded(8));
        assert_eq!(p.step().unwrap(), StepOutcome::Idle);
        assert_eq!(reader.fill_len(), 16);
    }

    #[test]
    fn exhausted_source_sets_eos() {
        let (mut p, _reader) = producer(3, 64);
        assert_eq!(p.step().unwrap(), StepOutcome::Decoded(6));
        assert_eq!(p.step().unwrap(), StepOutcome::EndOfStream);
        assert!(p.state().is_eos());
        assert_eq!(p.step().unwrap(), StepOutcome::Idle);
    }

    #[test]
    fn reset_pauses_and_empties() {
        let (mut p, mut reader) = producer(100, 64);
        p.state().toggle();
        p.step().unwrap();
        p.step().unwrap();
        assert_eq!(reader.fill_len(), 16);

        p.state().request_reset();
        assert_eq!(p.step().unwrap(), StepOutcome::Repositioned(0));
        assert_eq!(p.state().transport(), Transport::Paused);
        assert_eq!(reader.fill_len(), 0);
        assert_eq!(p.source.pos, 0);

        // decoding resumes from the origin
        p.step().unwrap();
        assert_eq!(&reader.read_region()[..2], &[0, 0]);
    }

    #[test]
    fn seek_keeps_transport_and_clears_eos() {
        let (mut p, mut reader) = producer(10, 64);
        p.state().toggle();
        while p.step().unwrap() != StepOutcome::EndOfStream {}
        p.state().request_seek(4);
        assert_eq!(p.step().unwrap(), StepOutcome::Repositioned(4));
        assert!(p.state().is_playing());
        assert!(!p.state().is_eos());
        assert_eq!(p.state().frames_played(), 4);
        assert_eq!(reader.fill_len(), 0);
        p.step().unwrap();
        assert_eq!(&reader.read_region()[..2], &[4, 0]);
    }

    #[test]
    fn seek_waits_for_reader_to_skip_stale_bytes() {
        let (mut p, mut reader) = producer(100, 16);
        p.step().unwrap();
        p.step().unwrap();
        assert_eq!(reader.read_region().len(), 16);

        p.state().request_seek(50);
        assert_eq!(p.step().unwrap(), StepOutcome::Repositioned(50));
        assert_eq!(reader.fill_len(), 0);
        // the stale bytes still belong to the reader
        assert_eq!(p.step().unwrap(), StepOutcome::Idle);

        assert!(reader.read_region().is_empty());
        assert_eq!(p.step().unwrap(), StepOutcome::Decoded(8));
        assert_eq!(&reader.read_region()[..4], &[50, 0, 51, 0]);
    }

    #[test]
    fn decode_error_is_fatal() {
        let (mut p, _reader) = producer(10, 64);
        p.source.fail = true;
        assert!(matches!(p.step(), Err(AudioError::Decode(_))));
    }

    #[test]
    fn run_exits_on_stop() {
        let (p, _reader) = producer(1_000_000, 64);
        let state = Arc::clone(p.state());
        let worker = std::thread::spawn(move || p.run());
        std::thread::sleep(Duration::from_millis(5));
        state.stop();
        assert!(worker.join().unwrap().is_ok());
    }
}
