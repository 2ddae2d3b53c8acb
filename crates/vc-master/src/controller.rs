//! Playback session controller.
//!
//! Owns the decode worker and the audio-io worker. The audio-io worker opens
//! the output stream (which may not be `Send`), then follows the shared
//! transport until the session is stopped.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use vc_audio::{
    ring_buffer, AudioBackend, AudioError, CpalBackend, DecodeProducer, OutputStream, PcmSource,
    PlaybackConsumer, PlaybackState, VorbisSource,
};
use vc_ir::{StreamSpec, Transport};

use crate::config::PlaybackConfig;
use crate::error::PlaybackError;

pub struct PlaybackController {
    state: Arc<PlaybackState>,
    spec: StreamSpec,
    duration: Option<Duration>,
    decoder: Option<JoinHandle<Result<(), AudioError>>>,
    audio_io: Option<JoinHandle<()>>,
}

impl PlaybackController {
    /// Open an Ogg/Vorbis file on the default output device.
    pub fn open(path: impl AsRef<Path>, config: &PlaybackConfig) -> Result<Self, PlaybackError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(AudioError::from)?;
        let source = VorbisSource::new(BufReader::new(file))?;
        log::info!("Opened {}", path.display());
        Self::with_backend(source, CpalBackend::new, config)
    }

    /// Start a session for `source`. `make_backend` runs on the audio-io
    /// worker, which keeps the stream for the session's lifetime.
    ///
    /// The session starts paused.
    pub fn with_backend<S, B, F>(
        source: S,
        make_backend: F,
        config: &PlaybackConfig,
    ) -> Result<Self, PlaybackError>
    where
        S: PcmSource + 'static,
        B: AudioBackend,
        F: FnOnce() -> Result<B, AudioError> + Send + 'static,
    {
        let spec = source.spec();
        if spec.channels == 0 || spec.sample_rate == 0 {
            return Err(AudioError::UnsupportedLayout(spec.channels).into());
        }
        let duration = source.duration();

        let state = Arc::new(PlaybackState::new(config.initial_volume));
        let capacity = spec.bytes_for_millis(config.buffer_ms);
        let (writer, reader) = ring_buffer(capacity);
        let consumer = PlaybackConsumer::new(reader, Arc::clone(&state), spec.channels);

        let (ready_tx, ready_rx) = mpsc::channel();
        let poll = Duration::from_millis(config.control_poll_ms.max(1));
        let io_state = Arc::clone(&state);
        let audio_io = std::thread::Builder::new()
            .name("audio-io".into())
            .spawn(move || {
                let stream = match make_backend().and_then(|b| b.open(spec, consumer)) {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));
                follow_transport(&stream, &io_state, poll);
            })
            .map_err(|e| AudioError::StreamCreate(e.to_string()))?;

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let _ = audio_io.join();
                return Err(e.into());
            }
            Err(_) => {
                let _ = audio_io.join();
                return Err(PlaybackError::WorkerPanicked("audio-io"));
            }
        }

        let producer = DecodeProducer::new(
            source,
            writer,
            Arc::clone(&state),
            config.decode_chunk_bytes,
            Duration::from_millis(config.idle_sleep_ms),
        );
        let decoder = match std::thread::Builder::new()
            .name("decoder".into())
            .spawn(move || producer.run())
        {
            Ok(handle) => handle,
            Err(e) => {
                state.stop();
                let _ = audio_io.join();
                return Err(AudioError::Playback(e.to_string()).into());
            }
        };

        log::info!(
            "Playback ready: {} ch, {} Hz, {} byte ring",
            spec.channels,
            spec.sample_rate,
            capacity
        );

        Ok(Self {
            state,
            spec,
            duration,
            decoder: Some(decoder),
            audio_io: Some(audio_io),
        })
    }

    pub fn is_initialized(&self) -> bool {
        self.decoder.is_some() && !self.state.is_stopped()
    }

    pub fn spec(&self) -> StreamSpec {
        self.spec
    }

    pub fn transport(&self) -> Transport {
        self.state.transport()
    }

    /// Flip between paused and playing. Returns whether playback is now
    /// running.
    pub fn toggle_playback(&self) -> bool {
        let playing = self.state.toggle();
        log::debug!("Playback {}", if playing { "started" } else { "paused" });
        playing
    }

    /// Rewind to the start and pause. Applied by the decode worker on its
    /// next iteration.
    pub fn reset(&self) -> Result<(), PlaybackError> {
        self.ensure_initialized()?;
        self.state.request_reset();
        Ok(())
    }

    /// Jump to `timestamp`, clamped to the stream duration when known.
    pub fn seek(&self, timestamp: Duration) -> Result<(), PlaybackError> {
        self.ensure_initialized()?;
        let target = self.duration.map_or(timestamp, |d| timestamp.min(d));
        self.state.request_seek(self.spec.duration_to_frames(target));
        Ok(())
    }

    pub fn set_volume(&self, volume: f32) -> Result<(), PlaybackError> {
        if !(0.0..=1.0).contains(&volume) {
            return Err(PlaybackError::InvalidVolume(volume));
        }
        self.state.set_volume(volume);
        Ok(())
    }

    pub fn volume(&self) -> f32 {
        self.state.volume()
    }

    /// Position of the audio handed to the device.
    pub fn timestamp(&self) -> Duration {
        self.spec.frames_to_duration(self.state.frames_played())
    }

    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }

    /// True once the decoder has reached the end of the stream.
    pub fn is_eos(&self) -> bool {
        self.state.is_eos()
    }

    fn ensure_initialized(&self) -> Result<(), PlaybackError> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(PlaybackError::NotInitialized)
        }
    }

    /// Stop both workers and wait for them. The ring and the output stream
    /// are released as the workers exit. Later calls are no-ops.
    ///
    /// Returns the decoder's error if it ended on one.
    pub fn finalize(&mut self) -> Result<(), PlaybackError> {
        self.state.stop();

        let decoded = match self.decoder.take().map(JoinHandle::join) {
            None | Some(Ok(Ok(()))) => Ok(()),
            Some(Ok(Err(e))) => Err(PlaybackError::Audio(e)),
            Some(Err(_)) => Err(PlaybackError::WorkerPanicked("decoder")),
        };
        let io = match self.audio_io.take().map(JoinHandle::join) {
            None | Some(Ok(())) => Ok(()),
            Some(Err(_)) => Err(PlaybackError::WorkerPanicked("audio-io")),
        };
        log::debug!("Playback finalized");
        decoded.and(io)
    }

    /// Run [`finalize`] on a worker and hand its result to `on_done` there.
    ///
    /// [`finalize`]: PlaybackController::finalize
    pub fn finalize_in_background<F>(mut self, on_done: F) -> std::io::Result<JoinHandle<()>>
    where
        F: FnOnce(Result<(), PlaybackError>) + Send + 'static,
    {
        std::thread::Builder::new()
            .name("finalize".into())
            .spawn(move || on_done(self.finalize()))
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        if let Err(e) = self.finalize() {
            log::warn!("Playback teardown: {e}");
        }
    }
}

/// Apply the shared transport to `stream` until the session stops.
fn follow_transport<O: OutputStream>(stream: &O, state: &PlaybackState, poll: Duration) {
    let mut running = false;
    loop {
        match state.transport() {
            Transport::Stopped => break,
            Transport::Playing if !running => match stream.play() {
                Ok(()) => running = true,
                Err(e) => {
                    log::error!("{e}");
                    state.pause();
                }
            },
            Transport::Paused if running => {
                if let Err(e) = stream.pause() {
                    log::warn!("{e}");
                }
                running = false;
            }
            _ => {}
        }
        std::thread::sleep(poll);
    }
    if running {
        let _ = stream.pause();
    }
}
