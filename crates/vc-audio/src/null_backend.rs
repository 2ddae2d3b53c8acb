//! Device-less backend that drains the consumer on a wall-clock timer.
//!
//! Used for headless runs and tests: the ring is consumed at the stream's
//! real rate, but the samples go nowhere.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use vc_ir::StreamSpec;

use crate::consumer::PlaybackConsumer;
use crate::traits::{AudioBackend, AudioError, OutputStream};

/// Frames per simulated device callback.
const PERIOD_FRAMES: usize = 512;

#[derive(Default)]
pub struct NullBackend;

impl AudioBackend for NullBackend {
    type Stream = NullStream;

    fn open(self, spec: StreamSpec, mut consumer: PlaybackConsumer) -> Result<NullStream, AudioError> {
        if spec.channels == 0 || spec.sample_rate == 0 {
            return Err(AudioError::UnsupportedLayout(spec.channels));
        }
        let shared = Arc::new(NullShared::default());
        let period = Duration::from_nanos(
            PERIOD_FRAMES as u64 * 1_000_000_000 / u64::from(spec.sample_rate),
        );
        let channels = usize::from(spec.channels);

        let worker = Arc::clone(&shared);
        let thread = std::thread::Builder::new()
            .name("null-device".into())
            .spawn(move || {
                let mut buffer = vec![0.0f32; PERIOD_FRAMES * channels];
                while !worker.closed.load(Ordering::Acquire) {
                    if worker.running.load(Ordering::Acquire) {
                        let frames = consumer.drain(&mut buffer, channels);
                        worker.frames.fetch_add(frames as u64, Ordering::Relaxed);
                        worker.callbacks.fetch_add(1, Ordering::Relaxed);
                    }
                    std::thread::sleep(period);
                }
            })
            .map_err(|e| AudioError::StreamCreate(e.to_string()))?;

        Ok(NullStream {
            shared,
            thread: Some(thread),
        })
    }
}

#[derive(Default)]
struct NullShared {
    running: AtomicBool,
    closed: AtomicBool,
    frames: AtomicU64,
    callbacks: AtomicU64,
}

pub struct NullStream {
    shared: Arc<NullShared>,
    thread: Option<JoinHandle<()>>,
}

impl NullStream {
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// Frames drained from the ring so far.
    pub fn frames_drained(&self) -> u64 {
        self.shared.frames.load(Ordering::Relaxed)
    }
}

impl OutputStream for NullStream {
    fn play(&self) -> Result<(), AudioError> {
        self.shared.running.store(true, Ordering::Release);
        Ok(())
    }

    fn pause(&self) -> Result<(), AudioError> {
        self.shared.running.store(false, Ordering::Release);
        Ok(())
    }
}

impl Drop for NullStream {
    fn drop(&mut self) {
        self.shared.closed.store(true, Ordering::Release);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}
