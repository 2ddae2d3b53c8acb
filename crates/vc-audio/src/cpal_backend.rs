//! CPAL-based audio output backend.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream, StreamConfig};
use vc_ir::StreamSpec;

use crate::consumer::PlaybackConsumer;
use crate::traits::{AudioBackend, AudioError, OutputStream};

/// Default output device of the default host.
pub struct CpalBackend {
    device: Device,
}

impl CpalBackend {
    pub fn new() -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(AudioError::NoDevice)?;
        if let Ok(name) = device.name() {
            log::info!("Output audio device: {name}");
        }
        Ok(Self { device })
    }

    /// Check the device can open `spec` as f32 output.
    fn check_layout(&self, spec: StreamSpec) -> Result<(), AudioError> {
        let mut configs = self
            .device
            .supported_output_configs()
            .map_err(|e| AudioError::DeviceInit(e.to_string()))?;
        let rate = cpal::SampleRate(spec.sample_rate);
        let supported = configs.any(|c| {
            c.channels() == spec.channels
                && c.sample_format() == SampleFormat::F32
                && c.min_sample_rate() <= rate
                && rate <= c.max_sample_rate()
        });
        if supported {
            Ok(())
        } else {
            Err(AudioError::UnsupportedLayout(spec.channels))
        }
    }
}

impl AudioBackend for CpalBackend {
    type Stream = CpalStream;

    fn open(self, spec: StreamSpec, mut consumer: PlaybackConsumer) -> Result<CpalStream, AudioError> {
        self.check_layout(spec)?;
        let config = StreamConfig {
            channels: spec.channels,
            sample_rate: cpal::SampleRate(spec.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };
        let channels = config.channels as usize;

        let stream = self
            .device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    #[cfg(feature = "alloc_check")]
                    assert_no_alloc::assert_no_alloc(|| {
                        consumer.drain(data, channels);
                    });
                    #[cfg(not(feature = "alloc_check"))]
                    consumer.drain(data, channels);
                },
                |err| log::error!("Audio stream error: {err}"),
                None,
            )
            .map_err(|e| AudioError::StreamCreate(e.to_string()))?;

        // Some hosts start streams implicitly
        if let Err(e) = stream.pause() {
            log::debug!("Initial pause not supported: {e}");
        }

        Ok(CpalStream { stream })
    }
}

/// Open CPAL stream. Not `Send` on every host, so it stays on the thread
/// that opened it.
pub struct CpalStream {
    stream: Stream,
}

impl OutputStream for CpalStream {
    fn play(&self) -> Result<(), AudioError> {
        self.stream
            .play()
            .map_err(|e| AudioError::Playback(e.to_string()))
    }

    fn pause(&self) -> Result<(), AudioError> {
        self.stream
            .pause()
            .map_err(|e| AudioError::Playback(e.to_string()))
    }
}
