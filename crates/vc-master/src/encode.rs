//! Encode orchestration: header read, codec init, header pages, streaming
//! loop and finalize, on a dedicated worker thread.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Seek, Write};
use std::thread::JoinHandle;

use vc_engine::{EncodeError, EncodeSession, EncoderSettings};

use crate::config::EncodeOptions;

/// Value of the `ENCODER` comment written to every stream.
pub const ENCODER_TAG: &str = concat!("vorbis-converter ", env!("CARGO_PKG_VERSION"));

/// Receives progress strings and the terminal result of an encode.
pub trait EncodeObserver: Send {
    fn on_status(&self, message: &str);

    fn on_finished(&self, _result: &Result<EncodeSummary, EncodeError>) {}
}

/// Observer that only logs.
pub struct LogObserver;

impl EncodeObserver for LogObserver {
    fn on_status(&self, _message: &str) {}
}

/// Outcome of a successful encode.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EncodeSummary {
    pub channels: u16,
    pub sample_rate: u32,
    pub frames: u64,
    pub pages: u64,
    pub bytes_written: u64,
    pub data_bytes: u64,
}

impl EncodeSummary {
    /// Output size as a percentage of the PCM input size.
    pub fn compression_ratio(&self) -> f64 {
        if self.data_bytes == 0 {
            return 0.0;
        }
        self.bytes_written as f64 / self.data_bytes as f64 * 100.0
    }

    pub fn seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames as f64 / f64::from(self.sample_rate)
    }
}

fn status(observer: &dyn EncodeObserver, message: &str) {
    log::info!("{message}");
    observer.on_status(message);
}

fn settings_for(options: &EncodeOptions) -> EncoderSettings {
    let mut comments = vec![("ENCODER".to_string(), ENCODER_TAG.to_string())];
    comments.extend(options.comments.iter().cloned());
    EncoderSettings {
        quality: options.quality,
        serial: options.serial.unwrap_or_else(rand::random),
        comments,
    }
}

/// Encode a WAVE stream into an Ogg/Vorbis sink on the calling thread.
///
/// Partial output is left in `output` on failure.
pub fn encode_stream<R, W>(
    input: R,
    output: W,
    options: &EncodeOptions,
    observer: &dyn EncodeObserver,
) -> Result<EncodeSummary, EncodeError>
where
    R: Read + Seek,
    W: Write,
{
    status(observer, "Reading header...");
    let settings = settings_for(options);
    let mut session = EncodeSession::open(input, output, &settings, options.frames_per_block)?;

    let format = session.header().format;
    status(observer, "Header processed:");
    status(observer, &format!("Number of channels: {}", format.channels));
    status(observer, &format!("Bits per sample: {}", format.bits_per_sample));
    status(observer, &format!("Sample rate: {}", format.sample_rate));

    status(observer, "Writing headers...");
    session.write_headers()?;

    status(observer, "Encoding...");
    let stats = session.run()?;
    let data_bytes = session.data_read();

    let mut sink = session.into_output();
    sink.flush()?;

    let summary = EncodeSummary {
        channels: format.channels,
        sample_rate: format.sample_rate,
        frames: stats.frames,
        pages: stats.pages,
        bytes_written: stats.bytes,
        data_bytes,
    };
    status(observer, "Encoding finished");
    status(
        observer,
        &format!(
            "Compression ratio: {:.2}% ({} -> {} bytes)",
            summary.compression_ratio(),
            summary.data_bytes,
            summary.bytes_written
        ),
    );
    Ok(summary)
}

/// Encode `options.input` into `options.output`.
pub fn encode_file(
    options: &EncodeOptions,
    observer: &dyn EncodeObserver,
) -> Result<EncodeSummary, EncodeError> {
    let input = BufReader::new(File::open(&options.input)?);
    let output = BufWriter::new(File::create(&options.output)?);
    encode_stream(input, output, options, observer)
}

/// Handle to an encode running on its own thread.
pub struct EncodeHandle {
    thread: JoinHandle<Result<EncodeSummary, EncodeError>>,
}

impl EncodeHandle {
    /// Block until the encode completes.
    pub fn join(self) -> Result<EncodeSummary, EncodeError> {
        self.thread
            .join()
            .unwrap_or_else(|_| Err(io::Error::other("encoder thread panicked").into()))
    }
}

/// Run [`encode_file`] on a dedicated worker. The observer receives every
/// status string and then the terminal result on that worker.
pub fn spawn_encode<O>(options: EncodeOptions, observer: O) -> io::Result<EncodeHandle>
where
    O: EncodeObserver + 'static,
{
    let thread = std::thread::Builder::new()
        .name("encoder".into())
        .spawn(move || {
            let result = encode_file(&options, &observer);
            if let Err(e) = &result {
                log::warn!("Encoding failed: {e}");
                observer.on_status(&format!("Encoding failed: {e}"));
            }
            observer.on_finished(&result);
            result
        })?;
    Ok(EncodeHandle { thread })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::{Arc, Mutex};
    use vc_formats::pcm16_to_wav;

    #[derive(Clone, Default)]
    struct Recorder {
        lines: Arc<Mutex<Vec<String>>>,
        finished: Arc<Mutex<Option<bool>>>,
    }

    impl EncodeObserver for Recorder {
        fn on_status(&self, message: &str) {
            self.lines.lock().unwrap().push(message.to_string());
        }

        fn on_finished(&self, result: &Result<EncodeSummary, EncodeError>) {
            *self.finished.lock().unwrap() = Some(result.is_ok());
        }
    }

    fn options() -> EncodeOptions {
        EncodeOptions {
            serial: Some(1234),
            ..Default::default()
        }
    }

    #[test]
    fn reports_progress_in_order() {
        let wav = pcm16_to_wav(&[0; 2000], 2, 44100);
        let recorder = Recorder::default();
        let mut out = Vec::new();
        let summary = encode_stream(Cursor::new(wav), &mut out, &options(), &recorder).unwrap();

        let lines = recorder.lines.lock().unwrap();
        assert_eq!(lines[0], "Reading header...");
        assert!(lines.contains(&"Number of channels: 2".to_string()));
        assert!(lines.contains(&"Bits per sample: 16".to_string()));
        assert!(lines.contains(&"Sample rate: 44100".to_string()));
        let headers = lines.iter().position(|l| l == "Writing headers...").unwrap();
        let finished = lines.iter().position(|l| l == "Encoding finished").unwrap();
        assert!(headers < finished);

        assert_eq!(summary.frames, 1000);
        assert_eq!(summary.data_bytes, 4000);
        assert_eq!(summary.bytes_written, out.len() as u64);
    }

    #[test]
    fn encoder_tag_is_written() {
        let wav = pcm16_to_wav(&[0; 100], 1, 8000);
        let mut out = Vec::new();
        encode_stream(Cursor::new(wav), &mut out, &options(), &LogObserver).unwrap();
        let tag = format!("ENCODER={ENCODER_TAG}");
        assert!(out.windows(tag.len()).any(|w| w == tag.as_bytes()));
    }

    #[test]
    fn header_failure_stops_before_codec() {
        let recorder = Recorder::default();
        let err = encode_stream(Cursor::new(vec![0u8; 8]), Vec::new(), &options(), &recorder)
            .unwrap_err();
        assert_eq!(err.kind(), vc_engine::EncodeErrorKind::HeaderParse);
        assert_eq!(*recorder.lines.lock().unwrap(), ["Reading header..."]);
    }

    #[test]
    fn invalid_quality_is_codec_init() {
        let wav = pcm16_to_wav(&[0; 100], 1, 8000);
        let mut opts = options();
        opts.quality = 2.0;
        let err = encode_stream(Cursor::new(wav), Vec::new(), &opts, &LogObserver).unwrap_err();
        assert_eq!(err.kind(), vc_engine::EncodeErrorKind::CodecInit);
    }

    #[test]
    fn compression_ratio_is_percent() {
        let summary = EncodeSummary {
            channels: 1,
            sample_rate: 100,
            frames: 100,
            pages: 3,
            bytes_written: 50,
            data_bytes: 200,
        };
        assert_eq!(summary.compression_ratio(), 25.0);
        assert_eq!(summary.seconds(), 1.0);
    }

    #[test]
    fn missing_input_reports_failure_asynchronously() {
        let recorder = Recorder::default();
        let handle = spawn_encode(
            EncodeOptions::new("/nonexistent/input.wav", "/nonexistent/output.ogg"),
            recorder.clone(),
        )
        .unwrap();
        let err = handle.join().unwrap_err();
        assert_eq!(err.kind(), vc_engine::EncodeErrorKind::Io);
        assert_eq!(*recorder.finished.lock().unwrap(), Some(false));
        assert!(recorder.lines.lock().unwrap()[0].starts_with("Encoding failed"));
    }
}
