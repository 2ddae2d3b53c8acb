//! vorbis-converter CLI: encode, playback, header inspection and test tones.
//!
//! Usage:
//!   vc-cli encode input.wav output.ogg --quality 0.6
//!   vc-cli play file.ogg
//!   vc-cli info input.wav
//!   vc-cli tone out.wav --seconds 1 --freq 0

use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use vc_master::{
    EncodeOptions, EncodeSummary, LogObserver, PlaybackConfig, PlaybackController, Transport,
    WaveFormat,
};

#[derive(Parser)]
#[command(name = "vc-cli", version, about = "WAVE to Ogg/Vorbis converter and player")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Encode a PCM WAVE file to Ogg/Vorbis
    Encode {
        input: PathBuf,
        output: PathBuf,
        /// VBR quality, 0.0 to 1.0
        #[arg(short, long, default_value_t = 0.5)]
        quality: f32,
        /// Ogg stream serial number (random by default)
        #[arg(long)]
        serial: Option<i32>,
        /// Vorbis comment, TAG=value (repeatable)
        #[arg(short, long = "comment", value_parser = parse_comment)]
        comments: Vec<(String, String)>,
    },
    /// Play an Ogg/Vorbis file
    Play {
        input: PathBuf,
        /// YAML playback configuration
        #[arg(long)]
        config: Option<PathBuf>,
        /// Ring buffer length in milliseconds (overrides the config file)
        #[arg(long)]
        buffer_ms: Option<u32>,
        /// Initial volume, 0.0 to 1.0 (overrides the config file)
        #[arg(long)]
        volume: Option<f32>,
    },
    /// Print the WAVE header of a file
    Info { input: PathBuf },
    /// Write a 16-bit PCM sine (or silent) WAVE file
    Tone {
        output: PathBuf,
        #[arg(long, default_value_t = 1.0)]
        seconds: f32,
        #[arg(long, default_value_t = 44100)]
        rate: u32,
        #[arg(long, default_value_t = 1)]
        channels: u16,
        /// Frequency in Hz; 0 writes silence
        #[arg(long, default_value_t = 440.0)]
        freq: f32,
    },
}

fn parse_comment(s: &str) -> Result<(String, String), String> {
    let (tag, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected TAG=value, got {s:?}"))?;
    Ok((tag.to_string(), value.to_string()))
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Encode {
            input,
            output,
            quality,
            serial,
            comments,
        } => encode(input, output, quality, serial, comments),
        Command::Play {
            input,
            config,
            buffer_ms,
            volume,
        } => play(&input, config.as_deref(), buffer_ms, volume),
        Command::Info { input } => info(&input),
        Command::Tone {
            output,
            seconds,
            rate,
            channels,
            freq,
        } => tone(&output, seconds, rate, channels, freq),
    };

    if let Err(message) = result {
        eprintln!("{message}");
        std::process::exit(1);
    }
}

fn encode(
    input: PathBuf,
    output: PathBuf,
    quality: f32,
    serial: Option<i32>,
    comments: Vec<(String, String)>,
) -> Result<(), String> {
    let options = EncodeOptions {
        quality,
        serial,
        comments,
        ..EncodeOptions::new(input, output)
    };
    let out_path = options.output.clone();
    let handle = vc_master::spawn_encode(options, LogObserver).map_err(|e| e.to_string())?;
    let summary: EncodeSummary = handle.join().map_err(|e| {
        let _ = fs::remove_file(&out_path);
        format!("Encoding failed: {e}")
    })?;
    println!(
        "Encoded {:.2} s into {} bytes ({:.2}% of input)",
        summary.seconds(),
        summary.bytes_written,
        summary.compression_ratio()
    );
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<PlaybackConfig, String> {
    let Some(path) = path else {
        return Ok(PlaybackConfig::default());
    };
    let text = fs::read_to_string(path).map_err(|e| format!("{}: {e}", path.display()))?;
    serde_yaml::from_str(&text).map_err(|e| format!("{}: {e}", path.display()))
}

fn play(
    input: &Path,
    config: Option<&Path>,
    buffer_ms: Option<u32>,
    volume: Option<f32>,
) -> Result<(), String> {
    let mut config = load_config(config)?;
    if let Some(ms) = buffer_ms {
        config.buffer_ms = ms;
    }
    if let Some(v) = volume {
        config.initial_volume = v.clamp(0.0, 1.0);
    }

    let mut ctrl = PlaybackController::open(input, &config).map_err(|e| e.to_string())?;
    let total = ctrl.duration();
    println!("Keys: p play/pause | s stop | + / - volume | q quit (then Enter)");

    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        for line in io::stdin().lock().lines().map_while(Result::ok) {
            if tx.send(line.trim().to_string()).is_err() {
                break;
            }
        }
    });

    ctrl.toggle_playback();
    let mut end = EndWatch::default();
    loop {
        match rx.try_recv().as_deref() {
            Ok("p") => {
                ctrl.toggle_playback();
            }
            Ok("s") => ctrl.reset().map_err(|e| e.to_string())?,
            Ok("+") => nudge_volume(&ctrl, 0.1),
            Ok("-") => nudge_volume(&ctrl, -0.1),
            Ok("q") | Err(mpsc::TryRecvError::Disconnected) => break,
            _ => {}
        }

        let transport = ctrl.transport();
        let now = total.map_or(ctrl.timestamp(), |t| ctrl.timestamp().min(t));
        print!(
            "\r{:?} | {} / {} | vol {:.1}   ",
            transport,
            clock(now),
            total.map_or_else(|| "--:--".to_string(), clock),
            ctrl.volume()
        );
        let _ = io::stdout().flush();

        if end.update(transport == Transport::Playing, ctrl.is_eos(), now, total) {
            break;
        }
        std::thread::sleep(Duration::from_millis(50));
    }

    println!("\rDone.                                  ");
    ctrl.finalize().map_err(|e| e.to_string())
}

/// Polls the playback clock reaching the end of its stream must stay still
/// for before the player exits.
const STILL_POLLS: u32 = 4;

/// Tracks when playback has run out. The decoder reaches end of stream
/// while the ring still holds audio, so the clock must also have stopped:
/// either at the known duration or, for streams without one, by holding
/// still across several polls while playing.
#[derive(Default)]
struct EndWatch {
    last: Option<Duration>,
    still: u32,
}

impl EndWatch {
    fn update(&mut self, playing: bool, eos: bool, now: Duration, total: Option<Duration>) -> bool {
        if !playing || !eos {
            *self = Self::default();
            return false;
        }
        if total.is_some_and(|t| now >= t) {
            return true;
        }
        if self.last == Some(now) {
            self.still += 1;
        } else {
            self.last = Some(now);
            self.still = 0;
        }
        self.still >= STILL_POLLS
    }
}

fn nudge_volume(ctrl: &PlaybackController, delta: f32) {
    let volume = (ctrl.volume() + delta).clamp(0.0, 1.0);
    if let Err(e) = ctrl.set_volume(volume) {
        log::warn!("{e}");
    }
}

fn clock(d: Duration) -> String {
    let secs = d.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

fn info(input: &Path) -> Result<(), String> {
    let file = File::open(input).map_err(|e| format!("{}: {e}", input.display()))?;
    let header = vc_master::read_header(&mut BufReader::new(file)).map_err(|e| e.to_string())?;
    let format = header.format;
    println!("Format:      {}", format.tag);
    println!("Channels:    {}", format.channels);
    println!("Sample rate: {}", format.sample_rate);
    println!("Bits:        {}", format.bits_per_sample);
    println!("Block align: {}", format.block_align);
    println!(
        "Data:        {} bytes at offset {} ({:.2} s)",
        header.data.len,
        header.data.offset,
        format.seconds(format.frames_in(header.data.len as usize) as u64)
    );
    Ok(())
}

fn tone(output: &Path, seconds: f32, rate: u32, channels: u16, freq: f32) -> Result<(), String> {
    let frames = (seconds.max(0.0) * rate as f32) as usize;
    let step = freq * std::f32::consts::TAU / rate as f32;
    let mut data = Vec::with_capacity(frames * channels as usize * 2);
    for i in 0..frames {
        let s = if freq > 0.0 {
            ((i as f32 * step).sin() * 0.5 * i16::MAX as f32) as i16
        } else {
            0
        };
        for _ in 0..channels {
            data.extend_from_slice(&s.to_le_bytes());
        }
    }

    let format = WaveFormat::pcm(channels, rate, 16);
    let mut file = io::BufWriter::new(
        File::create(output).map_err(|e| format!("{}: {e}", output.display()))?,
    );
    vc_formats::write_wav(&mut file, &format, &data)
        .and_then(|_| file.flush())
        .map_err(|e| e.to_string())?;
    println!("Wrote {frames} frames to {}", output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn known_duration_ends_at_total() {
        let mut end = EndWatch::default();
        assert!(!end.update(true, true, ms(900), Some(ms(1000))));
        assert!(end.update(true, true, ms(1000), Some(ms(1000))));
    }

    #[test]
    fn unknown_duration_waits_for_ring_to_drain() {
        let mut end = EndWatch::default();
        // end of stream while buffered audio still plays
        for t in [100, 150, 200, 250] {
            assert!(!end.update(true, true, ms(t), None));
        }
        for _ in 0..STILL_POLLS - 1 {
            assert!(!end.update(true, true, ms(250), None));
        }
        assert!(end.update(true, true, ms(250), None));
    }

    #[test]
    fn pause_or_reset_does_not_end() {
        let mut end = EndWatch::default();
        for _ in 0..10 {
            assert!(!end.update(false, true, ms(500), None));
        }
        for _ in 0..STILL_POLLS {
            assert!(!end.update(true, false, ms(500), None));
        }
        // resuming after a pause starts the count over
        for _ in 0..STILL_POLLS {
            assert!(!end.update(true, true, ms(500), None));
        }
        assert!(end.update(true, true, ms(500), None));
    }
}
