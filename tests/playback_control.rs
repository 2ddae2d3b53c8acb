//! Playback transport tests over a real encoded stream, using the null
//! output device.

use std::io::Cursor;
use std::sync::Arc;
use std::time::{Duration, Instant};

use vc_audio::{
    ring_buffer, DecodeProducer, NullBackend, PlaybackState, StepOutcome, VorbisSource,
};
use vc_formats::pcm16_to_wav;
use vc_master::{
    encode_stream, EncodeOptions, LogObserver, PlaybackConfig, PlaybackController, PlaybackError,
    Transport,
};

fn encoded(seconds: f32, rate: u32) -> Vec<u8> {
    let frames = (seconds * rate as f32) as usize;
    let samples: Vec<i16> = (0..frames).map(|i| ((i % 64) as i16 - 32) * 200).collect();
    let mut out = Vec::new();
    encode_stream(
        Cursor::new(pcm16_to_wav(&samples, 1, rate)),
        &mut out,
        &EncodeOptions::default(),
        &LogObserver,
    )
    .unwrap();
    out
}

fn wait_until(timeout: Duration, mut done: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if done() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    done()
}

#[test]
fn toggle_flips_between_playing_and_paused() {
    let source = VorbisSource::new(Cursor::new(encoded(0.5, 8000))).unwrap();
    let ctrl =
        PlaybackController::with_backend(source, || Ok(NullBackend), &PlaybackConfig::default())
            .unwrap();

    assert_eq!(ctrl.transport(), Transport::Paused);
    assert!(ctrl.toggle_playback());
    assert_eq!(ctrl.transport(), Transport::Playing);
    assert!(!ctrl.toggle_playback());
    assert_eq!(ctrl.transport(), Transport::Paused);
}

#[test]
fn reset_rewinds_and_empties_the_ring() {
    let source = VorbisSource::new(Cursor::new(encoded(1.0, 8000))).unwrap();
    let (writer, reader) = ring_buffer(4000);
    let state = Arc::new(PlaybackState::default());
    let mut producer = DecodeProducer::new(source, writer, Arc::clone(&state), 1000, Duration::ZERO);

    assert!(state.toggle());
    while reader.free_len() > 0 {
        assert!(matches!(producer.step().unwrap(), StepOutcome::Decoded(_)));
    }
    state.set_frames_played(1234);

    state.request_reset();
    assert_eq!(producer.step().unwrap(), StepOutcome::Repositioned(0));
    assert_eq!(state.transport(), Transport::Paused);
    assert_eq!(reader.fill_len(), 0);
    assert_eq!(state.frames_played(), 0);
    assert!(!state.is_eos());
}

#[test]
fn plays_to_end_of_stream() {
    let source = VorbisSource::new(Cursor::new(encoded(0.25, 8000))).unwrap();
    let ctrl =
        PlaybackController::with_backend(source, || Ok(NullBackend), &PlaybackConfig::default())
            .unwrap();
    assert_eq!(ctrl.duration(), Some(Duration::from_millis(250)));

    ctrl.toggle_playback();
    assert!(wait_until(Duration::from_secs(5), || ctrl.is_eos()));
    assert!(wait_until(Duration::from_secs(5), || {
        ctrl.timestamp() >= Duration::from_millis(250)
    }));
}

#[test]
fn seek_and_volume_are_validated() {
    let source = VorbisSource::new(Cursor::new(encoded(4.0, 8000))).unwrap();
    let mut ctrl =
        PlaybackController::with_backend(source, || Ok(NullBackend), &PlaybackConfig::default())
            .unwrap();
    let near = |at: Duration, want: Duration| {
        let delta = if at > want { at - want } else { want - at };
        delta <= Duration::from_millis(256)
    };

    ctrl.seek(Duration::from_secs(3)).unwrap();
    assert!(
        wait_until(Duration::from_secs(5), || near(ctrl.timestamp(), Duration::from_secs(3))),
        "timestamp after seek: {:?}",
        ctrl.timestamp()
    );

    ctrl.seek(Duration::from_secs(1)).unwrap();
    assert!(wait_until(Duration::from_secs(5), || near(
        ctrl.timestamp(),
        Duration::from_secs(1)
    )));

    // Past the end clamps to the duration.
    ctrl.seek(Duration::from_secs(30)).unwrap();
    assert!(wait_until(Duration::from_secs(5), || near(
        ctrl.timestamp(),
        Duration::from_secs(4)
    )));
    assert!(ctrl.timestamp() <= Duration::from_secs(4));

    assert!(matches!(
        ctrl.set_volume(1.5),
        Err(PlaybackError::InvalidVolume(_))
    ));
    ctrl.set_volume(0.25).unwrap();
    assert_eq!(ctrl.volume(), 0.25);

    ctrl.finalize().unwrap();
    assert_eq!(ctrl.transport(), Transport::Stopped);
    assert!(matches!(ctrl.reset(), Err(PlaybackError::NotInitialized)));
    assert!(!ctrl.toggle_playback());
}
