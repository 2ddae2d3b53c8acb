use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::io::Cursor;
use vc_engine::{EncodeSession, EncoderSettings, DEFAULT_FRAMES_PER_BLOCK};
use vc_formats::{normalize, pcm16_to_wav};
use vc_ir::{AudioBuffer, WaveFormat};

fn sine_pcm(channels: u16, frames: usize) -> Vec<i16> {
    (0..frames)
        .flat_map(|i| {
            let s = ((i as f32 * 440.0 * std::f32::consts::TAU / 44100.0).sin() * 16000.0) as i16;
            std::iter::repeat(s).take(channels as usize)
        })
        .collect()
}

fn bench_normalize(c: &mut Criterion) {
    let format = WaveFormat::pcm(2, 44100, 16);
    let bytes: Vec<u8> = sine_pcm(2, DEFAULT_FRAMES_PER_BLOCK)
        .iter()
        .flat_map(|s| s.to_le_bytes())
        .collect();
    let mut out = AudioBuffer::new(2, DEFAULT_FRAMES_PER_BLOCK);

    c.bench_function("normalize_1024_frames_stereo_s16", |b| {
        b.iter(|| normalize(black_box(&bytes), &format, &mut out))
    });
}

fn bench_encode(c: &mut Criterion) {
    let wav = pcm16_to_wav(&sine_pcm(2, 44100), 2, 44100);
    let settings = EncoderSettings::default();

    c.bench_function("encode_1s_stereo_q05", |b| {
        b.iter(|| {
            let mut session = EncodeSession::open(
                Cursor::new(black_box(&wav[..])),
                Vec::with_capacity(64 * 1024),
                &settings,
                DEFAULT_FRAMES_PER_BLOCK,
            )
            .unwrap();
            session.run().unwrap()
        })
    });
}

criterion_group!(benches, bench_normalize, bench_encode);
criterion_main!(benches);
