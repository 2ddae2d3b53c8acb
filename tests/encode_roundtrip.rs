//! End-to-end encode tests: WAVE in, Ogg/Vorbis out, decoded back with the
//! playback source.

use std::io::Cursor;

use lewton::inside_ogg::OggStreamReader;
use vc_audio::{last_granule, PcmSource, VorbisSource};
use vc_formats::pcm16_to_wav;
use vc_master::{encode_stream, EncodeOptions, LogObserver};

fn encode(samples: &[i16], channels: u16, rate: u32) -> Vec<u8> {
    let wav = pcm16_to_wav(samples, channels, rate);
    let options = EncodeOptions {
        serial: Some(0x5eed),
        ..Default::default()
    };
    let mut out = Vec::new();
    encode_stream(Cursor::new(wav), &mut out, &options, &LogObserver).unwrap();
    out
}

/// Byte offsets of every page in a well-formed Ogg stream.
fn pages(ogg: &[u8]) -> Vec<usize> {
    let mut offsets = Vec::new();
    let mut at = 0;
    while at + 27 <= ogg.len() {
        assert_eq!(&ogg[at..at + 4], b"OggS", "page sync at {at}");
        let segments = ogg[at + 26] as usize;
        let body: usize = ogg[at + 27..at + 27 + segments]
            .iter()
            .map(|&b| b as usize)
            .sum();
        offsets.push(at);
        at += 27 + segments + body;
    }
    assert_eq!(at, ogg.len());
    offsets
}

#[test]
fn one_second_of_mono_silence() {
    let ogg = encode(&vec![0i16; 44100], 1, 44100);
    let offsets = pages(&ogg);
    assert!(offsets.len() >= 3);

    // Header type: 0x02 BOS, 0x04 EOS.
    assert_eq!(ogg[offsets[0] + 5] & 0x02, 0x02);
    let last = *offsets.last().unwrap();
    assert_eq!(ogg[last + 5] & 0x04, 0x04);
    assert!(offsets[1..].iter().all(|&p| ogg[p + 5] & 0x02 == 0));

    assert_eq!(last_granule(&mut Cursor::new(&ogg)).unwrap(), Some(44100));
}

#[test]
fn lewton_reads_encoded_stream() {
    let ogg = encode(&vec![0i16; 2 * 22050], 2, 22050);
    let mut reader = OggStreamReader::new(Cursor::new(ogg)).unwrap();
    assert_eq!(reader.ident_hdr.audio_channels, 2);
    assert_eq!(reader.ident_hdr.audio_sample_rate, 22050);

    let encoder = reader
        .comment_hdr
        .comment_list
        .iter()
        .find(|(k, _)| k == "ENCODER")
        .map(|(_, v)| v.clone());
    assert_eq!(encoder.as_deref(), Some(vc_master::ENCODER_TAG));

    let mut samples = 0;
    while let Some(packet) = reader.read_dec_packet_itl().unwrap() {
        samples += packet.len();
    }
    assert!(samples > 0);
    assert_eq!(samples % 2, 0);
}

#[test]
fn playback_source_decodes_tone() {
    let rate = 8000;
    let tone: Vec<i16> = (0..rate as usize)
        .map(|i| ((i as f32 * 440.0 * std::f32::consts::TAU / rate as f32).sin() * 12000.0) as i16)
        .collect();
    let ogg = encode(&tone, 1, rate);

    let mut source = VorbisSource::new(Cursor::new(ogg)).unwrap();
    assert_eq!(source.spec().channels, 1);
    assert_eq!(source.spec().sample_rate, rate);
    assert_eq!(source.total_frames(), Some(u64::from(rate)));
    assert_eq!(source.duration(), Some(std::time::Duration::from_secs(1)));

    let mut buf = [0u8; 1000];
    let mut bytes = 0;
    let mut peak = 0i16;
    loop {
        let n = source.read_pcm(&mut buf).unwrap();
        if n == 0 {
            break;
        }
        assert_eq!(n % 2, 0);
        for pair in buf[..n].chunks_exact(2) {
            peak = peak.max(i16::from_le_bytes([pair[0], pair[1]]).saturating_abs());
        }
        bytes += n;
    }
    assert!(bytes > 0);
    assert!(peak > 6000, "decoded peak {peak}");

    assert_eq!(source.seek_frame(0).unwrap(), 0);
    assert!(source.read_pcm(&mut buf).unwrap() > 0);
}

#[test]
fn pcm_sizes_encode_alike() {
    use vc_master::WaveFormat;

    let frames = 4000usize;
    let mut wav = Vec::new();
    let data = vec![0u8; frames * 3];
    vc_formats::write_wav(&mut wav, &WaveFormat::pcm(1, 16000, 24), &data).unwrap();

    let mut out = Vec::new();
    let summary = encode_stream(
        Cursor::new(wav),
        &mut out,
        &EncodeOptions::default(),
        &LogObserver,
    )
    .unwrap();
    assert_eq!(summary.frames, frames as u64);
    assert_eq!(summary.data_bytes, (frames * 3) as u64);
    assert_eq!(last_granule(&mut Cursor::new(&out)).unwrap(), Some(frames as u64));
}

#[test]
fn forward_seek_reports_resume_frame() {
    let rate = 8000u32;
    let total = 10 * rate as usize;
    let tone: Vec<i16> = (0..total)
        .map(|i| ((i as f32 * 330.0 * std::f32::consts::TAU / rate as f32).sin() * 9000.0) as i16)
        .collect();
    let ogg = encode(&tone, 1, rate);
    let mut source = VorbisSource::new(Cursor::new(ogg)).unwrap();

    // Decode ahead first, as the playback worker does before any seek.
    let mut buf = [0u8; 4000];
    assert_eq!(source.read_pcm(&mut buf).unwrap(), 4000);

    let target = 5 * u64::from(rate);
    let resumed = source.seek_frame(target).unwrap();
    assert!(resumed.abs_diff(target) < 2048, "resumed at {resumed}");

    let mut remaining = 0u64;
    loop {
        let n = source.read_pcm(&mut buf).unwrap();
        if n == 0 {
            break;
        }
        remaining += (n / 2) as u64;
    }
    assert_eq!(resumed + remaining, total as u64);
}
