//! WAV encoding for integer PCM.

use std::io::Write;

use vc_ir::WaveFormat;

/// Write a canonical 44-byte-header PCM WAVE file.
///
/// `data` is raw interleaved sample bytes matching `format`.
pub fn write_wav(w: &mut impl Write, format: &WaveFormat, data: &[u8]) -> std::io::Result<()> {
    let data_size = data.len() as u32;
    write_riff_header(w, data_size)?;
    write_fmt_chunk(w, format)?;
    w.write_all(b"data")?;
    w.write_all(&data_size.to_le_bytes())?;
    w.write_all(data)
}

/// Build a 16-bit PCM WAVE file from interleaved samples.
pub fn pcm16_to_wav(samples: &[i16], channels: u16, sample_rate: u32) -> Vec<u8> {
    let format = WaveFormat::pcm(channels, sample_rate, 16);
    let data: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
    let mut buf = Vec::with_capacity(44 + data.len());
    write_wav(&mut buf, &format, &data).expect("Vec<u8> write cannot fail");
    buf
}

fn write_riff_header(w: &mut impl Write, data_size: u32) -> std::io::Result<()> {
    w.write_all(b"RIFF")?;
    w.write_all(&(36 + data_size).to_le_bytes())?;
    w.write_all(b"WAVE")
}

fn write_fmt_chunk(w: &mut impl Write, format: &WaveFormat) -> std::io::Result<()> {
    w.write_all(b"fmt ")?;
    w.write_all(&16u32.to_le_bytes())?;
    w.write_all(&format.tag.raw().to_le_bytes())?;
    w.write_all(&format.channels.to_le_bytes())?;
    w.write_all(&format.sample_rate.to_le_bytes())?;
    w.write_all(&format.avg_bytes_per_sec.to_le_bytes())?;
    w.write_all(&format.block_align.to_le_bytes())?;
    w.write_all(&format.bits_per_sample.to_le_bytes())
}
