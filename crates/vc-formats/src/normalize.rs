//! Raw PCM bytes to normalized planar floats.
//!
//! Scaling factors are fixed per sample width. 8-bit data is treated as an
//! unsigned magnitude over 256 (not re-centred around zero), which keeps
//! output identical to files produced by earlier versions of the converter.

use vc_ir::{AudioBuffer, WaveFormat, WaveFormatTag};

use crate::FormatError;

/// Unsigned 8-bit sample.
#[inline]
pub fn decode_u8(bytes: &[u8]) -> f32 {
    bytes[0] as f32 / 256.0
}

/// Little-endian signed 16-bit sample.
#[inline]
pub fn decode_s16(bytes: &[u8]) -> f32 {
    i16::from_le_bytes([bytes[0], bytes[1]]) as f32 / 32768.0
}

/// Little-endian 24-bit sample with bit 23 replicated into bits 24-31.
#[inline]
pub fn sign_extend_24(bytes: &[u8]) -> i32 {
    let raw = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], 0]);
    let extended = if raw & 0x0080_0000 != 0 { raw | 0xff00_0000 } else { raw };
    extended as i32
}

/// Little-endian signed 24-bit sample.
#[inline]
pub fn decode_s24(bytes: &[u8]) -> f32 {
    sign_extend_24(bytes) as f32 / 8_388_608.0
}

/// Little-endian signed 32-bit sample. Scaled in double precision.
#[inline]
pub fn decode_s32(bytes: &[u8]) -> f32 {
    let value = i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    (value as f64 / 2_147_483_648.0) as f32
}

/// De-interleave and normalize a block of integer PCM into `out`.
///
/// Converts `block.len() / frame_size` frames (capped at `out.capacity()`),
/// sets `out`'s valid frame count and returns it. A trailing partial frame
/// is ignored.
pub fn normalize(block: &[u8], format: &WaveFormat, out: &mut AudioBuffer) -> Result<usize, FormatError> {
    if format.tag != WaveFormatTag::Pcm {
        return Err(FormatError::UnsupportedEncoding(format.tag));
    }
    debug_assert_eq!(out.channels(), format.channels);

    let width = format.bytes_per_sample() as usize;
    let decode: fn(&[u8]) -> f32 = match width {
        1 => decode_u8,
        2 => decode_s16,
        3 => decode_s24,
        4 => decode_s32,
        _ => return Err(FormatError::UnsupportedBitDepth(format.bits_per_sample)),
    };

    let stride = format.frame_size();
    let frames = format.frames_in(block.len()).min(out.capacity());
    out.set_frames(frames);

    for ch in 0..format.channels {
        let offset = ch as usize * width;
        let plane = out.channel_mut(ch);
        for (i, sample) in plane.iter_mut().enumerate() {
            let start = i * stride + offset;
            *sample = decode(&block[start..start + width]);
        }
    }

    Ok(frames)
}
