//! RIFF/WAVE header parsing at fixed offsets.
//!
//! The encoder only accepts canonical headers: the `fmt ` sub-chunk starts at
//! byte 12 and the `data` chunk follows it immediately.

use std::io::{Read, Seek, SeekFrom};

use binrw::{BinRead, BinReaderExt};
use vc_ir::{DataRegion, WaveFormat, WaveFormatTag};

use crate::FormatError;

/// Offset of the common `fmt ` fields (format tag onwards).
const FORMAT_OFFSET: u64 = 20;
/// Extension size, valid bits and channel mask preceding the sub-format.
const EXTENSIBLE_RESERVED: i64 = 8;
/// `data` chunk id between the sub-format record and the data size.
const CHUNK_ID_LEN: i64 = 4;

/// Offset of the data size field in a plain PCM header.
pub const PCM_DATA_SIZE_OFFSET: u64 = 40;
/// Offset of the data size field in an extensible header.
pub const EXTENSIBLE_DATA_SIZE_OFFSET: u64 = 64;

#[derive(BinRead, Debug)]
#[br(little, magic = b"RIFF")]
struct RiffPreamble {
    _riff_size: u32,
    form: [u8; 4],
}

#[derive(BinRead, Debug)]
#[br(little)]
struct FormatCommon {
    format_tag: u16,
    channels: u16,
    sample_rate: u32,
    avg_bytes_per_sec: u32,
    block_align: u16,
    bits_per_sample: u16,
}

/// Sub-format GUID of an extensible header. Its leading 16 bits carry the
/// real format tag.
#[derive(BinRead, Debug)]
#[br(little)]
struct SubFormat {
    format_tag: u16,
    _guid_tail: [u8; 14],
}

/// Format descriptor plus the location of the sample data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WaveHeader {
    pub format: WaveFormat,
    pub data: DataRegion,
}

/// Parse a WAVE header from a seekable byte source.
///
/// On success the source is positioned at the first sample byte.
pub fn read_header<R: Read + Seek>(reader: &mut R) -> Result<WaveHeader, FormatError> {
    reader.seek(SeekFrom::Start(0))?;
    let preamble: RiffPreamble = reader.read_le()?;
    if &preamble.form != b"WAVE" {
        return Err(FormatError::InvalidHeader);
    }

    reader.seek(SeekFrom::Start(FORMAT_OFFSET))?;
    let common: FormatCommon = reader.read_le()?;

    let tag = match WaveFormatTag::from_raw(common.format_tag) {
        Some(WaveFormatTag::Extensible) => {
            reader.seek(SeekFrom::Current(EXTENSIBLE_RESERVED))?;
            let sub: SubFormat = reader.read_le()?;
            reader.seek(SeekFrom::Current(CHUNK_ID_LEN))?;
            match WaveFormatTag::from_raw(sub.format_tag) {
                Some(WaveFormatTag::Extensible) | None => {
                    return Err(FormatError::UnrecognizedFormat(sub.format_tag))
                }
                Some(tag) => tag,
            }
        }
        Some(WaveFormatTag::Pcm) => {
            reader.seek(SeekFrom::Start(PCM_DATA_SIZE_OFFSET))?;
            WaveFormatTag::Pcm
        }
        _ => return Err(FormatError::UnrecognizedFormat(common.format_tag)),
    };

    let data_len: u32 = reader.read_le()?;
    let data_offset = reader.stream_position()?;

    if common.channels == 0 {
        return Err(FormatError::InvalidChannelCount(common.channels));
    }
    if common.bits_per_sample % 8 != 0 || !(1..=4).contains(&(common.bits_per_sample / 8)) {
        return Err(FormatError::UnsupportedBitDepth(common.bits_per_sample));
    }

    let format = WaveFormat {
        tag,
        channels: common.channels,
        sample_rate: common.sample_rate,
        avg_bytes_per_sec: common.avg_bytes_per_sec,
        block_align: common.block_align,
        bits_per_sample: common.bits_per_sample,
    };

    log::debug!(
        "WAVE header: {} ch, {} Hz, {} bits, {}, {} data bytes at {}",
        format.channels,
        format.sample_rate,
        format.bits_per_sample,
        format.tag,
        data_len,
        data_offset
    );

    Ok(WaveHeader {
        format,
        data: DataRegion { offset: data_offset, len: data_len },
    })
}
