//! Format handling for the vorbis converter.
//!
//! Parses the RIFF/WAVE header of encoder input, converts raw PCM bytes to
//! normalized planar floats, and writes plain PCM WAVE files.

mod normalize;
mod wav_header;
mod wav_writer;

pub use normalize::{decode_s16, decode_s24, decode_s32, decode_u8, normalize, sign_extend_24};
pub use wav_header::{read_header, WaveHeader, EXTENSIBLE_DATA_SIZE_OFFSET, PCM_DATA_SIZE_OFFSET};
pub use wav_writer::{pcm16_to_wav, write_wav};

use thiserror::Error;
use vc_ir::WaveFormatTag;

/// Error type for format parsing and sample conversion.
#[derive(Error, Debug)]
pub enum FormatError {
    /// A read returned fewer bytes than the header requires
    #[error("Unexpected end of file while reading WAVE header")]
    UnexpectedEof,

    /// Missing RIFF/WAVE magic or malformed header fields
    #[error("Invalid WAVE header")]
    InvalidHeader,

    /// Format tag other than PCM or extensible
    #[error("Format not recognized: 0x{0:04x}")]
    UnrecognizedFormat(u16),

    /// Channel count of zero
    #[error("Invalid channel count: {0}")]
    InvalidChannelCount(u16),

    /// Sample width outside 8/16/24/32 bits
    #[error("Unsupported bits per sample: {0}")]
    UnsupportedBitDepth(u16),

    /// Recognized encoding without a sample conversion
    #[error("No sample conversion for {0}")]
    UnsupportedEncoding(WaveFormatTag),

    /// I/O error from the byte source
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<binrw::Error> for FormatError {
    fn from(err: binrw::Error) -> Self {
        if err.is_eof() {
            return FormatError::UnexpectedEof;
        }
        match err {
            binrw::Error::Io(e) => FormatError::Io(e),
            // Derived readers wrap field errors with context
            binrw::Error::Backtrace(bt) => FormatError::from(*bt.error),
            _ => FormatError::InvalidHeader,
        }
    }
}
