//! Encode error types.

use thiserror::Error;
use vc_formats::FormatError;
use vc_ir::WaveFormatTag;

/// `OV_EINVAL` from libvorbis, used for parameters rejected before the codec
/// is called.
pub const OV_EINVAL: i32 = -131;

/// Errors that abort an encode session.
#[derive(Error, Debug)]
pub enum EncodeError {
    /// WAVE header could not be parsed
    #[error("Failed to parse header: {0}")]
    HeaderParse(#[from] FormatError),

    /// Input encoding has no sample conversion
    #[error("Unsupported input encoding: {0}")]
    UnsupportedFormat(WaveFormatTag),

    /// Codec or container initialisation rejected the parameters
    #[error("Couldn't initialize vorbis encoder: status {0}")]
    CodecInit(i32),

    /// Block analysis or bitrate management failed
    #[error("Analysis error: status {0}")]
    Analysis(i32),

    /// Packet could not be flushed or submitted to the container
    #[error("Packet error: status {0}")]
    Packet(i32),

    /// Container stream is in an error state
    #[error("Page error: status {0}")]
    Page(i32),

    /// Session already reached its terminal state
    #[error("Encoder already finalized")]
    AlreadyFinalized,

    /// Read, write or seek failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification of an [`EncodeError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EncodeErrorKind {
    HeaderParse,
    CodecInit,
    Analysis,
    Io,
}

impl EncodeError {
    pub fn kind(&self) -> EncodeErrorKind {
        match self {
            EncodeError::HeaderParse(FormatError::Io(_)) => EncodeErrorKind::Io,
            EncodeError::HeaderParse(_) | EncodeError::UnsupportedFormat(_) => {
                EncodeErrorKind::HeaderParse
            }
            EncodeError::CodecInit(_) => EncodeErrorKind::CodecInit,
            EncodeError::Analysis(_)
            | EncodeError::Packet(_)
            | EncodeError::Page(_)
            | EncodeError::AlreadyFinalized => EncodeErrorKind::Analysis,
            EncodeError::Io(_) => EncodeErrorKind::Io,
        }
    }
}

/// Map a libvorbis/libogg status to `Ok(status)` or the given error.
pub(crate) fn check(status: i32, err: fn(i32) -> EncodeError) -> Result<i32, EncodeError> {
    if status < 0 {
        Err(err(status))
    } else {
        Ok(status)
    }
}
