//! WAVE format descriptor.

use core::fmt;

/// Format tag from the WAVE `fmt ` sub-chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WaveFormatTag {
    /// Linear integer PCM
    Pcm,
    /// 32/64-bit IEEE float
    IeeeFloat,
    /// G.711 A-law
    ALaw,
    /// G.711 μ-law
    MuLaw,
    /// `WAVE_FORMAT_EXTENSIBLE`, the real tag lives in the sub-format record
    Extensible,
}

impl WaveFormatTag {
    pub const PCM: u16 = 0x0001;
    pub const IEEE_FLOAT: u16 = 0x0003;
    pub const ALAW: u16 = 0x0006;
    pub const MULAW: u16 = 0x0007;
    pub const EXTENSIBLE: u16 = 0xfffe;

    /// Map a raw tag value to a known format.
    pub fn from_raw(raw: u16) -> Option<Self> {
        match raw {
            Self::PCM => Some(Self::Pcm),
            Self::IEEE_FLOAT => Some(Self::IeeeFloat),
            Self::ALAW => Some(Self::ALaw),
            Self::MULAW => Some(Self::MuLaw),
            Self::EXTENSIBLE => Some(Self::Extensible),
            _ => None,
        }
    }

    /// The raw tag value.
    pub fn raw(self) -> u16 {
        match self {
            Self::Pcm => Self::PCM,
            Self::IeeeFloat => Self::IEEE_FLOAT,
            Self::ALaw => Self::ALAW,
            Self::MuLaw => Self::MULAW,
            Self::Extensible => Self::EXTENSIBLE,
        }
    }
}

impl fmt::Display for WaveFormatTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pcm => "PCM",
            Self::IeeeFloat => "IEEE float",
            Self::ALaw => "A-law",
            Self::MuLaw => "mu-law",
            Self::Extensible => "extensible",
        };
        write!(f, "{} (0x{:04x})", name, self.raw())
    }
}

/// Parsed description of a WAVE stream.
///
/// `tag` is the resolved tag: for extensible files it is the sub-format's
/// tag, never [`WaveFormatTag::Extensible`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WaveFormat {
    pub tag: WaveFormatTag,
    pub channels: u16,
    pub sample_rate: u32,
    pub avg_bytes_per_sec: u32,
    pub block_align: u16,
    pub bits_per_sample: u16,
}

impl WaveFormat {
    /// Describe a plain integer PCM stream.
    pub fn pcm(channels: u16, sample_rate: u32, bits_per_sample: u16) -> Self {
        let block_align = channels * bits_per_sample.div_ceil(8);
        Self {
            tag: WaveFormatTag::Pcm,
            channels,
            sample_rate,
            avg_bytes_per_sec: sample_rate * block_align as u32,
            block_align,
            bits_per_sample,
        }
    }

    /// Bytes per single-channel sample (1, 2, 3 or 4 for supported streams).
    pub fn bytes_per_sample(&self) -> u16 {
        self.bits_per_sample / 8
    }

    /// Bytes per interleaved frame, derived from the sample width.
    ///
    /// Used instead of `block_align` when slicing sample data since some
    /// writers leave `block_align` inconsistent.
    pub fn frame_size(&self) -> usize {
        self.bytes_per_sample() as usize * self.channels as usize
    }

    /// Number of whole frames in `bytes` bytes of sample data.
    pub fn frames_in(&self, bytes: usize) -> usize {
        match self.frame_size() {
            0 => 0,
            size => bytes / size,
        }
    }

    /// Duration in seconds of `frames` frames.
    pub fn seconds(&self, frames: u64) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        frames as f64 / self.sample_rate as f64
    }
}

/// Location of the sample data inside a WAVE file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DataRegion {
    /// Byte offset of the first sample byte
    pub offset: u64,
    /// Length in bytes as declared by the `data` chunk
    pub len: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_tags_round_trip() {
        for raw in [0x0001, 0x0003, 0x0006, 0x0007, 0xfffe] {
            assert_eq!(WaveFormatTag::from_raw(raw).map(|t| t.raw()), Some(raw));
        }
        assert_eq!(WaveFormatTag::from_raw(0x0055), None);
    }

    #[test]
    fn pcm_constructor_fills_derived_fields() {
        let fmt = WaveFormat::pcm(2, 44100, 24);
        assert_eq!(fmt.block_align, 6);
        assert_eq!(fmt.avg_bytes_per_sec, 264600);
        assert_eq!(fmt.frame_size(), 6);
    }

    #[test]
    fn frames_in_drops_partial_frame() {
        let fmt = WaveFormat::pcm(2, 48000, 16);
        assert_eq!(fmt.frames_in(4096), 1024);
        assert_eq!(fmt.frames_in(4099), 1024);
        assert_eq!(fmt.frames_in(3), 0);
    }
}
