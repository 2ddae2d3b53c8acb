//! Safe wrapper over the libvorbis analysis state.
//!
//! Owns the four libvorbis structures that make up an encoder and tracks
//! which of them have been initialised so teardown only clears what exists.

use std::ffi::CString;
use std::mem;
use std::os::raw::c_int;
use std::ptr;
use std::slice;

use aotuv_lancer_vorbis_sys::{
    vorbis_analysis, vorbis_analysis_blockout, vorbis_analysis_buffer, vorbis_analysis_headerout,
    vorbis_analysis_init, vorbis_analysis_wrote, vorbis_bitrate_addblock,
    vorbis_bitrate_flushpacket, vorbis_block, vorbis_block_clear, vorbis_block_init,
    vorbis_comment, vorbis_comment_add_tag, vorbis_comment_clear, vorbis_comment_init,
    vorbis_dsp_clear, vorbis_dsp_state, vorbis_encode_init_vbr, vorbis_info, vorbis_info_clear,
    vorbis_info_init,
};
use ogg_next_sys::ogg_packet;
use vc_ir::AudioBuffer;

use crate::error::{check, EncodeError, OV_EINVAL};

/// Bit flags recording initialised sub-states.
const INFO: u8 = 1 << 0;
const COMMENT: u8 = 1 << 1;
const DSP: u8 = 1 << 2;
const BLOCK: u8 = 1 << 3;

pub(crate) struct VorbisCodec {
    info: Box<vorbis_info>,
    comment: Box<vorbis_comment>,
    dsp: Box<vorbis_dsp_state>,
    block: Box<vorbis_block>,
    live: u8,
    channels: u16,
}

// The raw structures are only touched through `&mut self`.
unsafe impl Send for VorbisCodec {}

impl VorbisCodec {
    /// Initialise a VBR encoder. `quality` is the 0.0..=1.0 quality factor.
    pub fn new(channels: u16, sample_rate: u32, quality: f32) -> Result<Self, EncodeError> {
        if channels == 0 || sample_rate == 0 || !(0.0..=1.0).contains(&quality) {
            return Err(EncodeError::CodecInit(OV_EINVAL));
        }

        // SAFETY: all four are plain C structs for which the all-zero pattern
        // is the documented pre-init state.
        let mut codec = unsafe {
            Self {
                info: Box::new(mem::zeroed()),
                comment: Box::new(mem::zeroed()),
                dsp: Box::new(mem::zeroed()),
                block: Box::new(mem::zeroed()),
                live: 0,
                channels,
            }
        };

        unsafe {
            vorbis_info_init(&mut *codec.info);
            codec.live |= INFO;

            check(
                vorbis_encode_init_vbr(&mut *codec.info, channels as _, sample_rate as _, quality),
                EncodeError::CodecInit,
            )?;

            check(
                vorbis_analysis_init(&mut *codec.dsp, &mut *codec.info),
                EncodeError::CodecInit,
            )?;
            codec.live |= DSP;

            check(
                vorbis_block_init(&mut *codec.dsp, &mut *codec.block),
                EncodeError::CodecInit,
            )?;
            codec.live |= BLOCK;

            vorbis_comment_init(&mut *codec.comment);
            codec.live |= COMMENT;
        }

        Ok(codec)
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Append a `TAG=value` user comment. Must precede [`header_packets`].
    ///
    /// Tags or values with interior NUL bytes are skipped.
    ///
    /// [`header_packets`]: VorbisCodec::header_packets
    pub fn add_comment(&mut self, tag: &str, value: &str) {
        let (Ok(tag), Ok(value)) = (CString::new(tag), CString::new(value)) else {
            log::warn!("Skipping comment with embedded NUL: {tag:?}");
            return;
        };
        unsafe {
            vorbis_comment_add_tag(&mut *self.comment, tag.as_ptr(), value.as_ptr());
        }
    }

    /// Produce the identification, comment and setup header packets.
    ///
    /// The packets borrow codec-owned memory and stay valid until the next
    /// call into the codec.
    pub fn header_packets(&mut self) -> Result<[ogg_packet; 3], EncodeError> {
        // SAFETY: ogg_packet is a plain C struct; headerout fills all three.
        let mut packets: [ogg_packet; 3] = unsafe { mem::zeroed() };
        let [ident, comment, setup] = &mut packets;
        unsafe {
            check(
                vorbis_analysis_headerout(&mut *self.dsp, &mut *self.comment, ident, comment, setup),
                EncodeError::CodecInit,
            )?;
        }
        Ok(packets)
    }

    /// Copy the buffer's frames into the analysis window.
    pub fn write_frames(&mut self, buffer: &AudioBuffer) {
        let frames = buffer.frames();
        let channels = self.channels.min(buffer.channels());
        unsafe {
            let planes = vorbis_analysis_buffer(&mut *self.dsp, frames as c_int);
            for ch in 0..channels {
                let dst = slice::from_raw_parts_mut(*planes.add(ch as usize), frames);
                dst.copy_from_slice(buffer.channel(ch));
            }
            vorbis_analysis_wrote(&mut *self.dsp, frames as c_int);
        }
    }

    /// Signal end of input so the analysis stage flushes its tail.
    pub fn end_of_input(&mut self) {
        unsafe {
            vorbis_analysis_wrote(&mut *self.dsp, 0);
        }
    }

    /// Pull the next ready analysis block. Returns false when none is ready.
    pub fn blockout(&mut self) -> Result<bool, EncodeError> {
        let status = unsafe { vorbis_analysis_blockout(&mut *self.dsp, &mut *self.block) };
        check(status, EncodeError::Analysis).map(|s| s > 0)
    }

    /// Run analysis and bitrate management on the current block.
    pub fn analyze_block(&mut self) -> Result<(), EncodeError> {
        unsafe {
            check(vorbis_analysis(&mut *self.block, ptr::null_mut()), EncodeError::Analysis)?;
            check(vorbis_bitrate_addblock(&mut *self.block), EncodeError::Analysis)?;
        }
        Ok(())
    }

    /// Pull the next compressed packet into `packet`. Returns false when
    /// no packet is ready.
    pub fn flush_packet(&mut self, packet: &mut ogg_packet) -> Result<bool, EncodeError> {
        let status = unsafe { vorbis_bitrate_flushpacket(&mut *self.dsp, packet) };
        check(status, EncodeError::Packet).map(|s| s > 0)
    }

    /// Release all sub-states in dependency order. Safe to call repeatedly.
    pub fn clear(&mut self) {
        unsafe {
            if self.live & BLOCK != 0 {
                vorbis_block_clear(&mut *self.block);
            }
            if self.live & DSP != 0 {
                vorbis_dsp_clear(&mut *self.dsp);
            }
            if self.live & COMMENT != 0 {
                vorbis_comment_clear(&mut *self.comment);
            }
            if self.live & INFO != 0 {
                vorbis_info_clear(&mut *self.info);
            }
        }
        self.live = 0;
    }

    pub fn is_cleared(&self) -> bool {
        self.live == 0
    }
}

impl Drop for VorbisCodec {
    fn drop(&mut self) {
        self.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_channels() {
        assert!(matches!(
            VorbisCodec::new(0, 44100, 0.5),
            Err(EncodeError::CodecInit(OV_EINVAL))
        ));
    }

    #[test]
    fn rejects_zero_rate() {
        assert!(matches!(
            VorbisCodec::new(2, 0, 0.5),
            Err(EncodeError::CodecInit(_))
        ));
    }

    #[test]
    fn rejects_quality_out_of_range() {
        assert!(VorbisCodec::new(1, 44100, 1.5).is_err());
        assert!(VorbisCodec::new(1, 44100, -0.1).is_err());
    }

    #[test]
    fn headers_are_ident_comment_setup() {
        let mut codec = VorbisCodec::new(2, 44100, 0.5).unwrap();
        codec.add_comment("ENCODER", "test");
        let packets = codec.header_packets().unwrap();
        let first = |p: &ogg_packet| unsafe { *p.packet };
        assert_eq!(first(&packets[0]), 0x01);
        assert_eq!(first(&packets[1]), 0x03);
        assert_eq!(first(&packets[2]), 0x05);
        assert_eq!(packets[0].b_o_s, 1);
    }

    #[test]
    fn clear_is_idempotent() {
        let mut codec = VorbisCodec::new(1, 22050, 0.1).unwrap();
        assert!(!codec.is_cleared());
        codec.clear();
        assert!(codec.is_cleared());
        codec.clear();
        assert!(codec.is_cleared());
    }
}
