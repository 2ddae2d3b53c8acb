//! Ogg container layer.
//!
//! Packets go in through [`OggContainerWriter::packet_in`]; finished pages are
//! serialised header then body to the output sink.

use std::io::Write;
use std::mem;
use std::os::raw::c_int;
use std::slice;

use ogg_next_sys::{
    ogg_packet, ogg_page, ogg_page_eos, ogg_stream_check, ogg_stream_clear, ogg_stream_flush,
    ogg_stream_init, ogg_stream_packetin, ogg_stream_pageout, ogg_stream_state,
};

use crate::error::{check, EncodeError};

/// Owned `ogg_stream_state`.
struct OggStream {
    state: Box<ogg_stream_state>,
    live: bool,
}

impl OggStream {
    fn new(serial: i32) -> Result<Self, EncodeError> {
        // SAFETY: zeroed is the expected pre-init state.
        let mut state: Box<ogg_stream_state> = Box::new(unsafe { mem::zeroed() });
        check(
            unsafe { ogg_stream_init(&mut *state, serial as c_int) },
            EncodeError::CodecInit,
        )?;
        Ok(Self { state, live: true })
    }

    fn clear(&mut self) {
        if self.live {
            unsafe {
                ogg_stream_clear(&mut *self.state);
            }
            self.live = false;
        }
    }
}

impl Drop for OggStream {
    fn drop(&mut self) {
        self.clear();
    }
}

/// Counters for what has reached the sink.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ContainerStats {
    pub pages: u64,
    pub bytes: u64,
    pub eos: bool,
}

/// Packs codec packets into Ogg pages and writes them to `W`.
pub struct OggContainerWriter<W: Write> {
    stream: OggStream,
    page: ogg_page,
    sink: W,
    stats: ContainerStats,
}

// The page only points into `stream`, which moves with the writer.
unsafe impl<W: Write + Send> Send for OggContainerWriter<W> {}

impl<W: Write> OggContainerWriter<W> {
    pub fn new(serial: i32, sink: W) -> Result<Self, EncodeError> {
        Ok(Self {
            stream: OggStream::new(serial)?,
            // SAFETY: filled by pageout/flush before any read.
            page: unsafe { mem::zeroed() },
            sink,
            stats: ContainerStats::default(),
        })
    }

    /// Queue one packet for paging.
    pub fn packet_in(&mut self, packet: &mut ogg_packet) -> Result<(), EncodeError> {
        if !self.stream.live {
            return Err(EncodeError::AlreadyFinalized);
        }
        check(
            unsafe { ogg_stream_packetin(&mut *self.stream.state, packet) },
            EncodeError::Packet,
        )?;
        Ok(())
    }

    /// Write every page libogg considers complete. Stops after the
    /// end-of-stream page.
    pub fn write_ready_pages(&mut self) -> Result<(), EncodeError> {
        while self.stream.live && !self.stats.eos {
            let ready = unsafe { ogg_stream_pageout(&mut *self.stream.state, &mut self.page) };
            if ready == 0 {
                let status = unsafe { ogg_stream_check(&mut *self.stream.state) };
                if status != 0 {
                    return Err(EncodeError::Page(status));
                }
                break;
            }
            self.write_page()?;
        }
        Ok(())
    }

    /// Force out all queued packets, even if the page is not full.
    pub fn flush(&mut self) -> Result<(), EncodeError> {
        while self.stream.live
            && unsafe { ogg_stream_flush(&mut *self.stream.state, &mut self.page) } != 0 {
            self.write_page()?;
        }
        Ok(())
    }

    fn write_page(&mut self) -> Result<(), EncodeError> {
        let header = unsafe { page_part(self.page.header, self.page.header_len) };
        let body = unsafe { page_part(self.page.body, self.page.body_len) };
        self.sink.write_all(header)?;
        self.sink.write_all(body)?;

        self.stats.pages += 1;
        self.stats.bytes += (header.len() + body.len()) as u64;
        if unsafe { ogg_page_eos(&self.page) } != 0 {
            self.stats.eos = true;
        }
        Ok(())
    }

    /// Release the stream state. Further packets are rejected.
    pub fn clear(&mut self) {
        self.stream.clear();
    }

    pub fn stats(&self) -> ContainerStats {
        self.stats
    }

    pub fn sink_mut(&mut self) -> &mut W {
        &mut self.sink
    }

    pub fn into_sink(mut self) -> W {
        self.stream.clear();
        self.sink
    }
}

/// View of a page segment. libogg leaves empty segments with a null pointer.
unsafe fn page_part<'a>(ptr: *const u8, len: std::os::raw::c_long) -> &'a [u8] {
    if ptr.is_null() || len <= 0 {
        &[]
    } else {
        slice::from_raw_parts(ptr, len as usize)
    }
}
