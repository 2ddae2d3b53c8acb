//! Single-producer single-consumer byte ring between the decode worker and
//! the device callback.
//!
//! Storage and cursors are a `ringbuf` heap ring. On top of it both ends
//! share three monotonic byte counts: bytes written, bytes consumed, and a
//! discard mark. [`RingWriter::clear`] only moves the discard mark; the
//! reader drops everything below it on its next [`RingReader::read_region`].
//! The writer therefore never gets back space the reader has not skipped
//! past, and a reset cannot overlap a read in flight.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};

#[derive(Default)]
struct Marks {
    written: AtomicUsize,
    consumed: AtomicUsize,
    discard_to: AtomicUsize,
}

impl Marks {
    /// Bytes readable after discarding, i.e. what playback will still hear.
    fn fill(&self) -> usize {
        let consumed = self.consumed.load(Ordering::Acquire);
        let discard_to = self.discard_to.load(Ordering::Acquire);
        let written = self.written.load(Ordering::Acquire);
        written.saturating_sub(consumed.max(discard_to))
    }

    /// Bytes the writer may push now. Discarded bytes still occupy storage
    /// until the reader skips them.
    fn free(&self, capacity: usize) -> usize {
        let consumed = self.consumed.load(Ordering::Acquire);
        let written = self.written.load(Ordering::Acquire);
        capacity - written.saturating_sub(consumed).min(capacity)
    }
}

/// Create a ring of `capacity` bytes and split it into its two ends.
///
/// # Panics
/// If `capacity` is zero.
pub fn ring_buffer(capacity: usize) -> (RingWriter, RingReader) {
    assert!(capacity > 0, "ring capacity must be non-zero");
    let (producer, consumer) = HeapRb::<u8>::new(capacity).split();
    let marks = Arc::new(Marks::default());
    (
        RingWriter {
            inner: producer,
            marks: Arc::clone(&marks),
            capacity,
        },
        RingReader {
            inner: consumer,
            marks,
            capacity,
        },
    )
}

/// Producer end.
pub struct RingWriter {
    inner: HeapProd<u8>,
    marks: Arc<Marks>,
    capacity: usize,
}

impl RingWriter {
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn fill_len(&self) -> usize {
        self.marks.fill()
    }

    pub fn free_len(&self) -> usize {
        self.marks.free(self.capacity)
    }

    /// Append as much of `data` as fits. Returns bytes written.
    pub fn push(&mut self, data: &[u8]) -> usize {
        let n = self.inner.push_slice(data);
        self.marks.written.fetch_add(n, Ordering::Release);
        n
    }

    /// Drop everything written so far. The reader skips it before its next
    /// read; bytes pushed after this call are kept.
    pub fn clear(&mut self) {
        let written = self.marks.written.load(Ordering::Relaxed);
        self.marks.discard_to.store(written, Ordering::Release);
    }
}

/// Consumer end.
pub struct RingReader {
    inner: HeapCons<u8>,
    marks: Arc<Marks>,
    capacity: usize,
}

impl RingReader {
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn fill_len(&self) -> usize {
        self.marks.fill()
    }

    pub fn free_len(&self) -> usize {
        self.marks.free(self.capacity)
    }

    /// Contiguous filled bytes starting at the read position. Bytes behind
    /// a pending [`RingWriter::clear`] are skipped first.
    pub fn read_region(&mut self) -> &[u8] {
        self.skip_discarded();
        self.inner.as_slices().0
    }

    /// Mark `n` bytes from the last [`read_region`] as consumed.
    ///
    /// [`read_region`]: RingReader::read_region
    pub fn release(&mut self, n: usize) {
        let n = self.inner.skip(n);
        self.marks.consumed.fetch_add(n, Ordering::Release);
    }

    fn skip_discarded(&mut self) {
        let discard_to = self.marks.discard_to.load(Ordering::Acquire);
        let consumed = self.marks.consumed.load(Ordering::Relaxed);
        if discard_to > consumed {
            let n = self.inner.skip(discard_to - consumed);
            self.marks.consumed.fetch_add(n, Ordering::Release);
        }
    }
}
