//! Consumed/examined watermarks over received bytes.
//!
//! A parser never owns the input. It is handed a [`BufferView`] over whatever
//! the connection has buffered so far and reports back two positions:
//!
//! - `consumed`: bytes that belong to fully parsed elements and may be dropped
//! - `examined`: bytes the parser has looked at, even if it could not use them
//!
//! The connection drops the consumed prefix and remembers the examined offset,
//! so the next scan resumes where the previous one gave up instead of starting
//! over from the first unconsumed byte.

use bytes::{Buf, BytesMut};

/// A window over buffered input with `0 <= consumed <= examined <= len`.
#[derive(Debug)]
pub struct BufferView<'a> {
    buf: &'a [u8],
    consumed: usize,
    examined: usize,
}

impl<'a> BufferView<'a> {
    /// Creates a view over `buf`, resuming scans at `examined`.
    ///
    /// `examined` is clamped to the buffer length.
    pub fn new(buf: &'a [u8], examined: usize) -> Self {
        Self {
            buf,
            consumed: 0,
            examined: examined.min(buf.len()),
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn consumed(&self) -> usize {
        self.consumed
    }

    pub fn examined(&self) -> usize {
        self.examined
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> &'a [u8] {
        &self.buf[self.consumed..]
    }

    /// Finds the next LF at or after the consumed position.
    ///
    /// Bytes below the examined watermark are known to hold no LF, so the scan
    /// starts there. On a miss, everything is marked examined. Returns the
    /// index of the LF relative to [`remaining`](Self::remaining).
    pub fn find_line_end(&mut self) -> Option<usize> {
        let from = self.examined.max(self.consumed);
        match self.buf[from..].iter().position(|&b| b == b'\n') {
            Some(i) => Some(from + i - self.consumed),
            None => {
                self.examined = self.buf.len();
                None
            }
        }
    }

    /// Marks `n` more bytes as consumed.
    ///
    /// # Panics
    ///
    /// Panics if `n` goes past the end of the view.
    pub fn consume(&mut self, n: usize) {
        assert!(self.consumed + n <= self.buf.len(), "consumed past end of view");
        self.consumed += n;
        if self.examined < self.consumed {
            self.examined = self.consumed;
        }
    }

    /// Marks everything as examined without consuming it.
    pub fn examine_all(&mut self) {
        self.examined = self.buf.len();
    }
}

/// Connection input: a growable buffer plus the examined watermark carried
/// between reads.
#[derive(Debug)]
pub struct InputBuffer {
    buf: BytesMut,
    examined: usize,
}

impl InputBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
            examined: 0,
        }
    }

    /// A fresh view over every buffered byte.
    pub fn view(&self) -> BufferView<'_> {
        BufferView::new(&self.buf, self.examined)
    }

    /// Drops `consumed` bytes and keeps the rest of `examined` for the next scan.
    pub fn advance_to(&mut self, consumed: usize, examined: usize) {
        debug_assert!(consumed <= examined && examined <= self.buf.len());
        self.buf.advance(consumed);
        self.examined = examined - consumed;
    }

    /// Unconsumed bytes not yet looked at by any parser.
    pub fn unexamined(&self) -> usize {
        self.buf.len() - self.examined
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Appends bytes, as a transport read would.
    pub fn extend_from_slice(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Spare capacity target for the next read.
    pub fn reserve(&mut self, additional: usize) {
        self.buf.reserve(additional);
    }

    pub(crate) fn inner_mut(&mut self) -> &mut BytesMut {
        &mut self.buf
    }
}
