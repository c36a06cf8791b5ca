//! Progress tracking
//!
//! Stream decorators that report every chunk of a transfer to the peer.
//!
//! ## Responsibilities
//! - Forward reads / positional writes to the wrapped stream unchanged
//! - Keep a running byte count for the object
//! - Emit one `progress` line per successful non-empty call
//!
//! Errors from the wrapped stream are returned as-is and never produce a
//! progress event. Back-pressure comes from the sink: if the peer stops
//! draining stdout, the transfer stalls with it.

use std::io::{self, Read, Seek, SeekFrom, Write};

use crate::protocol::ResponseSink;

// =============================================================================
// Positional writes
// =============================================================================

/// A destination that accepts writes at explicit offsets
pub trait WriteAt {
    /// Write up to `buf.len()` bytes at `offset`, returning how many were written
    fn write_at(&mut self, buf: &[u8], offset: u64) -> io::Result<usize>;

    /// Write all of `buf` starting at `offset`
    fn write_all_at(&mut self, mut buf: &[u8], mut offset: u64) -> io::Result<()> {
        while !buf.is_empty() {
            match self.write_at(buf, offset) {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "failed to write whole buffer",
                    ))
                }
                Ok(n) => {
                    buf = &buf[n..];
                    offset += n as u64;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

impl<T: WriteAt + ?Sized> WriteAt for &mut T {
    fn write_at(&mut self, buf: &[u8], offset: u64) -> io::Result<usize> {
        (**self).write_at(buf, offset)
    }
}

/// Adapts a seekable writer (a `File`, a `Cursor`) to [`WriteAt`]
///
/// Only seeks when the requested offset differs from the current position,
/// so sequential parts cost nothing extra.
pub struct OffsetWriter<W> {
    inner: W,
    position: u64,
}

impl<W: Write + Seek> OffsetWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, position: 0 }
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write + Seek> WriteAt for OffsetWriter<W> {
    fn write_at(&mut self, buf: &[u8], offset: u64) -> io::Result<usize> {
        if offset != self.position {
            self.inner.seek(SeekFrom::Start(offset))?;
            self.position = offset;
        }
        let n = self.inner.write(buf)?;
        self.position += n as u64;
        Ok(n)
    }
}

// =============================================================================
// Progress tracker
// =============================================================================

/// Wraps a source ([`Read`]) or destination ([`WriteAt`]) and reports progress
pub struct ProgressTracker<'a, T, W: Write> {
    inner: T,
    oid: String,

    /// Size announced by the peer, for diagnostics only
    expected: u64,

    bytes_so_far: u64,
    sink: &'a mut ResponseSink<W>,
}

impl<'a, T, W: Write> ProgressTracker<'a, T, W> {
    pub fn new(inner: T, oid: impl Into<String>, expected: u64, sink: &'a mut ResponseSink<W>) -> Self {
        Self {
            inner,
            oid: oid.into(),
            expected,
            bytes_so_far: 0,
            sink,
        }
    }

    /// Bytes observed so far
    pub fn bytes_so_far(&self) -> u64 {
        self.bytes_so_far
    }

    pub fn expected(&self) -> u64 {
        self.expected
    }

    pub fn into_inner(self) -> T {
        self.inner
    }

    fn record(&mut self, n: usize) {
        if n == 0 {
            return;
        }
        self.bytes_so_far += n as u64;
        tracing::trace!(
            oid = %self.oid,
            bytes_so_far = self.bytes_so_far,
            expected = self.expected,
            "progress"
        );
        // A lost progress line is not worth failing the transfer over.
        if let Err(e) = self.sink.send_progress(&self.oid, self.bytes_so_far, n as u64) {
            tracing::warn!("Unable to send progress for {}: {}", self.oid, e);
        }
    }
}

impl<T: Read, W: Write> Read for ProgressTracker<'_, T, W> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.record(n);
        Ok(n)
    }
}

impl<T: WriteAt, W: Write> WriteAt for ProgressTracker<'_, T, W> {
    fn write_at(&mut self, buf: &[u8], offset: u64) -> io::Result<usize> {
        let n = self.inner.write_at(buf, offset)?;
        self.record(n);
        Ok(n)
    }
}
