//! Tests for the progress tracker
//!
//! These tests verify:
//! - Bytes pass through reads and positional writes unchanged
//! - One progress line per non-empty call, with a running total
//! - Underlying errors are returned without emitting progress
//! - OffsetWriter seeks only when needed

use std::io::{self, Cursor, Read};

use lfs_s3::progress::{OffsetWriter, ProgressTracker, WriteAt};
use lfs_s3::protocol::{decode_response, Response, ResponseSink};

// =============================================================================
// Helper Functions
// =============================================================================

const OID: &str = "abcdef0123456789";

/// Decode every progress line written to the sink as (bytesSoFar, bytesSinceLast)
fn progress_events(sink: ResponseSink<Vec<u8>>) -> Vec<(u64, u64)> {
    let text = String::from_utf8(sink.into_inner()).unwrap();
    text.lines()
        .map(|line| match decode_response(line).unwrap() {
            Response::Progress(p) => {
                assert_eq!(p.oid, OID);
                (p.bytes_so_far, p.bytes_since_last)
            }
            other => panic!("Expected progress, got {:?}", other),
        })
        .collect()
}

/// Reader that hands out at most `chunk` bytes per call
struct Chunked<R> {
    inner: R,
    chunk: usize,
}

impl<R: Read> Read for Chunked<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let len = buf.len().min(self.chunk);
        self.inner.read(&mut buf[..len])
    }
}

/// Reader that fails after `good` bytes
struct FailingReader {
    good: usize,
}

impl Read for FailingReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.good == 0 {
            return Err(io::Error::new(io::ErrorKind::Other, "disk on fire"));
        }
        let n = buf.len().min(self.good);
        buf[..n].fill(7);
        self.good -= n;
        Ok(n)
    }
}

/// Destination that rejects every write
struct RejectingWriter;

impl WriteAt for RejectingWriter {
    fn write_at(&mut self, _buf: &[u8], _offset: u64) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"))
    }
}

// =============================================================================
// Read Tests
// =============================================================================

#[test]
fn test_read_passes_bytes_through() {
    let data: Vec<u8> = (0..=255).cycle().take(10_000).collect();
    let mut sink = ResponseSink::new(Vec::new());

    let mut out = Vec::new();
    {
        let source = Chunked { inner: Cursor::new(data.clone()), chunk: 1000 };
        let mut tracker = ProgressTracker::new(source, OID, data.len() as u64, &mut sink);
        tracker.read_to_end(&mut out).unwrap();
        assert_eq!(tracker.bytes_so_far(), data.len() as u64);
    }

    assert_eq!(out, data);
}

#[test]
fn test_read_progress_sums_to_total() {
    let data = vec![1u8; 4321];
    let mut sink = ResponseSink::new(Vec::new());

    {
        let source = Chunked { inner: Cursor::new(data.clone()), chunk: 1000 };
        let mut tracker = ProgressTracker::new(source, OID, 4321, &mut sink);
        io::copy(&mut tracker, &mut io::sink()).unwrap();
    }

    let events = progress_events(sink);
    assert_eq!(events.len(), 5);
    assert_eq!(events.iter().map(|(_, since)| since).sum::<u64>(), 4321);
    assert_eq!(events.last().unwrap().0, 4321);

    // Running total is monotonic and consistent with the increments
    let mut total = 0;
    for (so_far, since) in events {
        total += since;
        assert_eq!(so_far, total);
    }
}

#[test]
fn test_read_eof_emits_nothing() {
    let mut sink = ResponseSink::new(Vec::new());
    {
        let mut tracker = ProgressTracker::new(Cursor::new(Vec::new()), OID, 0, &mut sink);
        let mut buf = [0u8; 16];
        assert_eq!(tracker.read(&mut buf).unwrap(), 0);
    }
    assert_eq!(sink.lines_sent(), 0);
}

#[test]
fn test_read_error_is_returned_without_progress() {
    let mut sink = ResponseSink::new(Vec::new());
    {
        let mut tracker = ProgressTracker::new(FailingReader { good: 10 }, OID, 100, &mut sink);
        let mut buf = [0u8; 64];
        assert_eq!(tracker.read(&mut buf).unwrap(), 10);

        let err = tracker.read(&mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Other);
        assert_eq!(err.to_string(), "disk on fire");
        assert_eq!(tracker.bytes_so_far(), 10);
    }
    assert_eq!(progress_events(sink), vec![(10, 10)]);
}

// =============================================================================
// WriteAt Tests
// =============================================================================

#[test]
fn test_write_at_passes_bytes_through() {
    let mut sink = ResponseSink::new(Vec::new());
    let dest = OffsetWriter::new(Cursor::new(Vec::new()));

    let mut tracker = ProgressTracker::new(dest, OID, 12, &mut sink);
    tracker.write_all_at(b"hello ", 0).unwrap();
    tracker.write_all_at(b"world!", 6).unwrap();
    let written = tracker.into_inner().into_inner().into_inner();

    assert_eq!(written, b"hello world!");
    assert_eq!(progress_events(sink), vec![(6, 6), (12, 6)]);
}

#[test]
fn test_write_at_out_of_order_offsets() {
    let mut sink = ResponseSink::new(Vec::new());
    let dest = OffsetWriter::new(Cursor::new(Vec::new()));

    let mut tracker = ProgressTracker::new(dest, OID, 8, &mut sink);
    tracker.write_all_at(b"5678", 4).unwrap();
    tracker.write_all_at(b"1234", 0).unwrap();
    let written = tracker.into_inner().into_inner().into_inner();

    assert_eq!(written, b"12345678");
    assert_eq!(progress_events(sink), vec![(4, 4), (8, 4)]);
}

#[test]
fn test_write_at_error_is_returned_without_progress() {
    let mut sink = ResponseSink::new(Vec::new());
    {
        let mut tracker = ProgressTracker::new(RejectingWriter, OID, 4, &mut sink);
        let err = tracker.write_at(b"data", 0).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
        assert_eq!(tracker.bytes_so_far(), 0);
    }
    assert_eq!(sink.lines_sent(), 0);
}

#[test]
fn test_empty_write_emits_nothing() {
    let mut sink = ResponseSink::new(Vec::new());
    {
        let dest = OffsetWriter::new(Cursor::new(Vec::new()));
        let mut tracker = ProgressTracker::new(dest, OID, 0, &mut sink);
        assert_eq!(tracker.write_at(&[], 0).unwrap(), 0);
    }
    assert_eq!(sink.lines_sent(), 0);
}

#[test]
fn test_progress_sink_failure_does_not_fail_transfer() {
    struct ClosedPipe;
    impl io::Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    let mut sink = ResponseSink::new(ClosedPipe);
    let mut tracker = ProgressTracker::new(Cursor::new(vec![9u8; 32]), OID, 32, &mut sink);
    let mut out = Vec::new();
    tracker.read_to_end(&mut out).unwrap();

    assert_eq!(out.len(), 32);
    assert_eq!(tracker.bytes_so_far(), 32);
}

// =============================================================================
// OffsetWriter Tests
// =============================================================================

#[test]
fn test_offset_writer_sequential_and_gap() {
    let mut writer = OffsetWriter::new(Cursor::new(Vec::new()));
    writer.write_all_at(b"ab", 0).unwrap();
    writer.write_all_at(b"cd", 2).unwrap();
    writer.write_all_at(b"z", 6).unwrap();

    assert_eq!(writer.into_inner().into_inner(), b"abcd\0\0z");
}
