//! Response sink
//!
//! The single output stream shared by progress events and terminal
//! responses.

use std::io::Write;
use std::path::PathBuf;

use super::{write_response, ErrorBody, Response};
use crate::error::{AgentError, Result};

/// Serialises responses onto the peer-facing stream, one flushed line each
pub struct ResponseSink<W: Write> {
    writer: W,

    /// Number of lines successfully written
    lines_sent: u64,
}

impl<W: Write> ResponseSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            lines_sent: 0,
        }
    }

    /// Write one response line and flush
    pub fn send(&mut self, response: &Response) -> Result<()> {
        write_response(&mut self.writer, response)?;
        self.lines_sent += 1;
        Ok(())
    }

    pub fn send_progress(&mut self, oid: &str, bytes_so_far: u64, bytes_since_last: u64) -> Result<()> {
        self.send(&Response::progress(oid, bytes_so_far, bytes_since_last))
    }

    pub fn send_complete(&mut self, oid: &str, path: Option<PathBuf>) -> Result<()> {
        self.send(&Response::complete(oid, path))
    }

    /// Report a failed transfer with an error-bearing `complete`
    pub fn send_failure(&mut self, oid: &str, err: &AgentError) -> Result<()> {
        self.send(&Response::failed(oid, ErrorBody::from(err)))
    }

    pub fn lines_sent(&self) -> u64 {
        self.lines_sent
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}
