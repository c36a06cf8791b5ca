//! Protocol codec
//!
//! Encoding and decoding functions for the line-delimited JSON protocol.
//!
//! ## Wire Format
//! ```text
//! ┌──────────────────────────────────────────────┬──────┐
//! │ one JSON object (no embedded newlines)       │ \n   │
//! └──────────────────────────────────────────────┴──────┘
//! ```
//!
//! There is no resynchronisation scheme: a line that does not decode is a
//! fatal protocol violation.

use std::io::{BufRead, Write};

use super::{Request, Response};
use crate::error::{AgentError, Result};

// =============================================================================
// Request Encoding/Decoding
// =============================================================================

/// Decode one request line (without its terminator)
///
/// Only the JSON itself is checked here; whether a transfer carries its
/// `oid` and `size` is up to the dispatcher.
pub fn decode_request(line: &str) -> Result<Request> {
    serde_json::from_str(line)
        .map_err(|e| AgentError::ProtocolDecode(format!("invalid request line: {}", e)))
}

/// Encode a request as one line, terminator included
pub fn encode_request(request: &Request) -> Result<String> {
    let mut line = serde_json::to_string(request)
        .map_err(|e| AgentError::ResponseEncode(e.to_string()))?;
    line.push('\n');
    Ok(line)
}

// =============================================================================
// Response Encoding/Decoding
// =============================================================================

/// Encode a response as one line, terminator included
pub fn encode_response(response: &Response) -> Result<Vec<u8>> {
    let mut line =
        serde_json::to_vec(response).map_err(|e| AgentError::ResponseEncode(e.to_string()))?;
    line.push(b'\n');
    Ok(line)
}

/// Decode one response line (without its terminator)
pub fn decode_response(line: &str) -> Result<Response> {
    serde_json::from_str(line)
        .map_err(|e| AgentError::ProtocolDecode(format!("invalid response line: {}", e)))
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read the next request from a stream
///
/// Returns `Ok(None)` at end of input. A trailing `\r\n` or `\n` is stripped
/// before decoding; an empty line is malformed.
pub fn read_request<R: BufRead>(reader: &mut R) -> Result<Option<Request>> {
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Ok(None);
    }

    let line = line.strip_suffix('\n').unwrap_or(&line);
    let line = line.strip_suffix('\r').unwrap_or(line);

    decode_request(line).map(Some)
}

/// Write a response to a stream and flush it
///
/// The whole line goes out in a single `write_all`, so lines never interleave.
pub fn write_response<W: Write>(writer: &mut W, response: &Response) -> Result<()> {
    let bytes = encode_response(response)?;
    writer
        .write_all(&bytes)
        .and_then(|_| writer.flush())
        .map_err(|e| AgentError::ResponseEncode(e.to_string()))
}
