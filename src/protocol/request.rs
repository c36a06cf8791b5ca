//! Request definitions
//!
//! Represents requests sent by the Git LFS client.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Request event types
///
/// Unknown event names are kept verbatim so that they survive a round trip
/// and can be ignored by the dispatcher instead of failing the decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Event {
    Init,
    Download,
    Upload,
    Terminate,
    Other(String),
}

impl Event {
    pub fn as_str(&self) -> &str {
        match self {
            Event::Init => "init",
            Event::Download => "download",
            Event::Upload => "upload",
            Event::Terminate => "terminate",
            Event::Other(name) => name,
        }
    }
}

/// A line without an `event` key decodes as an unnamed event
impl Default for Event {
    fn default() -> Self {
        Event::Other(String::new())
    }
}

impl From<String> for Event {
    fn from(name: String) -> Self {
        match name.as_str() {
            "init" => Event::Init,
            "download" => Event::Download,
            "upload" => Event::Upload,
            "terminate" => Event::Terminate,
            _ => Event::Other(name),
        }
    }
}

impl From<Event> for String {
    fn from(event: Event) -> Self {
        match event {
            Event::Other(name) => name,
            other => other.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded protocol line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    #[serde(default)]
    pub event: Event,

    /// Object id (sha256 hex); required for download/upload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oid: Option<String>,

    /// Object size in bytes; required for download/upload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,

    // -------------------------------------------------------------------------
    // init fields
    // -------------------------------------------------------------------------
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concurrent: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concurrenttransfers: Option<u32>,

    /// Local path supplied with upload requests
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Everything else (e.g. `action`), carried through untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Request {
    /// Create a bare request carrying only an event
    pub fn new(event: Event) -> Self {
        Self {
            event,
            oid: None,
            size: None,
            operation: None,
            remote: None,
            concurrent: None,
            concurrenttransfers: None,
            path: None,
            extra: Map::new(),
        }
    }

    pub fn init() -> Self {
        Self::new(Event::Init)
    }

    pub fn download(oid: impl Into<String>, size: u64) -> Self {
        Self::transfer(Event::Download, oid, size)
    }

    pub fn upload(oid: impl Into<String>, size: u64) -> Self {
        Self::transfer(Event::Upload, oid, size)
    }

    pub fn terminate() -> Self {
        Self::new(Event::Terminate)
    }

    fn transfer(event: Event, oid: impl Into<String>, size: u64) -> Self {
        Self {
            oid: Some(oid.into()),
            size: Some(size),
            ..Self::new(event)
        }
    }

    /// The `(oid, size)` pair of a transfer request
    pub fn target(&self) -> Option<(&str, u64)> {
        Some((self.oid.as_deref()?, self.size?))
    }
}
