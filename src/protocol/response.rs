//! Response definitions
//!
//! Represents responses written back to the Git LFS client. Each value
//! corresponds to exactly one protocol line.

use std::path::PathBuf;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::AgentError;

/// Structured error carried by init and complete responses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: i32,
    pub message: String,
}

impl ErrorBody {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<&AgentError> for ErrorBody {
    fn from(err: &AgentError) -> Self {
        Self::new(err.code(), err.to_string())
    }
}

/// Reply to `init`: `{}` on success
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

/// Emitted while bytes flow for a transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressResponse {
    pub oid: String,
    pub bytes_so_far: u64,
    pub bytes_since_last: u64,
}

/// Terminal response for a transfer (`event: complete`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferResponse {
    pub oid: String,

    /// Local path of the downloaded object
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

/// Any response the agent can emit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Init(InitResponse),
    Progress(ProgressResponse),
    Transfer(TransferResponse),
}

impl Response {
    /// Successful init
    pub fn init_ok() -> Self {
        Response::Init(InitResponse::default())
    }

    /// Failed init
    pub fn init_error(code: i32, message: impl Into<String>) -> Self {
        Response::Init(InitResponse {
            error: Some(ErrorBody::new(code, message)),
        })
    }

    pub fn progress(oid: impl Into<String>, bytes_so_far: u64, bytes_since_last: u64) -> Self {
        Response::Progress(ProgressResponse {
            oid: oid.into(),
            bytes_so_far,
            bytes_since_last,
        })
    }

    /// Successful transfer, with the local path for downloads
    pub fn complete(oid: impl Into<String>, path: Option<PathBuf>) -> Self {
        Response::Transfer(TransferResponse {
            oid: oid.into(),
            path,
            error: None,
        })
    }

    /// Failed transfer
    pub fn failed(oid: impl Into<String>, error: ErrorBody) -> Self {
        Response::Transfer(TransferResponse {
            oid: oid.into(),
            path: None,
            error: Some(error),
        })
    }
}

// =============================================================================
// Wire representation
// =============================================================================

#[derive(Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
enum TaggedRef<'a> {
    Progress(&'a ProgressResponse),
    Complete(&'a TransferResponse),
}

#[derive(Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
enum Tagged {
    Progress(ProgressResponse),
    Complete(TransferResponse),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Wire {
    Tagged(Tagged),
    Init(InitResponse),
}

impl Serialize for Response {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Response::Init(init) => init.serialize(serializer),
            Response::Progress(progress) => TaggedRef::Progress(progress).serialize(serializer),
            Response::Transfer(transfer) => TaggedRef::Complete(transfer).serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Response {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Ok(match Wire::deserialize(deserializer)? {
            Wire::Tagged(Tagged::Progress(progress)) => Response::Progress(progress),
            Wire::Tagged(Tagged::Complete(transfer)) => Response::Transfer(transfer),
            Wire::Init(init) => Response::Init(init),
        })
    }
}
