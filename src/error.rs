//! Error types for lfs-s3
//!
//! Provides a unified error type for all operations.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using AgentError
pub type Result<T> = std::result::Result<T, AgentError>;

/// Unified error type for the transfer agent
#[derive(Debug, Error)]
pub enum AgentError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Local cache file could not be opened, created, read, or written
    #[error("local file {}: {source}", path.display())]
    LocalIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // -------------------------------------------------------------------------
    // Protocol Errors
    // -------------------------------------------------------------------------
    #[error("Protocol error: {0}")]
    ProtocolDecode(String),

    #[error("Unable to send response: {0}")]
    ResponseEncode(String),

    #[error("Invalid object id: {0}")]
    InvalidOid(String),

    // -------------------------------------------------------------------------
    // Remote Errors
    // -------------------------------------------------------------------------
    #[error("Remote transfer failed: {0}")]
    RemoteTransfer(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl AgentError {
    /// Build a `LocalIo` error for `path`
    pub fn local_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AgentError::LocalIo {
            path: path.into(),
            source,
        }
    }

    /// Numeric code used when the error is reported to the peer
    pub fn code(&self) -> i32 {
        match self {
            AgentError::Config(_) => 1,
            AgentError::InvalidOid(_) | AgentError::LocalIo { .. } => 2,
            AgentError::RemoteTransfer(_) => 3,
            _ => 4,
        }
    }
}

impl From<reqwest::Error> for AgentError {
    fn from(err: reqwest::Error) -> Self {
        AgentError::RemoteTransfer(err.to_string())
    }
}
