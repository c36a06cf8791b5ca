//! # lfs-s3
//!
//! A Git LFS custom transfer agent backed by S3-compatible object storage:
//! - Line-delimited JSON protocol on stdin/stdout
//! - Progress events for every chunk that moves
//! - Sharded local object cache (`ab/cd/abcdef...`)
//! - Ranged downloads and multipart uploads
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       stdin (requests)                       │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                  Agent (event loop)                          │
//! │          init / download / upload / terminate                │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │  Transfers  │─────────▶│ ObjectStore │
//!   │ (cache file)│ Progress │ (S3 / mem)  │
//!   └──────┬──────┘ Tracker  └─────────────┘
//!          │
//!          ▼
//!   ┌─────────────┐
//!   │ ResponseSink│──────────▶ stdout (responses)
//!   └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod protocol;
pub mod progress;
pub mod cache;
pub mod storage;
pub mod transfer;
pub mod agent;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{AgentError, Result};
pub use config::Config;
pub use agent::{Agent, AgentState, ServeOutcome};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of lfs-s3
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
