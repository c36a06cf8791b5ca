//! Storage Module
//!
//! The object-storage collaborator behind a narrow interface.
//!
//! ## Responsibilities
//! - Move a whole object between a local stream and a remote key
//! - Split transfers into fixed-size parts
//! - Hide any internal parallelism from the caller
//!
//! The agent drives exactly one transfer at a time; whatever worker threads a
//! store uses internally stay behind `upload` / `download`, which block until
//! the object has been fully moved.
//!
//! ## Backends
//! ```text
//! ┌───────────────────┐     ┌───────────────────────────────┐
//! │  StoreConnector   │────▶│  Box<dyn ObjectStore>         │
//! └───────────────────┘     │   ├── S3Store    (HTTP, SigV4)│
//!                           │   └── MemoryStore (in-process)│
//!                           └───────────────────────────────┘
//! ```

pub mod memory;
pub mod s3;

use std::io::{self, Read};

use crate::config::Config;
use crate::error::Result;
use crate::progress::WriteAt;

pub use memory::MemoryStore;
pub use s3::{S3Connector, S3Store};

/// Remote object storage, keyed by string
pub trait ObjectStore {
    /// Store everything readable from `body` under `key`
    ///
    /// `body` is read sequentially on the calling thread. Returns the number
    /// of bytes stored.
    fn upload(&self, key: &str, body: &mut dyn Read) -> Result<u64>;

    /// Fetch `key` into `dest`, one positional write per part
    ///
    /// Writes happen on the calling thread. Returns the object size.
    fn download(&self, key: &str, dest: &mut dyn WriteAt) -> Result<u64>;
}

/// Builds an [`ObjectStore`] from the agent configuration
pub trait StoreConnector {
    fn connect(&self, config: &Config) -> Result<Box<dyn ObjectStore>>;
}

/// Part size and worker counts for a store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferOptions {
    /// Bytes per ranged GET / multipart part
    pub part_size: usize,
    pub download_concurrency: usize,
    pub upload_concurrency: usize,
}

impl TransferOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            part_size: config.part_size.max(1),
            download_concurrency: config.download_concurrency.max(1),
            upload_concurrency: config.upload_concurrency.max(1),
        }
    }
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Read up to `limit` bytes, stopping early only at end of input
pub(crate) fn read_part(reader: &mut dyn Read, limit: usize) -> io::Result<Vec<u8>> {
    let mut part = Vec::with_capacity(limit);
    reader.take(limit as u64).read_to_end(&mut part)?;
    Ok(part)
}
