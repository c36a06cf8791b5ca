//! Transfer Operations
//!
//! Moves one object between the local cache and the remote store.
//!
//! ## Download
//! 1. Validate the oid and derive the cache path
//! 2. Create (truncate) the cache file
//! 3. Wrap it in a [`ProgressTracker`] and let the store write into it
//! 4. Flush + sync the file, then send `complete` with the path
//!
//! ## Upload
//! 1. Validate the oid and derive the cache path
//! 2. Open the existing cache file
//! 3. Wrap it in a [`ProgressTracker`] and let the store read from it
//! 4. Send `complete` without a path
//!
//! Errors are returned to the caller, which decides whether the peer hears
//! about them. Nothing is sent to the peer for a failed transfer from here.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::cache;
use crate::config::Config;
use crate::error::{AgentError, Result};
use crate::progress::{OffsetWriter, ProgressTracker};
use crate::protocol::ResponseSink;
use crate::storage::ObjectStore;

/// Direction of a transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferKind {
    Download,
    Upload,
}

impl std::fmt::Display for TransferKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransferKind::Download => f.write_str("download"),
            TransferKind::Upload => f.write_str("upload"),
        }
    }
}

/// Result of a successful transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferOutcome {
    pub bytes: u64,

    /// Cache file that was written (downloads) or read (uploads)
    pub path: PathBuf,
}

/// Runs transfers against one store with one configuration
pub struct Transfers<'a> {
    config: &'a Config,
    store: &'a dyn ObjectStore,
}

impl<'a> Transfers<'a> {
    pub fn new(config: &'a Config, store: &'a dyn ObjectStore) -> Self {
        Self { config, store }
    }

    /// Run a transfer of either kind
    pub fn run<W: Write>(
        &self,
        kind: TransferKind,
        oid: &str,
        size: u64,
        sink: &mut ResponseSink<W>,
    ) -> Result<TransferOutcome> {
        match kind {
            TransferKind::Download => self.download(oid, size, sink),
            TransferKind::Upload => self.upload(oid, size, sink),
        }
    }

    /// Fetch `oid` from the store into the local cache
    pub fn download<W: Write>(
        &self,
        oid: &str,
        size: u64,
        sink: &mut ResponseSink<W>,
    ) -> Result<TransferOutcome> {
        let path = cache::cache_path(&self.config.lfs_root, oid)?;
        let file = File::create(&path).map_err(|e| AgentError::local_io(&path, e))?;

        let mut tracker = ProgressTracker::new(OffsetWriter::new(file), oid, size, sink);
        let fetched = self.store.download(cache::remote_key(oid), &mut tracker);
        let written = tracker.bytes_so_far();
        let mut file = tracker.into_inner().into_inner();

        if let Err(e) = fetched {
            drop(file);
            discard_partial(&path);
            return Err(with_local_path(e, &path));
        }

        file.flush()
            .and_then(|_| file.sync_all())
            .map_err(|e| AgentError::local_io(&path, e))?;
        drop(file);

        check_size(oid, size, written);

        // Best effort: the object is on disk even if the peer misses this line.
        if let Err(e) = sink.send_complete(oid, Some(path.clone())) {
            tracing::error!("Unable to send completion message for {}: {}", oid, e);
        }

        Ok(TransferOutcome {
            bytes: written,
            path,
        })
    }

    /// Send `oid` from the local cache to the store
    pub fn upload<W: Write>(
        &self,
        oid: &str,
        size: u64,
        sink: &mut ResponseSink<W>,
    ) -> Result<TransferOutcome> {
        let path = cache::cache_path(&self.config.lfs_root, oid)?;
        let file = File::open(&path).map_err(|e| AgentError::local_io(&path, e))?;

        let mut tracker = ProgressTracker::new(file, oid, size, sink);
        let stored = self.store.upload(cache::remote_key(oid), &mut tracker);
        let read = tracker.bytes_so_far();
        drop(tracker);

        stored.map_err(|e| with_local_path(e, &path))?;
        check_size(oid, size, read);

        if let Err(e) = sink.send_complete(oid, None) {
            tracing::error!("Unable to send completion message for {}: {}", oid, e);
        }

        Ok(TransferOutcome { bytes: read, path })
    }
}

/// Plain I/O errors surfacing from the store came from the local file
fn with_local_path(err: AgentError, path: &Path) -> AgentError {
    match err {
        AgentError::Io(source) => AgentError::local_io(path, source),
        other => other,
    }
}

fn discard_partial(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => tracing::debug!("Removed partial download {}", path.display()),
        Err(e) => tracing::warn!("Unable to remove partial download {}: {}", path.display(), e),
    }
}

fn check_size(oid: &str, expected: u64, actual: u64) {
    if expected != actual {
        tracing::warn!(
            "Size mismatch for {}: expected {} bytes, transferred {}",
            oid,
            expected,
            actual
        );
    }
}
