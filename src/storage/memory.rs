//! In-process object store
//!
//! Keeps objects in a shared map. Used by the test suite and benches, and
//! handy when embedding the agent without a remote.

use std::collections::HashMap;
use std::io::Read;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::RwLock;

use super::{read_part, ObjectStore, StoreConnector};
use crate::config::{Config, DEFAULT_PART_SIZE};
use crate::error::{AgentError, Result};
use crate::progress::WriteAt;

/// Object store backed by a `HashMap`
///
/// Clones share the same objects and counters.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    objects: Arc<RwLock<HashMap<String, Bytes>>>,

    /// Bytes per positional write on download / per read on upload
    part_size: usize,

    /// Number of upload/download calls that reached the store
    calls: Arc<AtomicUsize>,

    /// When set, every call fails with a remote error
    failing: Arc<AtomicBool>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_PART_SIZE)
    }
}

impl MemoryStore {
    pub fn new(part_size: usize) -> Self {
        Self {
            objects: Arc::new(RwLock::new(HashMap::new())),
            part_size: part_size.max(1),
            calls: Arc::new(AtomicUsize::new(0)),
            failing: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn insert(&self, key: impl Into<String>, data: impl Into<Bytes>) {
        self.objects.write().insert(key.into(), data.into());
    }

    pub fn get(&self, key: &str) -> Option<Bytes> {
        self.objects.read().get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }

    /// Number of upload/download calls made against the store
    pub fn remote_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Make every subsequent call fail
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn begin_call(&self, key: &str) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(AgentError::RemoteTransfer(format!(
                "injected failure for {}",
                key
            )));
        }
        Ok(())
    }
}

impl ObjectStore for MemoryStore {
    fn upload(&self, key: &str, body: &mut dyn Read) -> Result<u64> {
        self.begin_call(key)?;

        let mut data = Vec::new();
        loop {
            let part = read_part(body, self.part_size)?;
            if part.is_empty() {
                break;
            }
            data.extend_from_slice(&part);
        }

        let size = data.len() as u64;
        self.insert(key, data);
        Ok(size)
    }

    fn download(&self, key: &str, dest: &mut dyn WriteAt) -> Result<u64> {
        self.begin_call(key)?;

        let data = self
            .get(key)
            .ok_or_else(|| AgentError::RemoteTransfer(format!("NoSuchKey: {}", key)))?;

        for (index, chunk) in data.chunks(self.part_size).enumerate() {
            dest.write_all_at(chunk, (index * self.part_size) as u64)?;
        }

        Ok(data.len() as u64)
    }
}

impl StoreConnector for MemoryStore {
    fn connect(&self, _config: &Config) -> Result<Box<dyn ObjectStore>> {
        Ok(Box::new(self.clone()))
    }
}
