//! Local object cache layout
//!
//! Objects live under the LFS root in a two-level sharded tree:
//!
//! ```text
//! {lfs_root}/
//!   └── ab/
//!       └── cd/
//!           └── abcdef0123...   (full oid)
//! ```
//!
//! The remote key is the bare oid.

use std::path::{Path, PathBuf};

use crate::error::{AgentError, Result};

/// Shortest oid that can be sharded
pub const MIN_OID_LEN: usize = 4;

/// Check that an oid is usable as a path component and remote key
pub fn validate_oid(oid: &str) -> Result<()> {
    if oid.len() < MIN_OID_LEN {
        return Err(AgentError::InvalidOid(format!(
            "{:?} is shorter than {} characters",
            oid, MIN_OID_LEN
        )));
    }
    if !oid.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(AgentError::InvalidOid(format!(
            "{:?} is not a hex string",
            oid
        )));
    }
    Ok(())
}

/// Local cache path for `oid` under `lfs_root`
pub fn cache_path(lfs_root: &Path, oid: &str) -> Result<PathBuf> {
    validate_oid(oid)?;
    Ok(lfs_root.join(&oid[0..2]).join(&oid[2..4]).join(oid))
}

/// Remote object key for `oid`
pub fn remote_key(oid: &str) -> &str {
    oid
}
