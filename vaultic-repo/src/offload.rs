//! Large-value offload.
//!
//! Values above the configured threshold are externalized to the blob
//! store and replaced in the document by a reference. Encrypted values are
//! encrypted before offload, so the blob store never observes plaintext.
//! Materialization is lazy — a blob is fetched on first field access, not
//! at load time.

use crate::error::RepoResult;
use tracing::debug;
use vaultic_store::BlobStore;
use vaultic_types::{Cid, CoreConfig};

/// Threshold-based externalization of oversized field values.
#[derive(Debug, Clone)]
pub struct OffloadManager {
    threshold_bytes: usize,
}

impl OffloadManager {
    /// Builds a manager from validated configuration.
    #[must_use]
    pub fn new(config: &CoreConfig) -> Self {
        Self {
            threshold_bytes: config.offload_threshold_bytes,
        }
    }

    /// The active threshold in bytes.
    #[must_use]
    pub fn threshold_bytes(&self) -> usize {
        self.threshold_bytes
    }

    /// Whether a value of `len` bytes exceeds the threshold.
    #[must_use]
    pub fn should_offload(&self, len: usize) -> bool {
        len > self.threshold_bytes
    }

    /// Externalizes `bytes`, returning the blob reference.
    pub fn store(&self, blobs: &dyn BlobStore, bytes: &[u8]) -> RepoResult<Cid> {
        let id = blobs.put(bytes)?;
        debug!(blob = %id, len = bytes.len(), "value offloaded");
        Ok(id)
    }

    /// Fetches an offloaded value, `Ok(None)` when the reference is
    /// orphaned.
    pub fn load(&self, blobs: &dyn BlobStore, id: &Cid) -> RepoResult<Option<Vec<u8>>> {
        Ok(blobs.get(id)?)
    }

    /// Removes an offloaded value.
    pub fn delete(&self, blobs: &dyn BlobStore, id: &Cid) -> RepoResult<()> {
        blobs.delete(id)?;
        Ok(())
    }
}
