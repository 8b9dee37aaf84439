//! Request-scoped secret lifecycle.
//!
//! A [`RequestScope`] lives for one logical request. Secrets bound to it
//! and any explicitly tracked sensitive buffers are zeroed when the scope
//! closes; records bound during the request that were never persisted are
//! deleted (cascade included) rather than left as partially-committed
//! orphans. Closing goes through `Repository::close_scope` so the cleanup
//! can reach the stores; a wipe failure there is fatal for the request.
//!
//! The secret and everything derived from it are scoped to this one
//! request and never shared across concurrent requests.

use tracing::error;
use vaultic_crypto::{SecretBytes, SensitiveBuf, WipeError, WipeRegistry};
use vaultic_model::OwnedRef;
use vaultic_types::Cid;

/// A secret bound into a request scope. The bytes live in a wipe-tracked
/// buffer; the handle only borrows them for derivation.
pub struct ScopedSecret {
    buf: SensitiveBuf,
}

impl ScopedSecret {
    /// Runs `f` over the secret bytes without copying them out.
    pub(crate) fn with_bytes<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        let guard = self.buf.lock().unwrap_or_else(|e| e.into_inner());
        f(&guard)
    }
}

impl std::fmt::Debug for ScopedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ScopedSecret([REDACTED])")
    }
}

/// Bookkeeping for one record bound during the request.
#[derive(Debug, Clone)]
pub(crate) struct TrackedRecord {
    pub cid: Cid,
    pub type_name: String,
    pub persisted: bool,
    /// Owned references known for this record (refreshed on bind/save).
    pub owned: Vec<OwnedRef>,
    /// Blobs written for this record; cleaned up if it never persists.
    pub blobs: Vec<Cid>,
}

/// Per-request lifecycle state: the wipe registry plus the set of records
/// bound during the request.
pub struct RequestScope {
    wipe: WipeRegistry,
    records: Vec<TrackedRecord>,
    closed: bool,
}

impl RequestScope {
    /// Opens a fresh scope.
    #[must_use]
    pub fn new() -> Self {
        Self {
            wipe: WipeRegistry::new(),
            records: Vec::new(),
            closed: false,
        }
    }

    /// Binds a secret into the scope. The bytes move into a wipe-tracked
    /// buffer; the returned handle is the only way to use them.
    pub fn bind_secret(&mut self, secret: SecretBytes) -> Result<ScopedSecret, WipeError> {
        let buf = self.wipe.track(secret.into_bytes())?;
        Ok(ScopedSecret { buf })
    }

    /// Tracks an arbitrary sensitive buffer for wiping at close.
    pub fn track_sensitive(&mut self, bytes: Vec<u8>) -> Result<SensitiveBuf, WipeError> {
        self.wipe.track(bytes)
    }

    /// Number of sensitive buffers currently tracked.
    #[must_use]
    pub fn tracked_buffers(&self) -> usize {
        self.wipe.len()
    }

    /// Whether the scope has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub(crate) fn track_record(&mut self, cid: Cid, type_name: &str, persisted: bool) {
        if let Some(existing) = self.records.iter_mut().find(|r| r.cid == cid) {
            existing.persisted = existing.persisted || persisted;
            return;
        }
        self.records.push(TrackedRecord {
            cid,
            type_name: type_name.to_string(),
            persisted,
            owned: Vec::new(),
            blobs: Vec::new(),
        });
    }

    pub(crate) fn mark_persisted(&mut self, cid: &Cid) {
        if let Some(r) = self.records.iter_mut().find(|r| r.cid == *cid) {
            r.persisted = true;
        }
    }

    pub(crate) fn note_owned(&mut self, cid: &Cid, owned: Vec<OwnedRef>) {
        if let Some(r) = self.records.iter_mut().find(|r| r.cid == *cid) {
            r.owned = owned;
        }
    }

    pub(crate) fn note_blob(&mut self, cid: &Cid, blob: Cid) {
        if let Some(r) = self.records.iter_mut().find(|r| r.cid == *cid) {
            r.blobs.push(blob);
        }
    }

    /// Drains records that never persisted, for anti-leak cleanup.
    pub(crate) fn take_unpersisted(&mut self) -> Vec<TrackedRecord> {
        self.closed = true;
        let (unpersisted, kept): (Vec<_>, Vec<_>) =
            self.records.drain(..).partition(|r| !r.persisted);
        drop(kept);
        unpersisted
    }

    /// Zeroes every tracked buffer. Failure is fatal for the request.
    pub(crate) fn finish_wipe(&mut self) -> Result<(), WipeError> {
        self.wipe.close()
    }
}

impl Default for RequestScope {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for RequestScope {
    fn drop(&mut self) {
        if !self.closed && self.records.iter().any(|r| !r.persisted) {
            // Cannot reach the stores from Drop; the required path is
            // Repository::close_scope.
            error!("request scope dropped without close; unsaved records were not cleaned up");
        }
    }
}
