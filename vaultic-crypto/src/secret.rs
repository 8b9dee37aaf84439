//! Secret buffers and the per-request wipe registry.
//!
//! Secrets enter the core as [`SecretBytes`] — owned, mutable byte buffers
//! that zeroize on drop — never as immutable strings. The [`WipeRegistry`]
//! tracks every sensitive buffer accumulated during one logical request and
//! guarantees all of them read as zero when the request closes. Failure to
//! zero a buffer is fatal, never silently ignored.

use crate::error::WipeError;
use std::sync::{Arc, Mutex, TryLockError};
use tracing::{error, warn};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Minimum secret length (bytes) for deterministic identifier derivation.
pub const MIN_DERIVE_SECRET_LEN: usize = 32;

/// Exact length (characters) of a randomly generated secret: 22 base64
/// characters encoding 128 bits.
pub const RANDOM_SECRET_LEN: usize = 22;

/// An owned, mutable secret buffer. Zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretBytes {
    bytes: Vec<u8>,
}

impl SecretBytes {
    /// Takes ownership of raw secret bytes.
    #[must_use]
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Returns the secret bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the buffer is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Consumes the secret, handing the bytes to the caller without a copy.
    #[must_use]
    pub fn into_bytes(mut self) -> Vec<u8> {
        std::mem::take(&mut self.bytes)
    }
}

impl From<&str> for SecretBytes {
    fn from(s: &str) -> Self {
        Self::new(s.as_bytes().to_vec())
    }
}

impl std::fmt::Debug for SecretBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretBytes")
            .field("len", &self.bytes.len())
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// A shared handle to a sensitive buffer tracked by a [`WipeRegistry`].
pub type SensitiveBuf = Arc<Mutex<Vec<u8>>>;

/// Per-request registry of sensitive buffers.
///
/// State machine: `Open` (buffers accumulate) → `close()` drains and zeroes
/// every buffer → `Closed`. Closing verifies that each buffer actually
/// reads as zero afterwards; any buffer that cannot be exclusively locked
/// and zeroed makes `close()` fail with [`WipeError::WipeFailed`].
pub struct WipeRegistry {
    buffers: Vec<SensitiveBuf>,
    closed: bool,
}

impl WipeRegistry {
    /// Creates an open, empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffers: Vec::new(),
            closed: false,
        }
    }

    /// Registers an existing buffer handle for wiping at close.
    pub fn register(&mut self, buf: SensitiveBuf) -> Result<(), WipeError> {
        if self.closed {
            return Err(WipeError::Closed);
        }
        self.buffers.push(buf);
        Ok(())
    }

    /// Moves `bytes` into a tracked buffer, returning a shared handle.
    pub fn track(&mut self, bytes: Vec<u8>) -> Result<SensitiveBuf, WipeError> {
        let buf = Arc::new(Mutex::new(bytes));
        self.register(Arc::clone(&buf))?;
        Ok(buf)
    }

    /// Number of registered buffers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    /// Whether no buffers are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// Whether the registry has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Drains the registry, zeroing every buffer and verifying the zeroing
    /// took effect.
    ///
    /// Zeroing continues across the remaining buffers even after a failure,
    /// so one bad buffer never shields the rest; the error is returned at
    /// the end. Closing an already-closed registry is an idempotent `Ok`.
    pub fn close(&mut self) -> Result<(), WipeError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let total = self.buffers.len();
        let mut failed = 0usize;

        for buf in self.buffers.drain(..) {
            match buf.try_lock() {
                Ok(mut guard) => {
                    guard.zeroize();
                    if !guard.iter().all(|b| *b == 0) {
                        failed += 1;
                    }
                }
                Err(TryLockError::Poisoned(poisoned)) => {
                    // A panic elsewhere left the lock poisoned; the bytes
                    // are still reachable, so zero them anyway.
                    let mut guard = poisoned.into_inner();
                    warn!("zeroing sensitive buffer behind poisoned lock");
                    guard.zeroize();
                    if !guard.iter().all(|b| *b == 0) {
                        failed += 1;
                    }
                }
                Err(TryLockError::WouldBlock) => {
                    // Someone still holds the buffer; it cannot be zeroed.
                    failed += 1;
                }
            }
        }

        if failed > 0 {
            error!(failed, total, "sensitive buffer wipe failed");
            return Err(WipeError::WipeFailed { failed, total });
        }
        Ok(())
    }
}

impl Default for WipeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for WipeRegistry {
    fn drop(&mut self) {
        if !self.closed && !self.buffers.is_empty() {
            // Best effort on drop; the fail-fast path is close().
            if self.close().is_err() {
                error!("wipe registry dropped with buffers that could not be zeroed");
            }
        }
    }
}
