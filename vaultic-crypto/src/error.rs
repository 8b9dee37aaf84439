//! Error types for the cryptographic core.

use thiserror::Error;

/// Result type for crypto operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors that can occur in cryptographic operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Secret below the minimum length for derivation. This is a
    /// validation failure raised before any derivation is attempted.
    #[error("secret too short: {actual} bytes, minimum {minimum}")]
    SecretTooShort { actual: usize, minimum: usize },

    /// Derivation called without a context string.
    #[error("derivation context must not be empty")]
    MissingContext,

    /// Key derivation failed.
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    /// Encryption failed.
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// Decryption failed (wrong key or tampered data).
    #[error("decryption failed: {0}")]
    Decryption(String),

    /// Random generation kept failing the entropy check. Indicates a
    /// broken randomness source.
    #[error("entropy check failed after {0} attempts, randomness source unusable")]
    EntropyExhausted(usize),

    /// Invalid key length.
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },
}

/// Errors from the wipe registry. A [`WipeError::WipeFailed`] is fatal for
/// the request that owns the registry — privacy failures are never silent.
#[derive(Debug, Error)]
pub enum WipeError {
    /// Registration attempted after the registry was closed.
    #[error("wipe registry already closed")]
    Closed,

    /// One or more sensitive buffers could not be zeroed.
    #[error("failed to wipe {failed} of {total} sensitive buffers")]
    WipeFailed { failed: usize, total: usize },
}
