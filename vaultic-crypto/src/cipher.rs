//! Field encryption using ChaCha20-Poly1305.
//!
//! Authenticated encryption with a 256-bit key, a fresh 96-bit random nonce
//! per call and a 128-bit tag. Wire form is `nonce || ciphertext+tag`.
//!
//! Two API levels:
//! - [`encrypt`]/[`decrypt`] — strict, typed results.
//! - [`encrypt_field`]/[`decrypt_field`] — the fail-soft per-field policy:
//!   an encryption failure yields an empty value, a decryption failure
//!   (tamper/corruption) returns the wire bytes unchanged. Both are logged
//!   and neither raises, so one corrupted field never aborts loading an
//!   otherwise-healthy record. Callers detect the fail-soft decrypt path by
//!   shape: the output equals the input.

use crate::error::{CryptoError, CryptoResult};
use base64::{Engine, engine::general_purpose::STANDARD};
use chacha20poly1305::{
    ChaCha20Poly1305, Nonce,
    aead::{Aead, KeyInit},
};
use rand::RngCore;
use tracing::warn;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Size of field-encryption keys in bytes (256 bits).
pub const KEY_SIZE: usize = 32;

/// Size of the nonce in bytes (96 bits).
pub const NONCE_SIZE: usize = 12;

/// Size of the authentication tag in bytes (128 bits).
pub const TAG_SIZE: usize = 16;

/// Minimum length of a valid wire value: nonce plus tag.
pub const MIN_WIRE_LEN: usize = NONCE_SIZE + TAG_SIZE;

/// A field-encryption key with automatic zeroization on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct FieldKey {
    bytes: [u8; KEY_SIZE],
}

impl FieldKey {
    /// Creates a key from raw bytes.
    #[must_use]
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    /// Returns the key bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl std::fmt::Debug for FieldKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Encrypts `plaintext`, returning `nonce || ciphertext+tag`.
///
/// A fresh nonce is drawn from the OS randomness source on every call;
/// nonces are never reused.
pub fn encrypt(key: &FieldKey, plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
    let cipher = ChaCha20Poly1305::new(key.as_bytes().into());

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;

    let mut wire = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    wire.extend_from_slice(&nonce_bytes);
    wire.extend_from_slice(&ciphertext);
    Ok(wire)
}

/// Decrypts a wire value produced by [`encrypt`].
pub fn decrypt(key: &FieldKey, wire: &[u8]) -> CryptoResult<Vec<u8>> {
    if wire.len() < MIN_WIRE_LEN {
        return Err(CryptoError::Decryption(format!(
            "wire value too short: {} bytes, minimum {MIN_WIRE_LEN}",
            wire.len()
        )));
    }
    let cipher = ChaCha20Poly1305::new(key.as_bytes().into());
    let nonce = Nonce::from_slice(&wire[..NONCE_SIZE]);

    cipher.decrypt(nonce, &wire[NONCE_SIZE..]).map_err(|_| {
        CryptoError::Decryption("authentication failed (wrong key or tampered data)".to_string())
    })
}

/// Fail-soft encrypt: a cipher failure yields an empty value, never a
/// placeholder resembling valid ciphertext.
#[must_use]
pub fn encrypt_field(key: &FieldKey, plaintext: &[u8]) -> Vec<u8> {
    match encrypt(key, plaintext) {
        Ok(wire) => wire,
        Err(e) => {
            warn!(error = %e, "field encryption failed, writing empty value");
            Vec::new()
        }
    }
}

/// Fail-soft decrypt: tamper or corruption returns the wire bytes
/// unchanged rather than raising.
#[must_use]
pub fn decrypt_field(key: &FieldKey, wire: &[u8]) -> Vec<u8> {
    match decrypt(key, wire) {
        Ok(plaintext) => plaintext,
        Err(e) => {
            warn!(error = %e, "field decryption failed, returning ciphertext unchanged");
            wire.to_vec()
        }
    }
}

/// Encodes a wire value to base64 for storage inside a document.
#[must_use]
pub fn encode_wire(wire: &[u8]) -> String {
    STANDARD.encode(wire)
}

/// Decodes a base64 wire value from a document.
pub fn decode_wire(encoded: &str) -> CryptoResult<Vec<u8>> {
    STANDARD
        .decode(encoded)
        .map_err(|e| CryptoError::Decryption(format!("invalid base64: {e}")))
}
