//! Entropy validation for randomly generated identifiers and secrets.
//!
//! Derived identifiers are high-entropy by construction and are never run
//! through this module; only the random-generation paths are gated. A
//! candidate is accepted when its Shannon entropy is at least 3.5 bits per
//! character and at least a quarter of its characters are distinct.

use crate::error::{CryptoError, CryptoResult};
use crate::secret::{RANDOM_SECRET_LEN, SecretBytes};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use rand::rngs::OsRng;
use std::collections::HashMap;
use tracing::debug;
use vaultic_types::{CID_LEN, Cid};

/// Minimum Shannon entropy (bits per character) for a random candidate.
pub const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.5;

/// Minimum ratio of unique characters to total length.
pub const MIN_UNIQUE_RATIO: f64 = 0.25;

/// Attempts before a persistently failing randomness source is fatal.
pub const MAX_ENTROPY_RETRIES: usize = 8;

/// Shannon entropy of `s` in bits per character.
#[must_use]
pub fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }
    let bytes = s.as_bytes();
    let len = bytes.len() as f64;

    let mut freq: HashMap<u8, usize> = HashMap::new();
    for &byte in bytes {
        *freq.entry(byte).or_insert(0) += 1;
    }

    let mut entropy = 0.0;
    for &count in freq.values() {
        let p = count as f64 / len;
        entropy -= p * p.log2();
    }
    entropy
}

/// Ratio of distinct characters to total length (0.0 for empty input).
#[must_use]
pub fn unique_ratio(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }
    let mut seen = [false; 256];
    let mut unique = 0usize;
    for &b in s.as_bytes() {
        if !seen[b as usize] {
            seen[b as usize] = true;
            unique += 1;
        }
    }
    unique as f64 / s.len() as f64
}

/// Whether a random candidate passes the entropy gate.
#[must_use]
pub fn validate(candidate: &str) -> bool {
    shannon_entropy(candidate) >= MIN_ENTROPY_BITS_PER_CHAR
        && unique_ratio(candidate) >= MIN_UNIQUE_RATIO
}

/// Generates a random, entropy-validated identifier from the OS randomness
/// source.
pub fn random_cid() -> CryptoResult<Cid> {
    random_cid_from(&mut OsRng)
}

/// Generates a random identifier from the given source, regenerating up to
/// [`MAX_ENTROPY_RETRIES`] times when a candidate fails the entropy gate.
///
/// Exhausting the retries means the randomness source is producing
/// degenerate output and is treated as a fatal environment error.
pub fn random_cid_from(rng: &mut impl RngCore) -> CryptoResult<Cid> {
    for attempt in 0..MAX_ENTROPY_RETRIES {
        let mut bytes = [0u8; CID_LEN];
        rng.fill_bytes(&mut bytes);
        let cid = Cid::from_bytes(bytes);
        if validate(&cid.to_string()) {
            return Ok(cid);
        }
        debug!(attempt, "random identifier failed entropy check, regenerating");
    }
    Err(CryptoError::EntropyExhausted(MAX_ENTROPY_RETRIES))
}

/// Generates a random 22-character (128-bit) secret, entropy-validated the
/// same way as random identifiers.
pub fn random_secret() -> CryptoResult<SecretBytes> {
    random_secret_from(&mut OsRng)
}

/// [`random_secret`] with an explicit randomness source.
pub fn random_secret_from(rng: &mut impl RngCore) -> CryptoResult<SecretBytes> {
    for attempt in 0..MAX_ENTROPY_RETRIES {
        let mut bytes = [0u8; CID_LEN];
        rng.fill_bytes(&mut bytes);
        let encoded = URL_SAFE_NO_PAD.encode(bytes);
        debug_assert_eq!(encoded.len(), RANDOM_SECRET_LEN);
        if validate(&encoded) {
            return Ok(SecretBytes::new(encoded.into_bytes()));
        }
        debug!(attempt, "random secret failed entropy check, regenerating");
    }
    Err(CryptoError::EntropyExhausted(MAX_ENTROPY_RETRIES))
}
