//! Cryptographic core for vaultic.
//!
//! Provides the secret-addressed primitives the persistence layer is built
//! on:
//! - HKDF-based derivation of identifiers and field keys from a
//!   caller-supplied secret, separated by a mandatory context string
//! - Shannon-entropy validation of randomly generated identifiers/secrets
//! - Authenticated field encryption (ChaCha20-Poly1305) with a fail-soft
//!   per-field policy
//! - Zeroizing secret buffers and the per-request wipe registry
//!
//! Nothing in this crate persists anything; it is pure computation over
//! byte buffers plus an OS randomness source.

mod cipher;
mod derive;
mod entropy;
mod error;
mod secret;

pub use cipher::{
    FieldKey, KEY_SIZE, MIN_WIRE_LEN, NONCE_SIZE, TAG_SIZE, decode_wire, decrypt, decrypt_field,
    encode_wire, encrypt, encrypt_field,
};
pub use derive::{DeriveHash, derive, derive_cid, derive_field_key, derive_with};
pub use entropy::{
    MAX_ENTROPY_RETRIES, MIN_ENTROPY_BITS_PER_CHAR, MIN_UNIQUE_RATIO, random_cid, random_cid_from,
    random_secret, random_secret_from, shannon_entropy, unique_ratio, validate,
};
pub use error::{CryptoError, CryptoResult, WipeError};
pub use secret::{
    MIN_DERIVE_SECRET_LEN, RANDOM_SECRET_LEN, SecretBytes, SensitiveBuf, WipeRegistry,
};
