//! Key and identifier derivation.
//!
//! One-way HKDF expansion keyed by the caller's secret. The context string
//! is mandatory: it separates derivation purposes (identifier vs encryption
//! key) and entity types, so the same secret never yields related output
//! for two different contexts.
//!
//! ## Derivation structure
//!
//! ```text
//! HKDF-SHA-256(
//!     ikm  = secret,
//!     salt = None,
//!     info = "<fully-qualified-type-name>:<purpose>"
//! )
//! ```

use crate::cipher::{FieldKey, KEY_SIZE};
use crate::error::{CryptoError, CryptoResult};
use crate::secret::MIN_DERIVE_SECRET_LEN;
use hkdf::Hkdf;
use sha2::{Sha256, Sha512};
use vaultic_types::{CID_LEN, Cid};
use zeroize::Zeroizing;

/// Context suffix for identifier derivation.
pub(crate) const CID_CONTEXT: &str = "CID";

/// Context suffix for field-key derivation.
pub(crate) const KEY_CONTEXT: &str = "ENCRYPTION_KEY";

/// Underlying keyed-hash primitive for derivation.
///
/// SHA-256 is the default; SHA-512 is available for callers that want the
/// stronger primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeriveHash {
    #[default]
    Sha256,
    Sha512,
}

/// Derives `out_len` bytes from `secret` under the given `context` using
/// HKDF-SHA-256.
///
/// Deterministic for fixed inputs and one-way. The context is required;
/// the secret must be at least [`MIN_DERIVE_SECRET_LEN`] bytes (checked
/// before any derivation happens).
pub fn derive(secret: &[u8], context: &str, out_len: usize) -> CryptoResult<Vec<u8>> {
    derive_with(DeriveHash::Sha256, secret, context, out_len)
}

/// [`derive`] with an explicit hash primitive.
pub fn derive_with(
    hash: DeriveHash,
    secret: &[u8],
    context: &str,
    out_len: usize,
) -> CryptoResult<Vec<u8>> {
    if secret.len() < MIN_DERIVE_SECRET_LEN {
        return Err(CryptoError::SecretTooShort {
            actual: secret.len(),
            minimum: MIN_DERIVE_SECRET_LEN,
        });
    }
    if context.is_empty() {
        return Err(CryptoError::MissingContext);
    }

    let mut out = vec![0u8; out_len];
    let expand = |e: Result<(), hkdf::InvalidLength>| {
        e.map_err(|err| CryptoError::KeyDerivation(err.to_string()))
    };
    match hash {
        DeriveHash::Sha256 => {
            let hk = Hkdf::<Sha256>::new(None, secret);
            expand(hk.expand(context.as_bytes(), &mut out))?;
        }
        DeriveHash::Sha512 => {
            let hk = Hkdf::<Sha512>::new(None, secret);
            expand(hk.expand(context.as_bytes(), &mut out))?;
        }
    }
    Ok(out)
}

/// Derives the deterministic identifier for `(secret, type_name)`.
///
/// Context: `"<type_name>:CID"`, 16 bytes of output.
pub fn derive_cid(secret: &[u8], type_name: &str) -> CryptoResult<Cid> {
    let context = format!("{type_name}:{CID_CONTEXT}");
    let out = Zeroizing::new(derive(secret, &context, CID_LEN)?);
    let mut bytes = [0u8; CID_LEN];
    bytes.copy_from_slice(&out);
    Ok(Cid::from_bytes(bytes))
}

/// Derives the field-encryption key for `(secret, type_name)`.
///
/// Context: `"<type_name>:ENCRYPTION_KEY"`, 32 bytes of output. The output
/// is computationally unrelated to the identifier derived from the same
/// secret.
pub fn derive_field_key(secret: &[u8], type_name: &str) -> CryptoResult<FieldKey> {
    let context = format!("{type_name}:{KEY_CONTEXT}");
    let out = Zeroizing::new(derive(secret, &context, KEY_SIZE)?);
    let mut bytes = [0u8; KEY_SIZE];
    bytes.copy_from_slice(&out);
    Ok(FieldKey::from_bytes(bytes))
}
