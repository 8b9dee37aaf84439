use vaultic_crypto::{
    CryptoError, DeriveHash, derive, derive_cid, derive_field_key, derive_with,
};

const SECRET: &[u8] = b"an-extremely-long-high-entropy-secret-0123456789";
const OTHER: &[u8] = b"a-different-equally-long-secret-value-9876543210";

// ── Determinism ──────────────────────────────────────────────────

#[test]
fn same_inputs_same_output() {
    let a = derive(SECRET, "com.example.Note:CID", 16).unwrap();
    let b = derive(SECRET, "com.example.Note:CID", 16).unwrap();
    assert_eq!(a, b);
}

#[test]
fn derived_cid_is_stable() {
    let a = derive_cid(SECRET, "com.example.Note").unwrap();
    let b = derive_cid(SECRET, "com.example.Note").unwrap();
    assert_eq!(a, b);
}

#[test]
fn derived_key_is_stable() {
    let a = derive_field_key(SECRET, "com.example.Note").unwrap();
    let b = derive_field_key(SECRET, "com.example.Note").unwrap();
    assert_eq!(a.as_bytes(), b.as_bytes());
}

// ── Context separation ───────────────────────────────────────────

#[test]
fn different_contexts_different_output() {
    let id = derive(SECRET, "com.example.Note:CID", 16).unwrap();
    let key = derive(SECRET, "com.example.Note:ENCRYPTION_KEY", 16).unwrap();
    assert_ne!(id, key);
}

#[test]
fn cid_and_key_derivations_are_unrelated() {
    let cid = derive_cid(SECRET, "com.example.Note").unwrap();
    let key = derive_field_key(SECRET, "com.example.Note").unwrap();
    assert_ne!(cid.as_bytes().as_slice(), &key.as_bytes()[..16]);
}

#[test]
fn different_types_different_identifiers() {
    let a = derive_cid(SECRET, "com.example.Note").unwrap();
    let b = derive_cid(SECRET, "com.example.Task").unwrap();
    assert_ne!(a, b);
}

#[test]
fn different_secrets_different_identifiers() {
    let a = derive_cid(SECRET, "com.example.Note").unwrap();
    let b = derive_cid(OTHER, "com.example.Note").unwrap();
    assert_ne!(a, b);
}

// ── Hash primitives ──────────────────────────────────────────────

#[test]
fn sha512_differs_from_sha256() {
    let a = derive_with(DeriveHash::Sha256, SECRET, "ctx", 32).unwrap();
    let b = derive_with(DeriveHash::Sha512, SECRET, "ctx", 32).unwrap();
    assert_ne!(a, b);
}

#[test]
fn sha512_is_deterministic_too() {
    let a = derive_with(DeriveHash::Sha512, SECRET, "ctx", 64).unwrap();
    let b = derive_with(DeriveHash::Sha512, SECRET, "ctx", 64).unwrap();
    assert_eq!(a, b);
}

#[test]
fn output_length_is_respected() {
    for len in [16, 32, 64] {
        assert_eq!(derive(SECRET, "ctx", len).unwrap().len(), len);
    }
}

// ── Validation ───────────────────────────────────────────────────

#[test]
fn short_secret_rejected_before_derivation() {
    let err = derive(b"too-short", "ctx", 16).unwrap_err();
    assert!(matches!(
        err,
        CryptoError::SecretTooShort {
            actual: 9,
            minimum: 32
        }
    ));
}

#[test]
fn thirty_two_byte_secret_is_accepted() {
    let secret = [b'x'; 32];
    assert!(derive(&secret, "ctx", 16).is_ok());
}

#[test]
fn empty_context_rejected() {
    let err = derive(SECRET, "", 16).unwrap_err();
    assert!(matches!(err, CryptoError::MissingContext));
}

#[test]
fn oversized_output_is_a_derivation_error() {
    // HKDF-SHA-256 caps expansion at 255 * 32 bytes
    let err = derive(SECRET, "ctx", 255 * 32 + 1).unwrap_err();
    assert!(matches!(err, CryptoError::KeyDerivation(_)));
}
