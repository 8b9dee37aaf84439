use vaultic_crypto::{
    FieldKey, MIN_WIRE_LEN, NONCE_SIZE, decode_wire, decrypt, decrypt_field, encode_wire, encrypt,
    encrypt_field,
};

fn key() -> FieldKey {
    FieldKey::from_bytes([7u8; 32])
}

fn other_key() -> FieldKey {
    FieldKey::from_bytes([8u8; 32])
}

// ── Strict API ───────────────────────────────────────────────────

#[test]
fn encrypt_decrypt_roundtrip() {
    let wire = encrypt(&key(), b"Hello, World!").unwrap();
    let plaintext = decrypt(&key(), &wire).unwrap();
    assert_eq!(plaintext, b"Hello, World!");
}

#[test]
fn roundtrip_empty_plaintext() {
    let wire = encrypt(&key(), b"").unwrap();
    assert_eq!(wire.len(), MIN_WIRE_LEN);
    assert_eq!(decrypt(&key(), &wire).unwrap(), b"");
}

#[test]
fn roundtrip_large_plaintext() {
    let plaintext: Vec<u8> = (0..10_000).map(|i| (i % 256) as u8).collect();
    let wire = encrypt(&key(), &plaintext).unwrap();
    assert_eq!(decrypt(&key(), &wire).unwrap(), plaintext);
}

#[test]
fn wrong_key_fails() {
    let wire = encrypt(&key(), b"secret").unwrap();
    assert!(decrypt(&other_key(), &wire).is_err());
}

#[test]
fn tampered_wire_fails() {
    let mut wire = encrypt(&key(), b"secret").unwrap();
    let last = wire.len() - 1;
    wire[last] ^= 0xFF;
    assert!(decrypt(&key(), &wire).is_err());
}

#[test]
fn truncated_wire_fails() {
    assert!(decrypt(&key(), &[0u8; MIN_WIRE_LEN - 1]).is_err());
    assert!(decrypt(&key(), &[]).is_err());
}

#[test]
fn nonce_is_fresh_per_call() {
    let a = encrypt(&key(), b"same").unwrap();
    let b = encrypt(&key(), b"same").unwrap();
    assert_ne!(a[..NONCE_SIZE], b[..NONCE_SIZE]);
    assert_ne!(a, b);
}

// ── Fail-soft API ────────────────────────────────────────────────

#[test]
fn fail_soft_roundtrip_matches_strict() {
    let wire = encrypt_field(&key(), b"value");
    assert_eq!(decrypt_field(&key(), &wire), b"value");
}

#[test]
fn corrupted_byte_returns_wire_unchanged() {
    let mut wire = encrypt_field(&key(), b"value");
    wire[NONCE_SIZE] ^= 0x01;
    let out = decrypt_field(&key(), &wire);
    assert_eq!(out, wire);
    assert_ne!(out, b"value");
}

#[test]
fn wrong_key_returns_wire_unchanged() {
    let wire = encrypt_field(&key(), b"value");
    assert_eq!(decrypt_field(&other_key(), &wire), wire);
}

#[test]
fn garbage_wire_returns_garbage_unchanged() {
    let garbage = vec![0xAB; 40];
    assert_eq!(decrypt_field(&key(), &garbage), garbage);
}

// ── Wire encoding ────────────────────────────────────────────────

#[test]
fn base64_roundtrip() {
    let wire = encrypt(&key(), b"data").unwrap();
    let encoded = encode_wire(&wire);
    assert_eq!(decode_wire(&encoded).unwrap(), wire);
}

#[test]
fn invalid_base64_fails() {
    assert!(decode_wire("!!!not-base64!!!").is_err());
}

// ── Key handling ─────────────────────────────────────────────────

#[test]
fn debug_output_is_redacted() {
    let formatted = format!("{:?}", key());
    assert!(formatted.contains("REDACTED"));
    assert!(!formatted.contains('7'));
}
