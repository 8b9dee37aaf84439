//! Document field encoding.
//!
//! Maps in-memory field values to their stored JSON shapes and back. The
//! marker keys `$enc`, `$bytes`, `$blob` and `$owned` are reserved at the
//! top level of a stored field value.
//!
//! Stored shapes:
//! - plain:      the JSON value itself
//! - binary:     `{"$bytes": "<base64>"}`
//! - encrypted:  `{"$enc": "<base64 nonce||ct>", "bin": bool}`
//! - offloaded:  `{"$blob": "<cid>", "len": n, "enc": bool}`
//! - owned:      `{"$owned": [{"cid": "...", "type": "..."}]}`
//!
//! Decoding is fail-soft for encrypted fields: tamper or corruption leaves
//! the field as raw wire bytes so the caller can detect it by shape, and
//! never aborts the rest of the record.

use base64::{Engine, engine::general_purpose::STANDARD};
use serde_json::{Value, json};
use tracing::warn;
use vaultic_crypto::{FieldKey, decode_wire, decrypt, encode_wire, encrypt_field};
use vaultic_model::{FieldDescriptor, FieldValue, OwnedRef};
use vaultic_types::Cid;
use zeroize::Zeroizing;

pub(crate) const MARKER_ENC: &str = "$enc";
pub(crate) const MARKER_BYTES: &str = "$bytes";
pub(crate) const MARKER_BLOB: &str = "$blob";
pub(crate) const MARKER_OWNED: &str = "$owned";

/// Outcome of the CPU phase of encoding; offload I/O happens afterwards,
/// sequentially.
pub(crate) enum Encoded {
    Inline(Value),
    /// Wire bytes that exceeded the threshold and must go to the blob
    /// store (already encrypted when the field is flagged encrypted).
    NeedsOffload {
        wire: Vec<u8>,
        plain_len: u64,
        encrypted: bool,
    },
}

/// Encodes one field value for storage. Pure CPU — any blob store write is
/// deferred through [`Encoded::NeedsOffload`].
pub(crate) fn encode_field(
    desc: &FieldDescriptor,
    value: &FieldValue,
    key: &FieldKey,
    should_offload: impl Fn(usize) -> bool,
) -> Encoded {
    match value {
        FieldValue::OwnedRefs(refs) => Encoded::Inline(json!({ MARKER_OWNED: refs })),

        FieldValue::Offloaded {
            blob,
            len,
            encrypted,
        } => Encoded::Inline(json!({
            MARKER_BLOB: blob.to_string(),
            "len": len,
            "enc": encrypted,
        })),

        FieldValue::Bytes(bytes) => {
            if desc.encrypted {
                let wire = encrypt_field(key, bytes);
                if desc.offload_eligible && should_offload(bytes.len()) {
                    Encoded::NeedsOffload {
                        wire,
                        plain_len: bytes.len() as u64,
                        encrypted: true,
                    }
                } else {
                    Encoded::Inline(json!({ MARKER_ENC: encode_wire(&wire), "bin": true }))
                }
            } else if desc.offload_eligible && should_offload(bytes.len()) {
                Encoded::NeedsOffload {
                    wire: bytes.clone(),
                    plain_len: bytes.len() as u64,
                    encrypted: false,
                }
            } else {
                Encoded::Inline(json!({ MARKER_BYTES: STANDARD.encode(bytes) }))
            }
        }

        FieldValue::Plain(v) => {
            if desc.encrypted {
                let plaintext = Zeroizing::new(serde_json::to_vec(v).unwrap_or_default());
                let wire = encrypt_field(key, &plaintext);
                if desc.offload_eligible && should_offload(plaintext.len()) {
                    Encoded::NeedsOffload {
                        wire,
                        plain_len: plaintext.len() as u64,
                        encrypted: true,
                    }
                } else {
                    Encoded::Inline(json!({ MARKER_ENC: encode_wire(&wire), "bin": false }))
                }
            } else {
                Encoded::Inline(v.clone())
            }
        }
    }
}

/// Builds the stored marker for an offloaded value.
pub(crate) fn blob_marker(blob: &Cid, plain_len: u64, encrypted: bool) -> Value {
    json!({
        MARKER_BLOB: blob.to_string(),
        "len": plain_len,
        "enc": encrypted,
    })
}

/// Decodes one stored field value back into memory. Offloaded values stay
/// as lazy references; encrypted values decrypt fail-soft.
pub(crate) fn decode_field(stored: &Value, key: &FieldKey) -> FieldValue {
    let Some(obj) = stored.as_object() else {
        return FieldValue::Plain(stored.clone());
    };

    if let Some(owned) = obj.get(MARKER_OWNED) {
        match serde_json::from_value::<Vec<OwnedRef>>(owned.clone()) {
            Ok(refs) => return FieldValue::OwnedRefs(refs),
            Err(e) => {
                warn!(error = %e, "malformed owned-reference list, keeping raw value");
                return FieldValue::Plain(stored.clone());
            }
        }
    }

    if let Some(blob) = obj.get(MARKER_BLOB).and_then(Value::as_str) {
        match blob.parse::<Cid>() {
            Ok(cid) => {
                return FieldValue::Offloaded {
                    blob: cid,
                    len: obj.get("len").and_then(Value::as_u64).unwrap_or(0),
                    encrypted: obj.get("enc").and_then(Value::as_bool).unwrap_or(false),
                };
            }
            Err(e) => {
                warn!(error = %e, "malformed blob reference, keeping raw value");
                return FieldValue::Plain(stored.clone());
            }
        }
    }

    if let Some(encoded) = obj.get(MARKER_ENC).and_then(Value::as_str) {
        let binary = obj.get("bin").and_then(Value::as_bool).unwrap_or(false);
        let wire = match decode_wire(encoded) {
            Ok(wire) => wire,
            Err(e) => {
                warn!(error = %e, "undecodable ciphertext envelope");
                return FieldValue::Bytes(encoded.as_bytes().to_vec());
            }
        };
        return match decrypt(key, &wire) {
            Ok(plaintext) => {
                if binary {
                    FieldValue::Bytes(plaintext)
                } else {
                    match serde_json::from_slice(&plaintext) {
                        Ok(v) => FieldValue::Plain(v),
                        Err(_) => FieldValue::Bytes(plaintext),
                    }
                }
            }
            Err(e) => {
                // Fail soft: surface the wire bytes unchanged for this
                // field only; the rest of the record loads normally.
                warn!(error = %e, "field decryption failed, returning ciphertext unchanged");
                FieldValue::Bytes(wire)
            }
        };
    }

    if let Some(encoded) = obj.get(MARKER_BYTES).and_then(Value::as_str) {
        return match STANDARD.decode(encoded) {
            Ok(bytes) => FieldValue::Bytes(bytes),
            Err(e) => {
                warn!(error = %e, "undecodable binary field");
                FieldValue::Bytes(encoded.as_bytes().to_vec())
            }
        };
    }

    FieldValue::Plain(stored.clone())
}
