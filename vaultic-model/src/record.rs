use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use vaultic_types::Cid;

/// Reference to an owned child record: its identifier plus the type name
/// needed to interpret its document during cascade walks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnedRef {
    pub cid: Cid,
    #[serde(rename = "type")]
    pub type_name: String,
}

impl OwnedRef {
    #[must_use]
    pub fn new(cid: Cid, type_name: impl Into<String>) -> Self {
        Self {
            cid,
            type_name: type_name.into(),
        }
    }
}

/// One field's in-memory value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Structured plaintext value.
    Plain(serde_json::Value),
    /// Raw binary value. Also what a corrupted encrypted field decodes to
    /// (the wire bytes unchanged), so callers can detect corruption by
    /// shape.
    Bytes(Vec<u8>),
    /// Unresolved offload reference; materialized lazily on first access.
    Offloaded { blob: Cid, len: u64, encrypted: bool },
    /// Owned child references.
    OwnedRefs(Vec<OwnedRef>),
}

impl FieldValue {
    /// The plain JSON value, if this is a [`FieldValue::Plain`].
    #[must_use]
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Plain(v) => Some(v),
            _ => None,
        }
    }

    /// The raw bytes, if this is a [`FieldValue::Bytes`].
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// The owned references, if this is a [`FieldValue::OwnedRefs`].
    #[must_use]
    pub fn as_owned_refs(&self) -> Option<&[OwnedRef]> {
        match self {
            Self::OwnedRefs(refs) => Some(refs),
            _ => None,
        }
    }

    /// Whether the value is an unresolved offload reference.
    #[must_use]
    pub fn is_offloaded(&self) -> bool {
        matches!(self, Self::Offloaded { .. })
    }
}

/// A generic in-memory entity.
///
/// Carries exactly one identifier once bound, a field map interpreted
/// through the type's descriptors, and the per-field hash snapshot captured
/// at load time that drives change detection on save.
#[derive(Debug, Clone)]
pub struct Record {
    /// Identifier; `None` until bound by the repository (derived) or the
    /// caller (random, for owned children).
    pub cid: Option<Cid>,
    /// Fully-qualified type name, resolved through the type registry.
    pub type_name: String,
    /// Field values keyed by field name. BTreeMap so iteration — and the
    /// write-set assembled from it — is deterministic.
    pub fields: BTreeMap<String, FieldValue>,
    /// Per-field hashes captured at load time ("original hashes").
    pub original_hashes: HashMap<String, [u8; 32]>,
    /// Offload references attached at load time, kept so replacing a value
    /// can delete the superseded blob.
    pub offload_refs: HashMap<String, Cid>,
    /// Whether the record has been persisted during this request or was
    /// loaded from the store.
    pub persisted: bool,
}

impl Record {
    /// Creates an empty, unbound record of the given type.
    #[must_use]
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            cid: None,
            type_name: type_name.into(),
            fields: BTreeMap::new(),
            original_hashes: HashMap::new(),
            offload_refs: HashMap::new(),
            persisted: false,
        }
    }

    /// Returns a field value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Sets a field value, returning the previous one.
    pub fn set(&mut self, name: impl Into<String>, value: FieldValue) -> Option<FieldValue> {
        self.fields.insert(name.into(), value)
    }

    /// Sets a plain JSON field.
    pub fn set_json(&mut self, name: impl Into<String>, value: serde_json::Value) {
        self.set(name, FieldValue::Plain(value));
    }

    /// Sets a raw binary field.
    pub fn set_bytes(&mut self, name: impl Into<String>, bytes: Vec<u8>) {
        self.set(name, FieldValue::Bytes(bytes));
    }

    /// Removes a field, returning its value.
    pub fn take(&mut self, name: &str) -> Option<FieldValue> {
        self.fields.remove(name)
    }

    /// Appends an owned child reference to the given field.
    pub fn add_owned(&mut self, field: impl Into<String>, child: OwnedRef) {
        let entry = self
            .fields
            .entry(field.into())
            .or_insert_with(|| FieldValue::OwnedRefs(Vec::new()));
        if let FieldValue::OwnedRefs(refs) = entry {
            refs.push(child);
        } else {
            *entry = FieldValue::OwnedRefs(vec![child]);
        }
    }

    /// All owned references across every field of the record.
    #[must_use]
    pub fn owned_refs(&self) -> Vec<OwnedRef> {
        self.fields
            .values()
            .filter_map(FieldValue::as_owned_refs)
            .flatten()
            .cloned()
            .collect()
    }
}
