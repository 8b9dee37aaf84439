//! Change detection.
//!
//! Per-field hashes are snapshotted at load time and again at save time;
//! the diff yields the minimal write-set. Small values are hashed in full;
//! values past [`PREFIX_CHECKSUM_LIMIT`] hash only a fixed-size prefix plus
//! the length, trading a small false-negative probability for bounded cost
//! on large values. Unresolved offloaded fields keep the hash captured at
//! load — an unfetched blob cannot have changed in memory.

use crate::pool::par_map;
use sha2::{Digest, Sha256};
use std::collections::{BTreeSet, HashMap};
use vaultic_model::{FieldValue, Record};

/// Values larger than this hash only their first 4 KiB plus length.
pub const PREFIX_CHECKSUM_LIMIT: usize = 4096;

/// A per-field content hash.
pub type FieldHash = [u8; 32];

/// Hashes a value under the prefix-checksum policy.
#[must_use]
pub fn hash_bytes(bytes: &[u8]) -> FieldHash {
    let mut hasher = Sha256::new();
    if bytes.len() > PREFIX_CHECKSUM_LIMIT {
        hasher.update(&bytes[..PREFIX_CHECKSUM_LIMIT]);
        hasher.update((bytes.len() as u64).to_le_bytes());
    } else {
        hasher.update(bytes);
    }
    hasher.finalize().into()
}

/// Canonical byte form of a field value for hashing. `None` for unresolved
/// offload references.
fn canonical_bytes(value: &FieldValue) -> Option<Vec<u8>> {
    match value {
        FieldValue::Plain(v) => Some(serde_json::to_vec(v).unwrap_or_default()),
        FieldValue::Bytes(b) => Some(b.clone()),
        FieldValue::OwnedRefs(refs) => {
            let mut out = Vec::new();
            for r in refs {
                out.extend_from_slice(r.cid.as_bytes());
                out.extend_from_slice(r.type_name.as_bytes());
                out.push(0);
            }
            Some(out)
        }
        FieldValue::Offloaded { .. } => None,
    }
}

/// Computes the per-field hash map for a record, hashing fields in
/// parallel on up to `workers` threads.
#[must_use]
pub fn snapshot(record: &Record, workers: usize) -> HashMap<String, FieldHash> {
    let mut hashes = HashMap::with_capacity(record.fields.len());
    let mut hashable: Vec<(&String, Vec<u8>)> = Vec::new();

    for (name, value) in &record.fields {
        match canonical_bytes(value) {
            Some(bytes) => hashable.push((name, bytes)),
            None => {
                // Unresolved offload reference: carry the load-time hash
                // forward, or hash the reference itself when none exists.
                let hash = record.original_hashes.get(name).copied().unwrap_or_else(|| {
                    if let FieldValue::Offloaded { blob, len, .. } = value {
                        let mut ref_bytes = blob.as_bytes().to_vec();
                        ref_bytes.extend_from_slice(&len.to_le_bytes());
                        hash_bytes(&ref_bytes)
                    } else {
                        hash_bytes(&[])
                    }
                });
                hashes.insert(name.clone(), hash);
            }
        }
    }

    let computed = par_map(&hashable, workers, |(_, bytes)| hash_bytes(bytes));
    for ((name, _), hash) in hashable.iter().zip(computed) {
        hashes.insert((*name).clone(), hash);
    }
    hashes
}

/// The minimal set of field names whose hash differs between the two
/// snapshots, including fields added or removed.
#[must_use]
pub fn diff(
    original: &HashMap<String, FieldHash>,
    current: &HashMap<String, FieldHash>,
) -> BTreeSet<String> {
    let mut changed = BTreeSet::new();
    for (name, hash) in current {
        if original.get(name) != Some(hash) {
            changed.insert(name.clone());
        }
    }
    for name in original.keys() {
        if !current.contains_key(name) {
            changed.insert(name.clone());
        }
    }
    changed
}
