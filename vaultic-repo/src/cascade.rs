//! Ownership-aware cascade delete.
//!
//! Walks `$owned` references recursively, deleting children before their
//! parent so a partial failure never leaves an orphan whose parent is
//! already gone. Every `$blob` reference attached to a visited document is
//! deleted along the way — zero orphaned blobs. A visited set keyed by
//! identifier terminates ownership cycles.

use crate::encode::{MARKER_BLOB, MARKER_OWNED};
use crate::error::{RepoError, RepoResult};
use serde_json::Value;
use std::collections::HashSet;
use tracing::debug;
use vaultic_model::OwnedRef;
use vaultic_store::{BlobStore, Document, DocumentStore};
use vaultic_types::Cid;

/// Recursively deletes the document at `cid`, its owned children and all
/// attached blobs. Returns the number of documents removed.
pub(crate) fn cascade_delete(
    docs: &dyn DocumentStore,
    blobs: &dyn BlobStore,
    cid: &Cid,
    visited: &mut HashSet<Cid>,
) -> RepoResult<usize> {
    if !visited.insert(*cid) {
        debug!(cid = %cid, "ownership cycle detected, already visited");
        return Ok(0);
    }

    let Some(doc) = docs.get(cid).map_err(|e| fail(cid, &e))? else {
        return Ok(0);
    };

    let mut removed = 0usize;

    // Children first, then this document's blobs, then the document.
    for child in owned_refs_of(&doc) {
        removed += cascade_delete(docs, blobs, &child.cid, visited)?;
    }
    for blob in blob_refs_of(&doc) {
        blobs.delete(&blob).map_err(|e| fail(cid, &e))?;
    }
    docs.delete(cid).map_err(|e| fail(cid, &e))?;
    Ok(removed + 1)
}

fn fail(cid: &Cid, e: &dyn std::fmt::Display) -> RepoError {
    RepoError::CascadeFailed {
        cid: *cid,
        reason: e.to_string(),
    }
}

/// Owned references found in a stored document. Fields without the owned
/// marker are left untouched regardless of type.
pub(crate) fn owned_refs_of(doc: &Document) -> Vec<OwnedRef> {
    let mut refs = Vec::new();
    for value in doc.values() {
        if let Some(owned) = value.get(MARKER_OWNED)
            && let Ok(mut parsed) = serde_json::from_value::<Vec<OwnedRef>>(owned.clone())
        {
            refs.append(&mut parsed);
        }
    }
    refs
}

/// Blob references found in a stored document.
pub(crate) fn blob_refs_of(doc: &Document) -> Vec<Cid> {
    let mut refs = Vec::new();
    for value in doc.values() {
        if let Some(blob) = value.get(MARKER_BLOB).and_then(Value::as_str)
            && let Ok(cid) = blob.parse::<Cid>()
        {
            refs.push(cid);
        }
    }
    refs
}
