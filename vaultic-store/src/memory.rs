//! In-memory store implementations.
//!
//! Used by the repository test suites and as embeddable defaults for
//! processes that do not need durable storage.

use crate::{BlobStore, Document, DocumentStore, StoreError, StoreResult};
use std::collections::HashMap;
use std::sync::Mutex;
use vaultic_types::Cid;

/// `HashMap`-backed document store.
#[derive(Default)]
pub struct MemoryDocumentStore {
    docs: Mutex<HashMap<Cid, Document>>,
}

impl MemoryDocumentStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.docs.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn get(&self, id: &Cid) -> StoreResult<Option<Document>> {
        let docs = self.docs.lock().unwrap_or_else(|e| e.into_inner());
        Ok(docs.get(id).cloned())
    }

    fn put_full(&self, id: &Cid, doc: Document) -> StoreResult<()> {
        let mut docs = self.docs.lock().unwrap_or_else(|e| e.into_inner());
        docs.insert(*id, doc);
        Ok(())
    }

    fn put_partial(&self, id: &Cid, changed: Document) -> StoreResult<()> {
        let mut docs = self.docs.lock().unwrap_or_else(|e| e.into_inner());
        let doc = docs.entry(*id).or_default();
        for (name, value) in changed {
            if value.is_null() {
                doc.remove(&name);
            } else {
                doc.insert(name, value);
            }
        }
        Ok(())
    }

    fn delete(&self, id: &Cid) -> StoreResult<()> {
        let mut docs = self.docs.lock().unwrap_or_else(|e| e.into_inner());
        docs.remove(id);
        Ok(())
    }

    fn exists(&self, id: &Cid) -> StoreResult<bool> {
        let docs = self.docs.lock().unwrap_or_else(|e| e.into_inner());
        Ok(docs.contains_key(id))
    }
}

/// `HashMap`-backed blob store with entropy-gated random references.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<Cid, Vec<u8>>>,
}

impl MemoryBlobStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored blobs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.blobs.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BlobStore for MemoryBlobStore {
    fn put(&self, bytes: &[u8]) -> StoreResult<Cid> {
        let id = vaultic_crypto::random_cid()
            .map_err(|e| StoreError::RefAllocation(e.to_string()))?;
        let mut blobs = self.blobs.lock().unwrap_or_else(|e| e.into_inner());
        blobs.insert(id, bytes.to_vec());
        Ok(id)
    }

    fn get(&self, id: &Cid) -> StoreResult<Option<Vec<u8>>> {
        let blobs = self.blobs.lock().unwrap_or_else(|e| e.into_inner());
        Ok(blobs.get(id).cloned())
    }

    fn delete(&self, id: &Cid) -> StoreResult<()> {
        let mut blobs = self.blobs.lock().unwrap_or_else(|e| e.into_inner());
        blobs.remove(id);
        Ok(())
    }

    fn exists(&self, id: &Cid) -> StoreResult<bool> {
        let blobs = self.blobs.lock().unwrap_or_else(|e| e.into_inner());
        Ok(blobs.contains_key(id))
    }
}
