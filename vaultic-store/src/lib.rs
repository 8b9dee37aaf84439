//! Store collaborator contracts for vaultic.
//!
//! The persistence core consumes two abstract stores implemented by
//! callers:
//! - [`DocumentStore`] — an opaque keyed field-map store
//! - [`BlobStore`] — a content store addressed by reference
//!
//! The core owns interpretation of documents; the stores never see
//! plaintext for encrypted fields. Not-found is always `Ok(None)` — never
//! an error. In-memory reference implementations back the test suites and
//! work as embeddable defaults.

mod error;
mod memory;

pub use error::{StoreError, StoreResult};
pub use memory::{MemoryBlobStore, MemoryDocumentStore};

use std::collections::BTreeMap;
use vaultic_types::Cid;

/// An opaque field map. BTreeMap so iteration order is deterministic.
pub type Document = BTreeMap<String, serde_json::Value>;

/// Keyed document store contract.
pub trait DocumentStore: Send + Sync {
    /// Fetches a document, `Ok(None)` when absent.
    fn get(&self, id: &Cid) -> StoreResult<Option<Document>>;

    /// Writes a full document, replacing any existing one.
    fn put_full(&self, id: &Cid, doc: Document) -> StoreResult<()>;

    /// Merges the changed fields into an existing document. A field mapped
    /// to JSON `null` is removed. Creates the document when absent.
    fn put_partial(&self, id: &Cid, changed: Document) -> StoreResult<()>;

    /// Removes a document. Removing an absent document is `Ok`.
    fn delete(&self, id: &Cid) -> StoreResult<()>;

    /// Whether a document exists. O(1) for reasonable backends.
    fn exists(&self, id: &Cid) -> StoreResult<bool>;
}

/// Content-addressed blob store contract.
pub trait BlobStore: Send + Sync {
    /// Stores a blob, returning its reference.
    fn put(&self, bytes: &[u8]) -> StoreResult<Cid>;

    /// Fetches a blob by reference, `Ok(None)` when absent.
    fn get(&self, id: &Cid) -> StoreResult<Option<Vec<u8>>>;

    /// Removes a blob. Removing an absent blob is `Ok`.
    fn delete(&self, id: &Cid) -> StoreResult<()>;

    /// Whether the blob exists.
    fn exists(&self, id: &Cid) -> StoreResult<bool>;
}
