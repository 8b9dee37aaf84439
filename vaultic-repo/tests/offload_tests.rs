//! Large-value offload: thresholding, encrypt-before-offload, lazy
//! materialization, superseded-blob cleanup and orphan handling.

use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use vaultic_crypto::SecretBytes;
use vaultic_model::{FieldDescriptor, FieldValue, Record, TypeDescriptor, TypeRegistry};
use vaultic_repo::{Repository, RequestScope, ScopedSecret};
use vaultic_store::{BlobStore, DocumentStore, MemoryBlobStore, MemoryDocumentStore};
use vaultic_types::{Cid, CoreConfig};

const SECRET: &str = "an-extremely-long-high-entropy-secret-0123456789";

fn registry() -> Arc<TypeRegistry> {
    let registry = TypeRegistry::new();
    registry.register(TypeDescriptor::new(
        "test.Asset",
        vec![
            FieldDescriptor::plain("title"),
            FieldDescriptor::blob("payload").with_encryption(),
            FieldDescriptor::blob("thumbnail"),
        ],
    ));
    Arc::new(registry)
}

type TestRepo = Repository<MemoryDocumentStore, MemoryBlobStore>;

fn setup_with(config: CoreConfig) -> (TestRepo, Arc<MemoryDocumentStore>, Arc<MemoryBlobStore>) {
    let docs = Arc::new(MemoryDocumentStore::new());
    let blobs = Arc::new(MemoryBlobStore::new());
    let repo = Repository::new(Arc::clone(&docs), Arc::clone(&blobs), registry(), config).unwrap();
    (repo, docs, blobs)
}

fn setup() -> (TestRepo, Arc<MemoryDocumentStore>, Arc<MemoryBlobStore>) {
    setup_with(CoreConfig::default())
}

fn open(scope: &mut RequestScope) -> ScopedSecret {
    scope.bind_secret(SecretBytes::from(SECRET)).unwrap()
}

/// A deterministic, non-repeating payload so plaintext windows are
/// recognizable.
fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

fn stored_blob_ref(doc: &vaultic_store::Document, field: &str) -> Cid {
    doc.get(field)
        .and_then(|v| v.get("$blob"))
        .and_then(|v| v.as_str())
        .unwrap()
        .parse()
        .unwrap()
}

// ── Thresholding ─────────────────────────────────────────────────

#[test]
fn oversized_value_is_offloaded_small_value_stays_inline() {
    let (repo, docs, blobs) = setup();

    let mut scope = RequestScope::new();
    let secret = open(&mut scope);
    let mut record = Record::new("test.Asset");
    record.set_bytes("payload", payload(2000));
    record.set_bytes("thumbnail", payload(500));
    let cid = repo.save(&mut scope, &secret, &mut record).unwrap();

    let raw = docs.get(&cid).unwrap().unwrap();
    assert!(raw.get("payload").unwrap().get("$blob").is_some());
    assert!(raw.get("thumbnail").unwrap().get("$bytes").is_some());
    assert_eq!(blobs.len(), 1);
    repo.close_scope(scope).unwrap();
}

#[test]
fn threshold_comes_from_configuration() {
    let (repo, docs, _) = setup_with(CoreConfig {
        offload_threshold_bytes: 4096,
        ..CoreConfig::default()
    });

    let mut scope = RequestScope::new();
    let secret = open(&mut scope);
    let mut record = Record::new("test.Asset");
    record.set_bytes("payload", payload(2000));
    let cid = repo.save(&mut scope, &secret, &mut record).unwrap();

    // 2000 bytes stays inline under the raised threshold.
    let raw = docs.get(&cid).unwrap().unwrap();
    assert!(raw.get("payload").unwrap().get("$enc").is_some());
    repo.close_scope(scope).unwrap();
}

#[test]
fn encrypted_value_is_encrypted_before_offload() {
    let (repo, docs, blobs) = setup();

    let plaintext = payload(2000);
    let mut scope = RequestScope::new();
    let secret = open(&mut scope);
    let mut record = Record::new("test.Asset");
    record.set_bytes("payload", plaintext.clone());
    let cid = repo.save(&mut scope, &secret, &mut record).unwrap();

    let raw = docs.get(&cid).unwrap().unwrap();
    let blob_ref = stored_blob_ref(&raw, "payload");
    let stored = blobs.get(&blob_ref).unwrap().unwrap();

    // nonce(12) || ciphertext+tag(16)
    assert_eq!(stored.len(), plaintext.len() + 28);
    let window = &plaintext[..64];
    assert!(!stored.windows(window.len()).any(|w| w == window));
    repo.close_scope(scope).unwrap();
}

#[test]
fn plain_blob_is_offloaded_unencrypted() {
    let (repo, docs, blobs) = setup();

    let bytes = payload(3000);
    let mut scope = RequestScope::new();
    let secret = open(&mut scope);
    let mut record = Record::new("test.Asset");
    record.set_bytes("thumbnail", bytes.clone());
    let cid = repo.save(&mut scope, &secret, &mut record).unwrap();

    let raw = docs.get(&cid).unwrap().unwrap();
    let blob_ref = stored_blob_ref(&raw, "thumbnail");
    assert_eq!(blobs.get(&blob_ref).unwrap().unwrap(), bytes);
    repo.close_scope(scope).unwrap();
}

// ── Lazy materialization ─────────────────────────────────────────

#[test]
fn offloaded_field_materializes_on_first_access() {
    let (repo, _, _) = setup();

    let original = payload(2000);
    let mut scope = RequestScope::new();
    let secret = open(&mut scope);
    let mut record = Record::new("test.Asset");
    record.set_bytes("payload", original.clone());
    repo.save(&mut scope, &secret, &mut record).unwrap();
    repo.close_scope(scope).unwrap();

    let mut scope = RequestScope::new();
    let secret = open(&mut scope);
    let mut loaded = repo
        .find_by_secret(&mut scope, &secret, "test.Asset")
        .unwrap()
        .unwrap();

    // Loading does not fetch the blob.
    assert!(loaded.get("payload").unwrap().is_offloaded());

    let bytes = repo
        .materialize(&secret, &mut loaded, "payload")
        .unwrap()
        .unwrap();
    assert_eq!(bytes, original);
    assert_eq!(loaded.get("payload").unwrap().as_bytes(), Some(&original[..]));
    repo.close_scope(scope).unwrap();
}

#[test]
fn materializing_without_mutation_is_not_a_change() {
    let (repo, docs, blobs) = setup();

    let mut scope = RequestScope::new();
    let secret = open(&mut scope);
    let mut record = Record::new("test.Asset");
    record.set_bytes("payload", payload(2000));
    let cid = repo.save(&mut scope, &secret, &mut record).unwrap();
    repo.close_scope(scope).unwrap();

    let mut scope = RequestScope::new();
    let secret = open(&mut scope);
    let mut loaded = repo
        .find_by_secret(&mut scope, &secret, "test.Asset")
        .unwrap()
        .unwrap();
    repo.materialize(&secret, &mut loaded, "payload").unwrap();

    let before = docs.get(&cid).unwrap().unwrap();
    repo.save(&mut scope, &secret, &mut loaded).unwrap();
    let after = docs.get(&cid).unwrap().unwrap();

    assert_eq!(before, after);
    assert_eq!(blobs.len(), 1);
    repo.close_scope(scope).unwrap();
}

#[test]
fn materializing_a_plain_field_returns_none() {
    let (repo, _, _) = setup();

    let mut scope = RequestScope::new();
    let secret = open(&mut scope);
    let mut record = Record::new("test.Asset");
    record.set_json("title", json!("cover"));
    repo.save(&mut scope, &secret, &mut record).unwrap();

    assert!(
        repo.materialize(&secret, &mut record, "title")
            .unwrap()
            .is_none()
    );
    repo.close_scope(scope).unwrap();
}

// ── Superseded blobs ─────────────────────────────────────────────

#[test]
fn replacing_an_offloaded_value_deletes_the_superseded_blob() {
    let (repo, docs, blobs) = setup();

    let mut scope = RequestScope::new();
    let secret = open(&mut scope);
    let mut record = Record::new("test.Asset");
    record.set_bytes("payload", payload(2000));
    let cid = repo.save(&mut scope, &secret, &mut record).unwrap();
    let old_ref = stored_blob_ref(&docs.get(&cid).unwrap().unwrap(), "payload");
    repo.close_scope(scope).unwrap();

    let mut scope = RequestScope::new();
    let secret = open(&mut scope);
    let mut loaded = repo
        .find_by_secret(&mut scope, &secret, "test.Asset")
        .unwrap()
        .unwrap();
    loaded.set_bytes("payload", payload(3000));
    repo.save(&mut scope, &secret, &mut loaded).unwrap();

    let new_ref = stored_blob_ref(&docs.get(&cid).unwrap().unwrap(), "payload");
    assert_ne!(old_ref, new_ref);
    assert_eq!(blobs.len(), 1);
    assert!(!blobs.exists(&old_ref).unwrap());
    repo.close_scope(scope).unwrap();
}

#[test]
fn shrinking_below_the_threshold_moves_the_value_back_inline() {
    let (repo, docs, blobs) = setup();

    let mut scope = RequestScope::new();
    let secret = open(&mut scope);
    let mut record = Record::new("test.Asset");
    record.set_bytes("payload", payload(2000));
    let cid = repo.save(&mut scope, &secret, &mut record).unwrap();
    repo.close_scope(scope).unwrap();

    let mut scope = RequestScope::new();
    let secret = open(&mut scope);
    let mut loaded = repo
        .find_by_secret(&mut scope, &secret, "test.Asset")
        .unwrap()
        .unwrap();
    loaded.set_bytes("payload", payload(100));
    repo.save(&mut scope, &secret, &mut loaded).unwrap();

    let raw = docs.get(&cid).unwrap().unwrap();
    assert!(raw.get("payload").unwrap().get("$enc").is_some());
    assert!(blobs.is_empty());
    repo.close_scope(scope).unwrap();
}

// ── Orphaned references ──────────────────────────────────────────

#[test]
fn orphaned_reference_is_cleaned_on_load() {
    let (repo, docs, blobs) = setup();

    let mut scope = RequestScope::new();
    let secret = open(&mut scope);
    let mut record = Record::new("test.Asset");
    record.set_json("title", json!("cover"));
    record.set_bytes("payload", payload(2000));
    let cid = repo.save(&mut scope, &secret, &mut record).unwrap();
    repo.close_scope(scope).unwrap();

    let blob_ref = stored_blob_ref(&docs.get(&cid).unwrap().unwrap(), "payload");
    blobs.delete(&blob_ref).unwrap();

    let mut scope = RequestScope::new();
    let secret = open(&mut scope);
    let loaded = repo
        .find_by_secret(&mut scope, &secret, "test.Asset")
        .unwrap()
        .unwrap();

    assert!(loaded.get("payload").is_none());
    assert_eq!(loaded.get("title").unwrap().as_json(), Some(&json!("cover")));
    // The dangling reference is also gone from the stored document.
    assert!(docs.get(&cid).unwrap().unwrap().get("payload").is_none());
    repo.close_scope(scope).unwrap();
}

#[test]
fn orphaned_reference_stays_when_integrity_check_is_disabled() {
    let (repo, docs, blobs) = setup_with(CoreConfig {
        integrity_check_enabled: false,
        ..CoreConfig::default()
    });

    let mut scope = RequestScope::new();
    let secret = open(&mut scope);
    let mut record = Record::new("test.Asset");
    record.set_bytes("payload", payload(2000));
    let cid = repo.save(&mut scope, &secret, &mut record).unwrap();
    repo.close_scope(scope).unwrap();

    let blob_ref = stored_blob_ref(&docs.get(&cid).unwrap().unwrap(), "payload");
    blobs.delete(&blob_ref).unwrap();

    let mut scope = RequestScope::new();
    let secret = open(&mut scope);
    let mut loaded = repo
        .find_by_secret(&mut scope, &secret, "test.Asset")
        .unwrap()
        .unwrap();

    assert!(loaded.get("payload").unwrap().is_offloaded());
    assert!(
        repo.materialize(&secret, &mut loaded, "payload")
            .unwrap()
            .is_none()
    );
    repo.close_scope(scope).unwrap();
}
