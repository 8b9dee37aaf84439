//! Repository façade.
//!
//! Orchestrates derivation, field crypto, offload, change detection and
//! cascade delete into the secret-addressed operations: `save`,
//! `find_by_secret`, `delete_by_secret`, `rotate_secret`,
//! `exists_by_secret` and `delete_by_id`.
//!
//! There is deliberately no lookup-by-identifier for secret-addressed
//! records: identifiers are one-way derived, so a caller holding only an
//! identifier could never decrypt, and exposing such a method would invite
//! misuse.

use crate::cascade::cascade_delete;
use crate::change::{diff, hash_bytes, snapshot};
use crate::encode::{Encoded, MARKER_ENC, blob_marker, decode_field, encode_field};
use crate::error::{RepoError, RepoResult};
use crate::offload::OffloadManager;
use crate::pool::par_map;
use crate::scope::{RequestScope, ScopedSecret};
use serde_json::Value;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};
use vaultic_crypto::{FieldKey, decrypt, derive_cid, derive_field_key, encrypt_field, random_cid};
use vaultic_model::{FieldValue, OwnedRef, Record, TypeRegistry};
use vaultic_store::{BlobStore, Document, DocumentStore};
use vaultic_types::{Cid, CoreConfig};
use zeroize::Zeroizing;

/// The secret-addressed repository.
///
/// Holds the two store collaborators, the shared type registry and the
/// validated configuration. One instance serves many concurrent requests;
/// all per-request state lives in [`RequestScope`].
pub struct Repository<D: DocumentStore, B: BlobStore> {
    docs: Arc<D>,
    blobs: Arc<B>,
    registry: Arc<TypeRegistry>,
    config: CoreConfig,
    offload: OffloadManager,
    workers: usize,
}

impl<D: DocumentStore, B: BlobStore> Repository<D, B> {
    /// Builds a repository over the given collaborators. The configuration
    /// is validated (and its threshold clamped) here.
    pub fn new(
        docs: Arc<D>,
        blobs: Arc<B>,
        registry: Arc<TypeRegistry>,
        config: CoreConfig,
    ) -> RepoResult<Self> {
        let config = config.validated()?;
        let offload = OffloadManager::new(&config);
        let workers = config.worker_threads();
        Ok(Self {
            docs,
            blobs,
            registry,
            config,
            offload,
            workers,
        })
    }

    /// The validated configuration in effect.
    #[must_use]
    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// The offload manager in effect.
    #[must_use]
    pub fn offload(&self) -> &OffloadManager {
        &self.offload
    }

    // ── Binding ──────────────────────────────────────────────────

    /// Binds a record to a secret: assigns its derived identifier if it
    /// has none and tracks it in the scope so an unsaved record is cleaned
    /// up at request end.
    pub fn bind(
        &self,
        scope: &mut RequestScope,
        secret: &ScopedSecret,
        record: &mut Record,
    ) -> RepoResult<Cid> {
        let cid = match record.cid {
            Some(cid) => cid,
            None => {
                let cid = secret.with_bytes(|s| derive_cid(s, &record.type_name))?;
                record.cid = Some(cid);
                cid
            }
        };
        scope.track_record(cid, &record.type_name, record.persisted);
        scope.note_owned(&cid, record.owned_refs());
        Ok(cid)
    }

    /// Creates an owned child record under `parent.field`: allocates an
    /// entropy-validated random identifier, registers the reference on the
    /// parent and tracks the child in the scope.
    ///
    /// Children get random identifiers because the derived identifier for
    /// `(secret, type)` is already taken by the type's root record.
    pub fn new_child(
        &self,
        scope: &mut RequestScope,
        secret: &ScopedSecret,
        parent: &mut Record,
        field: &str,
        child_type: &str,
    ) -> RepoResult<Record> {
        let parent_desc = self
            .registry
            .get(&parent.type_name)
            .ok_or_else(|| RepoError::UnknownType(parent.type_name.clone()))?;
        let field_desc = parent_desc
            .field(field)
            .ok_or_else(|| RepoError::UnknownField {
                type_name: parent.type_name.clone(),
                field: field.to_string(),
            })?;
        if !field_desc.owned {
            return Err(RepoError::InvalidFieldValue {
                type_name: parent.type_name.clone(),
                field: field.to_string(),
                reason: "field is not flagged owned".into(),
            });
        }
        if !self.registry.contains(child_type) {
            return Err(RepoError::UnknownType(child_type.to_string()));
        }

        let child_cid = random_cid()?;
        let mut child = Record::new(child_type);
        child.cid = Some(child_cid);

        parent.add_owned(field, OwnedRef::new(child_cid, child_type));
        self.bind(scope, secret, parent)?;
        scope.track_record(child_cid, child_type, false);
        Ok(child)
    }

    // ── Save ─────────────────────────────────────────────────────

    /// Persists a record: derives the identifier if new, encrypts declared
    /// fields, offloads oversized values and writes only the fields that
    /// changed since load (all of them for a new record).
    pub fn save(
        &self,
        scope: &mut RequestScope,
        secret: &ScopedSecret,
        record: &mut Record,
    ) -> RepoResult<Cid> {
        let desc = self
            .registry
            .get(&record.type_name)
            .ok_or_else(|| RepoError::UnknownType(record.type_name.clone()))?;

        for (name, value) in &record.fields {
            let field_desc = desc.field(name).ok_or_else(|| RepoError::UnknownField {
                type_name: record.type_name.clone(),
                field: name.clone(),
            })?;
            let is_owned_value = matches!(value, FieldValue::OwnedRefs(_));
            if is_owned_value != field_desc.owned {
                return Err(RepoError::InvalidFieldValue {
                    type_name: record.type_name.clone(),
                    field: name.clone(),
                    reason: if field_desc.owned {
                        "owned field requires owned references".into()
                    } else {
                        "owned references on a field not flagged owned".into()
                    },
                });
            }
        }

        let cid = self.bind(scope, secret, record)?;
        let key = self.key_for(secret, &record.type_name)?;

        let current = snapshot(record, self.workers);
        let changed: BTreeSet<String> = if record.persisted {
            diff(&record.original_hashes, &current)
        } else {
            current
                .keys()
                .chain(record.original_hashes.keys())
                .cloned()
                .collect()
        };

        if record.persisted && changed.is_empty() {
            debug!(cid = %cid, "no fields changed, skipping write");
            return Ok(cid);
        }

        // CPU phase: encrypt/encode changed fields on the worker pool.
        let present: Vec<(&str, &FieldValue)> = changed
            .iter()
            .filter_map(|name| record.fields.get(name).map(|v| (name.as_str(), v)))
            .collect();
        let encoded = par_map(&present, self.workers, |(name, value)| {
            let field_desc = desc
                .field(name)
                .copied()
                .unwrap_or(vaultic_model::FieldDescriptor::plain(""));
            encode_field(&field_desc, value, &key, |len| {
                self.offload.should_offload(len)
            })
        });

        // I/O phase: offload oversized payloads, supersede old blobs.
        let mut write_set = Document::new();
        for ((name, _), payload) in present.iter().zip(encoded) {
            let stored = match payload {
                Encoded::Inline(value) => {
                    if let Some(old) = record.offload_refs.remove(*name) {
                        self.offload.delete(self.blobs.as_ref(), &old)?;
                    }
                    value
                }
                Encoded::NeedsOffload {
                    wire,
                    plain_len,
                    encrypted,
                } => {
                    let blob = self.offload.store(self.blobs.as_ref(), &wire)?;
                    scope.note_blob(&cid, blob);
                    if let Some(old) = record.offload_refs.insert(name.to_string(), blob) {
                        self.offload.delete(self.blobs.as_ref(), &old)?;
                    }
                    blob_marker(&blob, plain_len, encrypted)
                }
            };
            write_set.insert(name.to_string(), stored);
        }

        // Fields removed since load are written as nulls on partial update.
        for name in &changed {
            if !record.fields.contains_key(name) {
                if let Some(old) = record.offload_refs.remove(name) {
                    self.offload.delete(self.blobs.as_ref(), &old)?;
                }
                write_set.insert(name.clone(), Value::Null);
            }
        }

        if record.persisted {
            self.docs.put_partial(&cid, write_set)?;
        } else {
            write_set.retain(|_, v| !v.is_null());
            self.docs.put_full(&cid, write_set)?;
        }

        record.original_hashes = current;
        record.persisted = true;
        scope.mark_persisted(&cid);
        scope.note_owned(&cid, record.owned_refs());
        Ok(cid)
    }

    // ── Find ─────────────────────────────────────────────────────

    /// Loads the record addressed by `(secret, type_name)`. Re-derives the
    /// identifier, decrypts declared fields (fail-soft per field), captures
    /// the hash snapshot and invokes the type's `touch` hook.
    pub fn find_by_secret(
        &self,
        scope: &mut RequestScope,
        secret: &ScopedSecret,
        type_name: &str,
    ) -> RepoResult<Option<Record>> {
        let cid = secret.with_bytes(|s| derive_cid(s, type_name))?;
        self.load_record(scope, secret, cid, type_name)
    }

    /// Loads an owned child by its reference, using the same secret. The
    /// child's field key is derived from `(secret, child type)`.
    pub fn find_child(
        &self,
        scope: &mut RequestScope,
        secret: &ScopedSecret,
        child: &OwnedRef,
    ) -> RepoResult<Option<Record>> {
        self.load_record(scope, secret, child.cid, &child.type_name)
    }

    fn load_record(
        &self,
        scope: &mut RequestScope,
        secret: &ScopedSecret,
        cid: Cid,
        type_name: &str,
    ) -> RepoResult<Option<Record>> {
        let desc = self
            .registry
            .get(type_name)
            .ok_or_else(|| RepoError::UnknownType(type_name.to_string()))?;
        let Some(doc) = self.docs.get(&cid)? else {
            return Ok(None);
        };
        let key = self.key_for(secret, type_name)?;

        // Decrypt/decode fields on the worker pool; document order is
        // deterministic, so reassembly is too.
        let entries: Vec<(&String, &Value)> = doc.iter().collect();
        let decoded = par_map(&entries, self.workers, |(_, stored)| {
            decode_field(stored, &key)
        });

        let mut record = Record::new(type_name);
        record.cid = Some(cid);
        record.persisted = true;
        for ((name, _), value) in entries.iter().zip(decoded) {
            if let FieldValue::Offloaded { blob, .. } = &value {
                record.offload_refs.insert((*name).clone(), *blob);
            }
            record.set((*name).clone(), value);
        }

        if self.config.integrity_check_enabled {
            self.clean_orphan_refs(&cid, &mut record)?;
        }

        record.original_hashes = snapshot(&record, self.workers);

        if let Some(touch) = desc.touch {
            touch(&mut record);
        }

        scope.track_record(cid, type_name, true);
        scope.note_owned(&cid, record.owned_refs());
        Ok(Some(record))
    }

    /// Removes offload references whose blob no longer exists, both from
    /// the in-memory record and from the stored document.
    fn clean_orphan_refs(&self, cid: &Cid, record: &mut Record) -> RepoResult<()> {
        let mut orphaned = Vec::new();
        for (name, value) in &record.fields {
            if let FieldValue::Offloaded { blob, .. } = value
                && !self.blobs.exists(blob)?
            {
                warn!(cid = %cid, field = %name, blob = %blob, "orphaned offload reference, cleaning");
                orphaned.push(name.clone());
            }
        }
        if orphaned.is_empty() {
            return Ok(());
        }
        let mut cleanup = Document::new();
        for name in orphaned {
            record.take(&name);
            record.offload_refs.remove(&name);
            cleanup.insert(name, Value::Null);
        }
        self.docs.put_partial(cid, cleanup)?;
        Ok(())
    }

    // ── Lazy materialization ─────────────────────────────────────

    /// Resolves an offloaded field on first access: fetches the blob,
    /// decrypts it when the value was encrypted before offload, and
    /// replaces the reference with the bytes in the record. Returns the
    /// bytes, or `None` when the field is not materializable (absent,
    /// plain, or an orphaned reference).
    pub fn materialize(
        &self,
        secret: &ScopedSecret,
        record: &mut Record,
        field: &str,
    ) -> RepoResult<Option<Vec<u8>>> {
        let (blob, encrypted) = match record.get(field) {
            Some(FieldValue::Offloaded {
                blob, encrypted, ..
            }) => (*blob, *encrypted),
            Some(FieldValue::Bytes(bytes)) => return Ok(Some(bytes.clone())),
            _ => return Ok(None),
        };

        let Some(wire) = self.offload.load(self.blobs.as_ref(), &blob)? else {
            warn!(field = %field, blob = %blob, "offloaded value missing from blob store");
            return Ok(None);
        };

        let bytes = if encrypted {
            let key = self.key_for(secret, &record.type_name)?;
            match decrypt(&key, &wire) {
                Ok(plaintext) => plaintext,
                Err(e) => {
                    warn!(field = %field, error = %e, "offloaded value failed decryption, returning ciphertext unchanged");
                    wire
                }
            }
        } else {
            wire
        };

        // Materialization itself is not a mutation: align the original
        // hash so an untouched field stays out of the next write-set.
        record
            .original_hashes
            .insert(field.to_string(), hash_bytes(&bytes));
        record.offload_refs.insert(field.to_string(), blob);
        record.set(field.to_string(), FieldValue::Bytes(bytes.clone()));
        Ok(Some(bytes))
    }

    // ── Delete ───────────────────────────────────────────────────

    /// Cascade-deletes the record addressed by `(secret, type_name)`:
    /// owned children first, then attached blobs, then the document.
    /// Returns whether anything was removed.
    pub fn delete_by_secret(
        &self,
        secret: &ScopedSecret,
        type_name: &str,
    ) -> RepoResult<bool> {
        let cid = secret.with_bytes(|s| derive_cid(s, type_name))?;
        let mut visited = HashSet::new();
        let removed = cascade_delete(self.docs.as_ref(), self.blobs.as_ref(), &cid, &mut visited)?;
        Ok(removed > 0)
    }

    /// Removes a document by raw identifier. No cascade guarantee: without
    /// a loaded record there is no decryption and no ownership walk beyond
    /// the plaintext markers — this is for non-secret-addressed cleanup.
    pub fn delete_by_id(&self, cid: &Cid) -> RepoResult<bool> {
        let existed = self.docs.exists(cid)?;
        self.docs.delete(cid)?;
        Ok(existed)
    }

    /// Whether a record exists under `(secret, type_name)`. O(1): one
    /// derivation plus one existence probe.
    pub fn exists_by_secret(&self, secret: &ScopedSecret, type_name: &str) -> RepoResult<bool> {
        let cid = secret.with_bytes(|s| derive_cid(s, type_name))?;
        Ok(self.docs.exists(&cid)?)
    }

    // ── Secret rotation ──────────────────────────────────────────

    /// Re-identifies and re-encrypts the record (and its owned children
    /// and encrypted blobs) under `new_secret`. The old document is
    /// removed only after the new one is fully written. `Ok(None)` when
    /// nothing exists under the old secret.
    pub fn rotate_secret(
        &self,
        old_secret: &ScopedSecret,
        new_secret: &ScopedSecret,
        type_name: &str,
    ) -> RepoResult<Option<Cid>> {
        let old_cid = old_secret.with_bytes(|s| derive_cid(s, type_name))?;
        let new_cid = new_secret.with_bytes(|s| derive_cid(s, type_name))?;

        let Some(doc) = self.docs.get(&old_cid)? else {
            return Ok(None);
        };
        if self.docs.exists(&new_cid)? {
            return Err(RepoError::ExistsUnderNew);
        }

        let mut superseded_blobs = Vec::new();
        let mut visited = HashSet::new();
        visited.insert(old_cid);
        let rotated = self.rotate_doc(
            &doc,
            type_name,
            old_secret,
            new_secret,
            &mut superseded_blobs,
            &mut visited,
        )?;

        self.docs.put_full(&new_cid, rotated)?;
        for blob in superseded_blobs {
            self.offload.delete(self.blobs.as_ref(), &blob)?;
        }
        self.docs.delete(&old_cid)?;
        debug!(old = %old_cid, new = %new_cid, "secret rotated");
        Ok(Some(new_cid))
    }

    /// Rewrites one document's encrypted material from the old key to the
    /// new key, recursing through owned children (rewritten in place —
    /// their random identifiers are not secret-derived).
    fn rotate_doc(
        &self,
        doc: &Document,
        type_name: &str,
        old_secret: &ScopedSecret,
        new_secret: &ScopedSecret,
        superseded_blobs: &mut Vec<Cid>,
        visited: &mut HashSet<Cid>,
    ) -> RepoResult<Document> {
        let old_key = self.key_for(old_secret, type_name)?;
        let new_key = self.key_for(new_secret, type_name)?;

        let mut rotated = Document::new();
        for (name, stored) in doc {
            let value = self.rotate_value(
                stored,
                &old_key,
                &new_key,
                old_secret,
                new_secret,
                superseded_blobs,
                visited,
            )?;
            rotated.insert(name.clone(), value);
        }
        Ok(rotated)
    }

    #[allow(clippy::too_many_arguments)]
    fn rotate_value(
        &self,
        stored: &Value,
        old_key: &FieldKey,
        new_key: &FieldKey,
        old_secret: &ScopedSecret,
        new_secret: &ScopedSecret,
        superseded_blobs: &mut Vec<Cid>,
        visited: &mut HashSet<Cid>,
    ) -> RepoResult<Value> {
        let Some(obj) = stored.as_object() else {
            return Ok(stored.clone());
        };

        // Owned children: rewrite each child document in place.
        if let Some(owned) = obj.get(crate::encode::MARKER_OWNED) {
            if let Ok(refs) = serde_json::from_value::<Vec<OwnedRef>>(owned.clone()) {
                for child in &refs {
                    if !visited.insert(child.cid) {
                        continue;
                    }
                    if let Some(child_doc) = self.docs.get(&child.cid)? {
                        let rotated = self.rotate_doc(
                            &child_doc,
                            &child.type_name,
                            old_secret,
                            new_secret,
                            superseded_blobs,
                            visited,
                        )?;
                        self.docs.put_full(&child.cid, rotated)?;
                    }
                }
            }
            return Ok(stored.clone());
        }

        // Encrypted offloaded value: re-encrypt the blob under the new key.
        if let Some(blob_str) = obj.get(crate::encode::MARKER_BLOB).and_then(Value::as_str) {
            let encrypted = obj.get("enc").and_then(Value::as_bool).unwrap_or(false);
            if !encrypted {
                return Ok(stored.clone());
            }
            let Ok(blob) = blob_str.parse::<Cid>() else {
                return Ok(stored.clone());
            };
            let Some(wire) = self.offload.load(self.blobs.as_ref(), &blob)? else {
                warn!(blob = %blob, "offloaded value missing during rotation, keeping reference");
                return Ok(stored.clone());
            };
            let plaintext = match decrypt(old_key, &wire) {
                Ok(plaintext) => Zeroizing::new(plaintext),
                Err(e) => {
                    warn!(blob = %blob, error = %e, "corrupted blob left under old key during rotation");
                    return Ok(stored.clone());
                }
            };
            let new_wire = encrypt_field(new_key, &plaintext);
            let new_blob = self.offload.store(self.blobs.as_ref(), &new_wire)?;
            superseded_blobs.push(blob);
            let len = obj.get("len").and_then(Value::as_u64).unwrap_or(0);
            return Ok(blob_marker(&new_blob, len, true));
        }

        // Inline encrypted value: decrypt and re-encrypt.
        if let Some(encoded) = obj.get(MARKER_ENC).and_then(Value::as_str) {
            let binary = obj.get("bin").and_then(Value::as_bool).unwrap_or(false);
            let Ok(wire) = vaultic_crypto::decode_wire(encoded) else {
                return Ok(stored.clone());
            };
            return match decrypt(old_key, &wire) {
                Ok(plaintext) => {
                    let plaintext = Zeroizing::new(plaintext);
                    let new_wire = encrypt_field(new_key, &plaintext);
                    Ok(serde_json::json!({
                        MARKER_ENC: vaultic_crypto::encode_wire(&new_wire),
                        "bin": binary,
                    }))
                }
                Err(e) => {
                    warn!(error = %e, "corrupted field left under old key during rotation");
                    Ok(stored.clone())
                }
            };
        }

        Ok(stored.clone())
    }

    // ── Scope teardown ───────────────────────────────────────────

    /// Closes a request scope: deletes every record bound during the
    /// request that was never persisted (cascade and offloaded blobs
    /// included), then zeroes all tracked sensitive buffers.
    ///
    /// A wipe failure is fatal and takes precedence over cleanup errors;
    /// the wipe always runs even when cleanup fails.
    pub fn close_scope(&self, mut scope: RequestScope) -> RepoResult<()> {
        let unpersisted = scope.take_unpersisted();
        let mut first_error: Option<RepoError> = None;

        for tracked in unpersisted {
            debug!(cid = %tracked.cid, type_name = %tracked.type_name, "cleaning up unsaved record");
            for blob in &tracked.blobs {
                if let Err(e) = self.offload.delete(self.blobs.as_ref(), blob) {
                    first_error.get_or_insert(e);
                }
            }
            let mut visited = HashSet::new();
            if let Err(e) =
                cascade_delete(self.docs.as_ref(), self.blobs.as_ref(), &tracked.cid, &mut visited)
            {
                first_error.get_or_insert(e);
            }
            for child in &tracked.owned {
                if let Err(e) = cascade_delete(
                    self.docs.as_ref(),
                    self.blobs.as_ref(),
                    &child.cid,
                    &mut visited,
                ) {
                    first_error.get_or_insert(e);
                }
            }
        }

        scope.finish_wipe()?;
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn key_for(&self, secret: &ScopedSecret, type_name: &str) -> RepoResult<FieldKey> {
        Ok(secret.with_bytes(|s| derive_field_key(s, type_name))?)
    }
}
