//! Secret-addressed repository engine.
//!
//! Ties the derivation, field-crypto, offload and store layers together
//! into a secret-addressed persistence API. Records are located by
//! deriving their identifier from a caller-held secret; no identifier
//! index exists and no secret is ever persisted.
//!
//! Typical request flow:
//!
//! ```no_run
//! use std::sync::Arc;
//! use vaultic_crypto::SecretBytes;
//! use vaultic_model::{FieldDescriptor, TypeDescriptor, TypeRegistry};
//! use vaultic_repo::{Repository, RequestScope};
//! use vaultic_store::{MemoryBlobStore, MemoryDocumentStore};
//! use vaultic_types::CoreConfig;
//!
//! # fn main() -> Result<(), vaultic_repo::RepoError> {
//! let registry = Arc::new(TypeRegistry::new());
//! registry.register(TypeDescriptor::new(
//!     "app.Profile",
//!     vec![
//!         FieldDescriptor::plain("updated_at"),
//!         FieldDescriptor::encrypted("email"),
//!     ],
//! ));
//!
//! let repo = Repository::new(
//!     Arc::new(MemoryDocumentStore::new()),
//!     Arc::new(MemoryBlobStore::new()),
//!     registry,
//!     CoreConfig::default(),
//! )?;
//!
//! let mut scope = RequestScope::new();
//! let secret = scope.bind_secret(SecretBytes::from(
//!     "a-sufficiently-long-high-entropy-secret-0123456789",
//! ))?;
//!
//! let record = repo.find_by_secret(&mut scope, &secret, "app.Profile")?;
//! // ... mutate and save ...
//! repo.close_scope(scope)?;
//! # Ok(())
//! # }
//! ```

mod cascade;
mod change;
mod encode;
mod error;
mod offload;
mod pool;
mod repo;
mod scope;

pub use change::{FieldHash, PREFIX_CHECKSUM_LIMIT, diff, hash_bytes, snapshot};
pub use error::{RepoError, RepoResult};
pub use offload::OffloadManager;
pub use repo::Repository;
pub use scope::{RequestScope, ScopedSecret};
