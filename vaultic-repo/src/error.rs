//! Error types for the repository engine.

use thiserror::Error;
use vaultic_crypto::{CryptoError, WipeError};
use vaultic_store::StoreError;
use vaultic_types::{Cid, ConfigError};

/// Result type for repository operations.
pub type RepoResult<T> = Result<T, RepoError>;

/// Errors surfaced by the repository façade.
///
/// Field-level crypto failures never appear here — they are handled
/// fail-soft per field. Not-found is `Ok(None)`, not an error.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// Memory wipe failure at request close. Fatal for the request.
    #[error(transparent)]
    Wipe(#[from] WipeError),

    /// Record type has no registered descriptor.
    #[error("unknown record type: {0}")]
    UnknownType(String),

    /// Record carries a field its type does not declare.
    #[error("field {field:?} not declared for type {type_name}")]
    UnknownField { type_name: String, field: String },

    /// Field value shape contradicts the declared descriptor flags.
    #[error("invalid value for {type_name}.{field}: {reason}")]
    InvalidFieldValue {
        type_name: String,
        field: String,
        reason: String,
    },

    /// `rotate_secret` target identifier already occupied.
    #[error("an entity already exists under the new secret")]
    ExistsUnderNew,

    /// Cascade delete failed partway; parent and remaining children are
    /// left as-is.
    #[error("cascade delete failed at {cid}: {reason}")]
    CascadeFailed { cid: Cid, reason: String },
}
