//! Compact identifier type.
//!
//! A [`Cid`] is 16 raw bytes rendered as a 22-character unpadded URL-safe
//! base64 string. The bit pattern carries no embedded structure — it is
//! either derived from a secret or fully random.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Size of a CID in raw bytes (128 bits).
pub const CID_LEN: usize = 16;

/// Length of the base64 string form (unpadded).
pub const CID_STR_LEN: usize = 22;

/// Errors from parsing a CID string.
#[derive(Debug, thiserror::Error)]
pub enum CidError {
    #[error("invalid CID length: expected {expected} characters, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("invalid CID encoding: {0}")]
    InvalidEncoding(String),
}

/// Compact identifier for documents and blobs.
///
/// Round-trips losslessly through its 22-character string form.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Cid([u8; CID_LEN]);

impl Cid {
    /// Creates a CID from raw bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; CID_LEN]) -> Self {
        Self(bytes)
    }

    /// Returns the raw bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; CID_LEN] {
        &self.0
    }

    /// Parses a CID from its 22-character string form.
    pub fn parse(s: &str) -> Result<Self, CidError> {
        if s.len() != CID_STR_LEN {
            return Err(CidError::InvalidLength {
                expected: CID_STR_LEN,
                actual: s.len(),
            });
        }
        let decoded = URL_SAFE_NO_PAD
            .decode(s)
            .map_err(|e| CidError::InvalidEncoding(e.to_string()))?;
        let bytes: [u8; CID_LEN] = decoded
            .try_into()
            .map_err(|_| CidError::InvalidEncoding("decoded to wrong byte count".into()))?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&URL_SAFE_NO_PAD.encode(self.0))
    }
}

impl fmt::Debug for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cid({self})")
    }
}

impl FromStr for Cid {
    type Err = CidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<Cid> for String {
    fn from(cid: Cid) -> Self {
        cid.to_string()
    }
}

impl TryFrom<String> for Cid {
    type Error = CidError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}
