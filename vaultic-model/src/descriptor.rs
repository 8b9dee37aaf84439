/// Describes one persisted field of a record type.
///
/// Descriptors are declared once per type and reused across every instance
/// of that type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Field name as stored in the document.
    pub name: &'static str,
    /// Value is encrypted with the type's derived field key.
    pub encrypted: bool,
    /// Value holds owned ("part-of") children whose lifecycle is bound to
    /// this record; deleting the record deletes them.
    pub owned: bool,
    /// Value may be externalized to the blob store when it exceeds the
    /// configured threshold.
    pub offload_eligible: bool,
}

impl FieldDescriptor {
    const fn new(name: &'static str) -> Self {
        Self {
            name,
            encrypted: false,
            owned: false,
            offload_eligible: false,
        }
    }

    /// A plaintext field persisted as-is.
    #[must_use]
    pub const fn plain(name: &'static str) -> Self {
        Self::new(name)
    }

    /// An encrypted field.
    #[must_use]
    pub const fn encrypted(name: &'static str) -> Self {
        Self {
            encrypted: true,
            ..Self::new(name)
        }
    }

    /// A field holding owned child references.
    #[must_use]
    pub const fn owned(name: &'static str) -> Self {
        Self {
            owned: true,
            ..Self::new(name)
        }
    }

    /// A binary field eligible for large-value offload.
    #[must_use]
    pub const fn blob(name: &'static str) -> Self {
        Self {
            offload_eligible: true,
            ..Self::new(name)
        }
    }

    /// Marks the field encrypted (chainable, e.g. an encrypted blob).
    #[must_use]
    pub const fn with_encryption(mut self) -> Self {
        self.encrypted = true;
        self
    }

    /// Marks the field offload-eligible (chainable).
    #[must_use]
    pub const fn with_offload(mut self) -> Self {
        self.offload_eligible = true;
        self
    }
}
