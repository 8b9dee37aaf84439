use crate::descriptor::FieldDescriptor;
use crate::record::Record;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::debug;

/// Hook invoked by the repository after every successful secret-based load.
/// Mutations performed inside it land in the next write-set.
pub type TouchFn = fn(&mut Record);

/// A record type's full persistence description: its field descriptors plus
/// the optional touch hook.
#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    /// Fully-qualified type name, unique across the process.
    pub type_name: &'static str,
    /// Persisted fields in declaration order.
    pub fields: Vec<FieldDescriptor>,
    /// Post-load hook.
    pub touch: Option<TouchFn>,
}

impl TypeDescriptor {
    #[must_use]
    pub fn new(type_name: &'static str, fields: Vec<FieldDescriptor>) -> Self {
        Self {
            type_name,
            fields,
            touch: None,
        }
    }

    /// Attaches a touch hook.
    #[must_use]
    pub fn with_touch(mut self, touch: TouchFn) -> Self {
        self.touch = Some(touch);
        self
    }

    /// Looks up one field's descriptor by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|d| d.name == name)
    }
}

/// Process-wide registry of type descriptors.
///
/// Descriptor lists are built once per type at registration and shared
/// read-only across concurrent requests; this is the only structure the
/// engine shares between requests.
pub struct TypeRegistry {
    inner: RwLock<HashMap<&'static str, Arc<TypeDescriptor>>>,
}

impl TypeRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a type descriptor, returning the shared handle. Re-
    /// registering a type name replaces the previous descriptor.
    pub fn register(&self, descriptor: TypeDescriptor) -> Arc<TypeDescriptor> {
        let descriptor = Arc::new(descriptor);
        let mut map = self.inner.write().unwrap_or_else(|e| e.into_inner());
        if map
            .insert(descriptor.type_name, Arc::clone(&descriptor))
            .is_some()
        {
            debug!(type_name = descriptor.type_name, "type descriptor replaced");
        }
        descriptor
    }

    /// Looks up a type by its fully-qualified name.
    #[must_use]
    pub fn get(&self, type_name: &str) -> Option<Arc<TypeDescriptor>> {
        let map = self.inner.read().unwrap_or_else(|e| e.into_inner());
        map.get(type_name).cloned()
    }

    /// Whether the type is registered.
    #[must_use]
    pub fn contains(&self, type_name: &str) -> bool {
        let map = self.inner.read().unwrap_or_else(|e| e.into_inner());
        map.contains_key(type_name)
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
