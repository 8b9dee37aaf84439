//! Record model for vaultic.
//!
//! Defines the types the repository layer orchestrates:
//! - [`FieldDescriptor`] — a persisted field's name plus its
//!   encrypted/owned/offload flags
//! - [`TypeDescriptor`] / [`TypeRegistry`] — per-type descriptor lists,
//!   built once and shared read-only across concurrent requests
//! - [`Record`] / [`FieldValue`] — the generic in-memory entity with its
//!   load-time hash snapshot
//!
//! Field enumeration is explicit and type-registered; there is no hidden
//! control-flow interception anywhere in the engine.

mod descriptor;
mod record;
mod registry;

pub use descriptor::FieldDescriptor;
pub use record::{FieldValue, OwnedRef, Record};
pub use registry::{TouchFn, TypeDescriptor, TypeRegistry};
