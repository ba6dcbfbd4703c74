//! Keel Core - Entity Model Types
//!
//! Pure data model for the keel data-access layer: key addresses, field
//! metadata, entity descriptors, the entity registry, queries, and the
//! error taxonomy. All other crates depend on this.

pub mod entity;
pub mod error;
pub mod key;
pub mod metadata;
pub mod query;
pub mod registry;

pub use entity::{name_to_slug, slug_to_name, EntityDescriptor, ExistSpec, ReferenceField, ReferenceKind};
pub use error::{ContextError, KeelError, KeelResult, RegistryError, StoreError, StoreResult};
pub use key::KeyAddress;
pub use metadata::FieldMetadata;
pub use query::Query;
pub use registry::Registry;

/// Raw record as returned by the store: an opaque set of named values.
/// The core never interprets record contents beyond the `key` attribute and
/// declared reference-field values.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Extract a record's `key` attribute, if usable.
pub fn record_key(record: &Record) -> Option<&str> {
    record
        .get("key")
        .and_then(serde_json::Value::as_str)
        .filter(|key| !key.is_empty())
}
