//! Error types for keel operations

use thiserror::Error;

/// Store adapter errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Fetch failed on table {table}: {reason}")]
    Fetch { table: String, reason: String },

    #[error("Key {key} already exists in table {table}")]
    KeyExists { table: String, key: String },

    #[error("Write failed on table {table}: {reason}")]
    Write { table: String, reason: String },

    #[error("No record under key {key} in table {table}")]
    NotFound { table: String, key: String },

    #[error("Store lock poisoned")]
    LockPoisoned,
}

/// Entity registration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Invalid entity descriptor {name}: {reason}")]
    InvalidDescriptor { name: String, reason: String },
}

/// Scope cache and context population errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ContextError {
    /// A read was attempted for an entity type the scope was never
    /// populated with. Distinct from an initialized-but-empty slot.
    #[error("Scope was never populated for entity {entity}")]
    ScopeNotInitialized { entity: String },

    /// A store read failed while populating a scope. Aborts the enclosing
    /// population call; retry policy belongs to the store adapter.
    #[error("Fetch failed while populating {entity}")]
    FetchFailure {
        entity: String,
        source: StoreError,
    },

    /// An existence check matched more than one stored record.
    #[error("More than one stored record matches {entity}, candidate keys: {keys:?}")]
    AmbiguousMatch { entity: String, keys: Vec<String> },

    /// An address could not be resolved to a table-qualified record.
    #[error("Address {raw:?} does not name a table-qualified record")]
    InvalidAddress { raw: String },
}

/// Master error type for all keel errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KeelError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Context error: {0}")]
    Context(#[from] ContextError),
}

/// Result type alias for keel operations.
pub type KeelResult<T> = Result<T, KeelError>;

/// Result type alias for store adapter operations.
pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// TESTS
// =============================================================================
