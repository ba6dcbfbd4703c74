//! Scope-local record cache.
//!
//! One cache per logical scope (e.g. one inbound request), mapping entity
//! type to `identifier -> record`. The populator writes it; entity
//! construction reads it. A slot that was never populated is an error
//! distinct from an initialized-but-empty slot, so callers can tell "no
//! record" apart from "never asked for this type". Never share a scope
//! cache across concurrent scopes.

use std::collections::HashMap;
use std::sync::RwLock;

use keel_core::{ContextError, EntityDescriptor, KeelResult, KeyAddress, Record, Registry};

/// Per-scope cache of fetched records, one slot per entity type.
#[derive(Default)]
pub struct ScopeCache {
    slots: RwLock<HashMap<String, HashMap<String, Record>>>,
}

impl ScopeCache {
    /// Create an empty scope cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the slot for `slug` wholesale. One assignment per completed
    /// fetch; concurrent writers of distinct slots do not contend beyond
    /// the map lock.
    pub(crate) fn commit(&self, slug: &str, records: HashMap<String, Record>) {
        self.slots
            .write()
            .unwrap()
            .insert(slug.to_string(), records);
    }

    /// Whether `entity`'s slot was populated at least once this scope.
    pub fn is_initialized(&self, entity: &EntityDescriptor) -> bool {
        self.slots.read().unwrap().contains_key(entity.slug())
    }

    /// Whether `entity`'s slot holds at least one record.
    pub fn has_entries(&self, entity: &EntityDescriptor) -> bool {
        self.slots
            .read()
            .unwrap()
            .get(entity.slug())
            .is_some_and(|slot| !slot.is_empty())
    }

    /// Number of cached records for `entity`.
    pub fn len(&self, entity: &EntityDescriptor) -> KeelResult<usize> {
        let slots = self.slots.read().unwrap();
        let slot = slots
            .get(entity.slug())
            .ok_or_else(|| ContextError::ScopeNotInitialized {
                entity: entity.slug().to_string(),
            })?;
        Ok(slot.len())
    }

    /// Read one record by identifier. `Ok(None)` means the slot was
    /// populated but holds no record under `key`.
    pub fn lookup(&self, entity: &EntityDescriptor, key: &str) -> KeelResult<Option<Record>> {
        let slots = self.slots.read().unwrap();
        let slot = slots
            .get(entity.slug())
            .ok_or_else(|| ContextError::ScopeNotInitialized {
                entity: entity.slug().to_string(),
            })?;
        Ok(slot.get(key).cloned())
    }

    /// All cached records for `entity`.
    pub fn records(&self, entity: &EntityDescriptor) -> KeelResult<Vec<Record>> {
        let slots = self.slots.read().unwrap();
        let slot = slots
            .get(entity.slug())
            .ok_or_else(|| ContextError::ScopeNotInitialized {
                entity: entity.slug().to_string(),
            })?;
        Ok(slot.values().cloned().collect())
    }

    /// Resolve a table-qualified address against the cache. The address
    /// must carry an explicit table naming a registered entity; bare and
    /// empty addresses cannot name a slot and are rejected.
    pub fn resolve_address(
        &self,
        registry: &Registry,
        address: &KeyAddress,
    ) -> KeelResult<Option<Record>> {
        let (Some(table), Some(id)) = (address.table(), address.id()) else {
            return Err(ContextError::InvalidAddress {
                raw: address.as_text(),
            }
            .into());
        };
        let entity = registry
            .lookup_table(table)
            .ok_or_else(|| ContextError::InvalidAddress {
                raw: address.as_text(),
            })?;
        self.lookup(&entity, id)
    }

    /// Drop every slot, returning the scope to its unpopulated state.
    pub fn clear(&self) {
        self.slots.write().unwrap().clear();
    }
}

// =============================================================================
// TESTS
// =============================================================================
